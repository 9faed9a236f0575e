//! History backend configuration types.

use serde::{Deserialize, Serialize};

/// History backend configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    #[default]
    Memory,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryConfig {
    #[serde(default)]
    pub backend: HistoryBackend,
    /// Turns retained per session (user and assistant messages count separately).
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// Sessions retained before the least recently used one is evicted.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Turns interleaved into a text-generation prompt.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: HistoryBackend::default(),
            max_turns: default_max_turns(),
            max_sessions: default_max_sessions(),
            context_window: default_context_window(),
        }
    }
}

fn default_max_turns() -> usize {
    10
}

fn default_max_sessions() -> usize {
    1024
}

fn default_context_window() -> usize {
    5
}
