// core.rs
//
// Core types for conversation history: the turn record, the storage trait,
// the per-session lease and the error type.

use std::fmt::{Display, Formatter};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    /// Label used when a turn is rendered into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            TurnRole::User => "User",
            TurnRole::Assistant => "Assistant",
        }
    }
}

impl Display for TurnRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One message in a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }
}

pub type HistoryResult<T> = Result<T, HistoryError>;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Invalid session id: {0:?}")]
    InvalidSession(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Exclusive access to one session, held while a request reads and then
/// writes its history. Released on drop.
pub struct SessionLease {
    guard: Option<OwnedMutexGuard<()>>,
    on_release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl std::fmt::Debug for SessionLease {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLease")
            .field("held", &self.is_held())
            .finish()
    }
}

impl SessionLease {
    /// `on_release` runs after the guard has been dropped.
    pub(crate) fn held(
        guard: OwnedMutexGuard<()>,
        on_release: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            guard: Some(guard),
            on_release: Some(Box::new(on_release)),
        }
    }

    /// A lease that serializes nothing, for backends without state.
    pub fn detached() -> Self {
        Self {
            guard: None,
            on_release: None,
        }
    }

    pub fn is_held(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        drop(self.guard.take());
        if let Some(release) = self.on_release.take() {
            release();
        }
    }
}

#[async_trait]
pub trait HistoryStore: Send + Sync + 'static {
    async fn append(&self, session_id: &str, turn: ChatTurn) -> HistoryResult<()>;

    /// The last `n` turns of a session, oldest first.
    async fn recent(&self, session_id: &str, n: usize) -> HistoryResult<Vec<ChatTurn>>;

    /// Every retained turn of a session, oldest first.
    async fn history(&self, session_id: &str) -> HistoryResult<Vec<ChatTurn>>;

    /// Drop a session. Returns whether anything was stored for it.
    async fn clear(&self, session_id: &str) -> HistoryResult<bool>;

    /// Wait for exclusive access to a session.
    async fn lock(&self, session_id: &str) -> SessionLease;

    fn backend_name(&self) -> &'static str;
}

pub(crate) fn check_session_id(session_id: &str) -> HistoryResult<()> {
    if session_id.trim().is_empty() {
        return Err(HistoryError::InvalidSession(session_id.to_string()));
    }
    Ok(())
}
