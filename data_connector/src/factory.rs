//! Factory for creating the configured history store.

use std::sync::Arc;

use tracing::info;

use crate::{
    config::{HistoryBackend, HistoryConfig},
    core::HistoryStore,
    memory::MemoryHistoryStore,
    noop::NoOpHistoryStore,
};

pub fn create_history_store(config: &HistoryConfig) -> Arc<dyn HistoryStore> {
    match config.backend {
        HistoryBackend::Memory => {
            info!(
                max_turns = config.max_turns,
                max_sessions = config.max_sessions,
                "Initializing in-memory history store"
            );
            Arc::new(MemoryHistoryStore::new(config.max_turns, config.max_sessions))
        }
        HistoryBackend::None => {
            info!("History disabled, using no-op store");
            Arc::new(NoOpHistoryStore::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_backend() {
        let store = create_history_store(&HistoryConfig::default());
        assert_eq!(store.backend_name(), "memory");

        let store = create_history_store(&HistoryConfig {
            backend: HistoryBackend::None,
            ..Default::default()
        });
        assert_eq!(store.backend_name(), "none");
    }
}
