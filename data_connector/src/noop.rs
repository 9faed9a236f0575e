//! NoOp history store
//!
//! Stores nothing - useful when history is disabled.

use async_trait::async_trait;

use super::core::*;

#[derive(Default, Debug, Clone)]
pub struct NoOpHistoryStore;

impl NoOpHistoryStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HistoryStore for NoOpHistoryStore {
    async fn append(&self, _session_id: &str, _turn: ChatTurn) -> HistoryResult<()> {
        Ok(())
    }

    async fn recent(&self, _session_id: &str, _n: usize) -> HistoryResult<Vec<ChatTurn>> {
        Ok(Vec::new())
    }

    async fn history(&self, _session_id: &str) -> HistoryResult<Vec<ChatTurn>> {
        Ok(Vec::new())
    }

    async fn clear(&self, _session_id: &str) -> HistoryResult<bool> {
        Ok(false)
    }

    async fn lock(&self, _session_id: &str) -> SessionLease {
        SessionLease::detached()
    }

    fn backend_name(&self) -> &'static str {
        "none"
    }
}
