//! In-memory history store.
//!
//! Each session keeps a ring buffer of its last `max_turns` turns. Sessions
//! themselves live in an LRU cache of `max_sessions` entries.

use std::{collections::VecDeque, num::NonZeroUsize, sync::Arc};

use async_trait::async_trait;
use dashmap::DashMap;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use super::core::*;

type LockMap = DashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// Drop a session's lock entry when nobody holds or waits on it.
fn release_idle_lock(locks: &LockMap, session_id: &str) {
    locks.remove_if(session_id, |_, lock| Arc::strong_count(lock) == 1);
}

pub struct MemoryHistoryStore {
    sessions: Mutex<LruCache<String, VecDeque<ChatTurn>>>,
    locks: Arc<LockMap>,
    max_turns: usize,
}

impl std::fmt::Debug for MemoryHistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryHistoryStore")
            .field("sessions", &self.sessions.lock().len())
            .field("max_turns", &self.max_turns)
            .finish()
    }
}

impl MemoryHistoryStore {
    pub fn new(max_turns: usize, max_sessions: usize) -> Self {
        let capacity = NonZeroUsize::new(max_sessions).unwrap_or(NonZeroUsize::MIN);
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
            locks: Arc::new(DashMap::new()),
            max_turns: max_turns.max(1),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Sessions with a lock entry, held or waited on.
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    fn forget_lock(&self, session_id: &str) {
        release_idle_lock(&self.locks, session_id);
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, session_id: &str, turn: ChatTurn) -> HistoryResult<()> {
        check_session_id(session_id)?;
        let evicted = {
            let mut sessions = self.sessions.lock();
            if let Some(turns) = sessions.get_mut(session_id) {
                if turns.len() == self.max_turns {
                    turns.pop_front();
                }
                turns.push_back(turn);
                None
            } else {
                let mut turns = VecDeque::with_capacity(self.max_turns);
                turns.push_back(turn);
                sessions
                    .push(session_id.to_string(), turns)
                    .map(|(key, _)| key)
            }
        };
        if let Some(evicted) = evicted {
            debug!(session_id = %evicted, "Evicted least recently used session");
            self.forget_lock(&evicted);
        }
        Ok(())
    }

    async fn recent(&self, session_id: &str, n: usize) -> HistoryResult<Vec<ChatTurn>> {
        check_session_id(session_id)?;
        let mut sessions = self.sessions.lock();
        Ok(sessions
            .get(session_id)
            .map(|turns| {
                let skip = turns.len().saturating_sub(n);
                turns.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default())
    }

    async fn history(&self, session_id: &str) -> HistoryResult<Vec<ChatTurn>> {
        check_session_id(session_id)?;
        let mut sessions = self.sessions.lock();
        Ok(sessions
            .get(session_id)
            .map(|turns| turns.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear(&self, session_id: &str) -> HistoryResult<bool> {
        check_session_id(session_id)?;
        let removed = self.sessions.lock().pop(session_id).is_some();
        self.forget_lock(session_id);
        Ok(removed)
    }

    async fn lock(&self, session_id: &str) -> SessionLease {
        let lock = self
            .locks
            .entry(session_id.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        let locks = self.locks.clone();
        let session_id = session_id.to_string();
        SessionLease::held(guard, move || release_idle_lock(&locks, &session_id))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
