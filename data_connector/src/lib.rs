//! Conversation history storage.
//!
//! Supported backends:
//! - Memory (default): bounded ring buffer per session, LRU eviction of whole sessions
//! - None (no-op)

pub mod config;
mod core;
mod factory;
mod memory;
mod noop;

pub use core::{ChatTurn, HistoryError, HistoryResult, HistoryStore, SessionLease, TurnRole};

pub use config::{HistoryBackend, HistoryConfig};
pub use factory::create_history_store;
pub use memory::MemoryHistoryStore;
pub use noop::NoOpHistoryStore;
