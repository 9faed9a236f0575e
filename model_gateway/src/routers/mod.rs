//! HTTP handlers.

pub mod blobs;
pub mod chat;
pub mod error;
pub mod health;
