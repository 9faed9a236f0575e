//! Multimodal chat gateway.
//!
//! Routes each chat request through a fixed workflow (input normalization,
//! intent classification, one model operation, response synthesis) and
//! serves it over HTTP.

pub mod config;
pub mod gateway;
pub mod logging;
pub mod metrics;
pub mod routers;
pub mod server;
pub mod version;
pub mod workflow;
