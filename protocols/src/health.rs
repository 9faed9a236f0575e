//! Health probe payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
}

/// Body of `GET /api/v1/chat/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    /// Unix timestamp in seconds.
    pub timestamp: f64,
    pub services: BTreeMap<String, ComponentStatus>,
}

impl HealthReport {
    pub fn from_services(timestamp: f64, services: BTreeMap<String, ComponentStatus>) -> Self {
        let status = if services
            .values()
            .all(|s| *s == ComponentStatus::Healthy)
        {
            OverallStatus::Healthy
        } else {
            OverallStatus::Degraded
        };
        Self {
            status,
            timestamp,
            services,
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
    pub service: String,
}
