//! Liveness and dependency health.

use std::{collections::BTreeMap, sync::Arc};

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use mmchat_protocol::health::{ComponentStatus, HealthReport, LivenessResponse};
use serde_json::json;
use tracing::warn;

use crate::{server::AppState, version};

/// `GET /`
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": version::SERVICE_NAME,
        "version": version::VERSION,
    }))
}

/// `GET /health`
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "healthy".to_string(),
        service: version::SERVICE_NAME.to_string(),
    })
}

/// `GET /api/v1/chat/health`
///
/// Probes the model gateway and object storage concurrently. Always 200;
/// an unreachable collaborator only degrades the overall status.
pub async fn chat_health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    let components = state.engine.components();
    let (gateway, storage) = tokio::join!(
        components.gateway.health_check(),
        components.storage.health_check()
    );

    let mut services = BTreeMap::new();
    services.insert(
        components.gateway.name().to_string(),
        match gateway {
            Ok(()) => ComponentStatus::Healthy,
            Err(e) => {
                warn!(error = %e, "Model gateway health check failed");
                ComponentStatus::Unhealthy
            }
        },
    );
    services.insert(
        "storage".to_string(),
        match storage {
            Ok(()) => ComponentStatus::Healthy,
            Err(e) => {
                warn!(backend = components.storage.backend_name(), error = %e, "Storage health check failed");
                ComponentStatus::Unhealthy
            }
        },
    );

    let timestamp = Utc::now().timestamp_millis() as f64 / 1000.0;
    Json(HealthReport::from_services(timestamp, services))
}
