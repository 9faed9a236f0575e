//! Response Envelope Builder.
//!
//! Steps fold per-call results into `WorkflowState::metadata` as they go;
//! `build` turns a finished state into the uniform payload.

use std::time::Duration;

use mmchat_protocol::MessageType;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::{context::WorkflowState, error::ErrorInfo, prompts};

/// Uniform response payload, whichever branch ran.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    /// Always non-empty: the answer, or an apology when `error` is set.
    pub response: String,
    pub session_id: String,
    pub message_type: MessageType,
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub error_info: Option<ErrorInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    pub processing_time_seconds: f64,
}

impl Envelope {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Build the envelope of a finished workflow. Never fails.
pub fn build(state: &WorkflowState) -> Envelope {
    let response = state
        .response
        .clone()
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| {
            let reason = state
                .error
                .as_ref()
                .map(|e| e.message.as_str())
                .unwrap_or("no response was generated");
            prompts::apology(reason)
        });

    Envelope {
        response,
        session_id: state.session_id.clone(),
        message_type: state.message_type,
        metadata: state.metadata.clone(),
        error: state.error.as_ref().map(|e| e.message.clone()),
        error_info: state.error.clone(),
        model_used: state.model_used.clone(),
        tokens_used: state.tokens_used,
        processing_time_seconds: state.processing_time_seconds.unwrap_or_default(),
    }
}

impl WorkflowState {
    /// Fold one model call into metadata under `key`.
    pub(crate) fn record_call(
        &mut self,
        key: &str,
        model_id: &str,
        tokens_used: Option<u64>,
        elapsed: Duration,
        extra: Map<String, Value>,
    ) {
        let mut entry = Map::new();
        entry.insert("model_used".into(), json!(model_id));
        entry.insert("tokens_used".into(), json!(tokens_used));
        entry.insert("processing_time_seconds".into(), json!(elapsed.as_secs_f64()));
        entry.extend(extra);
        self.metadata.insert(key.to_string(), Value::Object(entry));

        self.model_used = Some(model_id.to_string());
        self.metadata.insert("model_used".into(), json!(model_id));
        if let Some(tokens) = tokens_used {
            let total = self.tokens_used.unwrap_or(0) + tokens;
            self.tokens_used = Some(total);
            self.metadata.insert("tokens_used".into(), json!(total));
        }
    }

    /// Stamp the request-level summary. Called once by each terminal step.
    pub(crate) fn stamp_summary(&mut self) {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        self.processing_time_seconds = Some(elapsed);
        self.metadata
            .insert("processing_time_seconds".into(), json!(elapsed));
        self.metadata
            .insert("step_trace".into(), json!(self.step_trace));
        self.metadata
            .insert("session_id".into(), json!(self.session_id));
        self.metadata
            .insert("message_type".into(), json!(self.message_type));
        if let Some(intent) = self.intent {
            self.metadata.insert("intent".into(), json!(intent));
        }
    }
}
