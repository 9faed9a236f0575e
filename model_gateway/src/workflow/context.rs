//! Context types for the workflow.
//!
//! Two-level context design:
//! - `SharedComponents`: created once at startup, `Arc`-cloned into each request.
//! - `WorkflowContext`: created fresh per request, owned and mutated by steps.

use std::{sync::Arc, time::Instant};

use blob_storage::ObjectStorage;
use data_connector::{HistoryStore, SessionLease};
use llm_multimodal::{EncodedImage, ImageNormalizer, MediaConnector};
use mmchat_protocol::{ChatRequest, MessageType};
use serde_json::{Map, Value};

use super::{
    classifier::Intent,
    error::{ErrorInfo, WorkflowError},
    state::WorkflowStep,
};
use crate::gateway::{ImageGenParams, ModelGateway, TextParams};

// ============================================================================
// SharedComponents (per-process)
// ============================================================================

/// Defaults applied when a request does not specify its own parameters.
#[derive(Debug, Clone)]
pub struct WorkflowDefaults {
    pub text: TextParams,
    pub image: ImageGenParams,
    /// Turns (including the current question) interleaved into text prompts.
    pub context_window: usize,
}

impl Default for WorkflowDefaults {
    fn default() -> Self {
        Self {
            text: TextParams::default(),
            image: ImageGenParams::default(),
            context_window: 5,
        }
    }
}

/// Collaborators shared by every request.
pub struct SharedComponents {
    pub gateway: Arc<dyn ModelGateway>,
    pub normalizer: ImageNormalizer,
    /// Remote `http(s)` image fetches.
    pub media: MediaConnector,
    pub storage: Arc<dyn ObjectStorage>,
    pub history: Arc<dyn HistoryStore>,
    pub defaults: WorkflowDefaults,
}

impl std::fmt::Debug for SharedComponents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedComponents")
            .field("gateway", &self.gateway.name())
            .field("storage", &self.storage.backend_name())
            .field("history", &self.history.backend_name())
            .field("defaults", &self.defaults)
            .finish()
    }
}

// ============================================================================
// Request input
// ============================================================================

/// Where a request's image lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// `http(s)://` or `blob://` URL.
    Url(String),
    /// Base64 bytes, optionally as a `data:` URL.
    Inline(String),
}

#[derive(Debug, Clone)]
pub struct WorkflowRequest {
    pub question: String,
    pub image: Option<ImageRef>,
    pub session_id: Option<String>,
    pub declared_type: MessageType,
    pub text_params: TextParams,
}

impl WorkflowRequest {
    /// Inline data wins over a URL when a client sends both.
    pub fn from_chat(request: ChatRequest, defaults: &TextParams) -> Self {
        let image = request
            .image_data
            .map(ImageRef::Inline)
            .or(request.image_url.map(ImageRef::Url));
        Self {
            question: request.question,
            image,
            session_id: request.session_id,
            declared_type: request.message_type,
            text_params: TextParams {
                temperature: request.temperature.unwrap_or(defaults.temperature),
                top_p: defaults.top_p,
                max_tokens: request.max_tokens.unwrap_or(defaults.max_tokens),
            },
        }
    }

    pub fn text(question: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            question: question.into(),
            image: None,
            session_id,
            declared_type: MessageType::Text,
            text_params: TextParams::default(),
        }
    }
}

// ============================================================================
// WorkflowState (per-request)
// ============================================================================

/// Mutable record threaded through the steps.
#[derive(Debug)]
pub struct WorkflowState {
    pub request: WorkflowRequest,
    /// Assigned by input processing; empty before it runs.
    pub session_id: String,
    pub message_type: MessageType,
    pub normalized_image: Option<EncodedImage>,
    pub intent: Option<Intent>,
    pub response: Option<String>,
    pub generated_images: Vec<String>,
    /// Audit trail of executed steps, in order.
    pub step_trace: Vec<&'static str>,
    pub metadata: Map<String, Value>,
    pub error: Option<ErrorInfo>,
    pub model_used: Option<String>,
    pub tokens_used: Option<u64>,
    pub(crate) started_at: Instant,
    pub(crate) processing_time_seconds: Option<f64>,
    /// Serializes history access for this session until the request ends.
    pub(crate) lease: Option<SessionLease>,
}

impl WorkflowState {
    pub fn new(request: WorkflowRequest) -> Self {
        Self {
            message_type: request.declared_type,
            request,
            session_id: String::new(),
            normalized_image: None,
            intent: None,
            response: None,
            generated_images: Vec::new(),
            step_trace: Vec::new(),
            metadata: Map::new(),
            error: None,
            model_used: None,
            tokens_used: None,
            started_at: Instant::now(),
            processing_time_seconds: None,
            lease: None,
        }
    }
}

// ============================================================================
// WorkflowContext (per-request)
// ============================================================================

/// Per-request context passed through the state machine.
///
/// Steps read and write `state`; `step` determines which step the driver
/// executes next.
pub(crate) struct WorkflowContext {
    pub components: Arc<SharedComponents>,
    pub step: WorkflowStep,
    pub state: WorkflowState,
}

impl WorkflowContext {
    /// Create a new context in the `InputProcessing` step.
    pub fn new(request: WorkflowRequest, components: Arc<SharedComponents>) -> Self {
        Self {
            components,
            step: WorkflowStep::InputProcessing,
            state: WorkflowState::new(request),
        }
    }

    /// Record a trapped failure and divert to error handling.
    pub fn fail(&mut self, stage: &'static str, err: WorkflowError) {
        tracing::warn!(
            session_id = %self.state.session_id,
            step = stage,
            kind = %err.kind(),
            error = %err,
            "Workflow step failed"
        );
        self.state.error = Some(ErrorInfo::new(stage, &err));
        self.step = WorkflowStep::ErrorHandling;
    }
}
