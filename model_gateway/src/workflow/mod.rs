//! Request-routing workflow.
//!
//! A fixed state machine that takes one chat request through input
//! normalization, intent classification, exactly one operation branch, and
//! response synthesis. Failures at any step are trapped and converted into an
//! apology envelope; `WorkflowEngine::run` never fails.
//!
//! ```text
//! input_processing ─► routing ─┬─► image_analysis ──┐
//!                              ├─► text_generation ─┼─► response_synthesis
//!                              └─► image_generation ┘
//!        (any failure) ─────────────────────────────► error_handling
//! ```

pub mod classifier;
mod context;
mod conversation;
mod driver;
pub mod envelope;
mod error;
pub mod image_source;
pub mod prompts;
mod state;
mod steps;

use std::{sync::Arc, time::Instant};

use tracing::debug;

pub use classifier::{classify, Intent, GENERATION_KEYWORDS};
pub use context::{ImageRef, SharedComponents, WorkflowDefaults, WorkflowRequest, WorkflowState};
pub use conversation::build_text_prompt;
pub use envelope::Envelope;
pub use error::{ErrorInfo, ErrorKind, WorkflowError};

use self::context::WorkflowContext;
use crate::metrics;

/// Runs requests through the workflow state machine.
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    components: Arc<SharedComponents>,
}

impl WorkflowEngine {
    pub fn new(components: Arc<SharedComponents>) -> Self {
        Self { components }
    }

    pub fn components(&self) -> &Arc<SharedComponents> {
        &self.components
    }

    /// Process one request to completion.
    ///
    /// Requests for the same session are serialized by the session lease
    /// taken during input processing; different sessions run concurrently.
    pub async fn run(&self, request: WorkflowRequest) -> Envelope {
        let started = Instant::now();
        let mut ctx = WorkflowContext::new(request, self.components.clone());

        driver::execute(&mut ctx).await;

        let envelope = envelope::build(&ctx.state);
        let intent = ctx.state.intent.map(|i| i.as_str()).unwrap_or("unknown");
        let outcome = if envelope.is_error() { "error" } else { "success" };
        metrics::record_workflow(intent, outcome, started.elapsed());
        debug!(
            session_id = %envelope.session_id,
            intent,
            outcome,
            steps = ?ctx.state.step_trace,
            "Workflow finished"
        );
        envelope
    }
}
