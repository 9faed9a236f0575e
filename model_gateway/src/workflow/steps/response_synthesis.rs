//! ResponseSynthesis step.
//!
//! Transition: ResponseSynthesis → End

use data_connector::ChatTurn;
use tracing::{debug, warn};

use super::RESPONSE_SYNTHESIS;
use crate::workflow::{
    context::WorkflowContext,
    state::{StepResult, WorkflowStep},
};

/// Record the exchange in session history and stamp the summary metadata.
///
/// ## Writes
/// - Session history: the user question, then the assistant response.
/// - `metadata["processing_time_seconds"]`, `metadata["step_trace"]`, ...
/// - `ctx.step` → `End`.
pub(crate) async fn response_synthesis(ctx: &mut WorkflowContext) -> StepResult {
    ctx.state.step_trace.push(RESPONSE_SYNTHESIS);
    debug!(session_id = %ctx.state.session_id, step = RESPONSE_SYNTHESIS, "Workflow step");

    let history = ctx.components.history.clone();
    let session_id = ctx.state.session_id.clone();
    let response = ctx.state.response.clone().unwrap_or_default();
    for turn in [
        ChatTurn::user(ctx.state.request.question.clone()),
        ChatTurn::assistant(response),
    ] {
        if let Err(e) = history.append(&session_id, turn).await {
            warn!(session_id = %session_id, error = %e, "Failed to record conversation turn");
        }
    }

    ctx.state.stamp_summary();
    ctx.step = WorkflowStep::End;
    StepResult::Finished
}
