//! ErrorHandling step.
//!
//! Transition: ErrorHandling → End

use serde_json::json;
use tracing::error;

use super::ERROR_HANDLING;
use crate::workflow::{
    context::WorkflowContext,
    prompts,
    state::{StepResult, WorkflowStep},
};

/// Replace the response with an apology embedding the error message.
///
/// Never re-raises; failed exchanges are not recorded in history.
///
/// ## Writes
/// - `ctx.state.response`: the apology.
/// - `metadata["error"]`: `{stage, kind, message}`.
/// - `ctx.step` → `End`.
pub(crate) async fn error_handling(ctx: &mut WorkflowContext) -> StepResult {
    ctx.state.step_trace.push(ERROR_HANDLING);

    let message = match &ctx.state.error {
        Some(info) => {
            error!(
                session_id = %ctx.state.session_id,
                stage = %info.stage,
                kind = %info.kind,
                error = %info.message,
                "Workflow failed"
            );
            ctx.state.metadata.insert("error".into(), json!(info));
            info.message.clone()
        }
        None => "Unknown error".to_string(),
    };

    ctx.state.response = Some(prompts::apology(&message));
    ctx.state.stamp_summary();
    ctx.step = WorkflowStep::End;
    StepResult::Finished
}
