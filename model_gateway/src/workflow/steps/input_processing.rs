//! InputProcessing step.
//!
//! Transition: InputProcessing → Route | ErrorHandling

use mmchat_protocol::MessageType;
use tracing::debug;
use uuid::Uuid;

use super::INPUT_PROCESSING;
use crate::workflow::{
    context::WorkflowContext,
    error::WorkflowError,
    image_source::load_normalized,
    state::{StepResult, WorkflowStep},
};

/// Assign the session, take its lease, and normalize the image if any.
///
/// ## Reads
/// - `ctx.state.request`: question, image reference, declared type, session id.
///
/// ## Writes
/// - `ctx.state.session_id`: the client's id, or a fresh UUID.
/// - `ctx.state.lease`: exclusive access to the session's history.
/// - `ctx.state.normalized_image` / `message_type` → `Multimodal` on success.
/// - `ctx.step` → `Route`, or `ErrorHandling` if the image cannot be normalized.
pub(crate) async fn input_processing(ctx: &mut WorkflowContext) -> StepResult {
    ctx.state.step_trace.push(INPUT_PROCESSING);

    ctx.state.session_id = ctx
        .state
        .request
        .session_id
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    debug!(session_id = %ctx.state.session_id, step = INPUT_PROCESSING, "Workflow step");

    let history = ctx.components.history.clone();
    ctx.state.lease = Some(history.lock(&ctx.state.session_id).await);

    let Some(image) = ctx.state.request.image.clone() else {
        if ctx.state.request.declared_type == MessageType::Multimodal {
            ctx.fail(
                INPUT_PROCESSING,
                WorkflowError::Validation(
                    "Multimodal message requires either image_url or image_data".into(),
                ),
            );
        } else {
            ctx.step = WorkflowStep::Route;
        }
        return StepResult::Continue;
    };

    let components = ctx.components.clone();
    match load_normalized(&components, &image).await {
        Ok(encoded) => {
            debug!(
                session_id = %ctx.state.session_id,
                width = encoded.width,
                height = encoded.height,
                "Image normalized"
            );
            ctx.state.normalized_image = Some(encoded);
            ctx.state.message_type = MessageType::Multimodal;
            ctx.step = WorkflowStep::Route;
        }
        Err(e) => ctx.fail(INPUT_PROCESSING, WorkflowError::Normalization(e.to_string())),
    }
    StepResult::Continue
}
