//! Routing step.
//!
//! Transition: Route → ImageAnalysis | TextGeneration | ImageGeneration | ErrorHandling

use tracing::debug;

use super::ROUTING;
use crate::workflow::{
    classifier::{classify, Intent},
    context::WorkflowContext,
    state::{StepResult, WorkflowStep},
};

/// Classify the request and dispatch to exactly one operation branch.
///
/// ## Reads
/// - `ctx.state.error`: a prior failure short-circuits to error handling.
/// - `ctx.state.request.question`, `ctx.state.normalized_image`.
///
/// ## Writes
/// - `ctx.state.intent` and `metadata["intent"]`.
/// - `ctx.step` → the branch for the intent.
pub(crate) async fn routing(ctx: &mut WorkflowContext) -> StepResult {
    ctx.state.step_trace.push(ROUTING);

    if ctx.state.error.is_some() {
        ctx.step = WorkflowStep::ErrorHandling;
        return StepResult::Continue;
    }

    let intent = classify(
        &ctx.state.request.question,
        ctx.state.normalized_image.is_some(),
    );
    debug!(session_id = %ctx.state.session_id, step = ROUTING, %intent, "Workflow step");

    ctx.state.intent = Some(intent);
    ctx.state
        .metadata
        .insert("intent".into(), serde_json::json!(intent));
    ctx.step = match intent {
        Intent::GenerateImage => WorkflowStep::ImageGeneration,
        Intent::AnalyzeImage => WorkflowStep::ImageAnalysis,
        Intent::GenerateText => WorkflowStep::TextGeneration,
    };
    StepResult::Continue
}
