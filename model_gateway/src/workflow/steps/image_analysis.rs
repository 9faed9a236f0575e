//! ImageAnalysis step.
//!
//! Transition: ImageAnalysis → ResponseSynthesis | ErrorHandling

use std::time::Instant;

use serde_json::{json, Map};
use tracing::debug;

use super::IMAGE_ANALYSIS;
use crate::workflow::{
    context::WorkflowContext,
    error::WorkflowError,
    prompts,
    state::{StepResult, WorkflowStep},
};

/// Analyze the image, then chain a text-generation pass that turns the
/// analysis into a conversational answer.
///
/// ## Reads
/// - `ctx.state.normalized_image`: required.
/// - `ctx.state.request.question`, `ctx.state.request.text_params`.
///
/// ## Writes
/// - `metadata["image_analysis"]`, `metadata["image_analysis_metadata"]`,
///   `metadata["text_generation"]`.
/// - `ctx.state.response`: the chained answer.
/// - `ctx.step` → `ResponseSynthesis`.
pub(crate) async fn image_analysis(ctx: &mut WorkflowContext) -> StepResult {
    ctx.state.step_trace.push(IMAGE_ANALYSIS);
    debug!(session_id = %ctx.state.session_id, step = IMAGE_ANALYSIS, "Workflow step");

    let Some(image) = ctx.state.normalized_image.as_ref() else {
        ctx.fail(
            IMAGE_ANALYSIS,
            WorkflowError::Internal("No image data available for analysis".into()),
        );
        return StepResult::Continue;
    };

    let gateway = ctx.components.gateway.clone();
    let question = ctx.state.request.question.clone();

    let started = Instant::now();
    let result = gateway
        .analyze_image(image, &prompts::analysis_prompt(&question))
        .await;
    let analysis = match result {
        Ok(analysis) => analysis,
        Err(e) => {
            ctx.fail(IMAGE_ANALYSIS, e.into());
            return StepResult::Continue;
        }
    };
    ctx.state
        .metadata
        .insert("image_analysis".into(), json!(analysis.analysis));
    ctx.state.record_call(
        "image_analysis_metadata",
        &analysis.model_id,
        analysis.tokens_used,
        started.elapsed(),
        Map::new(),
    );

    let started = Instant::now();
    let chained = prompts::chained_answer_prompt(&question, &analysis.analysis);
    let result = gateway
        .generate_text(&chained, &ctx.state.request.text_params)
        .await;
    match result {
        Ok(completion) => {
            ctx.state.record_call(
                "text_generation",
                &completion.model_id,
                completion.tokens_used,
                started.elapsed(),
                Map::new(),
            );
            ctx.state.response = Some(completion.text);
            ctx.step = WorkflowStep::ResponseSynthesis;
        }
        Err(e) => ctx.fail(IMAGE_ANALYSIS, e.into()),
    }
    StepResult::Continue
}
