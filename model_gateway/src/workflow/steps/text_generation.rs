//! TextGeneration step.
//!
//! Transition: TextGeneration → ResponseSynthesis | ErrorHandling

use std::time::Instant;

use serde_json::{json, Map};
use tracing::debug;

use super::TEXT_GENERATION;
use crate::workflow::{
    context::WorkflowContext,
    conversation::{build_text_prompt, load_context},
    state::{StepResult, WorkflowStep},
};

/// Answer the question, with recent session turns interleaved into the prompt.
///
/// ## Reads
/// - `ctx.state.request.question`, `ctx.state.request.text_params`.
/// - Session history (last `context_window - 1` turns).
///
/// ## Writes
/// - `metadata["text_generation"]`.
/// - `ctx.state.response`.
/// - `ctx.step` → `ResponseSynthesis`.
pub(crate) async fn text_generation(ctx: &mut WorkflowContext) -> StepResult {
    ctx.state.step_trace.push(TEXT_GENERATION);
    debug!(session_id = %ctx.state.session_id, step = TEXT_GENERATION, "Workflow step");

    let components = ctx.components.clone();
    let prior = load_context(
        components.history.as_ref(),
        &ctx.state.session_id,
        components.defaults.context_window,
    )
    .await;
    let prompt = build_text_prompt(&prior, &ctx.state.request.question);

    let started = Instant::now();
    let result = components
        .gateway
        .generate_text(&prompt, &ctx.state.request.text_params)
        .await;
    match result {
        Ok(completion) => {
            let mut extra = Map::new();
            extra.insert("context_turns".into(), json!(prior.len()));
            ctx.state.record_call(
                "text_generation",
                &completion.model_id,
                completion.tokens_used,
                started.elapsed(),
                extra,
            );
            ctx.state.response = Some(completion.text);
            ctx.step = WorkflowStep::ResponseSynthesis;
        }
        Err(e) => ctx.fail(TEXT_GENERATION, e.into()),
    }
    StepResult::Continue
}
