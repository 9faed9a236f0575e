//! ImageGeneration step.
//!
//! Transition: ImageGeneration → ResponseSynthesis | ErrorHandling

use std::time::Instant;

use blob_storage::generated_key;
use bytes::Bytes;
use llm_multimodal::decode_base64_image;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::IMAGE_GENERATION;
use crate::workflow::{
    context::{SharedComponents, WorkflowContext},
    prompts,
    state::{StepResult, WorkflowStep},
};

/// Generate an image from the question with the `realistic` template.
///
/// ## Reads
/// - `ctx.state.request.question`.
/// - `ctx.components.defaults.image`: size, count, quality.
///
/// ## Writes
/// - `ctx.state.generated_images`, `metadata["generated_images"]`,
///   `metadata["generated_image_urls"]`, `metadata["image_generation"]`.
/// - `ctx.state.response`: a confirmation message.
/// - `ctx.step` → `ResponseSynthesis`.
pub(crate) async fn image_generation(ctx: &mut WorkflowContext) -> StepResult {
    ctx.state.step_trace.push(IMAGE_GENERATION);
    debug!(session_id = %ctx.state.session_id, step = IMAGE_GENERATION, "Workflow step");

    let components = ctx.components.clone();
    let prompt = ctx.state.request.question.clone();
    let enhanced =
        prompts::expand_generation_prompt(&prompt, Some(prompts::WORKFLOW_GENERATION_TYPE), None);

    let started = Instant::now();
    let generated = match components
        .gateway
        .generate_image(&enhanced, &components.defaults.image)
        .await
    {
        Ok(generated) => generated,
        Err(e) => {
            ctx.fail(IMAGE_GENERATION, e.into());
            return StepResult::Continue;
        }
    };

    let mut extra = Map::new();
    extra.insert("generation_type".into(), json!(prompts::WORKFLOW_GENERATION_TYPE));
    extra.insert("original_prompt".into(), json!(prompt));
    extra.insert("enhanced_prompt".into(), json!(enhanced));
    ctx.state.record_call(
        "image_generation",
        &generated.model_id,
        None,
        started.elapsed(),
        extra,
    );

    let urls = persist_generated(&components, &generated.images).await;
    ctx.state
        .metadata
        .insert("generated_images".into(), json!(generated.images));
    ctx.state
        .metadata
        .insert("generated_image_urls".into(), Value::from(urls));
    ctx.state.generated_images = generated.images;
    ctx.state.response = Some(prompts::generation_response(&prompt));
    ctx.step = WorkflowStep::ResponseSynthesis;
    StepResult::Continue
}

/// Best effort: an image that cannot be stored is still returned inline.
async fn persist_generated(components: &SharedComponents, images: &[String]) -> Vec<String> {
    let mut urls = Vec::with_capacity(images.len());
    for image in images {
        let bytes = match decode_base64_image(image) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Generated image is not valid base64");
                continue;
            }
        };
        let content_type = match bytes.get(..4) {
            Some([0x89, b'P', b'N', b'G']) => "image/png",
            _ => "image/jpeg",
        };
        let extension = if content_type == "image/png" { "png" } else { "jpg" };
        let key = generated_key(extension);
        match components
            .storage
            .put_object(Bytes::from(bytes), &key, content_type)
            .await
        {
            Ok(stored) => urls.push(stored.url),
            Err(e) => warn!(key = %key, error = %e, "Failed to store generated image"),
        }
    }
    urls
}
