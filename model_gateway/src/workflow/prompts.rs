//! Prompt templates.

/// Generation type used when the workflow itself generates an image.
pub const WORKFLOW_GENERATION_TYPE: &str = "realistic";

pub fn analysis_prompt(question: &str) -> String {
    format!("Analyze this image in the context of this question: {question}")
}

/// Second hop of image analysis: turn the raw analysis into an answer.
pub fn chained_answer_prompt(question: &str, analysis: &str) -> String {
    format!(
        "User Question: {question}\n\n\
         Image Analysis: {analysis}\n\n\
         Please provide a comprehensive answer based on the user's question and the image analysis."
    )
}

pub fn generation_response(prompt: &str) -> String {
    format!(
        "I've generated an image based on your prompt: '{prompt}'. The image has been created successfully."
    )
}

pub fn apology(message: &str) -> String {
    format!("I apologize, but I encountered an error while processing your request: {message}")
}

/// Expand an image prompt with the template for `generation_type`.
///
/// Unknown or absent types leave the prompt unmodified, as does
/// `style_transfer` without a non-blank style.
pub fn expand_generation_prompt(
    prompt: &str,
    generation_type: Option<&str>,
    style: Option<&str>,
) -> String {
    let style = style.map(str::trim).filter(|s| !s.is_empty());
    match (generation_type, style) {
        (Some("enhance"), _) => format!("Create a detailed, high-quality version of: {prompt}"),
        (Some("artistic"), _) => format!("Create an artistic interpretation of: {prompt}"),
        (Some("realistic"), _) => format!("Create a photorealistic image of: {prompt}"),
        (Some("abstract"), _) => format!("Create an abstract representation of: {prompt}"),
        (Some("style_transfer"), Some(style)) => {
            format!("Create an image in the style of {style}: {prompt}")
        }
        _ => prompt.to_string(),
    }
}
