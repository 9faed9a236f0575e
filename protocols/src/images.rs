//! Standalone image analysis and generation endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use crate::{chat::validate_image_url, validated::Normalizable};

fn default_analysis_prompt() -> String {
    "Analyze this image".to_string()
}

fn default_dimension() -> u32 {
    1024
}

fn default_num_images() -> u32 {
    1
}

fn default_quality() -> String {
    "premium".to_string()
}

/// Body of `POST /api/v1/chat/analyze-image`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_has_image"))]
pub struct ImageAnalysisRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_image_url"))]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(default = "default_analysis_prompt")]
    pub prompt: String,
}

impl Normalizable for ImageAnalysisRequest {
    fn normalize(&mut self) {
        if self.prompt.trim().is_empty() {
            self.prompt = default_analysis_prompt();
        }
    }
}

fn validate_has_image(req: &ImageAnalysisRequest) -> Result<(), ValidationError> {
    if req.image_url.is_none() && req.image_data.is_none() {
        let mut err = ValidationError::new("missing_image");
        err.message = Some("No image provided".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAnalysisResponse {
    pub analysis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_objects: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Body of `POST /api/v1/chat/generate-image`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ImageGenerationRequest {
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,

    #[serde(default = "default_dimension")]
    #[validate(range(min = 256, max = 2048))]
    pub width: u32,

    #[serde(default = "default_dimension")]
    #[validate(range(min = 256, max = 2048))]
    pub height: u32,

    #[serde(default = "default_num_images")]
    #[validate(range(min = 1, max = 4))]
    pub num_images: u32,

    #[serde(default = "default_quality")]
    pub quality: String,

    /// Prompt template: enhance, artistic, realistic, abstract, style_transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_type: Option<String>,

    /// Style substituted by the `style_transfer` template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl Normalizable for ImageGenerationRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageGenerationResponse {
    /// Generated images, base64 encoded.
    pub images: Vec<String>,
    pub prompt_used: String,
    pub model_used: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_time: Option<f64>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_analysis_requires_some_image() {
        let req: ImageAnalysisRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(req.prompt, "Analyze this image");
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_generation_defaults_and_bounds() {
        let req: ImageGenerationRequest =
            serde_json::from_value(json!({"prompt": "a castle"})).unwrap();
        assert_eq!((req.width, req.height, req.num_images), (1024, 1024, 1));
        assert_eq!(req.quality, "premium");
        assert!(req.validate().is_ok());

        let req: ImageGenerationRequest =
            serde_json::from_value(json!({"prompt": "a castle", "num_images": 9})).unwrap();
        assert!(req.validate().is_err());
    }
}
