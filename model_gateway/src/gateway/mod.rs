//! Model Gateway: the three remote model operations behind one trait.
//!
//! The workflow and the standalone endpoints only ever talk to
//! `dyn ModelGateway`; `OpenAiGateway` is the production backend and tests
//! substitute a scripted fake.

mod catalog;
mod error;
mod openai;

use async_trait::async_trait;
use llm_multimodal::EncodedImage;
use serde::{Deserialize, Serialize};

pub use catalog::model_catalog;
pub use error::{GatewayError, GatewayResult};
pub use openai::{OpenAiGateway, OpenAiGatewayConfig};

use crate::config::{ImageDefaults, TextDefaults};

/// Sampling parameters for a text-generation call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl From<&TextDefaults> for TextParams {
    fn from(defaults: &TextDefaults) -> Self {
        Self {
            temperature: defaults.temperature,
            top_p: defaults.top_p,
            max_tokens: defaults.max_tokens,
        }
    }
}

impl Default for TextParams {
    fn default() -> Self {
        Self::from(&TextDefaults::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGenParams {
    pub width: u32,
    pub height: u32,
    pub num_images: u32,
    pub quality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

impl From<&ImageDefaults> for ImageGenParams {
    fn from(defaults: &ImageDefaults) -> Self {
        Self {
            width: defaults.width,
            height: defaults.height,
            num_images: defaults.num_images,
            quality: defaults.quality.clone(),
            negative_prompt: None,
        }
    }
}

impl Default for ImageGenParams {
    fn default() -> Self {
        Self::from(&ImageDefaults::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextCompletion {
    pub text: String,
    pub model_id: String,
    pub tokens_used: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageAnalysis {
    pub analysis: String,
    pub model_id: String,
    pub tokens_used: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImages {
    /// Base64 encoded images, in provider order.
    pub images: Vec<String>,
    pub model_id: String,
}

#[async_trait]
pub trait ModelGateway: Send + Sync + 'static {
    async fn generate_text(&self, prompt: &str, params: &TextParams)
        -> GatewayResult<TextCompletion>;

    async fn analyze_image(&self, image: &EncodedImage, prompt: &str)
        -> GatewayResult<ImageAnalysis>;

    async fn generate_image(
        &self,
        prompt: &str,
        params: &ImageGenParams,
    ) -> GatewayResult<GeneratedImages>;

    /// Cheap reachability probe.
    async fn health_check(&self) -> GatewayResult<()>;

    fn name(&self) -> &'static str;
}
