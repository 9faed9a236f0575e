//! OpenAI-compatible HTTP backend.
//!
//! - text:     `POST {base}/v1/chat/completions`
//! - analysis: `POST {base}/v1/chat/completions` with an `image_url` content part
//! - images:   `POST {base}/v1/images/generations` (base64 payloads)
//! - health:   `GET  {base}/v1/models`
//!
//! Every call carries `call_timeout`; failures are mapped to `GatewayError`
//! and never retried.

use std::time::Duration;

use async_trait::async_trait;
use llm_multimodal::EncodedImage;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{
    GatewayError, GatewayResult, GeneratedImages, ImageAnalysis, ImageGenParams, ModelGateway,
    TextCompletion, TextParams,
};
use crate::{config::ModelsConfig, metrics::record_gateway_call};

#[derive(Debug, Clone)]
pub struct OpenAiGatewayConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub text_model: String,
    pub vision_model: String,
    pub image_model: String,
    /// Sampling used for the analysis call itself.
    pub analysis_params: TextParams,
    pub call_timeout: Duration,
}

impl From<&ModelsConfig> for OpenAiGatewayConfig {
    fn from(models: &ModelsConfig) -> Self {
        Self {
            base_url: models.base_url.trim_end_matches('/').to_string(),
            api_key: models.api_key.clone(),
            text_model: models.text_model.clone(),
            vision_model: models.vision_model.clone(),
            image_model: models.image_model.clone(),
            analysis_params: TextParams::from(&models.text_defaults),
            call_timeout: Duration::from_secs(models.call_timeout_secs),
        }
    }
}

pub struct OpenAiGateway {
    client: reqwest::Client,
    config: OpenAiGatewayConfig,
}

impl std::fmt::Debug for OpenAiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiGateway")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl OpenAiGateway {
    pub fn new(client: reqwest::Client, config: OpenAiGatewayConfig) -> Self {
        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn post_json(&self, operation: &'static str, path: &str, body: &Value) -> GatewayResult<Value> {
        let result = self.send_json(path, body).await;
        record_gateway_call(operation, if result.is_ok() { "success" } else { "error" });
        if let Err(e) = &result {
            warn!(operation, code = e.code(), error = %e, "Model call failed");
        }
        result
    }

    async fn send_json(&self, path: &str, body: &Value) -> GatewayResult<Value> {
        let url = self.url(path);
        let timeout_secs = self.config.call_timeout.as_secs();
        debug!(url = %url, "Sending model request");

        let response = self
            .authorize(self.client.post(&url))
            .json(body)
            .timeout(self.config.call_timeout)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message: upstream_message(&text),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, timeout_secs))
    }

    async fn chat_completion(
        &self,
        operation: &'static str,
        model: &str,
        content: Value,
        params: &TextParams,
    ) -> GatewayResult<TextCompletion> {
        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": content}],
            "temperature": params.temperature,
            "top_p": params.top_p,
            "max_tokens": params.max_tokens,
        });
        let response = self.post_json(operation, "/v1/chat/completions", &body).await?;
        parse_chat_completion(&response, model)
    }
}

/// Prefer the provider's `error.message`; otherwise a bounded slice of the body.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(512).collect())
}

fn parse_chat_completion(response: &Value, requested_model: &str) -> GatewayResult<TextCompletion> {
    let text = response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::InvalidResponse("missing choices[0].message.content".into()))?;
    Ok(TextCompletion {
        text: text.to_string(),
        model_id: response
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(requested_model)
            .to_string(),
        tokens_used: response
            .pointer("/usage/completion_tokens")
            .and_then(Value::as_u64),
    })
}

fn is_dall_e(model: &str) -> bool {
    model.to_ascii_lowercase().starts_with("dall-e")
}

/// Map a gateway quality label onto what the image model accepts.
/// `None` means the field is left out.
fn image_quality(model: &str, quality: &str) -> Option<&'static str> {
    let quality = quality.to_ascii_lowercase();
    let model = model.to_ascii_lowercase();
    if model.starts_with("dall-e-2") {
        return None;
    }
    if model.starts_with("dall-e") {
        return Some(match quality.as_str() {
            "premium" | "hd" | "high" => "hd",
            _ => "standard",
        });
    }
    Some(match quality.as_str() {
        "premium" | "hd" | "high" => "high",
        "standard" | "medium" => "medium",
        "low" => "low",
        _ => "auto",
    })
}

/// gpt-image models always return base64 and reject `response_format`;
/// dall-e models need it. Neither takes a negative prompt, so it is folded
/// into the prompt text.
fn image_generation_body(model: &str, prompt: &str, params: &ImageGenParams) -> Value {
    let prompt = match params.negative_prompt.as_deref().map(str::trim) {
        Some(negative) if !negative.is_empty() => format!("{prompt}\n\nAvoid: {negative}"),
        _ => prompt.to_string(),
    };
    let mut body = json!({
        "model": model,
        "prompt": prompt,
        "n": params.num_images,
        "size": format!("{}x{}", params.width, params.height),
    });
    if let Some(quality) = image_quality(model, &params.quality) {
        body["quality"] = json!(quality);
    }
    if is_dall_e(model) {
        body["response_format"] = json!("b64_json");
    }
    body
}

fn parse_image_generation(response: &Value, requested_model: &str) -> GatewayResult<GeneratedImages> {
    let data = response
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| GatewayError::InvalidResponse("missing data array".into()))?;
    let images = data
        .iter()
        .map(|item| {
            item.get("b64_json")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| GatewayError::InvalidResponse("image without b64_json".into()))
        })
        .collect::<GatewayResult<Vec<_>>>()?;
    if images.is_empty() {
        return Err(GatewayError::InvalidResponse("no images returned".into()));
    }
    Ok(GeneratedImages {
        images,
        model_id: response
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(requested_model)
            .to_string(),
    })
}

#[async_trait]
impl ModelGateway for OpenAiGateway {
    async fn generate_text(&self, prompt: &str, params: &TextParams) -> GatewayResult<TextCompletion> {
        let model = self.config.text_model.clone();
        self.chat_completion("generate_text", &model, json!(prompt), params)
            .await
    }

    async fn analyze_image(&self, image: &EncodedImage, prompt: &str) -> GatewayResult<ImageAnalysis> {
        let model = self.config.vision_model.clone();
        let content = json!([
            {"type": "image_url", "image_url": {"url": image.data_url()}},
            {"type": "text", "text": prompt},
        ]);
        let completion = self
            .chat_completion("analyze_image", &model, content, &self.config.analysis_params)
            .await?;
        Ok(ImageAnalysis {
            analysis: completion.text,
            model_id: completion.model_id,
            tokens_used: completion.tokens_used,
        })
    }

    async fn generate_image(
        &self,
        prompt: &str,
        params: &ImageGenParams,
    ) -> GatewayResult<GeneratedImages> {
        let model = &self.config.image_model;
        let body = image_generation_body(model, prompt, params);
        let response = self
            .post_json("generate_image", "/v1/images/generations", &body)
            .await?;
        parse_image_generation(&response, model)
    }

    async fn health_check(&self) -> GatewayResult<()> {
        let timeout_secs = self.config.call_timeout.as_secs();
        let response = self
            .authorize(self.client.get(self.url("/v1/models")))
            .timeout(self.config.call_timeout)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, timeout_secs))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(GatewayError::Upstream {
                status: status.as_u16(),
                message: "health probe failed".to_string(),
            })
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
