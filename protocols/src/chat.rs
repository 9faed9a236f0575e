//! Chat endpoint request and response types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use crate::validated::Normalizable;

/// URL schemes accepted for `image_url` fields.
pub const IMAGE_URL_SCHEMES: &[&str] = &["http://", "https://", "blob://"];

fn default_temperature() -> Option<f32> {
    Some(0.7)
}

fn default_max_tokens() -> Option<u32> {
    Some(4000)
}

/// Declared kind of a chat message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Multimodal,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Multimodal => "multimodal",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /api/v1/chat/multimodal`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_chat_request"))]
pub struct ChatRequest {
    /// The user's question or prompt.
    pub question: String,

    /// URL of an image to analyze (`http(s)://` or `blob://`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_image_url"))]
    pub image_url: Option<String>,

    /// Base64 encoded image bytes, optionally as a `data:` URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,

    #[serde(default)]
    pub message_type: MessageType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default = "default_temperature")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub temperature: Option<f32>,

    #[serde(default = "default_max_tokens")]
    #[validate(range(min = 1, max = 8000))]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Text-only request with default sampling parameters.
    pub fn text(question: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            question: question.into(),
            image_url: None,
            image_data: None,
            message_type: MessageType::Text,
            session_id,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_url.is_some() || self.image_data.is_some()
    }
}

impl Normalizable for ChatRequest {
    fn normalize(&mut self) {
        // Blank strings from form-style clients mean "absent".
        for field in [&mut self.image_url, &mut self.image_data, &mut self.session_id] {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
    }
}

fn validate_chat_request(req: &ChatRequest) -> Result<(), ValidationError> {
    if req.message_type == MessageType::Multimodal && !req.has_image() {
        let mut err = ValidationError::new("multimodal_requires_image");
        err.message = Some("Multimodal message requires either image_url or image_data".into());
        return Err(err);
    }
    Ok(())
}

pub(crate) fn validate_image_url(url: &str) -> Result<(), ValidationError> {
    if IMAGE_URL_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_image_url");
        err.message = Some("Invalid image URL format".into());
        Err(err)
    }
}

/// Body of `POST /api/v1/chat/text`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TextChatRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Normalizable for TextChatRequest {}

impl From<TextChatRequest> for ChatRequest {
    fn from(req: TextChatRequest) -> Self {
        ChatRequest::text(req.question, req.session_id)
    }
}

/// Successful chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub message_type: MessageType,
    pub timestamp: DateTime<Utc>,
    pub model_used: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults_applied_on_deserialize() {
        let req: ChatRequest = serde_json::from_value(json!({"question": "hi"})).unwrap();
        assert_eq!(req.message_type, MessageType::Text);
        assert_eq!(req.temperature, Some(0.7));
        assert_eq!(req.max_tokens, Some(4000));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_multimodal_without_image_is_rejected() {
        let req: ChatRequest = serde_json::from_value(json!({
            "question": "what is this?",
            "message_type": "multimodal"
        }))
        .unwrap();
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("Multimodal message requires"));
    }

    #[test]
    fn test_image_url_scheme_checked() {
        let mut req = ChatRequest::text("q", None);
        req.image_url = Some("ftp://example.com/cat.png".into());
        assert!(req.validate().is_err());

        req.image_url = Some("blob://uploads/abc.png".into());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_temperature_out_of_range() {
        let mut req = ChatRequest::text("q", None);
        req.temperature = Some(1.5);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_normalize_blanks_become_none() {
        let mut req = ChatRequest::text("q", Some("  ".into()));
        req.image_data = Some(String::new());
        req.normalize();
        assert!(req.session_id.is_none());
        assert!(req.image_data.is_none());
    }
}
