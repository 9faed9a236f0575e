//! Model catalog entries returned by `GET /api/v1/chat/models`.
//!
//! Capabilities are tracked as bitflags and serialized as a map of booleans
//! so clients can feature-test a model without knowing the flag layout.

use bitflags::bitflags;
use serde::{
    de::Deserializer,
    ser::{SerializeMap, Serializer},
    Deserialize, Serialize,
};

bitflags! {
    #[derive(Copy, Debug, Default, Clone, Eq, PartialEq, Hash)]
    pub struct ModelCapabilities: u8 {
        /// Plain text completion
        const TEXT_GENERATION  = 1 << 0;
        /// Image understanding (image + prompt in, text out)
        const IMAGE_ANALYSIS   = 1 << 1;
        /// Text-to-image generation
        const IMAGE_GENERATION = 1 << 2;

        /// Vision-capable chat model
        const VISION_LLM = Self::TEXT_GENERATION.bits() | Self::IMAGE_ANALYSIS.bits();
    }
}

const CAPABILITY_NAMES: &[(ModelCapabilities, &str)] = &[
    (ModelCapabilities::TEXT_GENERATION, "text_generation"),
    (ModelCapabilities::IMAGE_ANALYSIS, "image_analysis"),
    (ModelCapabilities::IMAGE_GENERATION, "image_generation"),
];

impl ModelCapabilities {
    #[inline]
    pub fn supports_text(&self) -> bool {
        self.contains(Self::TEXT_GENERATION)
    }

    #[inline]
    pub fn supports_vision(&self) -> bool {
        self.contains(Self::IMAGE_ANALYSIS)
    }

    #[inline]
    pub fn supports_image_gen(&self) -> bool {
        self.contains(Self::IMAGE_GENERATION)
    }

    /// Coarse classification used by the catalog's `type` field.
    pub fn kind(&self) -> &'static str {
        if self.supports_text() {
            "text"
        } else {
            "image"
        }
    }
}

impl Serialize for ModelCapabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(CAPABILITY_NAMES.len()))?;
        for (flag, name) in CAPABILITY_NAMES {
            map.serialize_entry(name, &self.contains(*flag))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ModelCapabilities {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = std::collections::HashMap::<String, bool>::deserialize(deserializer)?;
        let mut caps = ModelCapabilities::empty();
        for (flag, name) in CAPABILITY_NAMES {
            if raw.get(*name).copied().unwrap_or(false) {
                caps |= *flag;
            }
        }
        Ok(caps)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCard {
    /// Short name used in configuration (e.g. "text", "vision", "image").
    pub name: String,
    /// Upstream model identifier.
    pub model_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub capabilities: ModelCapabilities,
}

impl ModelCard {
    pub fn new(
        name: impl Into<String>,
        model_id: impl Into<String>,
        capabilities: ModelCapabilities,
    ) -> Self {
        Self {
            name: name.into(),
            model_id: model_id.into(),
            kind: capabilities.kind().to_string(),
            capabilities,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelCard>,
    pub default_text_model: String,
    pub default_image_model: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_capabilities_serialize_as_bool_map() {
        let card = ModelCard::new("vision", "llava", ModelCapabilities::VISION_LLM);
        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(
            value["capabilities"],
            json!({"text_generation": true, "image_analysis": true, "image_generation": false})
        );

        let back: ModelCard = serde_json::from_value(value).unwrap();
        assert_eq!(back.capabilities, ModelCapabilities::VISION_LLM);
    }

    #[test]
    fn test_image_model_kind() {
        let card = ModelCard::new("image", "sdxl", ModelCapabilities::IMAGE_GENERATION);
        assert_eq!(card.kind, "image");
        assert!(card.capabilities.supports_image_gen());
        assert!(!card.capabilities.supports_vision());
    }
}
