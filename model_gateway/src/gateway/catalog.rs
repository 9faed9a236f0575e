use mmchat_protocol::{ModelCapabilities, ModelCard, ModelsResponse};

use crate::config::ModelsConfig;

/// Static capability listing for `GET /api/v1/chat/models`.
pub fn model_catalog(models: &ModelsConfig) -> ModelsResponse {
    let mut cards = vec![ModelCard::new(
        "text",
        &models.text_model,
        ModelCapabilities::TEXT_GENERATION,
    )];
    if models.vision_model == models.text_model {
        cards[0].capabilities |= ModelCapabilities::VISION_LLM;
    } else {
        cards.push(ModelCard::new(
            "vision",
            &models.vision_model,
            ModelCapabilities::VISION_LLM,
        ));
    }
    cards.push(ModelCard::new(
        "image",
        &models.image_model,
        ModelCapabilities::IMAGE_GENERATION,
    ));

    ModelsResponse {
        models: cards,
        default_text_model: "text".to_string(),
        default_image_model: "image".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lists_three_roles() {
        let catalog = model_catalog(&ModelsConfig::default());
        let names: Vec<_> = catalog.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["text", "vision", "image"]);
        assert!(catalog.models[1].capabilities.supports_vision());
        assert!(catalog.models[2].capabilities.supports_image_gen());
        assert_eq!(catalog.models[2].kind, "image");
        assert_eq!(catalog.default_text_model, "text");
    }

    #[test]
    fn test_shared_text_and_vision_model_merges() {
        let models = ModelsConfig {
            vision_model: "gpt-4o".into(),
            text_model: "gpt-4o".into(),
            ..Default::default()
        };
        let catalog = model_catalog(&models);
        assert_eq!(catalog.models.len(), 2);
        assert!(catalog.models[0].capabilities.supports_text());
        assert!(catalog.models[0].capabilities.supports_vision());
    }
}
