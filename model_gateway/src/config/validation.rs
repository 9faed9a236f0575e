use blob_storage::MAX_PRESIGN_EXPIRY_SECS;

use super::{ConfigError, ConfigResult, GatewayConfig};

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        let server = &self.server;
        if server.port == 0 {
            return Err(invalid("server.port", "must be non-zero"));
        }
        if server.max_payload_size == 0 {
            return Err(invalid("server.max_payload_size", "must be non-zero"));
        }
        if server.request_timeout_secs == 0 {
            return Err(invalid("server.request_timeout_secs", "must be non-zero"));
        }

        let models = &self.models;
        if !(models.base_url.starts_with("http://") || models.base_url.starts_with("https://")) {
            return Err(invalid(
                "models.base_url",
                format!("must be an http(s) URL, got {:?}", models.base_url),
            ));
        }
        for (field, value) in [
            ("models.text_model", &models.text_model),
            ("models.vision_model", &models.vision_model),
            ("models.image_model", &models.image_model),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }
        if models.call_timeout_secs == 0 {
            return Err(invalid("models.call_timeout_secs", "must be non-zero"));
        }
        let text = &models.text_defaults;
        if !(0.0..=1.0).contains(&text.temperature) {
            return Err(invalid("models.text_defaults.temperature", "must be within 0.0..=1.0"));
        }
        if !(0.0..=1.0).contains(&text.top_p) {
            return Err(invalid("models.text_defaults.top_p", "must be within 0.0..=1.0"));
        }
        if text.max_tokens == 0 {
            return Err(invalid("models.text_defaults.max_tokens", "must be non-zero"));
        }
        if !(1..=4).contains(&models.image_defaults.num_images) {
            return Err(invalid("models.image_defaults.num_images", "must be within 1..=4"));
        }

        let images = &self.images;
        if images.max_file_size == 0 {
            return Err(invalid("images.max_file_size", "must be non-zero"));
        }
        if images.max_width == 0 || images.max_height == 0 {
            return Err(invalid("images.max_width/max_height", "must be non-zero"));
        }
        if !(1..=100).contains(&images.jpeg_quality) {
            return Err(invalid("images.jpeg_quality", "must be within 1..=100"));
        }
        if images.allowed_types.is_empty() {
            return Err(invalid("images.allowed_types", "must list at least one type"));
        }

        let storage = &self.storage;
        if !(storage.public_base_url.starts_with("http://")
            || storage.public_base_url.starts_with("https://"))
        {
            return Err(invalid("storage.public_base_url", "must be an http(s) URL"));
        }
        if !(1..=MAX_PRESIGN_EXPIRY_SECS).contains(&storage.presign_expiry_secs) {
            return Err(invalid(
                "storage.presign_expiry_secs",
                format!("must be within 1..={MAX_PRESIGN_EXPIRY_SECS}"),
            ));
        }

        let history = &self.history;
        if history.max_turns == 0 || history.max_sessions == 0 || history.context_window == 0 {
            return Err(invalid(
                "history",
                "max_turns, max_sessions and context_window must be non-zero",
            ));
        }

        if let Some(addr) = &self.metrics.listen_addr {
            addr.parse::<std::net::SocketAddr>()
                .map_err(|e| invalid("metrics.listen_addr", e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::InvalidValue { field, .. } => field,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(GatewayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = GatewayConfig::default();
        config.server.port = 0;
        assert_eq!(field_of(config.validate().unwrap_err()), "server.port");

        let mut config = GatewayConfig::default();
        config.models.base_url = "ftp://models".into();
        assert_eq!(field_of(config.validate().unwrap_err()), "models.base_url");

        let mut config = GatewayConfig::default();
        config.models.vision_model = " ".into();
        assert_eq!(field_of(config.validate().unwrap_err()), "models.vision_model");

        let mut config = GatewayConfig::default();
        config.images.jpeg_quality = 0;
        assert_eq!(field_of(config.validate().unwrap_err()), "images.jpeg_quality");

        let mut config = GatewayConfig::default();
        config.storage.presign_expiry_secs = u64::MAX;
        assert_eq!(
            field_of(config.validate().unwrap_err()),
            "storage.presign_expiry_secs"
        );

        let mut config = GatewayConfig::default();
        config.storage.presign_expiry_secs = MAX_PRESIGN_EXPIRY_SECS;
        assert!(config.validate().is_ok());

        let mut config = GatewayConfig::default();
        config.history.context_window = 0;
        assert_eq!(field_of(config.validate().unwrap_err()), "history");

        let mut config = GatewayConfig::default();
        config.metrics.listen_addr = Some("not-an-addr".into());
        assert_eq!(field_of(config.validate().unwrap_err()), "metrics.listen_addr");
    }
}
