//! Fetching image bytes from the sources a client may reference.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::{
    encoding::decode_base64_image,
    error::{MediaConnectorError, MultiModalError, MultiModalResult},
};

/// Where an image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Remote `http(s)` URL.
    Url(String),
    /// `data:<mime>;base64,...` URL.
    DataUrl(String),
    /// Base64 encoded bytes without a data prefix.
    Base64(String),
    /// Raw bytes already in memory.
    InlineBytes(Vec<u8>),
}

impl MediaSource {
    /// Classify inline image data sent in a request body. Never a remote
    /// URL: anything that is not a data URL is decoded as base64.
    pub fn from_inline(value: &str) -> Self {
        if value.starts_with("data:") {
            MediaSource::DataUrl(value.to_string())
        } else {
            MediaSource::Base64(value.to_string())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConnectorConfig {
    /// When set, remote fetches are restricted to these hosts.
    pub allowed_domains: Option<Vec<String>>,
    pub fetch_timeout: Duration,
    pub max_bytes: usize,
    pub allowed_content_types: Vec<String>,
}

impl Default for MediaConnectorConfig {
    fn default() -> Self {
        Self {
            allowed_domains: None,
            fetch_timeout: Duration::from_secs(30),
            max_bytes: 10 * 1024 * 1024,
            allowed_content_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
        }
    }
}

/// Case-insensitive content-type check that ignores parameters like `charset`.
pub fn is_allowed_content_type(content_type: &str, allowed: &[String]) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    allowed.iter().any(|a| a.eq_ignore_ascii_case(&essence))
}

#[derive(Debug, Clone)]
pub struct MediaConnector {
    client: reqwest::Client,
    config: MediaConnectorConfig,
}

impl MediaConnector {
    pub fn new(client: reqwest::Client, config: MediaConnectorConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &MediaConnectorConfig {
        &self.config
    }

    /// Resolve a source to raw image bytes.
    pub async fn fetch_bytes(&self, source: MediaSource) -> MultiModalResult<Vec<u8>> {
        let bytes = match source {
            MediaSource::InlineBytes(bytes) => bytes,
            MediaSource::DataUrl(s) | MediaSource::Base64(s) => decode_base64_image(&s)?,
            MediaSource::Url(url) => self.fetch_remote(&url).await?,
        };
        if bytes.len() > self.config.max_bytes {
            return Err(MultiModalError::TooLarge {
                size: bytes.len(),
                max: self.config.max_bytes,
            });
        }
        Ok(bytes)
    }

    async fn fetch_remote(&self, raw_url: &str) -> Result<Vec<u8>, MediaConnectorError> {
        let url = Url::parse(raw_url).map_err(|e| MediaConnectorError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MediaConnectorError::UnsupportedScheme(url.scheme().to_string()));
        }
        if let Some(allowed) = &self.config.allowed_domains {
            let host = url.host_str().unwrap_or_default();
            if !allowed.iter().any(|d| d.eq_ignore_ascii_case(host)) {
                return Err(MediaConnectorError::DisallowedDomain(host.to_string()));
            }
        }

        debug!(url = %url, "Fetching remote image");
        let mut response = self
            .client
            .get(url.clone())
            .timeout(self.config.fetch_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MediaConnectorError::Timeout(url.to_string())
                } else {
                    MediaConnectorError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaConnectorError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !is_allowed_content_type(&content_type, &self.config.allowed_content_types) {
            warn!(url = %url, content_type = %content_type, "Rejected remote image");
            return Err(MediaConnectorError::InvalidContentType(content_type));
        }

        let max = self.config.max_bytes;
        if let Some(len) = response.content_length() {
            if len as usize > max {
                return Err(MediaConnectorError::TooLarge {
                    size: len as usize,
                    max,
                });
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > max {
                return Err(MediaConnectorError::TooLarge {
                    size: body.len() + chunk.len(),
                    max,
                });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}
