use std::path::PathBuf;

use data_connector::HistoryConfig;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl GatewayConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn from_yaml_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// `*` allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: Vec<String>,
    #[serde(default = "default_max_payload_size")]
    pub max_payload_size: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_allowed_origins: default_cors_origins(),
            max_payload_size: default_max_payload_size(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

fn default_max_payload_size() -> usize {
    // Base64 inflates a 10 MiB image by a third; leave headroom for the JSON around it.
    16 * 1024 * 1024
}

fn default_request_timeout_secs() -> u64 {
    300
}

/// Remote model provider (OpenAI-compatible API)
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelsConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default)]
    pub text_defaults: TextDefaults,
    #[serde(default)]
    pub image_defaults: ImageDefaults,
    /// Upper bound on a single model call.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl std::fmt::Debug for ModelsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelsConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("text_model", &self.text_model)
            .field("vision_model", &self.vision_model)
            .field("image_model", &self.image_model)
            .field("text_defaults", &self.text_defaults)
            .field("image_defaults", &self.image_defaults)
            .field("call_timeout_secs", &self.call_timeout_secs)
            .finish()
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            text_model: default_text_model(),
            vision_model: default_vision_model(),
            image_model: default_image_model(),
            text_defaults: TextDefaults::default(),
            image_defaults: ImageDefaults::default(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_text_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_vision_model() -> String {
    "gpt-4o".to_string()
}

fn default_image_model() -> String {
    "gpt-image-1".to_string()
}

fn default_call_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TextDefaults {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_max_tokens() -> u32 {
    4000
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageDefaults {
    #[serde(default = "default_num_images")]
    pub num_images: u32,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_dimension")]
    pub width: u32,
    #[serde(default = "default_dimension")]
    pub height: u32,
}

impl Default for ImageDefaults {
    fn default() -> Self {
        Self {
            num_images: default_num_images(),
            quality: default_quality(),
            width: default_dimension(),
            height: default_dimension(),
        }
    }
}

fn default_num_images() -> u32 {
    1
}

fn default_quality() -> String {
    "premium".to_string()
}

fn default_dimension() -> u32 {
    1024
}

/// Limits applied to every image entering the gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    #[serde(default = "default_dimension")]
    pub max_width: u32,
    #[serde(default = "default_dimension")]
    pub max_height: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Restrict remote image fetches to these hosts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_domains: Option<Vec<String>>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
            max_width: default_dimension(),
            max_height: default_dimension(),
            jpeg_quality: default_jpeg_quality(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            allowed_domains: None,
        }
    }
}

fn default_max_file_size() -> usize {
    10 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/webp".to_string(),
    ]
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    Memory,
}

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Prefix of every URL handed to clients.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "default_presign_expiry_secs")]
    pub presign_expiry_secs: u64,
    /// Secret for upload URL signatures. Generated per process when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("root", &self.root)
            .field("public_base_url", &self.public_base_url)
            .field("presign_expiry_secs", &self.presign_expiry_secs)
            .field("signing_key", &self.signing_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root: default_storage_root(),
            public_base_url: default_public_base_url(),
            presign_expiry_secs: default_presign_expiry_secs(),
            signing_key: None,
        }
    }
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./data/blobs")
}

fn default_public_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_presign_expiry_secs() -> u64 {
    3600
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Daily rolling log files are written here when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetricsConfig {
    /// Prometheus scrape endpoint, e.g. `0.0.0.0:29000`. Disabled when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_addr: Option<String>,
}
