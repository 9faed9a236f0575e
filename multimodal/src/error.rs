use thiserror::Error;

pub type MultiModalResult<T> = Result<T, MultiModalError>;

#[derive(Debug, Error)]
pub enum MediaConnectorError {
    #[error("invalid media url: {0}")]
    InvalidUrl(String),
    #[error("domain not allowed: {0}")]
    DisallowedDomain(String),
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    #[error("upstream returned status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("invalid image format: {0}")]
    InvalidContentType(String),
    #[error("image too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
    #[error("timed out fetching {0}")]
    Timeout(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum MultiModalError {
    #[error("failed to decode base64 image: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to encode image: {0}")]
    Encode(String),
    #[error("empty image payload")]
    Empty,
    #[error(transparent)]
    Media(#[from] MediaConnectorError),
}
