/// Result alias for model gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failures talking to the remote model provider. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Model call timed out after {0}s")]
    Timeout(u64),

    #[error("Connection to model provider failed: {0}")]
    Connection(String),

    #[error("Model provider returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Invalid response from model provider: {0}")]
    InvalidResponse(String),

    #[error("Model request failed: {0}")]
    Request(String),
}

impl GatewayError {
    /// Stable machine-readable code for logs and error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Timeout(_) => "timeout",
            GatewayError::Connection(_) => "connection_failed",
            GatewayError::Upstream { .. } => "upstream_error",
            GatewayError::InvalidResponse(_) => "invalid_upstream_response",
            GatewayError::Request(_) => "request_failed",
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(timeout_secs)
        } else if err.is_connect() {
            GatewayError::Connection(err.to_string())
        } else if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Request(err.to_string())
        }
    }
}
