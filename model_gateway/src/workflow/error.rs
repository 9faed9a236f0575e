use std::fmt;

use serde::{Deserialize, Serialize};

use crate::gateway::GatewayError;

/// Failures trapped by workflow steps.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Request violates an ingress invariant.
    #[error("{0}")]
    Validation(String),

    /// Image could not be fetched, decoded, resized or re-encoded.
    #[error("{0}")]
    Normalization(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("{0}")]
    Internal(String),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Validation(_) => ErrorKind::Validation,
            WorkflowError::Normalization(_) => ErrorKind::Normalization,
            WorkflowError::Gateway(_) => ErrorKind::Gateway,
            WorkflowError::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Normalization,
    Gateway,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Normalization => "normalization",
            ErrorKind::Gateway => "gateway",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trapped failure. Once set on a workflow it is terminal for that request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Trace name of the step that raised it.
    pub stage: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(stage: &str, err: &WorkflowError) -> Self {
        Self {
            stage: stage.to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
