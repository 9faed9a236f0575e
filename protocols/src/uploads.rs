//! Image upload endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validated::Normalizable;

/// Body of `POST /api/v1/chat/upload-image`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UploadImageRequest {
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    #[validate(length(min = 1))]
    pub content_type: String,
}

impl Normalizable for UploadImageRequest {
    fn normalize(&mut self) {
        self.content_type = self.content_type.trim().to_ascii_lowercase();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadImageResponse {
    /// Presigned URL the client PUTs the image bytes to.
    pub upload_url: String,
    /// URL the uploaded image is served from (usable as `image_url`).
    pub image_url: String,
    pub expires_at: DateTime<Utc>,
    pub upload_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectUploadResponse {
    pub message: String,
    pub image_url: String,
    pub upload_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
}
