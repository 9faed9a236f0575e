// core.rs
//
// Storage contract shared by every backend: the trait, its data types, the
// error type and key helpers.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::signer::UploadSignature;

pub type BlobResult<T> = Result<T, BlobStorageError>;

#[derive(Debug, thiserror::Error)]
pub enum BlobStorageError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("upload signature is invalid")]
    InvalidSignature,

    #[error("upload URL expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("content type mismatch: signed for {expected}, got {actual}")]
    ContentTypeMismatch { expected: String, actual: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Result of presigning an upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresignedUpload {
    pub upload_id: String,
    pub key: String,
    /// URL the client `PUT`s the bytes to.
    pub upload_url: String,
    /// URL the object is served from once uploaded.
    pub access_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectData {
    pub bytes: Bytes,
    pub content_type: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    /// Reserve a key under `uploads/` and mint a signed upload URL for it.
    async fn presign_upload(&self, filename: &str, content_type: &str)
        -> BlobResult<PresignedUpload>;

    async fn put_object(&self, bytes: Bytes, key: &str, content_type: &str)
        -> BlobResult<StoredObject>;

    async fn get_object(&self, key: &str) -> BlobResult<Option<ObjectData>>;

    /// Check a presigned upload before accepting its body.
    fn verify_upload(&self, signature: &UploadSignature) -> BlobResult<()>;

    /// Map a client-facing URL (`blob://key` or the public access URL) back to a key.
    fn resolve_key(&self, url: &str) -> Option<String>;

    /// Public URL an object is served from.
    fn object_url(&self, key: &str) -> String;

    async fn health_check(&self) -> BlobResult<()>;

    fn backend_name(&self) -> &'static str;
}

/// Validate a key: relative, `/`-separated, no traversal, conservative charset.
pub fn sanitize_key(key: &str) -> BlobResult<&str> {
    let invalid = key.is_empty()
        || key.len() > 512
        || key.starts_with('/')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '/'));
    if invalid {
        return Err(BlobStorageError::InvalidKey(key.to_string()));
    }
    Ok(key)
}

fn extension_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string())
}

/// Fresh `(upload_id, key)` for a client upload: `uploads/<uuid>.<ext>`.
pub fn upload_key(filename: &str) -> (String, String) {
    let upload_id = Uuid::new_v4().to_string();
    let key = format!("uploads/{upload_id}.{}", extension_of(filename));
    (upload_id, key)
}

/// Fresh key for a model-generated image: `generated/<uuid>.<ext>`.
pub fn generated_key(extension: &str) -> String {
    format!("generated/{}.{extension}", Uuid::new_v4())
}
