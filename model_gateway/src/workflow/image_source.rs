//! Resolving an `ImageRef` to normalized image bytes.
//!
//! `blob://` URLs and URLs under the storage's public base are read straight
//! from object storage; other URLs go through the media connector.

use blob_storage::BlobStorageError;
use llm_multimodal::{EncodedImage, MediaSource, MultiModalError};
use tracing::debug;

use super::context::{ImageRef, SharedComponents};

#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("Unsupported image reference: {0}")]
    Unresolvable(String),

    #[error("Failed to read stored image: {0}")]
    Storage(#[from] BlobStorageError),

    #[error("Failed to load image: {0}")]
    Media(#[source] MultiModalError),

    #[error("Failed to normalize image: {0}")]
    Normalize(#[source] MultiModalError),
}

pub async fn load_image_bytes(
    components: &SharedComponents,
    image: &ImageRef,
) -> Result<Vec<u8>, ImageLoadError> {
    match image {
        ImageRef::Inline(data) => components
            .media
            .fetch_bytes(MediaSource::from_inline(data))
            .await
            .map_err(ImageLoadError::Media),
        ImageRef::Url(url) => {
            if let Some(key) = components.storage.resolve_key(url) {
                debug!(key = %key, "Reading image from object storage");
                let object = components
                    .storage
                    .get_object(&key)
                    .await?
                    .ok_or_else(|| ImageLoadError::NotFound(url.clone()))?;
                return Ok(object.bytes.to_vec());
            }
            if url.starts_with("blob://") {
                return Err(ImageLoadError::Unresolvable(url.clone()));
            }
            components
                .media
                .fetch_bytes(MediaSource::Url(url.clone()))
                .await
                .map_err(ImageLoadError::Media)
        }
    }
}

/// Load and normalize in one go.
pub async fn load_normalized(
    components: &SharedComponents,
    image: &ImageRef,
) -> Result<EncodedImage, ImageLoadError> {
    let bytes = load_image_bytes(components, image).await?;
    components
        .normalizer
        .normalize(&bytes)
        .map_err(ImageLoadError::Normalize)
}
