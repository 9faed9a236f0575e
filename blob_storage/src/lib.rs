//! Object storage for uploaded and generated images.
//!
//! Backends:
//! - Local filesystem (default)
//! - Memory (tests, ephemeral deployments)
//!
//! Both hand out presigned upload URLs: a `PUT` to the gateway's
//! `/blobs/{key}` route is accepted only with an unexpired signature minted
//! by [`UrlSigner`].

mod core;
mod local;
mod memory;
mod signer;

pub use core::{
    generated_key, sanitize_key, upload_key, BlobResult, BlobStorageError, ObjectData,
    ObjectStorage, PresignedUpload, StoredObject,
};

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use signer::{UploadSignature, UrlSigner, MAX_PRESIGN_EXPIRY_SECS};
