//! Filesystem backed object storage.
//!
//! Objects live at `<root>/<key>`; the content type is kept in a
//! `<root>/<key>.meta.json` sidecar.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    core::{
        sanitize_key, upload_key, BlobResult, BlobStorageError, ObjectData, ObjectStorage,
        PresignedUpload, StoredObject,
    },
    signer::{UploadSignature, UrlSigner},
};

const META_SUFFIX: &str = ".meta.json";

#[derive(Debug, Serialize, Deserialize)]
struct ObjectMeta {
    content_type: String,
    size: usize,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    signer: UrlSigner,
}

impl LocalBlobStore {
    /// Create the store, making sure `root` exists.
    pub async fn open(root: impl Into<PathBuf>, signer: UrlSigner) -> BlobResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!(root = %root.display(), "Opened local blob store");
        Ok(Self { root, signer })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> BlobResult<PathBuf> {
        let key = sanitize_key(key)?;
        if key.ends_with(META_SUFFIX) {
            return Err(BlobStorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    fn meta_path(object_path: &Path) -> PathBuf {
        let mut name = object_path.as_os_str().to_owned();
        name.push(META_SUFFIX);
        PathBuf::from(name)
    }
}

#[async_trait]
impl ObjectStorage for LocalBlobStore {
    async fn presign_upload(
        &self,
        filename: &str,
        content_type: &str,
    ) -> BlobResult<PresignedUpload> {
        let (upload_id, key) = upload_key(filename);
        let (upload_url, expires_at) = self.signer.sign_upload(&key, content_type, Utc::now());
        debug!(key = %key, expires_at = %expires_at, "Presigned upload");
        Ok(PresignedUpload {
            upload_id,
            access_url: self.signer.access_url(&key),
            key,
            upload_url,
            expires_at,
        })
    }

    async fn put_object(
        &self,
        bytes: Bytes,
        key: &str,
        content_type: &str,
    ) -> BlobResult<StoredObject> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let meta = ObjectMeta {
            content_type: content_type.to_string(),
            size: bytes.len(),
            created_at: Utc::now(),
        };
        tokio::fs::write(&path, &bytes).await?;
        tokio::fs::write(Self::meta_path(&path), serde_json::to_vec(&meta)?).await?;
        debug!(key, size = bytes.len(), content_type, "Stored object");

        Ok(StoredObject {
            key: key.to_string(),
            url: self.signer.access_url(key),
            content_type: meta.content_type,
            size: meta.size,
        })
    }

    async fn get_object(&self, key: &str) -> BlobResult<Option<ObjectData>> {
        let path = self.object_path(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let content_type = match tokio::fs::read(Self::meta_path(&path)).await {
            Ok(raw) => serde_json::from_slice::<ObjectMeta>(&raw)?.content_type,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                "application/octet-stream".to_string()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Some(ObjectData {
            bytes: Bytes::from(bytes),
            content_type,
        }))
    }

    fn verify_upload(&self, signature: &UploadSignature) -> BlobResult<()> {
        sanitize_key(&signature.key)?;
        self.signer.verify(signature, Utc::now())
    }

    fn resolve_key(&self, url: &str) -> Option<String> {
        self.signer.resolve_key(url)
    }

    fn object_url(&self, key: &str) -> String {
        self.signer.access_url(key)
    }

    async fn health_check(&self) -> BlobResult<()> {
        let meta = tokio::fs::metadata(&self.root).await?;
        if !meta.is_dir() {
            return Err(BlobStorageError::Unavailable(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, LocalBlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let signer = UrlSigner::new("test-secret", "http://localhost:8000", 300);
        let store = LocalBlobStore::open(dir.path().join("blobs"), signer)
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let (_dir, store) = store().await;
        let stored = store
            .put_object(Bytes::from_static(b"jpeg-bytes"), "uploads/x.jpg", "image/jpeg")
            .await
            .unwrap();
        assert_eq!(stored.url, "http://localhost:8000/blobs/uploads/x.jpg");
        assert_eq!(stored.size, 10);

        let object = store.get_object("uploads/x.jpg").await.unwrap().unwrap();
        assert_eq!(object.bytes.as_ref(), b"jpeg-bytes");
        assert_eq!(object.content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_missing_object() {
        let (_dir, store) = store().await;
        assert!(store.get_object("uploads/none.jpg").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_traversal_and_sidecar_keys() {
        let (_dir, store) = store().await;
        let err = store
            .put_object(Bytes::from_static(b"x"), "../escape.jpg", "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, BlobStorageError::InvalidKey(_)));

        let err = store.get_object("uploads/x.jpg.meta.json").await.unwrap_err();
        assert!(matches!(err, BlobStorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_presign_then_verify() {
        let (_dir, store) = store().await;
        let presigned = store.presign_upload("cat.png", "image/png").await.unwrap();
        assert!(presigned.key.starts_with("uploads/"));
        assert!(presigned.key.ends_with(".png"));
        assert!(presigned.key.contains(&presigned.upload_id));
        assert_eq!(store.resolve_key(&presigned.access_url), Some(presigned.key.clone()));

        let query = presigned.upload_url.split_once('?').unwrap().1;
        let mut expires = 0;
        let mut signature = String::new();
        for pair in query.split('&') {
            match pair.split_once('=').unwrap() {
                ("expires", v) => expires = v.parse().unwrap(),
                ("signature", v) => signature = v.to_string(),
                _ => {}
            }
        }
        let sig = UploadSignature {
            key: presigned.key.clone(),
            content_type: "image/png".into(),
            expires,
            signature,
        };
        assert!(store.verify_upload(&sig).is_ok());

        let forged = UploadSignature {
            signature: "00".repeat(32),
            ..sig
        };
        assert!(matches!(
            store.verify_upload(&forged),
            Err(BlobStorageError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn test_health_check() {
        let (dir, store) = store().await;
        assert!(store.health_check().await.is_ok());
        drop(dir);
        assert!(store.health_check().await.is_err());
    }
}
