//! In-memory object storage.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;

use crate::{
    core::{
        sanitize_key, upload_key, BlobResult, ObjectData, ObjectStorage, PresignedUpload,
        StoredObject,
    },
    signer::{UploadSignature, UrlSigner},
};

#[derive(Debug, Clone)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<HashMap<String, ObjectData>>>,
    signer: UrlSigner,
}

impl MemoryBlobStore {
    pub fn new(signer: UrlSigner) -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            signer,
        }
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ObjectStorage for MemoryBlobStore {
    async fn presign_upload(
        &self,
        filename: &str,
        content_type: &str,
    ) -> BlobResult<PresignedUpload> {
        let (upload_id, key) = upload_key(filename);
        let (upload_url, expires_at) = self.signer.sign_upload(&key, content_type, Utc::now());
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
        let key = sanitize_key(key)?;
        let size = bytes.len();
        self.objects.write().insert(
            key.to_string(),
            ObjectData {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(StoredObject {
            key: key.to_string(),
            url: self.signer.access_url(key),
            content_type: content_type.to_string(),
            size,
        })
    }

    async fn get_object(&self, key: &str) -> BlobResult<Option<ObjectData>> {
        let key = sanitize_key(key)?;
        Ok(self.objects.read().get(key).cloned())
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
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip_and_overwrite() {
        let store = MemoryBlobStore::new(UrlSigner::new("s", "http://h", 60));
        assert!(store.is_empty());
        store
            .put_object(Bytes::from_static(b"a"), "generated/a.png", "image/png")
            .await
            .unwrap();
        store
            .put_object(Bytes::from_static(b"b"), "generated/a.png", "image/jpeg")
            .await
            .unwrap();
        assert_eq!(store.len(), 1);

        let object = store.get_object("generated/a.png").await.unwrap().unwrap();
        assert_eq!(object.bytes.as_ref(), b"b");
        assert_eq!(object.content_type, "image/jpeg");
        assert_eq!(store.object_url("generated/a.png"), "http://h/blobs/generated/a.png");
    }
}
