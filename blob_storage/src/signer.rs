//! Presigned upload URLs.
//!
//! A signature is a blake3 keyed hash over `key | content_type | expires`.
//! The upload must carry the same `Content-Type` it was signed for.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::core::{BlobResult, BlobStorageError};

const KEY_CONTEXT: &str = "mmchat blob-storage 2024 upload signing";

/// Longest lifetime a presigned upload URL may have (7 days).
pub const MAX_PRESIGN_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;

/// Parameters presented with a presigned `PUT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSignature {
    pub key: String,
    pub content_type: String,
    /// Unix timestamp (seconds).
    pub expires: i64,
    /// Hex encoded keyed hash.
    pub signature: String,
}

#[derive(Clone)]
pub struct UrlSigner {
    key: [u8; 32],
    public_base_url: String,
    expiry: Duration,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("public_base_url", &self.public_base_url)
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl UrlSigner {
    pub fn new(secret: &str, public_base_url: &str, expiry_secs: u64) -> Self {
        Self {
            key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            expiry: Duration::seconds(expiry_secs.min(MAX_PRESIGN_EXPIRY_SECS) as i64),
        }
    }

    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    fn mac(&self, key: &str, content_type: &str, expires: i64) -> blake3::Hash {
        let message = format!("{key}|{}|{expires}", content_type.to_ascii_lowercase());
        blake3::keyed_hash(&self.key, message.as_bytes())
    }

    /// Mint an upload URL valid until `now + expiry`.
    pub fn sign_upload(&self, key: &str, content_type: &str, now: DateTime<Utc>) -> (String, DateTime<Utc>) {
        let expires_at = now + self.expiry;
        let expires = expires_at.timestamp();
        let signature = self.mac(key, content_type, expires).to_hex();
        let url = format!(
            "{}?expires={expires}&signature={signature}",
            self.access_url(key)
        );
        (url, expires_at)
    }

    pub fn verify(&self, sig: &UploadSignature, now: DateTime<Utc>) -> BlobResult<()> {
        let presented =
            blake3::Hash::from_hex(&sig.signature).map_err(|_| BlobStorageError::InvalidSignature)?;
        // blake3::Hash equality is constant-time.
        if presented != self.mac(&sig.key, &sig.content_type, sig.expires) {
            return Err(BlobStorageError::InvalidSignature);
        }
        let expires_at = Utc
            .timestamp_opt(sig.expires, 0)
            .single()
            .ok_or(BlobStorageError::InvalidSignature)?;
        if now > expires_at {
            return Err(BlobStorageError::Expired(expires_at));
        }
        Ok(())
    }

    pub fn access_url(&self, key: &str) -> String {
        format!("{}/blobs/{key}", self.public_base_url)
    }

    /// `blob://<key>` or `<public_base_url>/blobs/<key>` to `<key>`.
    pub fn resolve_key(&self, url: &str) -> Option<String> {
        let prefix = format!("{}/blobs/", self.public_base_url);
        let key = url
            .strip_prefix("blob://")
            .or_else(|| url.strip_prefix(prefix.as_str()))?;
        let key = key.split(['?', '#']).next().unwrap_or_default();
        (!key.is_empty()).then(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> UrlSigner {
        UrlSigner::new("secret", "http://localhost:8000/", 60)
    }

    fn parse(url: &str, key: &str, content_type: &str) -> UploadSignature {
        let query = url.split_once('?').unwrap().1;
        let mut expires = 0;
        let mut signature = String::new();
        for pair in query.split('&') {
            match pair.split_once('=').unwrap() {
                ("expires", v) => expires = v.parse().unwrap(),
                ("signature", v) => signature = v.to_string(),
                _ => {}
            }
        }
        UploadSignature {
            key: key.into(),
            content_type: content_type.into(),
            expires,
            signature,
        }
    }

    #[test]
    fn test_expiry_is_capped() {
        let s = UrlSigner::new("secret", "http://localhost:8000", u64::MAX);
        let now = Utc::now();
        let (_, expires_at) = s.sign_upload("uploads/a.jpg", "image/jpeg", now);
        assert_eq!(
            (expires_at - now).num_seconds(),
            MAX_PRESIGN_EXPIRY_SECS as i64
        );
    }

    #[test]
    fn test_sign_and_verify() {
        let s = signer();
        let now = Utc::now();
        let (url, expires_at) = s.sign_upload("uploads/a.png", "image/png", now);
        assert!(url.starts_with("http://localhost:8000/blobs/uploads/a.png?expires="));
        assert_eq!(expires_at, now + Duration::seconds(60));

        let sig = parse(&url, "uploads/a.png", "image/png");
        assert!(s.verify(&sig, now).is_ok());
    }

    #[test]
    fn test_tampering_detected() {
        let s = signer();
        let now = Utc::now();
        let (url, _) = s.sign_upload("uploads/a.png", "image/png", now);

        let other_key = parse(&url, "uploads/b.png", "image/png");
        assert!(matches!(s.verify(&other_key, now), Err(BlobStorageError::InvalidSignature)));

        let other_type = parse(&url, "uploads/a.png", "image/jpeg");
        assert!(matches!(s.verify(&other_type, now), Err(BlobStorageError::InvalidSignature)));

        let other_secret = UrlSigner::new("different", "http://localhost:8000", 60);
        let sig = parse(&url, "uploads/a.png", "image/png");
        assert!(other_secret.verify(&sig, now).is_err());
    }

    #[test]
    fn test_expired() {
        let s = signer();
        let now = Utc::now();
        let (url, _) = s.sign_upload("uploads/a.png", "image/png", now);
        let sig = parse(&url, "uploads/a.png", "image/png");
        let later = now + Duration::seconds(61);
        assert!(matches!(s.verify(&sig, later), Err(BlobStorageError::Expired(_))));
    }

    #[test]
    fn test_resolve_key() {
        let s = signer();
        assert_eq!(s.resolve_key("blob://uploads/a.png").as_deref(), Some("uploads/a.png"));
        assert_eq!(
            s.resolve_key("http://localhost:8000/blobs/uploads/a.png?x=1").as_deref(),
            Some("uploads/a.png")
        );
        assert_eq!(s.resolve_key("https://elsewhere.test/blobs/a.png"), None);
        assert_eq!(s.resolve_key("blob://"), None);
    }
}
