//! Binary object storage port and the local-disk backend.
//!
//! Documents are stored under opaque keys (see
//! [`crate::uploads::document_storage_key`]). Downloads go through
//! short-lived signed URLs verified by [`UrlSigner`].

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Serialize;
use tokio::fs;

use crate::tokens::{hmac_sha256_hex, verify_hmac_sha256_hex};
use crate::types::Timestamp;

/// Default lifetime of a signed download URL.
pub const DEFAULT_SIGNED_URL_TTL_SECS: i64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A time-limited download link.
#[derive(Debug, Clone, Serialize)]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: Timestamp,
}

/// Storage backend for uploaded documents.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`, replacing any existing object.
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Fetch an object. `None` if it does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Mint a download URL valid for `ttl`.
    fn signed_url(&self, key: &str, ttl: Duration) -> Result<SignedUrl, StorageError>;
}

// ---------------------------------------------------------------------------
// URL signing
// ---------------------------------------------------------------------------

/// Signs and verifies `{key}:{expires}` pairs with HMAC-SHA256.
#[derive(Debug, Clone)]
pub struct UrlSigner {
    secret: String,
    base_path: String,
}

impl UrlSigner {
    /// `base_path` is the public route prefix serving objects, e.g. `/api/storage`.
    pub fn new(secret: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            base_path: base_path.into().trim_end_matches('/').to_string(),
        }
    }

    fn payload(key: &str, expires: i64) -> String {
        format!("{key}:{expires}")
    }

    pub fn sign(&self, key: &str, ttl: Duration) -> SignedUrl {
        let expires_at = Utc::now() + ttl;
        let expires = expires_at.timestamp();
        let signature = hmac_sha256_hex(&self.secret, &Self::payload(key, expires));
        SignedUrl {
            url: format!(
                "{}/{key}?expires={expires}&signature={signature}",
                self.base_path
            ),
            expires_at,
        }
    }

    /// True when the signature matches and `expires` is still in the future.
    pub fn verify(&self, key: &str, expires: i64, signature: &str) -> bool {
        if expires < Utc::now().timestamp() {
            return false;
        }
        verify_hmac_sha256_hex(&self.secret, &Self::payload(key, expires), signature)
    }
}

// ---------------------------------------------------------------------------
// Disk backend
// ---------------------------------------------------------------------------

/// Stores objects as files below a root directory, one file per key.
#[derive(Debug, Clone)]
pub struct DiskObjectStore {
    root: PathBuf,
    signer: UrlSigner,
}

impl DiskObjectStore {
    pub fn new(root: impl Into<PathBuf>, signer: UrlSigner) -> Self {
        Self {
            root: root.into(),
            signer,
        }
    }

    /// Resolve `key` below the root, refusing absolute paths and `..`.
    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let is_safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for DiskObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.object_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn signed_url(&self, key: &str, ttl: Duration) -> Result<SignedUrl, StorageError> {
        self.object_path(key)?;
        Ok(self.signer.sign(key, ttl))
    }
}
