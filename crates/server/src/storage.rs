//! Filesystem-backed blob store for reimbursement artifacts.
//!
//! Objects live under `<root>/<bucket>/<object path>`. Reads and writes go
//! through [`Storage`], which refuses path traversal and can mint short-lived
//! signed URLs for direct browser fetches (keyed blake3 MAC over the object
//! coordinates and expiry).

use std::path::{Component, Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use thiserror::Error;

/// Storage buckets known to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Uploaded invoice PDFs.
    Invoices,
    /// Uploaded signature images.
    Signatures,
    /// Generated advance request PDFs.
    Advances,
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invoices => "reimburse-invoices",
            Self::Signatures => "reimburse-signatures",
            Self::Advances => "reimburse-advances",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "reimburse-invoices" => Some(Self::Invoices),
            "reimburse-signatures" => Some(Self::Signatures),
            "reimburse-advances" => Some(Self::Advances),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("object already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid object path: {0}")]
    InvalidPath(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct Storage {
    root: PathBuf,
    key: [u8; 32],
}

impl Storage {
    /// The signing key is derived from the configured secret so the raw
    /// secret never sits in memory longer than startup.
    pub fn new(root: impl Into<PathBuf>, secret: &str) -> Self {
        Self {
            root: root.into(),
            key: *blake3::hash(secret.as_bytes()).as_bytes(),
        }
    }

    fn resolve(&self, bucket: Bucket, path: &str) -> Result<PathBuf, StorageError> {
        if path.is_empty() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        let relative = Path::new(path);
        let safe = relative.components().all(|component| {
            matches!(component, Component::Normal(part) if !part.to_string_lossy().is_empty())
        });
        if !safe {
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        Ok(self.root.join(bucket.as_str()).join(relative))
    }

    pub async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: &[u8],
        overwrite: bool,
    ) -> Result<(), StorageError> {
        let target = self.resolve(bucket, path)?;

        if !overwrite && tokio::fs::try_exists(&target).await? {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        Ok(())
    }

    pub async fn download(&self, bucket: Bucket, path: &str) -> Result<Vec<u8>, StorageError> {
        let target = self.resolve(bucket, path)?;

        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(format!("{}/{path}", bucket.as_str())))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn exists(&self, bucket: Bucket, path: &str) -> Result<bool, StorageError> {
        let target = self.resolve(bucket, path)?;
        Ok(tokio::fs::try_exists(&target).await?)
    }

    /// Mint a relative URL for `GET /files/raw/...` that stays valid until
    /// `expires` (unix seconds).
    pub fn signed_url(&self, bucket: Bucket, path: &str, expires: i64) -> String {
        let token = self.token(bucket, path, expires);
        format!(
            "/files/raw/{}/{path}?expires={expires}&token={token}",
            bucket.as_str()
        )
    }

    pub fn verify(&self, bucket: Bucket, path: &str, expires: i64, token: &str) -> bool {
        if expires < chrono::Utc::now().timestamp() {
            return false;
        }
        // Constant-time comparison via blake3's Hash equality.
        let Ok(provided) = URL_SAFE_NO_PAD.decode(token) else {
            return false;
        };
        let Ok(provided) = <[u8; 32]>::try_from(provided) else {
            return false;
        };
        blake3::Hash::from(provided) == self.mac(bucket, path, expires)
    }

    fn token(&self, bucket: Bucket, path: &str, expires: i64) -> String {
        URL_SAFE_NO_PAD.encode(self.mac(bucket, path, expires).as_bytes())
    }

    fn mac(&self, bucket: Bucket, path: &str, expires: i64) -> blake3::Hash {
        let message = format!("{}/{path}:{expires}", bucket.as_str());
        blake3::keyed_hash(&self.key, message.as_bytes())
    }
}
