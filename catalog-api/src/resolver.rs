//! Object reference resolver for product images.
//!
//! Products only hold an opaque blob key. The resolver stores uploaded
//! bytes, turns keys into retrievable URLs, and removes blobs when their
//! product goes away. Both access paths share one resolver.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use catalog_core::{BlobKey, ResolverError};
use uuid::Uuid;

/// Blob storage collaborator used by the façade.
#[async_trait]
pub trait ObjectResolver: Send + Sync {
    /// Store `bytes` and return the new key. `key_hint` is folded into the
    /// key but the returned key is always unique.
    async fn store(
        &self,
        bytes: &[u8],
        key_hint: &str,
        extension: Option<&str>,
    ) -> Result<BlobKey, ResolverError>;

    /// URL for an existing blob, `None` if nothing is stored under `key`.
    async fn resolve(&self, key: &str) -> Result<Option<String>, ResolverError>;

    /// Remove a blob. Removing a missing blob succeeds.
    async fn remove(&self, key: &str) -> Result<(), ResolverError>;
}

/// Key prefix for every stored product image.
const KEY_PREFIX: &str = "products";

/// Filesystem-backed resolver.
///
/// Blobs live under `root` at their key; URLs are `<base_url>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Filesystem path for a key, rejecting anything that could escape `root`.
    fn blob_path(&self, key: &str) -> Result<PathBuf, ResolverError> {
        let invalid = key.is_empty()
            || key.starts_with('/')
            || key.contains('\\')
            || key.split('/').any(|segment| segment.is_empty() || segment == "..");
        if invalid {
            return Err(ResolverError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.root.join(key))
    }

    fn new_key(key_hint: &str, extension: Option<&str>) -> BlobKey {
        let hint = sanitize_hint(key_hint);
        let mut key = format!("{}/{}-{}", KEY_PREFIX, hint, Uuid::now_v7());
        if let Some(ext) = extension.filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric())) {
            if !ext.is_empty() {
                key.push('.');
                key.push_str(&ext.to_ascii_lowercase());
            }
        }
        key
    }
}

/// Keep `[A-Za-z0-9_-]`, map everything else to `_`.
fn sanitize_hint(hint: &str) -> String {
    let cleaned: String = hint
        .chars()
        .take(64)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "blob".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl ObjectResolver for LocalObjectStore {
    async fn store(
        &self,
        bytes: &[u8],
        key_hint: &str,
        extension: Option<&str>,
    ) -> Result<BlobKey, ResolverError> {
        let key = Self::new_key(key_hint, extension);
        let path = self.blob_path(&key)?;

        let store_err = |e: std::io::Error| ResolverError::Store {
            key_hint: key_hint.to_string(),
            reason: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(store_err)?;
        }
        tokio::fs::write(&path, bytes).await.map_err(store_err)?;

        tracing::debug!(key = %key, size = bytes.len(), "blob stored");
        Ok(key)
    }

    async fn resolve(&self, key: &str) -> Result<Option<String>, ResolverError> {
        let path = self.blob_path(key)?;
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| ResolverError::Resolve {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        Ok(exists.then(|| format!("{}/{}", self.base_url, key)))
    }

    async fn remove(&self, key: &str) -> Result<(), ResolverError> {
        let path = self.blob_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key, "blob removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ResolverError::Remove {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
