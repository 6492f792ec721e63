//! LMDB-backed product store.
//!
//! Uses the heed crate (Rust bindings for LMDB) as the durable key-value
//! store behind the direct access path.
//!
//! # Layout
//!
//! One unnamed database. Key is the product id (UTF-8), value is the
//! JSON-encoded product.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions with a single writer. The store uses:
//! - Read transactions for `get` and `scan`
//! - One write transaction per `put`, `update` and `delete`, so a partial
//!   update is an atomic read-modify-write for its key

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use catalog_core::{CatalogError, CatalogResult, Product, ProductPatch, StorageError};
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};

use crate::store::{ProductStore, StorageStatistics};

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment at {path}: {reason}")]
    EnvOpen { path: PathBuf, reason: String },

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error during {operation}: {source}")]
    Transaction {
        operation: &'static str,
        #[source]
        source: heed::Error,
    },

    /// Value could not be encoded or decoded.
    #[error("Serialization error for {id}: {source}")]
    Serialization {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LmdbStoreError {
    fn txn(operation: &'static str) -> impl FnOnce(heed::Error) -> Self {
        move |source| Self::Transaction { operation, source }
    }
}

/// Convert LmdbStoreError to CatalogError.
impl From<LmdbStoreError> for CatalogError {
    fn from(e: LmdbStoreError) -> Self {
        match e {
            LmdbStoreError::Serialization { id, source } => {
                CatalogError::Storage(StorageError::Serialization {
                    id,
                    reason: source.to_string(),
                })
            }
            LmdbStoreError::Transaction { operation, source } => {
                CatalogError::Storage(StorageError::backend(operation, source))
            }
            other => CatalogError::Storage(StorageError::backend("open", other)),
        }
    }
}

/// Durable product store on LMDB.
///
/// # Example
///
/// ```ignore
/// use catalog_storage::{LmdbProductStore, ProductStore};
///
/// let store = LmdbProductStore::open("/tmp/catalog", 64)?;
/// store.put(&product).await?;
/// let fetched = store.get(&product.id).await?;
/// ```
pub struct LmdbProductStore {
    env: Env,
    db: Database<Str, Bytes>,
    path: PathBuf,
}

impl LmdbProductStore {
    /// Open (or create) the store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `map_size_mb` - Maximum size of the database in megabytes
    pub fn open<P: AsRef<Path>>(path: P, map_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per directory per process;
        // `CatalogState` owns the only handle.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen {
            path: path.as_ref().to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut wtxn = env.write_txn().map_err(LmdbStoreError::txn("open"))?;
        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(LmdbStoreError::txn("open"))?;

        tracing::info!(path = %path.as_ref().display(), map_size_mb, "LMDB product store opened");

        Ok(Self {
            env,
            db,
            path: path.as_ref().to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush dirty pages to disk.
    pub fn sync(&self) -> Result<(), LmdbStoreError> {
        self.env.force_sync().map_err(LmdbStoreError::txn("sync"))
    }

    pub fn statistics(&self) -> Result<StorageStatistics, LmdbStoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbStoreError::txn("stats"))?;
        let product_count = self.db.len(&rtxn).map_err(LmdbStoreError::txn("stats"))?;
        let total_size_bytes = self.env.real_disk_size().ok();
        Ok(StorageStatistics {
            product_count,
            total_size_bytes,
        })
    }

    fn encode(product: &Product) -> Result<Vec<u8>, LmdbStoreError> {
        serde_json::to_vec(product).map_err(|source| LmdbStoreError::Serialization {
            id: product.id.clone(),
            source,
        })
    }

    fn decode(id: &str, bytes: &[u8]) -> Result<Product, LmdbStoreError> {
        serde_json::from_slice(bytes).map_err(|source| LmdbStoreError::Serialization {
            id: id.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ProductStore for LmdbProductStore {
    fn name(&self) -> &'static str {
        "lmdb"
    }

    async fn put(&self, product: &Product) -> CatalogResult<()> {
        let bytes = Self::encode(product)?;

        let mut wtxn = self.env.write_txn().map_err(LmdbStoreError::txn("put"))?;
        self.db
            .put(&mut wtxn, &product.id, &bytes)
            .map_err(LmdbStoreError::txn("put"))?;
        wtxn.commit().map_err(LmdbStoreError::txn("put"))?;

        Ok(())
    }

    async fn get(&self, id: &str) -> CatalogResult<Option<Product>> {
        let rtxn = self.env.read_txn().map_err(LmdbStoreError::txn("get"))?;
        match self.db.get(&rtxn, id).map_err(LmdbStoreError::txn("get"))? {
            Some(bytes) => Ok(Some(Self::decode(id, bytes)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, id: &str, patch: &ProductPatch) -> CatalogResult<Option<Product>> {
        let mut wtxn = self.env.write_txn().map_err(LmdbStoreError::txn("update"))?;

        let current = match self.db.get(&wtxn, id).map_err(LmdbStoreError::txn("update"))? {
            Some(bytes) => Self::decode(id, bytes)?,
            // Dropping the txn aborts it.
            None => return Ok(None),
        };

        let mut merged = current;
        merged.apply_patch(patch);
        let bytes = Self::encode(&merged)?;

        self.db
            .put(&mut wtxn, id, &bytes)
            .map_err(LmdbStoreError::txn("update"))?;
        wtxn.commit().map_err(LmdbStoreError::txn("update"))?;

        Ok(Some(merged))
    }

    async fn delete(&self, id: &str) -> CatalogResult<Option<Product>> {
        let mut wtxn = self.env.write_txn().map_err(LmdbStoreError::txn("delete"))?;

        let existing = match self.db.get(&wtxn, id).map_err(LmdbStoreError::txn("delete"))? {
            Some(bytes) => Self::decode(id, bytes)?,
            None => return Ok(None),
        };

        self.db
            .delete(&mut wtxn, id)
            .map_err(LmdbStoreError::txn("delete"))?;
        wtxn.commit().map_err(LmdbStoreError::txn("delete"))?;

        Ok(Some(existing))
    }

    async fn scan(&self) -> CatalogResult<Vec<Product>> {
        let rtxn = self.env.read_txn().map_err(LmdbStoreError::txn("scan"))?;
        let iter = self.db.iter(&rtxn).map_err(LmdbStoreError::txn("scan"))?;

        let mut products = Vec::new();
        for entry in iter {
            let (id, bytes) = entry.map_err(LmdbStoreError::txn("scan"))?;
            products.push(Self::decode(id, bytes)?);
        }
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbProductStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store =
            LmdbProductStore::open(temp_dir.path(), 10).expect("store creation should succeed");
        (store, temp_dir)
    }

    fn widget() -> Product {
        Product::new("p1", "Widget")
            .with_description("A widget")
            .with_price(9.99)
            .with_remaining_sku(3)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (store, _temp_dir) = create_test_store();

        store.put(&widget()).await.expect("put should succeed");
        let fetched = store.get("p1").await.expect("get should succeed");
        assert_eq!(fetched, Some(widget()));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let (store, _temp_dir) = create_test_store();
        let fetched = store.get("missing").await.expect("get should succeed");
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let (store, _temp_dir) = create_test_store();

        store.put(&widget()).await.expect("put should succeed");
        store
            .put(&widget().with_description("Updated"))
            .await
            .expect("put should succeed");

        let fetched = store.get("p1").await.expect("get should succeed");
        assert_eq!(fetched.map(|p| p.description), Some("Updated".to_string()));
    }

    #[tokio::test]
    async fn test_partial_update() {
        let (store, _temp_dir) = create_test_store();
        store.put(&widget()).await.expect("put should succeed");

        let merged = store
            .update("p1", &ProductPatch::new().price(12.5))
            .await
            .expect("update should succeed")
            .expect("product should exist");
        assert_eq!(merged.price, 12.5);
        assert_eq!(merged.remaining_sku, 3);
        assert_eq!(merged.description, "A widget");

        let fetched = store.get("p1").await.expect("get should succeed");
        assert_eq!(fetched, Some(merged));
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let (store, _temp_dir) = create_test_store();
        let result = store
            .update("ghost", &ProductPatch::new().product_name("Ghost"))
            .await
            .expect("update should succeed");
        assert!(result.is_none());
        assert!(store.get("ghost").await.expect("get should succeed").is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (store, _temp_dir) = create_test_store();
        store.put(&widget()).await.expect("put should succeed");

        let first = store.delete("p1").await.expect("delete should succeed");
        assert_eq!(first, Some(widget()));

        let second = store.delete("p1").await.expect("second delete should succeed");
        assert!(second.is_none());
        assert!(store.get("p1").await.expect("get should succeed").is_none());
    }

    #[tokio::test]
    async fn test_scan_returns_every_item_once() {
        for n in [0usize, 1, 5, 100] {
            let (store, _temp_dir) = create_test_store();
            for i in 0..n {
                store
                    .put(&Product::new(format!("item-{}", i), "Item"))
                    .await
                    .expect("put should succeed");
            }

            let scanned = store.scan().await.expect("scan should succeed");
            let ids: HashSet<_> = scanned.into_iter().map(|p| p.id).collect();
            assert_eq!(ids.len(), n);
            assert_eq!(store.statistics().expect("stats").product_count, n as u64);
        }
    }

    #[tokio::test]
    async fn test_data_survives_reopen() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        {
            let store = LmdbProductStore::open(temp_dir.path(), 10).expect("open");
            store.put(&widget()).await.expect("put should succeed");
            store.sync().expect("sync should succeed");
        }

        let store = LmdbProductStore::open(temp_dir.path(), 10).expect("reopen");
        assert_eq!(store.get("p1").await.expect("get"), Some(widget()));
    }
}
