//! Catalog Storage - Adapter Contract and Implementations
//!
//! Defines the [`ProductStore`] contract and the stores behind both access
//! paths:
//! - [`LmdbProductStore`]: the durable backing store
//! - [`InMemoryProductStore`]: a map-backed store with the same semantics,
//!   used by tests and local benches
//! - [`AcceleratedStore`]: the cache-accelerated adapter fronting any backing
//!   store with write-through and read-through
//! - [`DirectStore`]: the uncached path, which invalidates tier entries after
//!   each mutation

pub mod cache;
pub mod lmdb_store;
pub mod store;

pub use lmdb_store::{LmdbProductStore, LmdbStoreError};
pub use store::{ProductStore, StorageStatistics};

// Re-export cache types for API integration
pub use cache::{
    AcceleratedStore, CacheBackend, CacheConfig, CacheStats, CachedProduct, DirectStore,
    InMemoryCacheBackend, WriteMode,
};

use async_trait::async_trait;
use catalog_core::{CatalogResult, Product, ProductPatch, StorageError};
use std::collections::HashMap;
use std::sync::RwLock;

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// Map-backed product store.
///
/// Holds the same contract as the LMDB store. Each operation takes the lock
/// once, so a partial update is a single read-modify-write.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    products: RwLock<HashMap<String, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of products currently stored.
    pub fn len(&self) -> CatalogResult<usize> {
        let products = self.products.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(products.len())
    }

    pub fn is_empty(&self) -> CatalogResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn statistics(&self) -> CatalogResult<StorageStatistics> {
        Ok(StorageStatistics {
            product_count: self.len()? as u64,
            total_size_bytes: None,
        })
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, product: &Product) -> CatalogResult<()> {
        let mut products = self.products.write().map_err(|_| StorageError::LockPoisoned)?;
        products.insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> CatalogResult<Option<Product>> {
        let products = self.products.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(products.get(id).cloned())
    }

    async fn update(&self, id: &str, patch: &ProductPatch) -> CatalogResult<Option<Product>> {
        let mut products = self.products.write().map_err(|_| StorageError::LockPoisoned)?;
        Ok(products.get_mut(id).map(|product| {
            product.apply_patch(patch);
            product.clone()
        }))
    }

    async fn delete(&self, id: &str) -> CatalogResult<Option<Product>> {
        let mut products = self.products.write().map_err(|_| StorageError::LockPoisoned)?;
        Ok(products.remove(id))
    }

    async fn scan(&self) -> CatalogResult<Vec<Product>> {
        let products = self.products.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(products.values().cloned().collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn widget() -> Product {
        Product::new("p1", "Widget")
            .with_description("A widget")
            .with_price(9.99)
            .with_remaining_sku(3)
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = InMemoryProductStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = InMemoryProductStore::new();
        store.put(&widget()).await.unwrap();
        assert_eq!(store.get("p1").await.unwrap(), Some(widget()));
    }

    #[tokio::test]
    async fn test_update_merges_named_fields() {
        let store = InMemoryProductStore::new();
        store.put(&widget()).await.unwrap();

        let updated = store
            .update("p1", &ProductPatch::new().price(12.5))
            .await
            .unwrap()
            .expect("product exists");
        assert_eq!(updated.price, 12.5);
        assert_eq!(updated.remaining_sku, 3);
        assert_eq!(updated.product_name, "Widget");
        assert_eq!(store.get("p1").await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_update_missing_does_not_create() {
        let store = InMemoryProductStore::new();
        let result = store
            .update("ghost", &ProductPatch::new().price(1.0))
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(store.get("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemoryProductStore::new();
        store.put(&widget()).await.unwrap();

        assert_eq!(store.delete("p1").await.unwrap(), Some(widget()));
        assert_eq!(store.delete("p1").await.unwrap(), None);
        assert!(store.get("p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_counts() {
        for n in [0usize, 1, 5, 100] {
            let store = InMemoryProductStore::new();
            for i in 0..n {
                store
                    .put(&Product::new(format!("p{}", i), "Item"))
                    .await
                    .unwrap();
            }
            let scanned = store.scan().await.unwrap();
            let ids: HashSet<_> = scanned.iter().map(|p| p.id.clone()).collect();
            assert_eq!(scanned.len(), n);
            assert_eq!(ids.len(), n);
        }
    }

    #[tokio::test]
    async fn test_statistics() {
        let store = InMemoryProductStore::new();
        assert!(store.is_empty().unwrap());
        store.put(&widget()).await.unwrap();
        assert_eq!(store.statistics().unwrap().product_count, 1);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Put then get returns the same product.
        #[test]
        fn prop_put_get_roundtrip(
            id in "[a-z0-9]{1,12}",
            name in "[A-Z][a-z]{2,12}",
            price in 0.0f64..10_000.0,
            remaining_sku in 0u64..1_000_000,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let product = Product::new(id.clone(), name)
                .with_price(price)
                .with_remaining_sku(remaining_sku);
            let store = InMemoryProductStore::new();

            let fetched = rt.block_on(async {
                store.put(&product).await.unwrap();
                store.get(&id).await.unwrap()
            });
            prop_assert_eq!(fetched, Some(product));
        }
    }
}
