//! Async adapter contract shared by the backing store and the accelerated path.
//!
//! Both access paths implement [`ProductStore`], so the façade can hold either
//! behind the same trait object and the two stay interchangeable except for
//! timing.

use async_trait::async_trait;
use catalog_core::{CatalogResult, Product, ProductPatch};

/// CRUD + scan over products.
///
/// Contract:
/// - `get` on a missing id returns `Ok(None)`, never an error.
/// - `update` merges only the fields named in the patch and returns the
///   merged product, or `Ok(None)` if the id does not exist. It never creates.
/// - `delete` is idempotent. It returns the removed product so callers can
///   release anything it referenced, and `Ok(None)` when nothing was there.
/// - `scan` returns every product, in no particular order.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Insert or overwrite a product by id.
    async fn put(&self, product: &Product) -> CatalogResult<()>;

    /// Get a product by id.
    async fn get(&self, id: &str) -> CatalogResult<Option<Product>>;

    /// Merge a partial update into an existing product.
    async fn update(&self, id: &str, patch: &ProductPatch) -> CatalogResult<Option<Product>>;

    /// Remove a product.
    async fn delete(&self, id: &str) -> CatalogResult<Option<Product>>;

    /// List all products.
    async fn scan(&self) -> CatalogResult<Vec<Product>>;
}

/// Storage statistics for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageStatistics {
    pub product_count: u64,
    pub total_size_bytes: Option<u64>,
}
