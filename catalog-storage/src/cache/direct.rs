//! Direct access path over the backing store.
//!
//! [`DirectStore`] reads and writes the backing store without going through
//! the tier, but once a mutation is acknowledged it invalidates the key so the
//! accelerated path cannot keep serving the earlier value.

use std::sync::Arc;

use async_trait::async_trait;
use catalog_core::{CatalogResult, Product, ProductPatch};

use super::traits::CacheBackend;
use crate::store::ProductStore;

pub struct DirectStore<C>
where
    C: CacheBackend + 'static,
{
    backing: Arc<dyn ProductStore>,
    tier: Arc<C>,
}

impl<C> DirectStore<C>
where
    C: CacheBackend + 'static,
{
    pub fn new(backing: Arc<dyn ProductStore>, tier: Arc<C>) -> Self {
        Self { backing, tier }
    }

    /// Get a reference to the backing store.
    pub fn backing(&self) -> &dyn ProductStore {
        self.backing.as_ref()
    }

    async fn invalidate(&self, id: &str) -> CatalogResult<()> {
        let generation = self.tier.invalidate(id).await?;
        tracing::trace!(id, generation, "direct write invalidated tier entry");
        Ok(())
    }
}

#[async_trait]
impl<C> ProductStore for DirectStore<C>
where
    C: CacheBackend + 'static,
{
    fn name(&self) -> &'static str {
        self.backing.name()
    }

    async fn put(&self, product: &Product) -> CatalogResult<()> {
        self.backing.put(product).await?;
        self.invalidate(&product.id).await
    }

    async fn get(&self, id: &str) -> CatalogResult<Option<Product>> {
        self.backing.get(id).await
    }

    async fn update(&self, id: &str, patch: &ProductPatch) -> CatalogResult<Option<Product>> {
        let merged = self.backing.update(id, patch).await?;
        if merged.is_some() {
            self.invalidate(id).await?;
        }
        Ok(merged)
    }

    async fn delete(&self, id: &str) -> CatalogResult<Option<Product>> {
        let removed = self.backing.delete(id).await?;
        if removed.is_some() {
            self.invalidate(id).await?;
        }
        Ok(removed)
    }

    async fn scan(&self) -> CatalogResult<Vec<Product>> {
        self.backing.scan().await
    }
}
