//! Cache-accelerated adapter with write-through and read-through.
//!
//! [`AcceleratedStore`] implements the same [`ProductStore`] contract as the
//! backing store it fronts. Mutations always land in the backing store first;
//! the tier only changes after the backing store has acknowledged. Reads are
//! served from the tier when possible and filled from the backing store on a
//! miss.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use catalog_core::{CatalogResult, ConfigError, Product, ProductPatch};

use super::traits::CacheBackend;
use crate::store::ProductStore;

/// When the tier is brought up to date after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Backing write, then tier update, then acknowledge.
    #[default]
    WriteThrough,
    /// Backing write, invalidate the tier entry, acknowledge, then warm the
    /// tier in the background. Reads in between fall through to the backing
    /// store, so they are never stale.
    WarmAfterAck,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WriteThrough => "write-through",
            Self::WarmAfterAck => "warm-after-ack",
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "write-through" | "write_through" | "sync" => Ok(Self::WriteThrough),
            "warm-after-ack" | "warm_after_ack" | "async" => Ok(Self::WarmAfterAck),
            other => Err(ConfigError::InvalidValue {
                field: "write_mode".to_string(),
                value: other.to_string(),
                reason: "expected write-through or warm-after-ack".to_string(),
            }),
        }
    }
}

/// Configuration for the acceleration tier.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub entry_ttl: Duration,
    /// Maximum number of products held by the tier.
    pub max_entries: usize,
    /// When the tier is updated after a mutation.
    pub write_mode: WriteMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entry_ttl: Duration::from_secs(300),
            max_entries: 10_000,
            write_mode: WriteMode::WriteThrough,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }

    /// Set the max entries.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Set the write mode.
    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }
}

/// Cache-accelerated product store.
///
/// # Type Parameters
///
/// - `C`: The cache backend holding the tier
///
/// # Example
///
/// ```ignore
/// let backing: Arc<dyn ProductStore> = Arc::new(LmdbProductStore::open(dir, 64)?);
/// let tier = Arc::new(InMemoryCacheBackend::new(ttl, 10_000));
/// let accelerated = AcceleratedStore::new(backing, tier, CacheConfig::default());
///
/// accelerated.put(&product).await?;           // lands in LMDB, then the tier
/// let hit = accelerated.get(&product.id).await?; // served from the tier
/// ```
pub struct AcceleratedStore<C>
where
    C: CacheBackend + 'static,
{
    backing: Arc<dyn ProductStore>,
    tier: Arc<C>,
    config: CacheConfig,
}

impl<C> AcceleratedStore<C>
where
    C: CacheBackend + 'static,
{
    pub fn new(backing: Arc<dyn ProductStore>, tier: Arc<C>, config: CacheConfig) -> Self {
        Self {
            backing,
            tier,
            config,
        }
    }

    /// Create an accelerated store with default configuration.
    pub fn with_defaults(backing: Arc<dyn ProductStore>, tier: Arc<C>) -> Self {
        Self::new(backing, tier, CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a reference to the cache backend.
    pub fn tier(&self) -> &C {
        &self.tier
    }

    /// Get a reference to the backing store.
    pub fn backing(&self) -> &dyn ProductStore {
        self.backing.as_ref()
    }

    /// Bring the tier up to date after a successful backing write.
    ///
    /// `observed` is the key's generation captured before the backing write.
    /// If anything touched the key since, this write may not be the latest
    /// one, so the tier is only invalidated.
    async fn after_write(&self, product: &Product, observed: u64) -> CatalogResult<()> {
        match self.config.write_mode {
            WriteMode::WriteThrough => {
                let landed = self.tier.replace(product, observed).await?;
                if !landed {
                    tracing::debug!(id = %product.id, "concurrent write, tier entry invalidated");
                }
                Ok(())
            }
            WriteMode::WarmAfterAck => {
                let Some(generation) = self.tier.supersede(&product.id, observed).await? else {
                    tracing::debug!(id = %product.id, "concurrent write, warm skipped");
                    return Ok(());
                };
                let tier = Arc::clone(&self.tier);
                let product = product.clone();
                tokio::spawn(async move {
                    match tier.fill(&product, generation).await {
                        Ok(true) => tracing::debug!(id = %product.id, "tier warmed"),
                        Ok(false) => {
                            tracing::debug!(id = %product.id, "warm skipped, key changed")
                        }
                        Err(e) => tracing::warn!(id = %product.id, error = %e, "tier warm failed"),
                    }
                });
                Ok(())
            }
        }
    }

    /// Invalidate after a failed backing write so no partial state is served.
    async fn after_failed_write(&self, id: &str) {
        if let Err(e) = self.tier.invalidate(id).await {
            tracing::warn!(id, error = %e, "tier invalidation after failed write also failed");
        }
    }
}

#[async_trait]
impl<C> ProductStore for AcceleratedStore<C>
where
    C: CacheBackend + 'static,
{
    fn name(&self) -> &'static str {
        "accelerated"
    }

    async fn put(&self, product: &Product) -> CatalogResult<()> {
        let observed = self.tier.generation(&product.id).await?;
        if let Err(e) = self.backing.put(product).await {
            self.after_failed_write(&product.id).await;
            return Err(e);
        }
        self.after_write(product, observed).await
    }

    async fn get(&self, id: &str) -> CatalogResult<Option<Product>> {
        if let Some(cached) = self.tier.get(id).await? {
            tracing::trace!(id, "tier hit");
            return Ok(Some(cached.product));
        }

        // Capture the generation before reading so a concurrent write wins.
        let generation = self.tier.generation(id).await?;
        let fetched = self.backing.get(id).await?;
        if let Some(product) = &fetched {
            let landed = self.tier.fill(product, generation).await?;
            tracing::trace!(id, landed, "tier miss, filled from backing store");
        }
        Ok(fetched)
    }

    async fn update(&self, id: &str, patch: &ProductPatch) -> CatalogResult<Option<Product>> {
        let observed = self.tier.generation(id).await?;
        match self.backing.update(id, patch).await {
            Ok(Some(merged)) => {
                self.after_write(&merged, observed).await?;
                Ok(Some(merged))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.after_failed_write(id).await;
                Err(e)
            }
        }
    }

    async fn delete(&self, id: &str) -> CatalogResult<Option<Product>> {
        let removed = match self.backing.delete(id).await {
            Ok(removed) => removed,
            Err(e) => {
                self.after_failed_write(id).await;
                return Err(e);
            }
        };
        self.tier.invalidate(id).await?;
        Ok(removed)
    }

    /// Scans always go to the backing store and do not warm the tier: a
    /// scan cannot capture per-key generations up front, so a fill from it
    /// could land an older value over a concurrent write.
    async fn scan(&self) -> CatalogResult<Vec<Product>> {
        self.backing.scan().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory_backend::InMemoryCacheBackend;
    use crate::InMemoryProductStore;
    use catalog_core::{CatalogError, StorageError};

    fn widget() -> Product {
        Product::new("p1", "Widget")
            .with_price(9.99)
            .with_remaining_sku(3)
    }

    fn accelerated(
        mode: WriteMode,
    ) -> (
        AcceleratedStore<InMemoryCacheBackend>,
        Arc<InMemoryProductStore>,
        Arc<InMemoryCacheBackend>,
    ) {
        let backing = Arc::new(InMemoryProductStore::new());
        let tier = Arc::new(InMemoryCacheBackend::new(Duration::from_secs(60), 1000));
        let store = AcceleratedStore::new(
            backing.clone() as Arc<dyn ProductStore>,
            Arc::clone(&tier),
            CacheConfig::new().with_write_mode(mode),
        );
        (store, backing, tier)
    }

    /// Backing store that fails every mutation.
    struct BrokenBacking;

    #[async_trait]
    impl ProductStore for BrokenBacking {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn put(&self, _product: &Product) -> CatalogResult<()> {
            Err(StorageError::backend("put", "unavailable").into())
        }
        async fn get(&self, _id: &str) -> CatalogResult<Option<Product>> {
            Ok(None)
        }
        async fn update(&self, _id: &str, _patch: &ProductPatch) -> CatalogResult<Option<Product>> {
            Err(StorageError::backend("update", "unavailable").into())
        }
        async fn delete(&self, _id: &str) -> CatalogResult<Option<Product>> {
            Err(StorageError::backend("delete", "unavailable").into())
        }
        async fn scan(&self) -> CatalogResult<Vec<Product>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_put_writes_through_to_backing() {
        let (store, backing, tier) = accelerated(WriteMode::WriteThrough);
        store.put(&widget()).await.unwrap();

        assert_eq!(backing.get("p1").await.unwrap(), Some(widget()));
        assert!(tier.get("p1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_miss_reads_through_and_populates() {
        let (store, backing, tier) = accelerated(WriteMode::WriteThrough);
        backing.put(&widget()).await.unwrap();

        assert_eq!(store.get("p1").await.unwrap(), Some(widget()));
        assert!(tier.get("p1").await.unwrap().is_some());

        let stats = tier.stats().await.unwrap();
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (store, _backing, tier) = accelerated(WriteMode::WriteThrough);
        assert!(store.get("nope").await.unwrap().is_none());
        assert_eq!(tier.stats().await.unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn test_update_refreshes_tier() {
        let (store, _backing, _tier) = accelerated(WriteMode::WriteThrough);
        store.put(&widget()).await.unwrap();
        // Prime the tier.
        store.get("p1").await.unwrap();

        store
            .update("p1", &ProductPatch::new().price(12.5))
            .await
            .unwrap();

        let fetched = store.get("p1").await.unwrap().unwrap();
        assert_eq!(fetched.price, 12.5);
        assert_eq!(fetched.remaining_sku, 3);
    }

    #[tokio::test]
    async fn test_update_missing_returns_none() {
        let (store, backing, _tier) = accelerated(WriteMode::WriteThrough);
        let result = store
            .update("ghost", &ProductPatch::new().price(1.0))
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(backing.get("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_and_clears_tier() {
        let (store, backing, tier) = accelerated(WriteMode::WriteThrough);
        store.put(&widget()).await.unwrap();

        assert_eq!(store.delete("p1").await.unwrap(), Some(widget()));
        assert_eq!(store.delete("p1").await.unwrap(), None);
        assert!(backing.get("p1").await.unwrap().is_none());
        assert!(tier.get("p1").await.unwrap().is_none());
        assert!(store.get("p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_warm_after_ack_never_serves_stale() {
        let (store, backing, tier) = accelerated(WriteMode::WarmAfterAck);
        store.put(&widget()).await.unwrap();
        store.get("p1").await.unwrap();

        store
            .update("p1", &ProductPatch::new().price(12.5))
            .await
            .unwrap();

        // Whether or not the warm has run, the read sees the new price.
        assert_eq!(store.get("p1").await.unwrap().unwrap().price, 12.5);
        assert_eq!(backing.get("p1").await.unwrap().unwrap().price, 12.5);

        // The background warm eventually lands.
        for _ in 0..50 {
            if tier.get("p1").await.unwrap().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(tier.get("p1").await.unwrap().unwrap().product.price, 12.5);
    }

    #[tokio::test]
    async fn test_failed_backing_write_is_surfaced_and_not_cached() {
        let tier = Arc::new(InMemoryCacheBackend::new(Duration::from_secs(60), 10));
        let store = AcceleratedStore::with_defaults(Arc::new(BrokenBacking), Arc::clone(&tier));

        let err = store.put(&widget()).await.unwrap_err();
        assert!(matches!(err, CatalogError::Storage(StorageError::Backend { .. })));
        assert!(tier.get("p1").await.unwrap().is_none());

        assert!(store.delete("p1").await.is_err());
        assert!(store
            .update("p1", &ProductPatch::new().price(1.0))
            .await
            .is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_leave_tier_consistent() {
        let (store, backing, tier) = accelerated(WriteMode::WriteThrough);
        let store = Arc::new(store);
        store.put(&widget()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .update("p1", &ProductPatch::new().remaining_sku(i as i64))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let durable = backing.get("p1").await.unwrap().unwrap();
        if let Some(cached) = tier.get("p1").await.unwrap() {
            assert_eq!(cached.product, durable);
        }
        assert_eq!(store.get("p1").await.unwrap(), Some(durable));
    }

    #[tokio::test]
    async fn test_scan_passes_through() {
        let (store, backing, tier) = accelerated(WriteMode::WriteThrough);
        for i in 0..5 {
            backing
                .put(&Product::new(format!("p{}", i), "Item"))
                .await
                .unwrap();
        }

        let scanned = store.scan().await.unwrap();
        assert_eq!(scanned.len(), 5);
        assert_eq!(tier.stats().await.unwrap().entry_count, 0);
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::new()
            .with_ttl(Duration::from_secs(1800))
            .with_max_entries(5000)
            .with_write_mode(WriteMode::WarmAfterAck);

        assert_eq!(config.entry_ttl, Duration::from_secs(1800));
        assert_eq!(config.max_entries, 5000);
        assert_eq!(config.write_mode, WriteMode::WarmAfterAck);
    }

    #[test]
    fn test_write_mode_parse() {
        assert_eq!("write-through".parse::<WriteMode>().unwrap(), WriteMode::WriteThrough);
        assert_eq!("ASYNC".parse::<WriteMode>().unwrap(), WriteMode::WarmAfterAck);
        assert!("sometimes".parse::<WriteMode>().is_err());
    }
}
