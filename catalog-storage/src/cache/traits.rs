//! Acceleration tier traits and statistics.

use async_trait::async_trait;
use catalog_core::{CatalogResult, Product};
use chrono::{DateTime, Utc};

/// A product held by the tier, with the time it was cached.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedProduct {
    pub product: Product,
    pub cached_at: DateTime<Utc>,
}

/// Cache backend trait for the acceleration tier.
///
/// Implementations must be safe for concurrent access. Every key carries a
/// generation that changes on `replace`, `invalidate`, `supersede` and
/// `clear`, and never returns to a value it held before. Callers
/// capture the generation before touching the backing store and hand it back
/// afterwards; if any mutation happened in between, the value is refused.
/// That is how a slow fill or a losing concurrent writer is kept from
/// leaving an older value in the tier.
///
/// Eviction and expiry are the backend's business; the only requirement is
/// that an expired entry reads as a miss.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a cached product. Misses and expired entries return `None`.
    async fn get(&self, id: &str) -> CatalogResult<Option<CachedProduct>>;

    /// Read-through fill: store a product only if the key's generation is
    /// still `generation`. Does not bump the generation.
    ///
    /// Returns whether the value landed.
    async fn fill(&self, product: &Product, generation: u64) -> CatalogResult<bool>;

    /// Write-through replace: if the key's generation is still `generation`,
    /// store the product and bump the generation. Otherwise another mutation
    /// raced this one, so the key is invalidated instead.
    ///
    /// Returns whether the value landed.
    async fn replace(&self, product: &Product, generation: u64) -> CatalogResult<bool>;

    /// Current generation for a key.
    async fn generation(&self, id: &str) -> CatalogResult<u64>;

    /// Drop a key and bump its generation. Returns the new generation.
    async fn invalidate(&self, id: &str) -> CatalogResult<u64>;

    /// Drop a key and bump its generation, like `invalidate`. Returns the new
    /// generation only if the key was still at `observed`, meaning the
    /// caller's write is the latest one and may be used to warm the key.
    async fn supersede(&self, id: &str, observed: u64) -> CatalogResult<Option<u64>>;

    /// Drop every entry.
    async fn clear(&self) -> CatalogResult<u64>;

    /// Get cache statistics.
    async fn stats(&self) -> CatalogResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (including expired entries).
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Number of evictions due to capacity.
    pub evictions: u64,
    /// Number of fills rejected because the key changed underneath them.
    pub stale_fills_rejected: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}
