//! In-memory acceleration tier on a sharded concurrent map.
//!
//! Entries expire after a fixed TTL and the oldest entry is evicted once the
//! tier holds more than `max_entries` products. Both policies are deliberately
//! simple; callers only rely on expired or evicted keys reading as misses.
//!
//! Generations come from one clock per tier, so every bump yields a value no
//! key has held before. Slots without an entry are pruned once they outnumber
//! the capacity; a pruned key reads back at the `floor`, the highest
//! generation any pruned slot carried. A fill captured before the prune can
//! then only land if nothing was pruned after it.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use catalog_core::{CatalogResult, Product};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::traits::{CacheBackend, CacheStats, CachedProduct};

#[derive(Debug)]
struct Slot {
    generation: u64,
    entry: Option<CachedProduct>,
}

/// DashMap-backed cache tier.
///
/// Per-key atomicity comes from DashMap's shard locks. The live-entry count
/// is only adjusted while the key's shard lock is held.
#[derive(Debug)]
pub struct InMemoryCacheBackend {
    slots: DashMap<String, Slot>,
    entry_ttl: Duration,
    max_entries: usize,
    clock: AtomicU64,
    floor: AtomicU64,
    live: AtomicUsize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    stale_fills_rejected: AtomicU64,
}

impl InMemoryCacheBackend {
    pub fn new(entry_ttl: Duration, max_entries: usize) -> Self {
        Self {
            slots: DashMap::new(),
            entry_ttl,
            max_entries: max_entries.max(1),
            clock: AtomicU64::new(0),
            floor: AtomicU64::new(0),
            live: AtomicUsize::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            stale_fills_rejected: AtomicU64::new(0),
        }
    }

    pub fn entry_ttl(&self) -> Duration {
        self.entry_ttl
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Number of keys with bookkeeping, cached or not.
    pub fn tracked_keys(&self) -> usize {
        self.slots.len()
    }

    fn is_expired(&self, cached: &CachedProduct) -> bool {
        let age = Utc::now()
            .signed_duration_since(cached.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        age > self.entry_ttl
    }

    fn cached(product: &Product) -> CachedProduct {
        CachedProduct {
            product: product.clone(),
            cached_at: Utc::now(),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Bump a slot's generation and drop its entry. Caller holds the guard.
    fn retire(&self, slot: &mut Slot) -> u64 {
        slot.generation = self.tick();
        if slot.entry.take().is_some() {
            self.live.fetch_sub(1, Ordering::AcqRel);
        }
        slot.generation
    }

    /// Drop an expired entry, if it is still the expired one.
    fn expire(&self, id: &str) {
        if let Some(mut slot) = self.slots.get_mut(id) {
            let expired = slot
                .entry
                .as_ref()
                .map(|cached| self.is_expired(cached))
                .unwrap_or(false);
            if expired {
                slot.entry = None;
                self.live.fetch_sub(1, Ordering::AcqRel);
            }
        }
        self.prune_if_needed();
    }

    fn evict_if_needed(&self) {
        while self.live.load(Ordering::Acquire) > self.max_entries {
            let oldest = self
                .slots
                .iter()
                .filter_map(|slot| {
                    slot.entry
                        .as_ref()
                        .map(|cached| (slot.key().clone(), cached.cached_at))
                })
                .min_by_key(|(_, cached_at)| *cached_at);

            let Some((key, _)) = oldest else {
                break;
            };

            if let Some(mut slot) = self.slots.get_mut(&key) {
                if slot.entry.take().is_some() {
                    self.live.fetch_sub(1, Ordering::AcqRel);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(id = %key, "evicted from acceleration tier");
                }
            }
        }
        self.prune_if_needed();
    }

    /// Forget entry-less slots once they outnumber the capacity.
    fn prune_if_needed(&self) {
        if self.slots.len() <= self.max_entries.saturating_mul(2) {
            return;
        }
        self.slots.retain(|_, slot| {
            if slot.entry.is_some() {
                return true;
            }
            self.floor.fetch_max(slot.generation, Ordering::AcqRel);
            false
        });
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn get(&self, id: &str) -> CatalogResult<Option<CachedProduct>> {
        let (found, expired) = match self.slots.get(id) {
            Some(slot) => match &slot.entry {
                Some(cached) if self.is_expired(cached) => (None, true),
                Some(cached) => (Some(cached.clone()), false),
                None => (None, false),
            },
            None => (None, false),
        };

        if expired {
            self.expire(id);
        }

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(found)
    }

    async fn replace(&self, product: &Product, generation: u64) -> CatalogResult<bool> {
        let landed = {
            let mut slot = match self.slots.entry(product.id.clone()) {
                Entry::Occupied(occupied) => occupied.into_ref(),
                Entry::Vacant(vacant) => vacant.insert(Slot {
                    generation: self.floor.load(Ordering::Acquire),
                    entry: None,
                }),
            };
            if slot.generation == generation {
                slot.generation = self.tick();
                if slot.entry.replace(Self::cached(product)).is_none() {
                    self.live.fetch_add(1, Ordering::AcqRel);
                }
                true
            } else {
                self.retire(&mut slot);
                false
            }
        };

        if landed {
            self.evict_if_needed();
        } else {
            self.stale_fills_rejected.fetch_add(1, Ordering::Relaxed);
            self.prune_if_needed();
        }
        Ok(landed)
    }

    async fn fill(&self, product: &Product, generation: u64) -> CatalogResult<bool> {
        let landed = match self.slots.entry(product.id.clone()) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                if slot.generation == generation {
                    if slot.entry.replace(Self::cached(product)).is_none() {
                        self.live.fetch_add(1, Ordering::AcqRel);
                    }
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                if self.floor.load(Ordering::Acquire) == generation {
                    vacant.insert(Slot {
                        generation,
                        entry: Some(Self::cached(product)),
                    });
                    self.live.fetch_add(1, Ordering::AcqRel);
                    true
                } else {
                    false
                }
            }
        };

        if landed {
            self.evict_if_needed();
        } else {
            self.stale_fills_rejected.fetch_add(1, Ordering::Relaxed);
        }
        Ok(landed)
    }

    async fn generation(&self, id: &str) -> CatalogResult<u64> {
        // Read the floor under the shard lock so a concurrent prune of this
        // key is either fully before or fully after.
        Ok(match self.slots.entry(id.to_string()) {
            Entry::Occupied(occupied) => occupied.get().generation,
            Entry::Vacant(_) => self.floor.load(Ordering::Acquire),
        })
    }

    async fn invalidate(&self, id: &str) -> CatalogResult<u64> {
        let generation = {
            let mut slot = self.slots.entry(id.to_string()).or_insert_with(|| Slot {
                generation: 0,
                entry: None,
            });
            self.retire(&mut slot)
        };
        self.prune_if_needed();
        Ok(generation)
    }

    async fn supersede(&self, id: &str, observed: u64) -> CatalogResult<Option<u64>> {
        let (unchanged, generation) = {
            let mut slot = match self.slots.entry(id.to_string()) {
                Entry::Occupied(occupied) => occupied.into_ref(),
                Entry::Vacant(vacant) => vacant.insert(Slot {
                    generation: self.floor.load(Ordering::Acquire),
                    entry: None,
                }),
            };
            let unchanged = slot.generation == observed;
            (unchanged, self.retire(&mut slot))
        };
        self.prune_if_needed();
        Ok(unchanged.then_some(generation))
    }

    async fn clear(&self) -> CatalogResult<u64> {
        // Every generation handed out so far is stale from here on.
        self.floor.fetch_max(self.tick(), Ordering::AcqRel);
        let mut cleared = 0u64;
        self.slots.retain(|_, slot| {
            if slot.entry.take().is_some() {
                self.live.fetch_sub(1, Ordering::AcqRel);
                cleared += 1;
            }
            false
        });
        Ok(cleared)
    }

    async fn stats(&self) -> CatalogResult<CacheStats> {
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.live.load(Ordering::Acquire) as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
            stale_fills_rejected: self.stale_fills_rejected.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> InMemoryCacheBackend {
        InMemoryCacheBackend::new(Duration::from_secs(60), 100)
    }

    async fn write(tier: &InMemoryCacheBackend, product: Product) {
        let generation = tier.generation(&product.id).await.unwrap();
        assert!(tier.replace(&product, generation).await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_and_get() {
        let tier = backend();
        let product = Product::new("p1", "Widget");
        write(&tier, product.clone()).await;

        let cached = tier.get("p1").await.unwrap().expect("cached");
        assert_eq!(cached.product, product);

        let stats = tier.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test]
    async fn test_miss_is_counted() {
        let tier = backend();
        assert!(tier.get("nope").await.unwrap().is_none());
        assert_eq!(tier.stats().await.unwrap().misses, 1);
    }

    #[tokio::test]
    async fn test_fill_rejected_after_invalidate() {
        let tier = backend();
        let generation = tier.generation("p1").await.unwrap();
        assert_eq!(generation, 0);

        tier.invalidate("p1").await.unwrap();
        let landed = tier
            .fill(&Product::new("p1", "Old"), generation)
            .await
            .unwrap();

        assert!(!landed);
        assert!(tier.get("p1").await.unwrap().is_none());
        assert_eq!(tier.stats().await.unwrap().stale_fills_rejected, 1);
    }

    #[tokio::test]
    async fn test_fill_lands_when_generation_current() {
        let tier = backend();
        let generation = tier.generation("p1").await.unwrap();
        assert!(tier
            .fill(&Product::new("p1", "Widget"), generation)
            .await
            .unwrap());
        assert!(tier.get("p1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_replace_bumps_generation() {
        let tier = backend();
        let before = tier.generation("p1").await.unwrap();
        write(&tier, Product::new("p1", "Widget")).await;
        assert!(tier.generation("p1").await.unwrap() > before);
    }

    #[tokio::test]
    async fn test_losing_writer_invalidates() {
        let tier = backend();
        // Two writers both observed generation 0.
        let observed = tier.generation("p1").await.unwrap();

        assert!(tier
            .replace(&Product::new("p1", "Second"), observed)
            .await
            .unwrap());
        assert!(!tier
            .replace(&Product::new("p1", "First"), observed)
            .await
            .unwrap());

        assert!(tier.get("p1").await.unwrap().is_none());
        assert_eq!(tier.stats().await.unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_miss() {
        let tier = InMemoryCacheBackend::new(Duration::from_millis(10), 100);
        write(&tier, Product::new("p1", "Widget")).await;

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(tier.get("p1").await.unwrap().is_none());
        assert_eq!(tier.stats().await.unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let tier = InMemoryCacheBackend::new(Duration::from_secs(60), 2);
        write(&tier, Product::new("a", "A")).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        write(&tier, Product::new("b", "B")).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        write(&tier, Product::new("c", "C")).await;

        let stats = tier.stats().await.unwrap();
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.evictions, 1);
        assert!(tier.get("a").await.unwrap().is_none());
        assert!(tier.get("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_blocks_older_fills() {
        let tier = backend();
        write(&tier, Product::new("p1", "Widget")).await;
        let generation = tier.generation("p1").await.unwrap();

        assert_eq!(tier.clear().await.unwrap(), 1);
        assert!(!tier
            .fill(&Product::new("p1", "Widget"), generation)
            .await
            .unwrap());
        assert_eq!(tier.stats().await.unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn test_untouched_keys_do_not_accumulate() {
        let tier = InMemoryCacheBackend::new(Duration::from_secs(60), 10);
        for i in 0..50_000 {
            tier.invalidate(&format!("k{}", i)).await.unwrap();
        }
        assert!(tier.tracked_keys() <= 2 * tier.max_entries());
        assert_eq!(tier.stats().await.unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn test_pruned_key_still_refuses_stale_fill() {
        let tier = InMemoryCacheBackend::new(Duration::from_secs(60), 2);
        let observed = tier.generation("p1").await.unwrap();
        tier.invalidate("p1").await.unwrap();

        // Push p1's empty slot out.
        for i in 0..10 {
            tier.invalidate(&format!("other-{}", i)).await.unwrap();
        }
        assert!(tier.tracked_keys() <= 4);

        assert!(!tier
            .fill(&Product::new("p1", "Old"), observed)
            .await
            .unwrap());
        assert!(tier.get("p1").await.unwrap().is_none());

        // A fresh read-through after the prune still lands.
        let current = tier.generation("p1").await.unwrap();
        assert!(tier
            .fill(&Product::new("p1", "New"), current)
            .await
            .unwrap());
        assert_eq!(tier.get("p1").await.unwrap().unwrap().product.product_name, "New");
    }

    #[tokio::test]
    async fn test_eviction_keeps_slot_map_bounded() {
        let tier = InMemoryCacheBackend::new(Duration::from_secs(60), 5);
        for i in 0..1_000 {
            write(&tier, Product::new(format!("p{}", i), "Item")).await;
        }
        let stats = tier.stats().await.unwrap();
        assert_eq!(stats.entry_count, 5);
        assert_eq!(stats.evictions, 995);
        assert!(tier.tracked_keys() <= 10);
    }

    #[tokio::test]
    async fn test_supersede_reports_whether_key_moved() {
        let tier = backend();
        let observed = tier.generation("p1").await.unwrap();
        let generation = tier.supersede("p1", observed).await.unwrap();
        assert!(generation.is_some());

        // A second writer that captured the same generation lost the race.
        assert!(tier.supersede("p1", observed).await.unwrap().is_none());
        let current = tier.generation("p1").await.unwrap();
        assert_ne!(Some(current), generation);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_live_count_matches_entries_under_contention() {
        let tier = std::sync::Arc::new(InMemoryCacheBackend::new(Duration::from_secs(60), 8));

        let mut handles = Vec::new();
        for worker in 0..8u64 {
            let tier = std::sync::Arc::clone(&tier);
            handles.push(tokio::spawn(async move {
                for i in 0..500u64 {
                    let id = format!("k{}", (worker * 7 + i) % 12);
                    let generation = tier.generation(&id).await.unwrap();
                    match i % 3 {
                        0 => {
                            tier.replace(&Product::new(id.clone(), "Item"), generation)
                                .await
                                .unwrap();
                        }
                        1 => {
                            tier.fill(&Product::new(id.clone(), "Item"), generation)
                                .await
                                .unwrap();
                        }
                        _ => {
                            tier.invalidate(&id).await.unwrap();
                        }
                    }
                    let stats = tier.stats().await.unwrap();
                    assert!(stats.entry_count <= 12, "entry_count wrapped: {}", stats.entry_count);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let cached = tier
            .slots
            .iter()
            .filter(|slot| slot.entry.is_some())
            .count() as u64;
        let stats = tier.stats().await.unwrap();
        assert_eq!(stats.entry_count, cached);
        assert!(stats.entry_count <= tier.max_entries() as u64);
    }
}
