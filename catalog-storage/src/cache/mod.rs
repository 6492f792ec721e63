//! Acceleration tier in front of a backing product store.
//!
//! The tier is a bounded, TTL-limited in-memory map. [`AcceleratedStore`]
//! wraps any [`ProductStore`](crate::ProductStore) with it and keeps the
//! read-your-writes guarantee: a read that follows an acknowledged write
//! never observes the value from before that write.
//!
//! Every key carries a generation counter. Writers and read-through fills
//! capture it before touching the backing store, and the tier refuses the
//! value if the key moved on in the meantime. [`DirectStore`] is the path
//! that bypasses the tier; it still invalidates the key after each
//! acknowledged mutation so both paths read the same product.
//!
//! # Example
//!
//! ```ignore
//! let tier = Arc::new(InMemoryCacheBackend::new(Duration::from_secs(300), 10_000));
//! let store = AcceleratedStore::new(backing, tier, CacheConfig::default());
//!
//! store.put(&product).await?;
//! let hit = store.get(&product.id).await?;
//! ```

pub mod accelerated;
pub mod direct;
pub mod memory_backend;
pub mod traits;

pub use accelerated::{AcceleratedStore, CacheConfig, WriteMode};
pub use direct::DirectStore;
pub use memory_backend::InMemoryCacheBackend;
pub use traits::{CacheBackend, CacheStats, CachedProduct};
