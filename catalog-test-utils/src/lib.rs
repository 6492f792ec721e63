//! Catalog Test Utilities
//!
//! Centralized test infrastructure for the catalog workspace:
//! - Proptest generators for products, requests and patches
//! - Fakes for the resolver and a store that always fails
//! - Fixtures wiring a façade over in-memory adapters
//! - Custom assertions for catalog results

// Re-export the in-memory store from its source crate
pub use catalog_storage::InMemoryProductStore;

// Re-export core types for convenience
pub use catalog_core::{
    AccessPath, CatalogError, CatalogResult, CreateProductRequest, ImageUpload, LatencyUnit,
    Product, ProductPatch, ResolverError, StorageError, ValidationError,
};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use catalog_api::ObjectResolver;
use catalog_storage::ProductStore;
use dashmap::{DashMap, DashSet};

// ============================================================================
// FAKES
// ============================================================================

/// In-memory resolver that records every call.
///
/// Keys are `products/<hint>-<n>`; URLs are `memory://blobs/<key>`. Resolve
/// failures can be injected per key and store failures globally.
#[derive(Debug, Default)]
pub struct RecordingResolver {
    blobs: DashMap<String, Vec<u8>>,
    failing_keys: DashSet<String>,
    fail_stores: AtomicBool,
    fail_removes: AtomicBool,
    next_key: AtomicUsize,
    store_calls: AtomicUsize,
    resolve_calls: AtomicUsize,
    remove_calls: AtomicUsize,
}

impl RecordingResolver {
    pub const URL_PREFIX: &'static str = "memory://blobs";

    pub fn new() -> Self {
        Self::default()
    }

    /// Make `resolve` fail for this key.
    pub fn fail_resolve_for(&self, key: impl Into<String>) {
        self.failing_keys.insert(key.into());
    }

    /// Make every subsequent `store` fail.
    pub fn fail_stores(&self) {
        self.fail_stores.store(true, Ordering::SeqCst);
    }

    /// Make every subsequent `remove` fail.
    pub fn fail_removes(&self) {
        self.fail_removes.store(true, Ordering::SeqCst);
    }

    pub fn url_for(key: &str) -> String {
        format!("{}/{}", Self::URL_PREFIX, key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    pub fn store_calls(&self) -> usize {
        self.store_calls.load(Ordering::SeqCst)
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectResolver for RecordingResolver {
    async fn store(
        &self,
        bytes: &[u8],
        key_hint: &str,
        extension: Option<&str>,
    ) -> Result<String, ResolverError> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_stores.load(Ordering::SeqCst) {
            return Err(ResolverError::Store {
                key_hint: key_hint.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        let n = self.next_key.fetch_add(1, Ordering::SeqCst);
        let mut key = format!("products/{}-{}", key_hint, n);
        if let Some(ext) = extension {
            key.push('.');
            key.push_str(ext);
        }
        self.blobs.insert(key.clone(), bytes.to_vec());
        Ok(key)
    }

    async fn resolve(&self, key: &str) -> Result<Option<String>, ResolverError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_keys.contains(key) {
            return Err(ResolverError::Resolve {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(self.blobs.contains_key(key).then(|| Self::url_for(key)))
    }

    async fn remove(&self, key: &str) -> Result<(), ResolverError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(ResolverError::Remove {
                key: key.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        self.blobs.remove(key);
        Ok(())
    }
}

/// Store whose every operation fails with a backend error.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

impl FailingStore {
    fn failure(operation: &str) -> CatalogError {
        StorageError::backend(operation, "injected failure").into()
    }
}

#[async_trait]
impl ProductStore for FailingStore {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn put(&self, _product: &Product) -> CatalogResult<()> {
        Err(Self::failure("put"))
    }

    async fn get(&self, _id: &str) -> CatalogResult<Option<Product>> {
        Err(Self::failure("get"))
    }

    async fn update(&self, _id: &str, _patch: &ProductPatch) -> CatalogResult<Option<Product>> {
        Err(Self::failure("update"))
    }

    async fn delete(&self, _id: &str) -> CatalogResult<Option<Product>> {
        Err(Self::failure("delete"))
    }

    async fn scan(&self) -> CatalogResult<Vec<Product>> {
        Err(Self::failure("scan"))
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for catalog types.

    use super::*;
    use proptest::collection::hash_set;
    use proptest::prelude::*;
    use std::collections::HashSet;

    /// Generate a product id.
    pub fn arb_product_id() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,15}"
    }

    /// Generate a non-blank product name.
    pub fn arb_product_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{2,12}( [A-Z][a-z]{2,8})?"
    }

    /// Generate a price with at most two decimals.
    pub fn arb_price() -> impl Strategy<Value = f64> {
        (0u32..1_000_000).prop_map(|cents| cents as f64 / 100.0)
    }

    /// Generate a non-negative stock count.
    pub fn arb_remaining_sku() -> impl Strategy<Value = i64> {
        0i64..100_000
    }

    /// Generate a valid creation request without an image.
    pub fn arb_create_request() -> impl Strategy<Value = CreateProductRequest> {
        (
            arb_product_id(),
            arb_product_name(),
            proptest::option::of("[a-z ]{0,40}"),
            proptest::option::of(arb_price()),
            proptest::option::of(arb_remaining_sku()),
        )
            .prop_map(|(id, name, description, price, remaining_sku)| {
                let mut request = CreateProductRequest::new(id, name);
                request.description = description;
                request.price = price;
                request.remaining_sku = remaining_sku;
                request
            })
    }

    /// Generate a valid patch that names at least one field.
    pub fn arb_product_patch() -> impl Strategy<Value = ProductPatch> {
        (
            proptest::option::of(arb_product_name()),
            proptest::option::of("[a-z ]{0,40}"),
            proptest::option::of(arb_price()),
            proptest::option::of(arb_remaining_sku()),
        )
            .prop_map(|(product_name, description, price, remaining_sku)| ProductPatch {
                product_name,
                description,
                price,
                remaining_sku,
            })
            .prop_filter("patch must name a field", |patch| !patch.is_empty())
    }

    /// Generate a set of distinct product ids.
    pub fn arb_distinct_ids(max: usize) -> impl Strategy<Value = HashSet<String>> {
        hash_set(arb_product_id(), 0..=max)
    }

    /// Generate either access path.
    pub fn arb_access_path() -> impl Strategy<Value = AccessPath> {
        prop_oneof![Just(AccessPath::Backing), Just(AccessPath::Accelerated)]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;
    use catalog_api::CatalogFacade;
    use catalog_storage::{
        AcceleratedStore, CacheConfig, DirectStore, InMemoryCacheBackend, WriteMode,
    };
    use std::sync::Arc;
    use std::time::Duration;

    /// A façade over in-memory adapters, with handles to every part.
    pub struct TestCatalog {
        pub facade: CatalogFacade,
        pub backing: Arc<InMemoryProductStore>,
        pub tier: Arc<InMemoryCacheBackend>,
        pub resolver: Arc<RecordingResolver>,
    }

    /// Test catalog with write-through tier updates.
    pub fn test_catalog() -> TestCatalog {
        test_catalog_with_mode(WriteMode::WriteThrough)
    }

    pub fn test_catalog_with_mode(mode: WriteMode) -> TestCatalog {
        let backing = Arc::new(InMemoryProductStore::new());
        let tier = Arc::new(InMemoryCacheBackend::new(Duration::from_secs(60), 1_000));
        let resolver = Arc::new(RecordingResolver::new());

        let accelerated = AcceleratedStore::new(
            backing.clone() as Arc<dyn ProductStore>,
            Arc::clone(&tier),
            CacheConfig::new().with_write_mode(mode),
        );

        let direct = DirectStore::new(backing.clone() as Arc<dyn ProductStore>, Arc::clone(&tier));

        let facade = CatalogFacade::new(
            Arc::new(direct) as Arc<dyn ProductStore>,
            Arc::new(accelerated) as Arc<dyn ProductStore>,
            resolver.clone() as Arc<dyn ObjectResolver>,
            LatencyUnit::Milliseconds,
            LatencyUnit::Microseconds,
        );

        TestCatalog {
            facade,
            backing,
            tier,
            resolver,
        }
    }

    /// The canonical widget: id p1, price 9.99, three in stock.
    pub fn widget_request() -> CreateProductRequest {
        CreateProductRequest::new("p1", "Widget")
            .with_price(9.99)
            .with_remaining_sku(3)
    }

    /// A request carrying a small PNG upload.
    pub fn request_with_image(id: &str) -> CreateProductRequest {
        CreateProductRequest::new(id, "Pictured")
            .with_description("Has an image")
            .with_price(4.5)
            .with_image(
                ImageUpload::new(vec![0x89, b'P', b'N', b'G'])
                    .with_file_name("photo.png")
                    .with_content_type("image/png"),
            )
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion helpers for catalog results.

    use super::*;
    use catalog_api::ProductView;

    /// Assert two views describe the same product, ignoring latency, path
    /// and image URL.
    #[track_caller]
    pub fn assert_same_product(left: &ProductView, right: &ProductView) {
        assert_eq!(left.product, right.product, "paths disagree on product fields");
    }

    /// Assert a latency field is sane for the expected unit.
    #[track_caller]
    pub fn assert_latency(view: &ProductView, unit: LatencyUnit) {
        assert!(view.response_time >= 0.0, "negative latency: {}", view.response_time);
        assert!(view.response_time.is_finite(), "non-finite latency");
        assert_eq!(view.response_time_unit, unit);
    }

    /// Assert that a CatalogResult is a NotFound error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &CatalogResult<T>) {
        match result {
            Err(CatalogError::NotFound { .. }) => {}
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }

    /// Assert that a CatalogResult is a Validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &CatalogResult<T>) {
        match result {
            Err(CatalogError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that a CatalogResult is a Storage error.
    #[track_caller]
    pub fn assert_storage_error<T: std::fmt::Debug>(result: &CatalogResult<T>) {
        match result {
            Err(CatalogError::Storage(_)) => {}
            other => panic!("Expected Storage error, got: {:?}", other),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
