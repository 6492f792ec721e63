//! Catalog façade over the two access paths.
//!
//! [`CatalogFacade`] holds one adapter per path and a shared resolver. The
//! caller picks a path explicitly with [`CatalogFacade::direct`],
//! [`CatalogFacade::accelerated`] or [`CatalogFacade::path`]; the façade
//! never switches paths on its own and never caches anything itself.
//!
//! Every operation crosses the selected adapter exactly once inside a
//! [`LatencyProbe`], so the attached measurement covers only the adapter
//! call. Image URLs are resolved the same way on both paths.

use std::sync::Arc;

use catalog_core::{
    AccessPath, CatalogError, CatalogResult, CreateProductRequest, LatencyUnit, Product,
    ProductPatch,
};
use catalog_storage::ProductStore;
use futures_util::future::join_all;

use crate::probe::{LatencyProbe, Timed};
use crate::resolver::ObjectResolver;
use crate::types::{CreatedProduct, DeleteAck, ProductView};

/// Entry point holding both access paths.
#[derive(Clone)]
pub struct CatalogFacade {
    direct: CatalogPath,
    accelerated: CatalogPath,
}

impl CatalogFacade {
    /// Build a façade from already-constructed adapters.
    ///
    /// `accelerated` must front the same backing store as `direct`, and
    /// `direct` must invalidate the accelerated tier after its writes (see
    /// `catalog_storage::DirectStore`). The façade never writes to both.
    pub fn new(
        direct: Arc<dyn ProductStore>,
        accelerated: Arc<dyn ProductStore>,
        resolver: Arc<dyn ObjectResolver>,
        backing_unit: LatencyUnit,
        accelerated_unit: LatencyUnit,
    ) -> Self {
        Self {
            direct: CatalogPath {
                store: direct,
                resolver: Arc::clone(&resolver),
                probe: LatencyProbe::new(AccessPath::Backing, backing_unit),
            },
            accelerated: CatalogPath {
                store: accelerated,
                resolver,
                probe: LatencyProbe::new(AccessPath::Accelerated, accelerated_unit),
            },
        }
    }

    /// Calls straight to the backing store, bypassing the tier.
    pub fn direct(&self) -> &CatalogPath {
        &self.direct
    }

    /// Calls through the acceleration tier.
    pub fn accelerated(&self) -> &CatalogPath {
        &self.accelerated
    }

    pub fn path(&self, path: AccessPath) -> &CatalogPath {
        match path {
            AccessPath::Backing => &self.direct,
            AccessPath::Accelerated => &self.accelerated,
        }
    }
}

/// Operations bound to one access path.
#[derive(Clone)]
pub struct CatalogPath {
    store: Arc<dyn ProductStore>,
    resolver: Arc<dyn ObjectResolver>,
    probe: LatencyProbe,
}

impl CatalogPath {
    pub fn access_path(&self) -> AccessPath {
        self.probe.path()
    }

    pub fn unit(&self) -> LatencyUnit {
        self.probe.unit()
    }

    /// Create (or overwrite) a product.
    ///
    /// The image, if any, is stored before the adapter write and its key is
    /// derived from the product id. When the adapter write fails the blob is
    /// removed again so it is not orphaned.
    pub async fn create(
        &self,
        request: CreateProductRequest,
    ) -> CatalogResult<Timed<CreatedProduct>> {
        request.validate()?;

        let image_key = match &request.image {
            Some(image) => {
                let extension = image.extension();
                self.resolver
                    .store(&image.bytes, &request.id, extension.as_deref())
                    .await?
            }
            None => String::new(),
        };

        let product = request.to_product(image_key);
        let written = self.probe.measure("put", self.store.put(&product)).await;

        let timed = match written {
            Ok(timed) => timed,
            Err(e) => {
                if let Some(key) = product.image_key() {
                    if let Err(cleanup) = self.resolver.remove(key).await {
                        tracing::warn!(
                            id = %product.id,
                            key,
                            error = %cleanup,
                            "failed to remove image after rejected write"
                        );
                    }
                }
                return Err(e);
            }
        };

        let image_url = self.image_url(&product).await;
        tracing::info!(id = %product.id, path = %self.access_path(), "product created");

        Ok(timed.map(|()| CreatedProduct {
            id: product.id.clone(),
            image_url,
            message: "Product created successfully".to_string(),
        }))
    }

    /// Fetch one product. A missing id is `Ok(None)`.
    pub async fn get(&self, id: &str) -> CatalogResult<Option<ProductView>> {
        let (found, latency) = self.probe.measure("get", self.store.get(id)).await?.into_parts();
        match found {
            Some(product) => {
                let image_url = self.image_url(&product).await;
                Ok(Some(ProductView::new(product, image_url, &latency)))
            }
            None => Ok(None),
        }
    }

    /// Every product, each carrying the measurement of the single scan.
    pub async fn list(&self) -> CatalogResult<Vec<ProductView>> {
        let (products, latency) = self.probe.measure("scan", self.store.scan()).await?.into_parts();

        let views = products.into_iter().map(|product| {
            let latency = &latency;
            async move {
                let image_url = self.image_url(&product).await;
                ProductView::new(product, image_url, latency)
            }
        });
        Ok(join_all(views).await)
    }

    /// Merge the named fields into an existing product.
    pub async fn update(&self, id: &str, patch: ProductPatch) -> CatalogResult<ProductView> {
        patch.validate()?;

        let (merged, latency) = self
            .probe
            .measure("update", self.store.update(id, &patch))
            .await?
            .into_parts();

        let product = merged.ok_or_else(|| CatalogError::NotFound { id: id.to_string() })?;
        let image_url = self.image_url(&product).await;
        Ok(ProductView::new(product, image_url, &latency))
    }

    /// Remove a product and its image. Deleting an absent id succeeds with
    /// `deleted: false`.
    ///
    /// Once the product is gone the delete is acknowledged even if the blob
    /// could not be removed; the failure is logged with the key.
    pub async fn delete(&self, id: &str) -> CatalogResult<Timed<DeleteAck>> {
        let timed = self.probe.measure("delete", self.store.delete(id)).await?;

        if let Some(key) = timed.value.as_ref().and_then(Product::image_key) {
            if let Err(e) = self.resolver.remove(key).await {
                tracing::warn!(id, key, error = %e, "image removal failed, blob orphaned");
            }
        }

        Ok(timed.map(|removed| DeleteAck {
            deleted: removed.is_some(),
        }))
    }

    /// Resolve a product's image. Failures degrade to an empty URL.
    async fn image_url(&self, product: &Product) -> String {
        let Some(key) = product.image_key() else {
            return String::new();
        };
        match self.resolver.resolve(key).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                tracing::debug!(id = %product.id, key, "image key has no blob");
                String::new()
            }
            Err(e) => {
                tracing::warn!(id = %product.id, key, error = %e, "image resolution failed");
                String::new()
            }
        }
    }
}
