//! Process-wide catalog state with an explicit init/shutdown lifecycle.

use std::sync::Arc;

use catalog_storage::{
    AcceleratedStore, CacheBackend, CacheStats, DirectStore, InMemoryCacheBackend,
    LmdbProductStore, ProductStore,
};

use crate::config::CatalogConfig;
use crate::error::{ApiError, ApiResult};
use crate::facade::CatalogFacade;
use crate::resolver::{LocalObjectStore, ObjectResolver};

/// The accelerated adapter used in production: the DashMap tier in front
/// of the LMDB store.
pub type ApiAccelerated = AcceleratedStore<InMemoryCacheBackend>;

/// The direct adapter: LMDB, invalidating the same tier after writes.
pub type ApiDirect = DirectStore<InMemoryCacheBackend>;

/// Shared handles for one process.
///
/// One LMDB environment, one tier and one resolver are created here and
/// handed to the façade as trait objects. Clone is cheap.
#[derive(Clone)]
pub struct CatalogState {
    pub config: CatalogConfig,
    pub backing: Arc<LmdbProductStore>,
    pub tier: Arc<InMemoryCacheBackend>,
    pub accelerated: Arc<ApiAccelerated>,
    pub resolver: Arc<LocalObjectStore>,
    pub facade: CatalogFacade,
    pub start_time: std::time::Instant,
}

impl CatalogState {
    /// Open the backing store, build the tier and resolver, wire the façade.
    pub async fn init(config: &CatalogConfig) -> ApiResult<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.blob_dir)
            .await
            .map_err(|source| ApiError::BlobDir {
                path: config.blob_dir.display().to_string(),
                source,
            })?;

        let backing = Arc::new(LmdbProductStore::open(
            &config.data_dir,
            config.lmdb_map_size_mb,
        )?);
        let tier = Arc::new(InMemoryCacheBackend::new(
            config.cache_ttl,
            config.cache_max_entries,
        ));
        let direct: Arc<ApiDirect> = Arc::new(DirectStore::new(
            backing.clone() as Arc<dyn ProductStore>,
            Arc::clone(&tier),
        ));
        let accelerated = Arc::new(AcceleratedStore::new(
            backing.clone() as Arc<dyn ProductStore>,
            Arc::clone(&tier),
            config.cache_config(),
        ));
        let resolver = Arc::new(LocalObjectStore::new(
            &config.blob_dir,
            config.blob_base_url.clone(),
        ));

        let facade = CatalogFacade::new(
            direct as Arc<dyn ProductStore>,
            accelerated.clone() as Arc<dyn ProductStore>,
            resolver.clone() as Arc<dyn ObjectResolver>,
            config.backing_unit,
            config.accelerated_unit,
        );

        tracing::info!(
            data_dir = %config.data_dir.display(),
            blob_dir = %config.blob_dir.display(),
            write_mode = %config.write_mode,
            backing_unit = %config.backing_unit,
            accelerated_unit = %config.accelerated_unit,
            "catalog state initialized"
        );

        Ok(Self {
            config: config.clone(),
            backing,
            tier,
            accelerated,
            resolver,
            facade,
            start_time: std::time::Instant::now(),
        })
    }

    pub fn facade(&self) -> &CatalogFacade {
        &self.facade
    }

    pub async fn tier_stats(&self) -> ApiResult<CacheStats> {
        Ok(self.tier.stats().await?)
    }

    /// Flush the backing store and drop every tier entry.
    pub async fn shutdown(&self) -> ApiResult<()> {
        let cleared = self.tier.clear().await?;
        self.backing.sync()?;
        tracing::info!(
            cleared,
            uptime_secs = self.start_time.elapsed().as_secs(),
            "catalog state shut down"
        );
        Ok(())
    }
}
