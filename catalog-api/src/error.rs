//! Error Types for the Catalog API
//!
//! Façade operations return [`CatalogResult`](catalog_core::CatalogResult)
//! directly. [`ApiError`] only covers process lifecycle: opening stores,
//! installing telemetry and reading configuration.

use catalog_core::{CatalogError, ConfigError};
use catalog_storage::LmdbStoreError;

/// Errors raised while bringing the catalog up or down.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backing store error: {0}")]
    Store(#[from] LmdbStoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Blob directory {path} unusable: {source}")]
    BlobDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl ApiError {
    pub fn telemetry(reason: impl ToString) -> Self {
        Self::Telemetry(reason.to_string())
    }
}

/// Result type alias for lifecycle operations.
pub type ApiResult<T> = Result<T, ApiError>;
