//! Catalog Core - Entity Types
//!
//! Pure data structures shared by both access paths. All other crates depend
//! on this one. Behavior here is limited to validation and field merging.

pub mod error;
pub mod latency;
pub mod product;

pub use error::{
    CatalogError, CatalogResult, ConfigError, ResolverError, StorageError, ValidationError,
};
pub use latency::{AccessPath, LatencyMeasurement, LatencyUnit};
pub use product::{CreateProductRequest, ImageUpload, Product, ProductPatch};

/// Opaque reference to a stored blob.
pub type BlobKey = String;
