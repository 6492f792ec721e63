//! Catalog API - Dual-Path Access Layer
//!
//! This crate exposes the product catalog through two parallel access paths
//! over one logical store: direct to the LMDB backing store, and through the
//! in-memory acceleration tier. Both paths return the same shapes and differ
//! only in the latency attached to each response.
//!
//! No transport lives here. Callers hold a [`CatalogState`] (or build a
//! [`CatalogFacade`] from their own adapters) and pick a path per call.

pub mod config;
pub mod error;
pub mod facade;
pub mod probe;
pub mod resolver;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use config::CatalogConfig;
pub use error::{ApiError, ApiResult};
pub use facade::{CatalogFacade, CatalogPath};
pub use probe::{LatencyProbe, Timed};
pub use resolver::{LocalObjectStore, ObjectResolver};
pub use state::{ApiAccelerated, ApiDirect, CatalogState};
pub use types::{CreatedProduct, DeleteAck, ProductView};
