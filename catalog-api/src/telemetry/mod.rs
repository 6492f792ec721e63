//! Catalog Telemetry - Logging Setup
//!
//! Installs the `tracing` subscriber used by the bench binary and any
//! embedding process.

pub mod tracer;

pub use tracer::{init_tracing, LogFormat, TelemetryConfig};
