//! Latency probe around single adapter calls.

use std::future::Future;
use std::time::Instant;

use catalog_core::{AccessPath, CatalogResult, LatencyMeasurement, LatencyUnit};
use serde::Serialize;

/// A value together with the measured duration of the call that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timed<T> {
    pub value: T,
    pub latency: LatencyMeasurement,
}

impl<T> Timed<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Timed<U> {
        Timed {
            value: f(self.value),
            latency: self.latency,
        }
    }

    pub fn into_parts(self) -> (T, LatencyMeasurement) {
        (self.value, self.latency)
    }
}

/// Times adapter calls for one access path and tags them with its unit.
///
/// The clock starts immediately before the adapter future is first polled
/// and stops when it resolves. Validation, image storage and URL resolution
/// happen outside the measured window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyProbe {
    path: AccessPath,
    unit: LatencyUnit,
}

impl LatencyProbe {
    pub fn new(path: AccessPath, unit: LatencyUnit) -> Self {
        Self { path, unit }
    }

    pub fn path(&self) -> AccessPath {
        self.path
    }

    pub fn unit(&self) -> LatencyUnit {
        self.unit
    }

    /// Run `call` and attach its duration. Failed calls are logged with
    /// their duration and the error is returned unchanged.
    pub async fn measure<T, F>(&self, operation: &'static str, call: F) -> CatalogResult<Timed<T>>
    where
        F: Future<Output = CatalogResult<T>>,
    {
        let started = Instant::now();
        let outcome = call.await;
        let elapsed = started.elapsed();

        let latency = LatencyMeasurement::new(operation, self.path, elapsed, self.unit);
        match &outcome {
            Ok(_) => tracing::debug!(
                operation,
                path = %self.path,
                value = latency.value,
                unit = %self.unit,
                "adapter call timed"
            ),
            Err(e) => tracing::debug!(
                operation,
                path = %self.path,
                value = latency.value,
                unit = %self.unit,
                error = %e,
                "adapter call failed"
            ),
        }

        outcome.map(|value| Timed { value, latency })
    }
}
