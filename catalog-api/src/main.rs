//! Catalog latency bench entry point.
//!
//! Seeds products through the direct path, then reads them back over both
//! paths and logs per-path latency in each path's own unit alongside a
//! nanosecond-normalized comparison.

use catalog_api::telemetry::{init_tracing, TelemetryConfig};
use catalog_api::{ApiResult, CatalogConfig, CatalogPath, CatalogState};
use catalog_core::{AccessPath, CreateProductRequest, LatencyUnit};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    let config = CatalogConfig::from_env()?;
    let items = env_count("CATALOG_BENCH_ITEMS", 50);
    let rounds = env_count("CATALOG_BENCH_ROUNDS", 5);

    let state = CatalogState::init(&config).await?;
    tracing::info!(items, rounds, write_mode = %config.write_mode, "Starting catalog bench");

    seed(state.facade().direct(), items).await?;

    for path in AccessPath::ALL {
        let handle = state.facade().path(path);
        let samples = read_rounds(handle, items, rounds).await?;
        report(path, handle.unit(), &samples);
    }

    let stats = state.tier_stats().await?;
    tracing::info!(
        hits = stats.hits,
        misses = stats.misses,
        entries = stats.entry_count,
        hit_rate = stats.hit_rate(),
        "Acceleration tier"
    );

    state.shutdown().await?;
    Ok(())
}

fn env_count(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|count| *count > 0)
        .unwrap_or(default)
}

fn bench_id(index: usize) -> String {
    format!("bench-{:05}", index)
}

async fn seed(direct: &CatalogPath, items: usize) -> ApiResult<()> {
    for index in 0..items {
        let request = CreateProductRequest::new(bench_id(index), format!("Bench item {}", index))
            .with_description("Seeded by catalog-bench")
            .with_price(1.0 + index as f64)
            .with_remaining_sku((index % 100) as i64);
        direct.create(request).await?;
    }
    tracing::info!(items, "Seeded products through the direct path");
    Ok(())
}

/// Per-read latency values, all in `handle.unit()`.
async fn read_rounds(handle: &CatalogPath, items: usize, rounds: usize) -> ApiResult<Vec<f64>> {
    let mut samples = Vec::with_capacity(items * rounds);
    for _ in 0..rounds {
        for index in 0..items {
            let id = bench_id(index);
            match handle.get(&id).await? {
                Some(view) => samples.push(view.response_time),
                None => {
                    tracing::warn!(id = %id, path = %handle.access_path(), "Seeded product missing")
                }
            }
        }
    }
    Ok(samples)
}

fn report(path: AccessPath, unit: LatencyUnit, samples: &[f64]) {
    if samples.is_empty() {
        tracing::warn!(%path, "No samples collected");
        return;
    }

    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let mean_ns = mean * unit.nanos_per_unit();

    tracing::info!(
        %path,
        samples = samples.len(),
        mean,
        unit = %unit,
        mean_ns,
        "Read latency"
    );
}
