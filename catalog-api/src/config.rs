//! Catalog Configuration Module
//!
//! Settings for both access paths and the blob resolver. Configuration is
//! loaded from `CATALOG_*` environment variables with defaults suitable for
//! local development.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use catalog_core::{AccessPath, ConfigError, LatencyUnit};
use catalog_storage::{CacheConfig, WriteMode};

// ============================================================================
// CATALOG CONFIGURATION
// ============================================================================

/// Configuration for the catalog state and façade.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogConfig {
    // ========================================================================
    // Backing store
    // ========================================================================
    /// Directory holding the LMDB environment.
    pub data_dir: PathBuf,

    /// Maximum LMDB map size in megabytes.
    pub lmdb_map_size_mb: usize,

    // ========================================================================
    // Blob resolver
    // ========================================================================
    /// Root directory for stored product images.
    pub blob_dir: PathBuf,

    /// Base URL that blob keys are appended to.
    pub blob_base_url: String,

    // ========================================================================
    // Acceleration tier
    // ========================================================================
    /// How long a tier entry stays valid.
    pub cache_ttl: Duration,

    /// Upper bound on tier entries.
    pub cache_max_entries: usize,

    /// When the tier is updated after a write.
    pub write_mode: WriteMode,

    // ========================================================================
    // Latency reporting
    // ========================================================================
    /// Unit for measurements taken on the direct path.
    pub backing_unit: LatencyUnit,

    /// Unit for measurements taken on the accelerated path.
    pub accelerated_unit: LatencyUnit,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/catalog"),
            lmdb_map_size_mb: 64,
            blob_dir: PathBuf::from("./data/blobs"),
            blob_base_url: "http://localhost:3000/blobs".to_string(),
            cache_ttl: Duration::from_secs(300),
            cache_max_entries: 10_000,
            write_mode: WriteMode::WriteThrough,
            backing_unit: LatencyUnit::Milliseconds,
            accelerated_unit: LatencyUnit::Microseconds,
        }
    }
}

impl CatalogConfig {
    /// Create CatalogConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CATALOG_DATA_DIR`: LMDB directory (default: ./data/catalog)
    /// - `CATALOG_LMDB_MAP_SIZE_MB`: LMDB map size (default: 64)
    /// - `CATALOG_BLOB_DIR`: Blob root directory (default: ./data/blobs)
    /// - `CATALOG_BLOB_BASE_URL`: Public base URL for blobs (default: http://localhost:3000/blobs)
    /// - `CATALOG_CACHE_TTL_SECS`: Tier entry TTL (default: 300)
    /// - `CATALOG_CACHE_MAX_ENTRIES`: Tier capacity (default: 10000)
    /// - `CATALOG_WRITE_MODE`: "write-through" or "warm-after-ack" (default: write-through)
    /// - `CATALOG_BACKING_UNIT`: Unit for direct path latency (default: ms)
    /// - `CATALOG_ACCELERATED_UNIT`: Unit for accelerated path latency (default: us)
    ///
    /// Unset variables fall back to defaults. Set but unparseable values are
    /// reported rather than silently replaced.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("CATALOG_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let lmdb_map_size_mb =
            parse_var(&lookup, "CATALOG_LMDB_MAP_SIZE_MB")?.unwrap_or(defaults.lmdb_map_size_mb);

        let blob_dir = lookup("CATALOG_BLOB_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.blob_dir);

        let blob_base_url = lookup("CATALOG_BLOB_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.blob_base_url);

        let cache_ttl = parse_var::<u64, _>(&lookup, "CATALOG_CACHE_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);

        let cache_max_entries =
            parse_var(&lookup, "CATALOG_CACHE_MAX_ENTRIES")?.unwrap_or(defaults.cache_max_entries);

        let write_mode = match lookup("CATALOG_WRITE_MODE") {
            Some(raw) => raw.parse()?,
            None => defaults.write_mode,
        };

        let backing_unit = match lookup("CATALOG_BACKING_UNIT") {
            Some(raw) => raw.parse()?,
            None => defaults.backing_unit,
        };

        let accelerated_unit = match lookup("CATALOG_ACCELERATED_UNIT") {
            Some(raw) => raw.parse()?,
            None => defaults.accelerated_unit,
        };

        let config = Self {
            data_dir,
            lmdb_map_size_mb,
            blob_dir,
            blob_base_url,
            cache_ttl,
            cache_max_entries,
            write_mode,
            backing_unit,
            accelerated_unit,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "data_dir".to_string(),
            });
        }
        if self.blob_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "blob_dir".to_string(),
            });
        }
        if self.lmdb_map_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "lmdb_map_size_mb".to_string(),
                value: "0".to_string(),
                reason: "map size must be at least 1 MB".to_string(),
            });
        }
        if self.cache_max_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache_max_entries".to_string(),
                value: "0".to_string(),
                reason: "tier must hold at least one entry".to_string(),
            });
        }
        if self.cache_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "cache_ttl".to_string(),
                value: "0".to_string(),
                reason: "entries would expire immediately".to_string(),
            });
        }
        if !(self.blob_base_url.starts_with("http://") || self.blob_base_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidValue {
                field: "blob_base_url".to_string(),
                value: self.blob_base_url.clone(),
                reason: "expected an http or https URL".to_string(),
            });
        }
        Ok(())
    }

    /// Tier configuration derived from these settings.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_ttl(self.cache_ttl)
            .with_max_entries(self.cache_max_entries)
            .with_write_mode(self.write_mode)
    }

    /// Reporting unit for a path.
    pub fn unit_for(&self, path: AccessPath) -> LatencyUnit {
        match path {
            AccessPath::Backing => self.backing_unit,
            AccessPath::Accelerated => self.accelerated_unit,
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                field: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}
