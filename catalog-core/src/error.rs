//! Error types for catalog operations

use thiserror::Error;

/// Storage layer errors (backing store and acceleration tier).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Backing store failure during {operation}: {reason}")]
    Backend { operation: String, reason: String },

    #[error("Accelerator failure during {operation}: {reason}")]
    Accelerator { operation: String, reason: String },

    #[error("Serialization failed for product {id}: {reason}")]
    Serialization { id: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    pub fn backend(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Backend {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    pub fn accelerator(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Accelerator {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }
}

/// Validation errors. Raised before any adapter call is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Update names no fields")]
    EmptyPatch,
}

/// Object reference resolver errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolverError {
    #[error("Failed to store blob for hint {key_hint}: {reason}")]
    Store { key_hint: String, reason: String },

    #[error("Failed to resolve blob {key}: {reason}")]
    Resolve { key: String, reason: String },

    #[error("Failed to remove blob {key}: {reason}")]
    Remove { key: String, reason: String },

    #[error("Invalid blob key: {key}")]
    InvalidKey { key: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all catalog errors.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Product not found: {id}")]
    NotFound { id: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl CatalogError {
    /// True for failures caused by the caller's input rather than the stores.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Validation(_))
    }
}

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

// =============================================================================
// TESTS
// =============================================================================
