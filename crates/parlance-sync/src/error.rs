//! Error types for catalog synchronization.

use parlance_core::ParlanceError;
use serde_json::Value;

/// Failures talking to the remote catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Network failure, connection refused, or an unreadable body.
    #[error("Catalog transport failed: {0}")]
    Transport(String),
    /// The catalog answered but did not report `status.code == 200`.
    #[error("Catalog rejected request with status {code}: {details}")]
    Rejected { code: u16, details: Value },
}

impl CatalogError {
    /// A 4xx rejection, e.g. deleting an entity that is still in use.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Rejected { code, .. } if (400..500).contains(code))
    }
}

/// Failures reading or writing the local sync cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache I/O failed at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Intent name cannot be stored in the cache: {0}")]
    InvalidName(String),
    #[error("Cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Any failure that aborts a sync run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Catalog(err) => err.is_retryable(),
            SyncError::Cache(_) => false,
        }
    }
}

impl From<SyncError> for ParlanceError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Catalog(e) => ParlanceError::Catalog(e.to_string()),
            SyncError::Cache(e) => ParlanceError::Cache(e.to_string()),
        }
    }
}
