use statmon_common::types::{MetricError, MetricKind};

/// Errors raised by the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Malformed metric record. Rejected immediately, never retried.
    #[error("invalid metric: {0}")]
    Invalid(#[from] MetricError),

    /// Query for an absent `(kind, id)` pair. Surfaced to the caller, not
    /// retried.
    #[error("metric {kind}:{id} not found")]
    NotFound { kind: MetricKind, id: String },

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("snapshot codec: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O failure. The only retryable variant; callers retry on the
    /// fixed backoff schedule and then continue operating in-memory.
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Transient errors are retried on the fixed schedule; everything else
    /// is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Io(_))
    }
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
