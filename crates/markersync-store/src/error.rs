//! Error types for the record-store layer.
//!
//! [`StoreError`] splits failures into "the store could not be reached"
//! ([`StoreError::Unavailable`]) and "the store was reached but the read
//! failed" ([`StoreError::Query`], [`StoreError::QueryTimeout`]). Both abort
//! only the current tick; the next tick simply tries again.

/// Errors that can occur in the record-store layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached (pool closed, connect or acquire
    /// failure, I/O error).
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// The snapshot query failed or a row could not be decoded.
    #[error("record store query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// The snapshot query did not finish within its deadline.
    #[error("record store query timed out after {elapsed_ms}ms")]
    QueryTimeout {
        /// The deadline that was exceeded, in milliseconds.
        elapsed_ms: u64,
    },

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Whether the error means the store itself could not be reached.
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => Self::Unavailable(err.to_string()),
            sqlx::Error::Configuration(e) => Self::Config(e.to_string()),
            other => Self::Query(other),
        }
    }
}
