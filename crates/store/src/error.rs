//! Store error type.

use thiserror::Error;

/// Errors from the KV store facade.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Unknown savepoint: {0}")]
    UnknownSavepoint(String),

    #[error("No prepared transaction with id {0}")]
    UnknownPrepared(String),

    #[error("Cannot decode `{value}` as u64")]
    BadScalar { value: String },
}
