//! Error types for the storage layer.

use habitat_model::EntityKind;
use habitat_types::EntityId;
use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in storage operations.
///
/// Cloneable so a terminal subscription error can be fanned out and kept in
/// consumer state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No document with this id in the collection.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: EntityId },

    /// The store cannot be reached (connectivity or server failure).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A live subscription terminated abnormally.
    #[error("subscription terminated: {0}")]
    Subscription(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Database error from the backing engine.
    #[error("database error: {0}")]
    Database(String),

    /// Invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(feature = "duckdb")]
impl From<duckdb::Error> for StoreError {
    fn from(err: duckdb::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}
