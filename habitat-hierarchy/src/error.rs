//! Error types for hierarchy operations.

use habitat_model::EntityKind;
use habitat_storage::StoreError;
use habitat_types::EntityId;
use serde::Serialize;
use thiserror::Error;

/// Result type for hierarchy operations.
pub type HierarchyResult<T> = Result<T, HierarchyError>;

/// What can go wrong when reading or writing the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HierarchyError {
    /// The entity, or a parent it references, does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: EntityId },

    /// The store could not be reached.
    #[error("store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// The write was rejected before reaching the store.
    #[error("validation failed: {message}")]
    ValidationFailure { message: String },

    /// A live subscription ended with an error.
    #[error("subscription failed: {message}")]
    SubscriptionError { message: String },
}

impl HierarchyError {
    pub fn validation(message: impl Into<String>) -> Self {
        HierarchyError::ValidationFailure {
            message: message.into(),
        }
    }

    pub fn not_found(entity: EntityKind, id: &EntityId) -> Self {
        HierarchyError::NotFound {
            entity,
            id: id.clone(),
        }
    }
}

impl From<StoreError> for HierarchyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => HierarchyError::NotFound { entity: kind, id },
            StoreError::Unavailable(message) | StoreError::Database(message) => {
                HierarchyError::StoreUnavailable { message }
            }
            StoreError::Subscription(message) => HierarchyError::SubscriptionError { message },
            StoreError::Serialization(message) | StoreError::InvalidData(message) => {
                HierarchyError::ValidationFailure { message }
            }
        }
    }
}
