//! Core type definitions for Habitat.
//!
//! This crate defines the fundamental, storage-agnostic types used throughout
//! the hierarchy core:
//! - Entity identifiers (store-assigned, string or integer on the wire)
//! - Change records published by a store after every write
//!
//! Entity shapes (Country, State, City, ...) live in `habitat-model`.

mod change;
mod ids;

pub use change::{Change, ChangeKind};
pub use ids::{optional_id, EntityId};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid id: {0:?}")]
    InvalidId(String),
}
