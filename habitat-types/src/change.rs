//! Change records for store writes.
//!
//! A store publishes one [`Change`] after every successful write. Live queries
//! use them as a wake-up signal: the record names the collection and the
//! entity that changed, never the new contents. Consumers always re-read a
//! full snapshot.

use crate::EntityId;
use serde::{Deserialize, Serialize};

/// The kind of write that produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// A single committed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Store-wide revision after the write. Strictly increasing per store.
    pub revision: u64,

    /// Collection the entity lives in (e.g., "flats").
    pub collection: String,

    /// The entity that changed.
    pub entity_id: EntityId,

    /// What happened to it.
    pub kind: ChangeKind,
}

impl Change {
    /// Creates a change record.
    #[must_use]
    pub fn new(
        revision: u64,
        collection: impl Into<String>,
        entity_id: EntityId,
        kind: ChangeKind,
    ) -> Self {
        Self {
            revision,
            collection: collection.into(),
            entity_id,
            kind,
        }
    }

    /// Creates an entity-created record.
    #[must_use]
    pub fn created(revision: u64, collection: impl Into<String>, entity_id: EntityId) -> Self {
        Self::new(revision, collection, entity_id, ChangeKind::Created)
    }

    /// Creates an entity-updated record.
    #[must_use]
    pub fn updated(revision: u64, collection: impl Into<String>, entity_id: EntityId) -> Self {
        Self::new(revision, collection, entity_id, ChangeKind::Updated)
    }

    /// Creates an entity-deleted record.
    #[must_use]
    pub fn deleted(revision: u64, collection: impl Into<String>, entity_id: EntityId) -> Self {
        Self::new(revision, collection, entity_id, ChangeKind::Deleted)
    }

    /// Whether this change touches the given collection.
    #[must_use]
    pub fn affects(&self, collection: &str) -> bool {
        self.collection == collection
    }
}
