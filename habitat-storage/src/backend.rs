//! Blocking document backends.
//!
//! A backend stores JSON documents keyed by `(collection, id)` and knows
//! nothing about entity types, revisions or subscriptions. `DocumentStore`
//! layers those on top and calls into the backend from the blocking pool.

use crate::error::StoreResult;
use habitat_types::EntityId;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Raw document storage.
pub trait DocumentBackend: Send + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Inserts a new document. The id is fresh; callers never reuse one.
    fn insert(&mut self, collection: &str, id: &EntityId, body: &Value) -> StoreResult<()>;

    /// Replaces an existing document. Returns false if there was none.
    fn replace(&mut self, collection: &str, id: &EntityId, body: &Value) -> StoreResult<bool>;

    /// Removes a document. Returns false if there was none.
    fn remove(&mut self, collection: &str, id: &EntityId) -> StoreResult<bool>;

    fn fetch(&self, collection: &str, id: &EntityId) -> StoreResult<Option<Value>>;

    /// Every document of a collection, ordered by id.
    fn scan(&self, collection: &str) -> StoreResult<Vec<Value>>;
}

/// In-process backend over ordered maps.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: HashMap<String, BTreeMap<EntityId, Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn insert(&mut self, collection: &str, id: &EntityId, body: &Value) -> StoreResult<()> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), body.clone());
        Ok(())
    }

    fn replace(&mut self, collection: &str, id: &EntityId, body: &Value) -> StoreResult<bool> {
        match self
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        {
            Some(existing) => {
                *existing = body.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove(&mut self, collection: &str, id: &EntityId) -> StoreResult<bool> {
        Ok(self
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some())
    }

    fn fetch(&self, collection: &str, id: &EntityId) -> StoreResult<Option<Value>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    fn scan(&self, collection: &str) -> StoreResult<Vec<Value>> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }
}
