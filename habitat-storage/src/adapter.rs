//! The entity store contract.
//!
//! Anything that can do point CRUD by id, evaluate a [`Query`], and push full
//! snapshots when a query's result set may have changed can back the
//! hierarchy. The core never talks to a database any other way.

use crate::error::StoreResult;
use crate::query::Query;
use crate::subscription::Subscription;
use async_trait::async_trait;
use habitat_model::{Block, City, Country, Flat, HierarchyEntity, Society, State, Tower};
use habitat_types::EntityId;

/// CRUD and live queries for one entity type.
#[async_trait]
pub trait EntityStore<T: HierarchyEntity>: Send + Sync {
    /// Stores a new entity and returns the id the store assigned.
    /// Whatever id the entity carried is ignored.
    async fn create(&self, entity: &T) -> StoreResult<EntityId>;

    /// Overlays every top-level field of `entity` onto the stored document.
    async fn update(&self, id: &EntityId, entity: &T) -> StoreResult<()>;

    /// Overlays only the fields present in `changes` (a JSON object).
    async fn patch(&self, id: &EntityId, changes: serde_json::Value) -> StoreResult<()>;

    /// Removes the document. Descendants are left alone.
    async fn delete(&self, id: &EntityId) -> StoreResult<()>;

    /// Point lookup. A missing document is `Ok(None)`, not an error.
    async fn get_by_id(&self, id: &EntityId) -> StoreResult<Option<T>>;

    /// Opens a live query. The first snapshot follows promptly; later ones
    /// whenever the result set may have changed.
    async fn subscribe(&self, query: Query) -> StoreResult<Subscription<T>>;
}

/// A store that serves every level of the hierarchy.
pub trait HierarchyStore:
    EntityStore<Country>
    + EntityStore<State>
    + EntityStore<City>
    + EntityStore<Society>
    + EntityStore<Block>
    + EntityStore<Tower>
    + EntityStore<Flat>
    + 'static
{
}

impl<S> HierarchyStore for S where
    S: EntityStore<Country>
        + EntityStore<State>
        + EntityStore<City>
        + EntityStore<Society>
        + EntityStore<Block>
        + EntityStore<Tower>
        + EntityStore<Flat>
        + 'static
{
}
