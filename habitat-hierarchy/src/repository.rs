//! Hierarchy repository: typed, parent-scoped access to an [`HierarchyStore`].
//!
//! Stateless apart from the store handle. Subscriptions are always scoped to a
//! parent id (only countries are unscoped). Writes are validated on the entity
//! itself and against the parents they reference before reaching the store:
//! a missing parent is `NotFound`, a denormalised ancestor id that disagrees
//! with the parent document is a `ValidationFailure`. Deletes never cascade.

use crate::error::{HierarchyError, HierarchyResult};
use crate::placement::{resolve_parent, PlacementContext};
use crate::queries;
use habitat_model::{
    fields, Block, City, Country, EntityKind, Flat, FlatParent, HierarchyEntity, Record, Society,
    State, Tower,
};
use habitat_storage::{EntityStore, HierarchyStore, Query, Subscription};
use habitat_types::EntityId;
use std::sync::Arc;
use tracing::debug;

/// Typed access to the seven collections.
pub struct HierarchyRepository<S> {
    store: Arc<S>,
}

impl<S> Clone for HierarchyRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

fn ensure_same(
    kind: EntityKind,
    field: &str,
    declared: &EntityId,
    actual: &EntityId,
) -> HierarchyResult<()> {
    if declared != actual {
        return Err(HierarchyError::validation(format!(
            "{kind} {field} {declared} does not match its parent's {actual}"
        )));
    }
    Ok(())
}

fn require_id<T: HierarchyEntity>(entity: &T) -> HierarchyResult<&EntityId> {
    let id = entity.id();
    if id.is_placeholder() {
        return Err(HierarchyError::validation(format!(
            "{} update requires a stored id",
            T::KIND
        )));
    }
    Ok(id)
}

impl<S: HierarchyStore> HierarchyRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ── Subscriptions ───────────────────────────────────────────

    /// Opens a live query for `T`.
    pub async fn watch<T>(&self, query: Query) -> HierarchyResult<Subscription<T>>
    where
        T: HierarchyEntity,
        S: EntityStore<T>,
    {
        debug!(%query, "opening subscription");
        Ok(EntityStore::<T>::subscribe(self.store.as_ref(), query).await?)
    }

    pub async fn countries(&self) -> HierarchyResult<Subscription<Country>> {
        self.watch(queries::countries()).await
    }

    pub async fn states_of(&self, country: &EntityId) -> HierarchyResult<Subscription<State>> {
        self.watch(queries::states_of(country)).await
    }

    pub async fn cities_of(&self, state: &EntityId) -> HierarchyResult<Subscription<City>> {
        self.watch(queries::cities_of(state)).await
    }

    pub async fn societies_of(&self, city: &EntityId) -> HierarchyResult<Subscription<Society>> {
        self.watch(queries::societies_of(city)).await
    }

    pub async fn blocks_of(&self, society: &EntityId) -> HierarchyResult<Subscription<Block>> {
        self.watch(queries::blocks_of(society)).await
    }

    pub async fn towers_of(&self, society: &EntityId) -> HierarchyResult<Subscription<Tower>> {
        self.watch(queries::towers_of(society)).await
    }

    pub async fn towers_of_block(&self, block: &EntityId) -> HierarchyResult<Subscription<Tower>> {
        self.watch(queries::towers_of_block(block)).await
    }

    /// Flats directly under the society, outside every block and tower.
    pub async fn flats_of(&self, society: &EntityId) -> HierarchyResult<Subscription<Flat>> {
        self.watch(queries::flats_of(society)).await
    }

    pub async fn flats_of_block(&self, block: &EntityId) -> HierarchyResult<Subscription<Flat>> {
        self.watch(queries::flats_of_block(block)).await
    }

    pub async fn flats_of_tower(&self, tower: &EntityId) -> HierarchyResult<Subscription<Flat>> {
        self.watch(queries::flats_of_tower(tower)).await
    }

    pub async fn flats_under(&self, parent: &FlatParent) -> HierarchyResult<Subscription<Flat>> {
        self.watch(queries::flats_under(parent)).await
    }

    // ── Reads ───────────────────────────────────────────────────

    /// Point lookup by id.
    pub async fn get<T>(&self, id: &EntityId) -> HierarchyResult<Option<T>>
    where
        T: HierarchyEntity,
        S: EntityStore<T>,
    {
        Ok(EntityStore::<T>::get_by_id(self.store.as_ref(), id).await?)
    }

    async fn require<T>(&self, id: &EntityId) -> HierarchyResult<T>
    where
        T: HierarchyEntity,
        S: EntityStore<T>,
    {
        self.get::<T>(id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(T::KIND, id))
    }

    // ── Containment ─────────────────────────────────────────────

    async fn check_state(&self, state: &State) -> HierarchyResult<()> {
        self.require::<Country>(&state.country_id).await?;
        Ok(())
    }

    async fn check_city(&self, city: &City) -> HierarchyResult<()> {
        let state = self.require::<State>(&city.state_id).await?;
        ensure_same(
            EntityKind::City,
            fields::COUNTRY_ID,
            &city.country_id,
            &state.country_id,
        )
    }

    async fn check_society(&self, society: &Society) -> HierarchyResult<()> {
        let city = self.require::<City>(&society.city_id).await?;
        ensure_same(
            EntityKind::Society,
            fields::STATE_ID,
            &society.state_id,
            &city.state_id,
        )?;
        ensure_same(
            EntityKind::Society,
            fields::COUNTRY_ID,
            &society.country_id,
            &city.country_id,
        )
    }

    async fn check_block(&self, block: &Block) -> HierarchyResult<()> {
        self.require::<Society>(&block.society_id).await?;
        Ok(())
    }

    async fn check_tower(&self, tower: &Tower) -> HierarchyResult<()> {
        self.require::<Society>(&tower.society_id).await?;
        if let Some(block_id) = &tower.block_id {
            let block = self.require::<Block>(block_id).await?;
            ensure_same(
                EntityKind::Tower,
                fields::SOCIETY_ID,
                &tower.society_id,
                &block.society_id,
            )?;
        }
        Ok(())
    }

    async fn check_flat(&self, flat: &Flat) -> HierarchyResult<()> {
        self.require::<Society>(&flat.society_id).await?;
        if let Some(block_id) = &flat.block_id {
            let block = self.require::<Block>(block_id).await?;
            ensure_same(
                EntityKind::Flat,
                fields::SOCIETY_ID,
                &flat.society_id,
                &block.society_id,
            )?;
        }
        if let Some(tower_id) = &flat.tower_id {
            let tower = self.require::<Tower>(tower_id).await?;
            ensure_same(
                EntityKind::Flat,
                fields::SOCIETY_ID,
                &flat.society_id,
                &tower.society_id,
            )?;
        }
        Ok(())
    }

    async fn insert<T>(&self, entity: &T) -> HierarchyResult<EntityId>
    where
        T: HierarchyEntity,
        S: EntityStore<T>,
    {
        let id = EntityStore::<T>::create(self.store.as_ref(), entity).await?;
        debug!(kind = %T::KIND, %id, label = entity.label(), "added");
        Ok(id)
    }

    async fn replace<T>(&self, entity: &T) -> HierarchyResult<()>
    where
        T: HierarchyEntity,
        S: EntityStore<T>,
    {
        let id = require_id(entity)?;
        EntityStore::<T>::update(self.store.as_ref(), id, entity).await?;
        debug!(kind = %T::KIND, %id, "updated");
        Ok(())
    }

    /// Removes one entity. Its descendants are left in place.
    pub async fn delete<T>(&self, id: &EntityId) -> HierarchyResult<()>
    where
        T: HierarchyEntity,
        S: EntityStore<T>,
    {
        EntityStore::<T>::delete(self.store.as_ref(), id).await?;
        debug!(kind = %T::KIND, %id, "deleted");
        Ok(())
    }

    // ── Mutations ───────────────────────────────────────────────

    pub async fn add_country(&self, country: &Country) -> HierarchyResult<EntityId> {
        country.validate().map_err(HierarchyError::validation)?;
        self.insert(country).await
    }

    pub async fn update_country(&self, country: &Country) -> HierarchyResult<()> {
        country.validate().map_err(HierarchyError::validation)?;
        self.replace(country).await
    }

    pub async fn delete_country(&self, id: &EntityId) -> HierarchyResult<()> {
        self.delete::<Country>(id).await
    }

    pub async fn add_state(&self, state: &State) -> HierarchyResult<EntityId> {
        state.validate().map_err(HierarchyError::validation)?;
        self.check_state(state).await?;
        self.insert(state).await
    }

    pub async fn update_state(&self, state: &State) -> HierarchyResult<()> {
        state.validate().map_err(HierarchyError::validation)?;
        self.check_state(state).await?;
        self.replace(state).await
    }

    pub async fn delete_state(&self, id: &EntityId) -> HierarchyResult<()> {
        self.delete::<State>(id).await
    }

    pub async fn add_city(&self, city: &City) -> HierarchyResult<EntityId> {
        city.validate().map_err(HierarchyError::validation)?;
        self.check_city(city).await?;
        self.insert(city).await
    }

    pub async fn update_city(&self, city: &City) -> HierarchyResult<()> {
        city.validate().map_err(HierarchyError::validation)?;
        self.check_city(city).await?;
        self.replace(city).await
    }

    pub async fn delete_city(&self, id: &EntityId) -> HierarchyResult<()> {
        self.delete::<City>(id).await
    }

    pub async fn add_society(&self, society: &Society) -> HierarchyResult<EntityId> {
        society.validate().map_err(HierarchyError::validation)?;
        self.check_society(society).await?;
        self.insert(society).await
    }

    pub async fn update_society(&self, society: &Society) -> HierarchyResult<()> {
        society.validate().map_err(HierarchyError::validation)?;
        self.check_society(society).await?;
        self.replace(society).await
    }

    pub async fn delete_society(&self, id: &EntityId) -> HierarchyResult<()> {
        self.delete::<Society>(id).await
    }

    pub async fn add_block(&self, block: &Block) -> HierarchyResult<EntityId> {
        block.validate().map_err(HierarchyError::validation)?;
        self.check_block(block).await?;
        self.insert(block).await
    }

    pub async fn update_block(&self, block: &Block) -> HierarchyResult<()> {
        block.validate().map_err(HierarchyError::validation)?;
        self.check_block(block).await?;
        self.replace(block).await
    }

    pub async fn delete_block(&self, id: &EntityId) -> HierarchyResult<()> {
        self.delete::<Block>(id).await
    }

    pub async fn add_tower(&self, tower: &Tower) -> HierarchyResult<EntityId> {
        tower.validate().map_err(HierarchyError::validation)?;
        self.check_tower(tower).await?;
        self.insert(tower).await
    }

    pub async fn update_tower(&self, tower: &Tower) -> HierarchyResult<()> {
        tower.validate().map_err(HierarchyError::validation)?;
        self.check_tower(tower).await?;
        self.replace(tower).await
    }

    pub async fn delete_tower(&self, id: &EntityId) -> HierarchyResult<()> {
        self.delete::<Tower>(id).await
    }

    /// Adds a flat under whatever `ctx` selects.
    ///
    /// The flat's own parent fields are ignored and overwritten by the
    /// resolved placement.
    pub async fn add_flat(
        &self,
        flat: &Flat,
        ctx: &PlacementContext<'_>,
    ) -> HierarchyResult<EntityId> {
        let flat = flat.clone().placed(resolve_parent(ctx)?);
        flat.validate().map_err(HierarchyError::validation)?;
        self.check_flat(&flat).await?;
        self.insert(&flat).await
    }

    /// Updates a flat, re-placing it under whatever `ctx` selects.
    pub async fn update_flat(
        &self,
        flat: &Flat,
        ctx: &PlacementContext<'_>,
    ) -> HierarchyResult<()> {
        let flat = flat.clone().placed(resolve_parent(ctx)?);
        flat.validate().map_err(HierarchyError::validation)?;
        self.check_flat(&flat).await?;
        self.replace(&flat).await
    }

    pub async fn delete_flat(&self, id: &EntityId) -> HierarchyResult<()> {
        self.delete::<Flat>(id).await
    }

    // ── Record dispatch ─────────────────────────────────────────

    /// Adds any record. Flats are placed through `ctx`.
    pub async fn add_record(
        &self,
        record: &Record,
        ctx: &PlacementContext<'_>,
    ) -> HierarchyResult<EntityId> {
        match record {
            Record::Country(e) => self.add_country(e).await,
            Record::State(e) => self.add_state(e).await,
            Record::City(e) => self.add_city(e).await,
            Record::Society(e) => self.add_society(e).await,
            Record::Block(e) => self.add_block(e).await,
            Record::Tower(e) => self.add_tower(e).await,
            Record::Flat(e) => self.add_flat(e, ctx).await,
        }
    }

    /// Updates any record. Flats are re-placed through `ctx`.
    pub async fn update_record(
        &self,
        record: &Record,
        ctx: &PlacementContext<'_>,
    ) -> HierarchyResult<()> {
        match record {
            Record::Country(e) => self.update_country(e).await,
            Record::State(e) => self.update_state(e).await,
            Record::City(e) => self.update_city(e).await,
            Record::Society(e) => self.update_society(e).await,
            Record::Block(e) => self.update_block(e).await,
            Record::Tower(e) => self.update_tower(e).await,
            Record::Flat(e) => self.update_flat(e, ctx).await,
        }
    }

    pub async fn delete_kind(&self, kind: EntityKind, id: &EntityId) -> HierarchyResult<()> {
        match kind {
            EntityKind::Country => self.delete_country(id).await,
            EntityKind::State => self.delete_state(id).await,
            EntityKind::City => self.delete_city(id).await,
            EntityKind::Society => self.delete_society(id).await,
            EntityKind::Block => self.delete_block(id).await,
            EntityKind::Tower => self.delete_tower(id).await,
            EntityKind::Flat => self.delete_flat(id).await,
        }
    }
}
