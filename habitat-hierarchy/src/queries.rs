//! Parent-scoped query descriptors, one per list the hierarchy shows.
//!
//! These are the only queries the repository issues; everything below the
//! root is filtered by its parent id.

use habitat_model::{fields, EntityKind, FlatParent};
use habitat_storage::Query;
use habitat_types::EntityId;

pub fn countries() -> Query {
    Query::all(EntityKind::Country)
}

pub fn states_of(country: &EntityId) -> Query {
    Query::children(EntityKind::State, fields::COUNTRY_ID, country)
}

pub fn cities_of(state: &EntityId) -> Query {
    Query::children(EntityKind::City, fields::STATE_ID, state)
}

pub fn societies_of(city: &EntityId) -> Query {
    Query::children(EntityKind::Society, fields::CITY_ID, city)
}

pub fn blocks_of(society: &EntityId) -> Query {
    Query::children(EntityKind::Block, fields::SOCIETY_ID, society)
}

/// Every tower of a society, whether or not it sits inside a block.
pub fn towers_of(society: &EntityId) -> Query {
    Query::children(EntityKind::Tower, fields::SOCIETY_ID, society)
}

pub fn towers_of_block(block: &EntityId) -> Query {
    Query::children(EntityKind::Tower, fields::BLOCK_ID, block)
}

/// Flats hanging directly off the society, outside any block or tower.
pub fn flats_of(society: &EntityId) -> Query {
    Query::children(EntityKind::Flat, fields::SOCIETY_ID, society)
        .and_absent(fields::BLOCK_ID)
        .and_absent(fields::TOWER_ID)
}

pub fn flats_of_block(block: &EntityId) -> Query {
    Query::children(EntityKind::Flat, fields::BLOCK_ID, block)
}

pub fn flats_of_tower(tower: &EntityId) -> Query {
    Query::children(EntityKind::Flat, fields::TOWER_ID, tower)
}

/// The flat list for a container.
pub fn flats_under(parent: &FlatParent) -> Query {
    match parent {
        FlatParent::Society(id) => flats_of(id),
        FlatParent::Block(id) => flats_of_block(id),
        FlatParent::Tower(id) => flats_of_tower(id),
    }
}
