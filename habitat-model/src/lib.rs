//! Entity model for Habitat.
//!
//! Defines the types every other Habitat crate agrees on:
//! - [`Country`], [`State`], [`City`], [`Society`], [`Block`], [`Tower`], [`Flat`]:
//!   the seven levels of the hierarchy
//! - [`HierarchyEntity`]: the trait stores and repositories are generic over
//! - [`EntityKind`]: collection names and document field names
//! - [`Placement`] / [`FlatParent`]: the Flat's three-field parent pointer
//! - [`Record`]: a tagged union over all entity types, used by mutation APIs

mod entity;
mod kind;
mod placement;
mod record;

pub use entity::{Block, City, Country, Flat, FlatStatus, HierarchyEntity, Society, State, Tower};
pub use kind::{fields, EntityKind};
pub use placement::{FlatParent, Placement};
pub use record::Record;
