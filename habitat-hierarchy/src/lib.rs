//! Hierarchy repository for Habitat.
//!
//! - [`HierarchyRepository`]: parent-scoped subscriptions and
//!   containment-checked mutations over any [`habitat_storage::HierarchyStore`]
//! - [`queries`]: the query descriptor behind every list
//! - [`resolve_parent`]: where a new flat goes, given the current selection
//! - [`HierarchyError`]: the error taxonomy the whole core reports in

mod error;
mod placement;
pub mod queries;
mod repository;

pub use error::{HierarchyError, HierarchyResult};
pub use placement::{resolve_parent, PlacementContext};
pub use repository::HierarchyRepository;
