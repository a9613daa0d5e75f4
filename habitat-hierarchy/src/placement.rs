//! Flat placement resolver.
//!
//! Turns whatever the user currently has selected into the three-field parent
//! pointer of a new flat. Priority is tower, then block, then society; with
//! nothing at or below the society level selected, no flat may be created.

use crate::error::{HierarchyError, HierarchyResult};
use habitat_model::{Block, Placement, Society, Tower};
use tracing::warn;

/// The selected society, block and tower, borrowed from the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlacementContext<'a> {
    pub society: Option<&'a Society>,
    pub block: Option<&'a Block>,
    pub tower: Option<&'a Tower>,
}

impl<'a> PlacementContext<'a> {
    pub fn society(society: &'a Society) -> Self {
        Self {
            society: Some(society),
            ..Default::default()
        }
    }

    pub fn with_block(mut self, block: &'a Block) -> Self {
        self.block = Some(block);
        self
    }

    pub fn with_tower(mut self, tower: &'a Tower) -> Self {
        self.tower = Some(tower);
        self
    }
}

/// Computes the placement of a flat created in `ctx`.
///
/// The result always satisfies [`Placement::check`].
pub fn resolve_parent(ctx: &PlacementContext<'_>) -> HierarchyResult<Placement> {
    let placement = if let Some(tower) = ctx.tower {
        Placement::tower(tower.society_id.clone(), tower.id.clone())
    } else if let Some(block) = ctx.block {
        Placement::block(block.society_id.clone(), block.id.clone())
    } else if let Some(society) = ctx.society {
        Placement::society(society.id.clone())
    } else {
        return Err(HierarchyError::validation(
            "select a society, block or tower before adding a flat",
        ));
    };

    if let Some(society) = ctx.society
        && society.id != placement.society_id
    {
        warn!(
            selected = %society.id,
            resolved = %placement.society_id,
            "selected society disagrees with the flat's container; using the container's"
        );
    }

    placement.check().map_err(HierarchyError::validation)?;
    Ok(placement)
}
