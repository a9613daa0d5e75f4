use habitat_types::{optional_id, EntityId};
use serde::{Deserialize, Serialize};

/// The parent pointer triple of a flat.
///
/// Kept as three explicit fields because that is how stores persist it. At
/// most one of `block_id` / `tower_id` may be set; with neither set the flat
/// belongs directly to the society.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub society_id: EntityId,
    #[serde(default, with = "optional_id")]
    pub block_id: Option<EntityId>,
    #[serde(default, with = "optional_id")]
    pub tower_id: Option<EntityId>,
}

/// The single container a flat hangs off, as a tagged value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum FlatParent {
    Society(EntityId),
    Block(EntityId),
    Tower(EntityId),
}

impl Placement {
    pub fn society(society_id: EntityId) -> Self {
        Self {
            society_id,
            block_id: None,
            tower_id: None,
        }
    }

    pub fn block(society_id: EntityId, block_id: EntityId) -> Self {
        Self {
            society_id,
            block_id: Some(block_id),
            tower_id: None,
        }
    }

    pub fn tower(society_id: EntityId, tower_id: EntityId) -> Self {
        Self {
            society_id,
            block_id: None,
            tower_id: Some(tower_id),
        }
    }

    /// Checks the exclusivity invariant and that a society is set.
    pub fn check(&self) -> Result<(), String> {
        if self.society_id.is_placeholder() {
            return Err("flat requires society_id".to_string());
        }
        if self.block_id.is_some() && self.tower_id.is_some() {
            return Err("flat may reference a block or a tower, not both".to_string());
        }
        Ok(())
    }

    pub fn is_exclusive(&self) -> bool {
        !(self.block_id.is_some() && self.tower_id.is_some())
    }

    /// The most specific container, tower first.
    pub fn parent(&self) -> FlatParent {
        match (&self.tower_id, &self.block_id) {
            (Some(tower), _) => FlatParent::Tower(tower.clone()),
            (None, Some(block)) => FlatParent::Block(block.clone()),
            (None, None) => FlatParent::Society(self.society_id.clone()),
        }
    }
}

impl FlatParent {
    pub fn id(&self) -> &EntityId {
        match self {
            FlatParent::Society(id) | FlatParent::Block(id) | FlatParent::Tower(id) => id,
        }
    }
}
