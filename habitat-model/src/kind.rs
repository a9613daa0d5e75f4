use serde::{Deserialize, Serialize};
use std::fmt;

/// Document field names shared by stores, queries and repositories.
pub mod fields {
    pub const ID: &str = "id";
    pub const COUNTRY_ID: &str = "country_id";
    pub const STATE_ID: &str = "state_id";
    pub const CITY_ID: &str = "city_id";
    pub const SOCIETY_ID: &str = "society_id";
    pub const BLOCK_ID: &str = "block_id";
    pub const TOWER_ID: &str = "tower_id";
}

/// The seven entity types of the hierarchy, root first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Country,
    State,
    City,
    Society,
    Block,
    Tower,
    Flat,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Country,
        EntityKind::State,
        EntityKind::City,
        EntityKind::Society,
        EntityKind::Block,
        EntityKind::Tower,
        EntityKind::Flat,
    ];

    /// Name of the store collection holding this kind.
    pub fn collection(self) -> &'static str {
        match self {
            EntityKind::Country => "countries",
            EntityKind::State => "states",
            EntityKind::City => "cities",
            EntityKind::Society => "societies",
            EntityKind::Block => "blocks",
            EntityKind::Tower => "towers",
            EntityKind::Flat => "flats",
        }
    }

    /// Parent reference fields a document of this kind carries.
    ///
    /// Optional references (a Tower's block, a Flat's block or tower) are
    /// included; whether they must be set is decided by validation.
    pub fn parent_fields(self) -> &'static [&'static str] {
        match self {
            EntityKind::Country => &[],
            EntityKind::State => &[fields::COUNTRY_ID],
            EntityKind::City => &[fields::COUNTRY_ID, fields::STATE_ID],
            EntityKind::Society => &[fields::COUNTRY_ID, fields::STATE_ID, fields::CITY_ID],
            EntityKind::Block => &[fields::SOCIETY_ID],
            EntityKind::Tower => &[fields::SOCIETY_ID, fields::BLOCK_ID],
            EntityKind::Flat => &[fields::SOCIETY_ID, fields::BLOCK_ID, fields::TOWER_ID],
        }
    }

    /// Looks a kind up by its collection name.
    pub fn from_collection(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.collection() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Country => "country",
            EntityKind::State => "state",
            EntityKind::City => "city",
            EntityKind::Society => "society",
            EntityKind::Block => "block",
            EntityKind::Tower => "tower",
            EntityKind::Flat => "flat",
        };
        f.write_str(name)
    }
}
