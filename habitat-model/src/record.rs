use crate::entity::{Block, City, Country, Flat, HierarchyEntity, Society, State, Tower};
use crate::kind::EntityKind;
use habitat_types::EntityId;
use serde::{Deserialize, Serialize};

/// Any one hierarchy entity, tagged with its kind.
///
/// Serialized as `{"kind": "flat", "entity": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entity", rename_all = "snake_case")]
pub enum Record {
    Country(Country),
    State(State),
    City(City),
    Society(Society),
    Block(Block),
    Tower(Tower),
    Flat(Flat),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Country(_) => EntityKind::Country,
            Record::State(_) => EntityKind::State,
            Record::City(_) => EntityKind::City,
            Record::Society(_) => EntityKind::Society,
            Record::Block(_) => EntityKind::Block,
            Record::Tower(_) => EntityKind::Tower,
            Record::Flat(_) => EntityKind::Flat,
        }
    }

    pub fn id(&self) -> &EntityId {
        match self {
            Record::Country(e) => e.id(),
            Record::State(e) => e.id(),
            Record::City(e) => e.id(),
            Record::Society(e) => e.id(),
            Record::Block(e) => e.id(),
            Record::Tower(e) => e.id(),
            Record::Flat(e) => e.id(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Record::Country(e) => e.label(),
            Record::State(e) => e.label(),
            Record::City(e) => e.label(),
            Record::Society(e) => e.label(),
            Record::Block(e) => e.label(),
            Record::Tower(e) => e.label(),
            Record::Flat(e) => e.label(),
        }
    }
}

impl From<Country> for Record {
    fn from(e: Country) -> Self {
        Record::Country(e)
    }
}

impl From<State> for Record {
    fn from(e: State) -> Self {
        Record::State(e)
    }
}

impl From<City> for Record {
    fn from(e: City) -> Self {
        Record::City(e)
    }
}

impl From<Society> for Record {
    fn from(e: Society) -> Self {
        Record::Society(e)
    }
}

impl From<Block> for Record {
    fn from(e: Block) -> Self {
        Record::Block(e)
    }
}

impl From<Tower> for Record {
    fn from(e: Tower) -> Self {
        Record::Tower(e)
    }
}

impl From<Flat> for Record {
    fn from(e: Flat) -> Self {
        Record::Flat(e)
    }
}
