use crate::kind::{fields, EntityKind};
use crate::placement::Placement;
use habitat_types::{optional_id, EntityId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Common behaviour of the seven hierarchy entities.
///
/// Stores are generic over this trait: an entity is serialized to a JSON
/// document in the collection named by [`EntityKind::collection`], and its
/// `id` field is owned by the store.
pub trait HierarchyEntity:
    Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync + 'static
{
    /// The kind this type represents.
    const KIND: EntityKind;

    fn id(&self) -> &EntityId;

    fn set_id(&mut self, id: EntityId);

    /// Human-facing label (a name, or a flat number).
    fn label(&self) -> &str;

    /// Checks the entity's own fields before it is written.
    /// Return `Err(message)` to reject the write.
    ///
    /// Only checks what can be decided from the entity alone; whether the
    /// referenced parents exist is the repository's job.
    fn validate(&self) -> Result<(), String> {
        require_text(Self::KIND, "name", self.label())
    }
}

fn require_text(kind: EntityKind, field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{kind} {field} must not be empty"));
    }
    Ok(())
}

fn require_parent(kind: EntityKind, field: &str, id: &EntityId) -> Result<(), String> {
    if id.is_placeholder() {
        return Err(format!("{kind} requires {field}"));
    }
    Ok(())
}

/// Root of the hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub iso2: String,
    #[serde(default)]
    pub iso3: String,
    #[serde(default)]
    pub phone_code: String,
    #[serde(default)]
    pub currency: String,
}

impl Country {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_codes(mut self, iso2: impl Into<String>, iso3: impl Into<String>) -> Self {
        self.iso2 = iso2.into();
        self.iso3 = iso3.into();
        self
    }
}

impl HierarchyEntity for Country {
    const KIND: EntityKind = EntityKind::Country;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), String> {
        require_text(Self::KIND, "name", &self.name)?;
        if !self.iso2.is_empty() && self.iso2.chars().count() != 2 {
            return Err(format!("country iso2 code {:?} must be two letters", self.iso2));
        }
        if !self.iso3.is_empty() && self.iso3.chars().count() != 3 {
            return Err(format!("country iso3 code {:?} must be three letters", self.iso3));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(rename = "type", default)]
    pub state_type: String,
    pub country_id: EntityId,
}

impl State {
    pub fn new(name: impl Into<String>, country_id: EntityId) -> Self {
        Self {
            name: name.into(),
            country_id,
            ..Default::default()
        }
    }
}

impl HierarchyEntity for State {
    const KIND: EntityKind = EntityKind::State;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), String> {
        require_text(Self::KIND, "name", &self.name)?;
        require_parent(Self::KIND, fields::COUNTRY_ID, &self.country_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    pub country_id: EntityId,
    pub state_id: EntityId,
}

impl City {
    pub fn new(name: impl Into<String>, country_id: EntityId, state_id: EntityId) -> Self {
        Self {
            id: EntityId::placeholder(),
            name: name.into(),
            country_id,
            state_id,
        }
    }
}

impl HierarchyEntity for City {
    const KIND: EntityKind = EntityKind::City;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), String> {
        require_text(Self::KIND, "name", &self.name)?;
        require_parent(Self::KIND, fields::COUNTRY_ID, &self.country_id)?;
        require_parent(Self::KIND, fields::STATE_ID, &self.state_id)
    }
}

/// First level at which blocks, towers and flats can exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Society {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    pub country_id: EntityId,
    pub state_id: EntityId,
    pub city_id: EntityId,
}

impl Society {
    pub fn new(name: impl Into<String>, city: &City) -> Self {
        Self {
            id: EntityId::placeholder(),
            name: name.into(),
            country_id: city.country_id.clone(),
            state_id: city.state_id.clone(),
            city_id: city.id.clone(),
        }
    }
}

impl HierarchyEntity for Society {
    const KIND: EntityKind = EntityKind::Society;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), String> {
        require_text(Self::KIND, "name", &self.name)?;
        require_parent(Self::KIND, fields::COUNTRY_ID, &self.country_id)?;
        require_parent(Self::KIND, fields::STATE_ID, &self.state_id)?;
        require_parent(Self::KIND, fields::CITY_ID, &self.city_id)
    }
}

/// Optional container inside a society.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub block_type: String,
    pub society_id: EntityId,
}

impl Block {
    pub fn new(name: impl Into<String>, society_id: EntityId) -> Self {
        Self {
            name: name.into(),
            society_id,
            ..Default::default()
        }
    }
}

impl HierarchyEntity for Block {
    const KIND: EntityKind = EntityKind::Block;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), String> {
        require_text(Self::KIND, "name", &self.name)?;
        require_parent(Self::KIND, fields::SOCIETY_ID, &self.society_id)
    }
}

/// A tower, either directly in a society or inside one of its blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tower {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    pub society_id: EntityId,
    #[serde(default, with = "optional_id")]
    pub block_id: Option<EntityId>,
}

impl Tower {
    pub fn new(name: impl Into<String>, society_id: EntityId) -> Self {
        Self {
            name: name.into(),
            society_id,
            ..Default::default()
        }
    }

    pub fn in_block(mut self, block_id: EntityId) -> Self {
        self.block_id = Some(block_id);
        self
    }
}

impl HierarchyEntity for Tower {
    const KIND: EntityKind = EntityKind::Tower;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), String> {
        require_text(Self::KIND, "name", &self.name)?;
        require_parent(Self::KIND, fields::SOCIETY_ID, &self.society_id)
    }
}

/// Occupancy status of a flat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlatStatus {
    #[default]
    Vacant,
    Occupied,
    Reserved,
    UnderMaintenance,
}

/// The leaf of the hierarchy.
///
/// A flat hangs directly off its society, or off exactly one block or tower
/// of that society. `block_id` and `tower_id` are never both set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flat {
    #[serde(default)]
    pub id: EntityId,
    pub number: String,
    #[serde(default)]
    pub floor: i32,
    #[serde(rename = "type", default)]
    pub flat_type: String,
    #[serde(default)]
    pub area: f64,
    #[serde(default)]
    pub status: FlatStatus,
    #[serde(default)]
    pub society_id: EntityId,
    #[serde(default, with = "optional_id")]
    pub block_id: Option<EntityId>,
    #[serde(default, with = "optional_id")]
    pub tower_id: Option<EntityId>,
}

impl Flat {
    /// A flat with no placement yet; the placement resolver fills it in.
    pub fn new(number: impl Into<String>, floor: i32) -> Self {
        Self {
            number: number.into(),
            floor,
            ..Default::default()
        }
    }

    /// The parent pointer triple of this flat.
    pub fn placement(&self) -> Placement {
        Placement {
            society_id: self.society_id.clone(),
            block_id: self.block_id.clone(),
            tower_id: self.tower_id.clone(),
        }
    }

    /// Overwrites all three parent fields.
    pub fn place(&mut self, placement: Placement) {
        self.society_id = placement.society_id;
        self.block_id = placement.block_id;
        self.tower_id = placement.tower_id;
    }

    pub fn placed(mut self, placement: Placement) -> Self {
        self.place(placement);
        self
    }
}

impl HierarchyEntity for Flat {
    const KIND: EntityKind = EntityKind::Flat;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn label(&self) -> &str {
        &self.number
    }

    fn validate(&self) -> Result<(), String> {
        require_text(Self::KIND, "number", &self.number)?;
        if !self.area.is_finite() || self.area < 0.0 {
            return Err(format!("flat area {} must be a non-negative number", self.area));
        }
        self.placement().check()
    }
}
