//! Identifier types used throughout the Habitat core.
//!
//! Ids are assigned by the backing store on creation. Document stores hand out
//! strings, relational stores tend to hand out integers, so an [`EntityId`]
//! accepts either on the wire and always serializes as a string. Ids generated
//! locally are UUID v7, which keeps documents in creation order when sorted.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a stored entity.
///
/// The empty string and `"0"` are the placeholder id carried by entities that
/// have not been created yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    /// Generates a fresh, time-ordered id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// The id carried by an entity before the store has assigned one.
    #[must_use]
    pub const fn placeholder() -> Self {
        Self(String::new())
    }

    /// Returns true for the empty id and for `"0"`.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.0.is_empty() || self.0 == "0"
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses a non-placeholder id from user input.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let id = Self(s.trim().to_string());
        if id.is_placeholder() {
            return Err(crate::Error::InvalidId(s.to_string()));
        }
        Ok(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for EntityId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

struct IdVisitor;

impl<'de> Visitor<'de> for IdVisitor {
    type Value = EntityId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or integer id")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<EntityId, E> {
        Ok(EntityId(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<EntityId, E> {
        Ok(EntityId(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<EntityId, E> {
        Ok(EntityId(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<EntityId, E> {
        if v < 0 {
            return Err(E::invalid_value(de::Unexpected::Signed(v), &self));
        }
        Ok(EntityId(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor)
    }
}

/// Serde adapter for optional parent references.
///
/// Stores disagree on how "no parent" is written: a missing field, `null`,
/// `""` and `0` all occur. They all read back as `None`; `None` is written as
/// `null` so an update always overwrites a previous reference.
///
/// ```ignore
/// #[serde(default, with = "habitat_types::optional_id")]
/// pub block_id: Option<EntityId>,
/// ```
pub mod optional_id {
    use super::EntityId;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<EntityId>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(id) if !id.is_placeholder() => serializer.serialize_str(id.as_str()),
            _ => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<EntityId>, D::Error> {
        let raw = Option::<EntityId>::deserialize(deserializer)?;
        Ok(raw.filter(|id| !id.is_placeholder()))
    }
}
