//! Query descriptors for live subscriptions.
//!
//! A [`Query`] names one collection and a conjunction of simple filters over
//! top-level document fields. That is all a parent-scoped hierarchy needs, and
//! it maps onto any document or relational store.

use habitat_model::EntityKind;
use habitat_types::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One condition on a top-level document field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    /// The field holds this id (string or integer form).
    Eq { field: String, value: EntityId },
    /// The field is missing, null, `""`, `0` or `"0"`.
    Absent { field: String },
}

impl Filter {
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Filter::Eq { field, value } => {
                doc.get(field).and_then(id_text).as_deref() == Some(value.as_str())
            }
            Filter::Absent { field } => match doc.get(field).and_then(id_text) {
                None => true,
                Some(text) => text.is_empty() || text == "0",
            },
        }
    }
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A collection plus filters, all of which must hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    pub kind: EntityKind,
    #[serde(default)]
    pub filters: Vec<Filter>,
}

impl Query {
    /// Every document of a kind. Only meaningful for the hierarchy root.
    pub fn all(kind: EntityKind) -> Self {
        Self {
            kind,
            filters: Vec::new(),
        }
    }

    /// Documents whose `field` points at `parent`.
    pub fn children(kind: EntityKind, field: &str, parent: &EntityId) -> Self {
        Self::all(kind).and_eq(field, parent)
    }

    pub fn and_eq(mut self, field: &str, value: &EntityId) -> Self {
        self.filters.push(Filter::Eq {
            field: field.to_string(),
            value: value.clone(),
        });
        self
    }

    pub fn and_absent(mut self, field: &str) -> Self {
        self.filters.push(Filter::Absent {
            field: field.to_string(),
        });
        self
    }

    pub fn collection(&self) -> &'static str {
        self.kind.collection()
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())?;
        for (i, filter) in self.filters.iter().enumerate() {
            f.write_str(if i == 0 { " where " } else { " and " })?;
            match filter {
                Filter::Eq { field, value } => write!(f, "{field} = {value}")?,
                Filter::Absent { field } => write!(f, "{field} is absent")?,
            }
        }
        Ok(())
    }
}
