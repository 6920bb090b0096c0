//! Persisted record types and the reflective surface the query layer needs.
//!
//! An [`Entity`] declares a static field catalogue. Predicates, ordering and
//! storage adapters only ever address fields through that catalogue, so a
//! field name that reaches SQL has always been validated first.

pub mod record;
pub mod value;

pub use record::Record;
pub use value::{FieldKind, FieldValue};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{QueryError, Result};

/// One entry of an entity's field catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// A persisted record type with a unique key.
pub trait Entity: Clone + Send + Sync + 'static {
    type Key: Clone + Into<FieldValue> + std::fmt::Debug + Send + Sync;

    /// Collection name; doubles as the SQL table name.
    const NAME: &'static str;

    /// Name of the key field. Must appear in [`Entity::FIELDS`].
    const KEY: &'static str;

    /// Every persisted field, in column order.
    const FIELDS: &'static [FieldDef];

    fn key(&self) -> Self::Key;

    /// Read a field by its catalogue name. `None` if the entity has no such field.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Rebuild the entity from a storage record.
    fn from_record(record: &Record) -> Result<Self>;

    /// Look up a field definition. Matching ignores case and underscores,
    /// so `StartedAt`, `startedAt` and `started_at` all resolve.
    fn field_def(name: &str) -> Result<&'static FieldDef> {
        let wanted = normalize(name);
        Self::FIELDS
            .iter()
            .find(|def| normalize(def.name) == wanted)
            .ok_or_else(|| QueryError::UnknownField {
                entity: Self::NAME,
                field: name.to_string(),
            })
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Pure mapping from an entity to its transport shape.
pub trait IntoDto: Entity {
    type Dto: Serialize + Send;

    fn to_dto(&self) -> Self::Dto;

    fn to_dtos(items: &[Self]) -> Vec<Self::Dto> {
        items.iter().map(Self::to_dto).collect()
    }
}

/// Audit columns shared by every entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
}

impl Audit {
    pub const CREATED_AT: FieldDef = FieldDef::new("created_at", FieldKind::Timestamp);
    pub const UPDATED_AT: FieldDef = FieldDef::new("updated_at", FieldKind::Timestamp);
    pub const CREATED_BY: FieldDef = FieldDef::new("created_by", FieldKind::Text);

    pub fn new(created_at: DateTime<Utc>, created_by: impl Into<String>) -> Self {
        Self {
            created_at,
            updated_at: None,
            created_by: Some(created_by.into()),
        }
    }

    pub fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "created_at" => Some(self.created_at.into()),
            "updated_at" => Some(self.updated_at.into()),
            "created_by" => Some(self.created_by.clone().into()),
            _ => None,
        }
    }

    pub fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            created_at: record.timestamp("created_at")?,
            updated_at: record.opt_timestamp("updated_at")?,
            created_by: record.opt_text("created_by")?,
        })
    }
}
