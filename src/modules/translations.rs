use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::{Audit, Entity, FieldDef, FieldKind, FieldValue, IntoDto, Record};
use crate::error::Result;
use crate::query::Searchable;

/// A localized string for one key and culture.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub id: i64,
    pub key: String,
    pub culture: String,
    pub value: String,
    pub notes: Option<String>,
    /// Set when the value came from machine translation and awaits review.
    pub is_machine_translated: bool,
    pub audit: Audit,
}

impl Entity for Translation {
    type Key = i64;
    const NAME: &'static str = "translations";
    const KEY: &'static str = "id";
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::new("id", FieldKind::Int),
        FieldDef::new("key", FieldKind::Text),
        FieldDef::new("culture", FieldKind::Text),
        FieldDef::new("value", FieldKind::Text),
        FieldDef::new("notes", FieldKind::Text),
        FieldDef::new("is_machine_translated", FieldKind::Bool),
        Audit::CREATED_AT,
        Audit::UPDATED_AT,
        Audit::CREATED_BY,
    ];

    fn key(&self) -> i64 {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.into()),
            "key" => Some(self.key.clone().into()),
            "culture" => Some(self.culture.clone().into()),
            "value" => Some(self.value.clone().into()),
            "notes" => Some(self.notes.clone().into()),
            "is_machine_translated" => Some(self.is_machine_translated.into()),
            other => self.audit.field(other),
        }
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.int("id")?,
            key: record.text("key")?,
            culture: record.text("culture")?,
            value: record.text("value")?,
            notes: record.opt_text("notes")?,
            is_machine_translated: record.bool("is_machine_translated")?,
            audit: Audit::from_record(record)?,
        })
    }
}

impl Searchable for Translation {
    const SEARCH_FIELDS: &'static [&'static str] = &["key", "value", "notes"];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationDto {
    pub id: i64,
    pub key: String,
    pub culture: String,
    pub value: String,
    pub notes: Option<String>,
    pub is_machine_translated: bool,
    pub updated_at: DateTime<Utc>,
}

impl IntoDto for Translation {
    type Dto = TranslationDto;

    fn to_dto(&self) -> TranslationDto {
        TranslationDto {
            id: self.id,
            key: self.key.clone(),
            culture: self.culture.clone(),
            value: self.value.clone(),
            notes: self.notes.clone(),
            is_machine_translated: self.is_machine_translated,
            updated_at: self.audit.updated_at.unwrap_or(self.audit.created_at),
        }
    }
}
