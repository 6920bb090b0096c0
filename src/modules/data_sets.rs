use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::entity::{Audit, Entity, FieldDef, FieldKind, FieldValue, IntoDto, Record};
use crate::error::Result;
use crate::query::Searchable;

#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub row_count: i64,
    pub audit: Audit,
}

impl Entity for DataSet {
    type Key = Uuid;
    const NAME: &'static str = "data_sets";
    const KEY: &'static str = "id";
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::new("id", FieldKind::Uuid),
        FieldDef::new("name", FieldKind::Text),
        FieldDef::new("description", FieldKind::Text),
        FieldDef::new("notes", FieldKind::Text),
        FieldDef::new("row_count", FieldKind::Int),
        Audit::CREATED_AT,
        Audit::UPDATED_AT,
        Audit::CREATED_BY,
    ];

    fn key(&self) -> Uuid {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.clone().into()),
            "description" => Some(self.description.clone().into()),
            "notes" => Some(self.notes.clone().into()),
            "row_count" => Some(self.row_count.into()),
            other => self.audit.field(other),
        }
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.uuid("id")?,
            name: record.text("name")?,
            description: record.opt_text("description")?,
            notes: record.opt_text("notes")?,
            row_count: record.int("row_count")?,
            audit: Audit::from_record(record)?,
        })
    }
}

impl Searchable for DataSet {
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "description", "notes"];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSetDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub row_count: i64,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

impl IntoDto for DataSet {
    type Dto = DataSetDto;

    fn to_dto(&self) -> DataSetDto {
        DataSetDto {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            row_count: self.row_count,
            created_at: self.audit.created_at,
            created_by: self.audit.created_by.clone(),
        }
    }
}
