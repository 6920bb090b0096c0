use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::entity::{Audit, Entity, FieldDef, FieldKind, FieldValue, IntoDto, Record};
use crate::error::Result;
use crate::query::Searchable;

/// A deployed instance of a tenant's project (one per environment).
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectInstance {
    pub id: Uuid,
    pub tenant: String,
    pub name: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub environment: String,
    pub is_active: bool,
    pub audit: Audit,
}

impl Entity for ProjectInstance {
    type Key = Uuid;
    const NAME: &'static str = "project_instances";
    const KEY: &'static str = "id";
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::new("id", FieldKind::Uuid),
        FieldDef::new("tenant", FieldKind::Text),
        FieldDef::new("name", FieldKind::Text),
        FieldDef::new("description", FieldKind::Text),
        FieldDef::new("notes", FieldKind::Text),
        FieldDef::new("environment", FieldKind::Text),
        FieldDef::new("is_active", FieldKind::Bool),
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
            "tenant" => Some(self.tenant.clone().into()),
            "name" => Some(self.name.clone().into()),
            "description" => Some(self.description.clone().into()),
            "notes" => Some(self.notes.clone().into()),
            "environment" => Some(self.environment.clone().into()),
            "is_active" => Some(self.is_active.into()),
            other => self.audit.field(other),
        }
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.uuid("id")?,
            tenant: record.text("tenant")?,
            name: record.text("name")?,
            description: record.opt_text("description")?,
            notes: record.opt_text("notes")?,
            environment: record.text("environment")?,
            is_active: record.bool("is_active")?,
            audit: Audit::from_record(record)?,
        })
    }
}

impl Searchable for ProjectInstance {
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "description", "notes"];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInstanceDto {
    pub id: Uuid,
    pub tenant: String,
    pub name: String,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub environment: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl IntoDto for ProjectInstance {
    type Dto = ProjectInstanceDto;

    fn to_dto(&self) -> ProjectInstanceDto {
        ProjectInstanceDto {
            id: self.id,
            tenant: self.tenant.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            notes: self.notes.clone(),
            environment: self.environment.clone(),
            is_active: self.is_active,
            created_at: self.audit.created_at,
            updated_at: self.audit.updated_at,
        }
    }
}
