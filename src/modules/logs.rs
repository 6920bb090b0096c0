//! Operation logs. Sensitive: only root callers see any rows.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{Audit, Entity, FieldDef, FieldKind, FieldValue, IntoDto, Record};
use crate::error::{QueryError, Result};
use crate::query::Searchable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(QueryError::decode("level", format!("unknown level `{other}`"))),
        }
    }
}

/// One recorded operation (an import run, a sync, a translation batch).
#[derive(Debug, Clone, PartialEq)]
pub struct Log {
    pub id: i64,
    pub level: LogLevel,
    pub source: String,
    pub message: String,
    pub details: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub audit: Audit,
}

impl Entity for Log {
    type Key = i64;
    const NAME: &'static str = "logs";
    const KEY: &'static str = "id";
    const FIELDS: &'static [FieldDef] = &[
        FieldDef::new("id", FieldKind::Int),
        FieldDef::new("level", FieldKind::Text),
        FieldDef::new("source", FieldKind::Text),
        FieldDef::new("message", FieldKind::Text),
        FieldDef::new("details", FieldKind::Text),
        FieldDef::new("started_at", FieldKind::Timestamp),
        FieldDef::new("finished_at", FieldKind::Timestamp),
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
            "level" => Some(self.level.as_str().into()),
            "source" => Some(self.source.clone().into()),
            "message" => Some(self.message.clone().into()),
            "details" => Some(self.details.clone().into()),
            "started_at" => Some(self.started_at.into()),
            "finished_at" => Some(self.finished_at.into()),
            other => self.audit.field(other),
        }
    }

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Self {
            id: record.int("id")?,
            level: record.text("level")?.parse()?,
            source: record.text("source")?,
            message: record.text("message")?,
            details: record.opt_text("details")?,
            started_at: record.timestamp("started_at")?,
            finished_at: record.opt_timestamp("finished_at")?,
            audit: Audit::from_record(record)?,
        })
    }
}

impl Searchable for Log {
    const SEARCH_FIELDS: &'static [&'static str] = &["message", "source", "details"];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogDto {
    pub id: i64,
    pub level: LogLevel,
    pub source: String,
    pub message: String,
    pub details: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Milliseconds between start and finish, once finished.
    pub duration_ms: Option<i64>,
    pub created_by: Option<String>,
}

impl IntoDto for Log {
    type Dto = LogDto;

    fn to_dto(&self) -> LogDto {
        LogDto {
            id: self.id,
            level: self.level,
            source: self.source.clone(),
            message: self.message.clone(),
            details: self.details.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            duration_ms: self
                .finished_at
                .map(|end| (end - self.started_at).num_milliseconds()),
            created_by: self.audit.created_by.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Log {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Log {
            id: 7,
            level: LogLevel::Warning,
            source: "importer".into(),
            message: "Hello World".into(),
            details: None,
            started_at: start,
            finished_at: Some(start + chrono::Duration::milliseconds(1500)),
            audit: Audit::new(start, "system"),
        }
    }

    #[test]
    fn dto_computes_duration() {
        assert_eq!(sample().to_dto().duration_ms, Some(1500));
    }

    #[test]
    fn record_round_trip_through_fields() {
        let log = sample();
        let mut record = Record::new();
        for def in Log::FIELDS {
            record.push(def.name, log.field(def.name).unwrap());
        }
        assert_eq!(Log::from_record(&record).unwrap(), log);
    }

    #[test]
    fn unknown_level_fails_to_decode() {
        assert!("fatal".parse::<LogLevel>().is_err());
    }
}
