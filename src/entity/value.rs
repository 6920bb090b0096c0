use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use uuid::Uuid;

/// Storage type of a field, as declared in an entity's field catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int,
    Text,
    Timestamp,
    Uuid,
}

/// A single field value read from (or compared against) an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(_) => Some(FieldKind::Bool),
            FieldValue::Int(_) => Some(FieldKind::Int),
            FieldValue::Text(_) => Some(FieldKind::Text),
            FieldValue::Timestamp(_) => Some(FieldKind::Timestamp),
            FieldValue::Uuid(_) => Some(FieldKind::Uuid),
        }
    }

    /// Parse a raw string as a value of the given kind.
    ///
    /// Timestamps accept RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC).
    pub fn parse(kind: FieldKind, raw: &str) -> Option<FieldValue> {
        let trimmed = raw.trim();
        match kind {
            FieldKind::Text => Some(FieldValue::Text(raw.to_string())),
            FieldKind::Int => trimmed.parse().ok().map(FieldValue::Int),
            FieldKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(FieldValue::Bool(true)),
                "false" | "0" | "no" => Some(FieldValue::Bool(false)),
                _ => None,
            },
            FieldKind::Uuid => Uuid::parse_str(trimmed).ok().map(FieldValue::Uuid),
            FieldKind::Timestamp => {
                if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
                    return Some(FieldValue::Timestamp(ts.with_timezone(&Utc)));
                }
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| FieldValue::Timestamp(dt.and_utc()))
            }
        }
    }

    /// Convert to `kind`, parsing text when needed. `None` if incompatible.
    pub fn coerce(self, kind: FieldKind) -> Option<FieldValue> {
        match self {
            FieldValue::Null => Some(FieldValue::Null),
            v if v.kind() == Some(kind) => Some(v),
            FieldValue::Text(raw) => FieldValue::parse(kind, &raw),
            _ => None,
        }
    }

    /// SQL-style comparison: `None` when either side is null or the kinds differ.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::Int(a), FieldValue::Int(b)) => Some(a.cmp(b)),
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
            (FieldValue::Uuid(a), FieldValue::Uuid(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used for sorting. Nulls sort first.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
            (FieldValue::Null, _) => Ordering::Less,
            (_, FieldValue::Null) => Ordering::Greater,
            (a, b) => a.compare(b).unwrap_or_else(|| a.rank().cmp(&b.rank())),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Int(_) => 2,
            FieldValue::Text(_) => 3,
            FieldValue::Timestamp(_) => 4,
            FieldValue::Uuid(_) => 5,
        }
    }
}

/// Canonical timestamp text. Fixed width, so lexical order is chronological.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Int(i) => write!(f, "{i}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Timestamp(ts) => write!(f, "{}", format_timestamp(ts)),
            FieldValue::Uuid(u) => write!(f, "{u}"),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl From<Uuid> for FieldValue {
    fn from(v: Uuid) -> Self {
        FieldValue::Uuid(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}
