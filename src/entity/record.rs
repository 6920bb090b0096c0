use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::value::FieldValue;
use crate::error::{QueryError, Result};

/// Column values of one stored row, keyed by catalogue name.
#[derive(Debug, Clone, Default)]
pub struct Record {
    values: Vec<(&'static str, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, name: &'static str, value: FieldValue) {
        self.values.push((name, value));
    }

    pub fn with(mut self, name: &'static str, value: impl Into<FieldValue>) -> Self {
        self.push(name, value.into());
        self
    }

    /// Missing columns read as null.
    pub fn get(&self, name: &str) -> &FieldValue {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
            .unwrap_or(&FieldValue::Null)
    }

    pub fn text(&self, name: &str) -> Result<String> {
        self.opt_text(name)?
            .ok_or_else(|| QueryError::decode(name, "unexpected null"))
    }

    pub fn opt_text(&self, name: &str) -> Result<Option<String>> {
        match self.get(name) {
            FieldValue::Null => Ok(None),
            FieldValue::Text(s) => Ok(Some(s.clone())),
            other => Err(mismatch(name, "text", other)),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.get(name) {
            FieldValue::Int(i) => Ok(*i),
            other => Err(mismatch(name, "integer", other)),
        }
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        match self.get(name) {
            FieldValue::Bool(b) => Ok(*b),
            other => Err(mismatch(name, "boolean", other)),
        }
    }

    pub fn uuid(&self, name: &str) -> Result<Uuid> {
        match self.get(name) {
            FieldValue::Uuid(u) => Ok(*u),
            other => Err(mismatch(name, "uuid", other)),
        }
    }

    pub fn timestamp(&self, name: &str) -> Result<DateTime<Utc>> {
        self.opt_timestamp(name)?
            .ok_or_else(|| QueryError::decode(name, "unexpected null"))
    }

    pub fn opt_timestamp(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
        match self.get(name) {
            FieldValue::Null => Ok(None),
            FieldValue::Timestamp(ts) => Ok(Some(*ts)),
            other => Err(mismatch(name, "timestamp", other)),
        }
    }
}

fn mismatch(name: &str, expected: &str, got: &FieldValue) -> QueryError {
    QueryError::decode(name, format!("expected {expected}, got {got:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_reads_as_null() {
        let record = Record::new();
        assert_eq!(record.opt_text("notes").unwrap(), None);
        assert!(record.text("notes").is_err());
    }

    #[test]
    fn typed_getters_reject_wrong_kind() {
        let record = Record::new().with("id", "seven");
        let err = record.int("id").unwrap_err();
        assert!(err.to_string().contains("expected integer"));
    }
}
