//! Error taxonomy for the query pipeline.
//!
//! Not-found is never an error (lookups return `Ok(None)`) and a caller
//! without access observes an empty result, so neither appears here.

/// Everything that can go wrong while composing or materializing a query.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Missing startup wiring for an (entity, filter) pair.
    #[error("no filter handler registered for `{filter}` on `{entity}`")]
    UnregisteredHandler {
        entity: &'static str,
        filter: &'static str,
    },

    #[error("unknown field `{field}` on `{entity}`")]
    UnknownField { entity: &'static str, field: String },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid ordering: {0}")]
    InvalidOrdering(String),

    #[error("cannot decode field `{field}`: {reason}")]
    Decode { field: String, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("storage connection poisoned")]
    Poisoned,

    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("query cancelled")]
    Cancelled,
}

impl QueryError {
    /// True for wiring mistakes that no request can recover from.
    pub fn is_configuration(&self) -> bool {
        matches!(self, QueryError::UnregisteredHandler { .. })
    }

    pub(crate) fn decode(field: &str, reason: impl Into<String>) -> Self {
        QueryError::Decode {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
