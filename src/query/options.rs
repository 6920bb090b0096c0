use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::filter::QueryFilter;
use super::pagination::PaginationParameters;
use crate::entity::Entity;
use crate::error::{QueryError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for OrderDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(OrderDirection::Asc),
            "desc" => Ok(OrderDirection::Desc),
            other => Err(QueryError::InvalidOrdering(format!(
                "unknown direction `{other}`"
            ))),
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "asc"),
            OrderDirection::Desc => write!(f, "desc"),
        }
    }
}

/// A resolved sort on one catalogue field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: &'static str,
    pub direction: OrderDirection,
}

/// Requested ordering, by field name as the caller spelled it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderingParameters {
    pub order_by: Option<String>,
    #[serde(default)]
    pub order_direction: OrderDirection,
}

impl OrderingParameters {
    pub fn new(field: impl Into<String>, direction: OrderDirection) -> Self {
        Self {
            order_by: Some(field.into()),
            order_direction: direction,
        }
    }

    /// `None` when no field was requested.
    pub fn resolve<E: Entity>(&self) -> Result<Option<OrderBy>> {
        let Some(field) = self.order_by.as_deref().map(str::trim).filter(|f| !f.is_empty())
        else {
            return Ok(None);
        };
        let def = E::field_def(field)?;
        Ok(Some(OrderBy {
            field: def.name,
            direction: self.order_direction,
        }))
    }
}

/// Ordered set of filters, applied conjunctively.
#[derive(Debug, Clone, Default)]
pub struct FilteringParameters {
    filters: Vec<Arc<dyn QueryFilter>>,
}

impl FilteringParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl QueryFilter) -> Self {
        self.push(filter);
        self
    }

    pub fn push(&mut self, filter: impl QueryFilter) {
        self.filters.push(Arc::new(filter));
    }

    pub fn all(&self) -> &[Arc<dyn QueryFilter>] {
        &self.filters
    }

    pub fn active(&self) -> impl Iterator<Item = &Arc<dyn QueryFilter>> {
        self.filters.iter().filter(|f| f.is_active())
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Per-request composition settings.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Materialize rows detached from any storage-side change tracking.
    pub as_no_tracking: bool,
    pub filtering: FilteringParameters,
    pub ordering: OrderingParameters,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_tracking(mut self) -> Self {
        self.as_no_tracking = true;
        self
    }

    pub fn filter(mut self, filter: impl QueryFilter) -> Self {
        self.filtering.push(filter);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.ordering = OrderingParameters::new(field, direction);
        self
    }
}

/// The request envelope: filter, order, page.
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    pub options: QueryOptions,
    pub pagination: PaginationParameters,
}

impl ListRequest {
    pub fn new(options: QueryOptions, pagination: PaginationParameters) -> Self {
        Self {
            options,
            pagination,
        }
    }
}
