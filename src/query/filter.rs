//! Caller-supplied filter payloads and the generic handlers that turn the
//! field-addressed ones into predicates.

use std::any::Any;
use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;

use super::predicate::{CompareOp, Predicate};
use super::registry::FilterHandler;
use crate::entity::{Entity, FieldValue};
use crate::error::Result;

/// A typed predicate fragment. Polymorphic: the registry dispatches on the
/// concrete type.
pub trait QueryFilter: Any + Send + Sync + Debug {
    /// Short name used in diagnostics.
    fn kind(&self) -> &'static str;

    /// Inactive filters are skipped entirely.
    fn is_active(&self) -> bool;

    fn as_any(&self) -> &dyn Any;

    /// Fully qualified type name. Names the filter in wiring errors, both
    /// from [`FilterHandlerRegistry::require`] and from per-request lookups.
    ///
    /// [`FilterHandlerRegistry::require`]: super::registry::FilterHandlerRegistry::require
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Free-text search across an entity's searchable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub search_term: Option<String>,
}

impl SearchFilter {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            search_term: Some(term.into()),
        }
    }

    /// The trimmed term, or `None` when blank.
    pub fn term(&self) -> Option<&str> {
        self.search_term
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

impl QueryFilter for SearchFilter {
    fn kind(&self) -> &'static str {
        "search"
    }

    fn is_active(&self) -> bool {
        self.term().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `field == value`. A null value matches rows where the field is null.
#[derive(Debug, Clone, PartialEq)]
pub struct EqualsFilter {
    pub field: String,
    pub value: FieldValue,
}

impl EqualsFilter {
    pub fn new(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl QueryFilter for EqualsFilter {
    fn kind(&self) -> &'static str {
        "equals"
    }

    fn is_active(&self) -> bool {
        !self.field.trim().is_empty()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Inclusive range on one field. Either bound may be open.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFilter {
    pub field: String,
    pub from: Option<FieldValue>,
    pub to: Option<FieldValue>,
}

impl RangeFilter {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            from: None,
            to: None,
        }
    }

    pub fn from(mut self, value: impl Into<FieldValue>) -> Self {
        self.from = Some(value.into());
        self
    }

    pub fn to(mut self, value: impl Into<FieldValue>) -> Self {
        self.to = Some(value.into());
        self
    }

    fn bounds(&self) -> impl Iterator<Item = (CompareOp, &FieldValue)> {
        let from = self.from.iter().filter(|v| !v.is_null());
        let to = self.to.iter().filter(|v| !v.is_null());
        from.map(|v| (CompareOp::Ge, v))
            .chain(to.map(|v| (CompareOp::Le, v)))
    }
}

impl QueryFilter for RangeFilter {
    fn kind(&self) -> &'static str {
        "range"
    }

    fn is_active(&self) -> bool {
        !self.field.trim().is_empty() && self.bounds().next().is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Handles [`EqualsFilter`] for any entity.
pub struct EqualsFilterHandler<E>(PhantomData<fn() -> E>);

impl<E> Default for EqualsFilterHandler<E> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<E: Entity> FilterHandler<E, EqualsFilter> for EqualsFilterHandler<E> {
    async fn expression(&self, filter: &EqualsFilter) -> Result<Predicate<E>> {
        Predicate::eq(filter.field.trim(), filter.value.clone())
    }
}

/// Handles [`RangeFilter`] for any entity.
pub struct RangeFilterHandler<E>(PhantomData<fn() -> E>);

impl<E> Default for RangeFilterHandler<E> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<E: Entity> FilterHandler<E, RangeFilter> for RangeFilterHandler<E> {
    async fn expression(&self, filter: &RangeFilter) -> Result<Predicate<E>> {
        let field = filter.field.trim();
        filter
            .bounds()
            .map(|(op, value)| Predicate::compare(field, op, value.clone()))
            .collect::<Result<Vec<_>>>()
            .map(Predicate::all_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_filter_is_inactive_when_blank() {
        assert!(!SearchFilter::default().is_active());
        assert!(!SearchFilter::new("").is_active());
        assert!(!SearchFilter::new("   ").is_active());
        assert!(SearchFilter::new(" x ").is_active());
        assert_eq!(SearchFilter::new(" x ").term(), Some("x"));
    }

    #[test]
    fn range_filter_needs_a_bound() {
        assert!(!RangeFilter::new("id").is_active());
        assert!(!RangeFilter::new("id").from(FieldValue::Null).is_active());
        assert!(RangeFilter::new("id").to(5).is_active());
        assert!(!RangeFilter::new(" ").from(1).is_active());
    }

    #[test]
    fn equals_filter_needs_a_field() {
        assert!(!EqualsFilter::new("", 1).is_active());
        assert!(EqualsFilter::new("level", "error").is_active());
    }
}
