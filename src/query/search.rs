//! Multi-field, case-insensitive "contains" search.

use std::marker::PhantomData;

use async_trait::async_trait;

use super::filter::SearchFilter;
use super::predicate::Predicate;
use super::registry::FilterHandler;
use crate::entity::Entity;
use crate::error::Result;

/// Entities that support free-text search over a fixed set of text fields.
pub trait Searchable: Entity {
    const SEARCH_FIELDS: &'static [&'static str];
}

/// Reusable search predicate for one term. A match on any field qualifies.
#[derive(Debug, Clone)]
pub struct SearchSpecification<E> {
    term: Option<String>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Searchable> SearchSpecification<E> {
    /// Blank terms produce an inactive specification.
    pub fn new(term: Option<&str>) -> Self {
        let term = term.map(str::trim).filter(|t| !t.is_empty());
        Self {
            term: term.map(str::to_string),
            _entity: PhantomData,
        }
    }

    pub fn is_active(&self) -> bool {
        self.term.is_some()
    }

    /// Inactive specifications match everything.
    pub fn to_predicate(&self) -> Result<Predicate<E>> {
        let Some(term) = &self.term else {
            return Ok(Predicate::always());
        };
        E::SEARCH_FIELDS
            .iter()
            .map(|field| Predicate::contains(field, term))
            .collect::<Result<Vec<_>>>()
            .map(Predicate::any_of)
    }

    pub fn is_satisfied_by(&self, entity: &E) -> Result<bool> {
        Ok(self.to_predicate()?.matches(entity))
    }
}

/// Routes [`SearchFilter`] through an entity's [`SearchSpecification`].
pub struct SearchFilterHandler<E>(PhantomData<fn() -> E>);

impl<E> Default for SearchFilterHandler<E> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

#[async_trait]
impl<E: Searchable> FilterHandler<E, SearchFilter> for SearchFilterHandler<E> {
    async fn expression(&self, filter: &SearchFilter) -> Result<Predicate<E>> {
        SearchSpecification::new(filter.term()).to_predicate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::ProjectInstance;
    use crate::modules::fixtures::sample_project_instances;

    fn hello_world() -> ProjectInstance {
        let mut row = sample_project_instances(1).remove(0);
        row.name = "Hello World".to_string();
        row
    }

    #[test]
    fn matches_any_search_field_ignoring_case() {
        let row = hello_world();
        for term in ["hello", "WORLD", "o w", "instance 1"] {
            let spec = SearchSpecification::<ProjectInstance>::new(Some(term));
            assert!(spec.is_satisfied_by(&row).unwrap(), "term {term:?}");
        }
        let spec = SearchSpecification::<ProjectInstance>::new(Some("goodbye"));
        assert!(!spec.is_satisfied_by(&row).unwrap());
    }

    #[test]
    fn blank_term_is_inactive_and_matches_everything() {
        for term in [None, Some(""), Some("   ")] {
            let spec = SearchSpecification::<ProjectInstance>::new(term);
            assert!(!spec.is_active());
            assert!(spec.to_predicate().unwrap().is_always());
        }
    }

    #[test]
    fn term_is_trimmed_before_matching() {
        let spec = SearchSpecification::<ProjectInstance>::new(Some("  hello  "));
        assert!(spec.is_satisfied_by(&hello_world()).unwrap());
    }

    #[test]
    fn null_search_field_does_not_block_other_fields() {
        let row = hello_world();
        assert!(row.notes.is_none());
        let spec = SearchSpecification::<ProjectInstance>::new(Some("hello"));
        assert!(spec.is_satisfied_by(&row).unwrap());
    }

    #[tokio::test]
    async fn handler_builds_the_specification_predicate() {
        let handler = SearchFilterHandler::<ProjectInstance>::default();
        let predicate = handler
            .expression(&SearchFilter::new(" World "))
            .await
            .unwrap();
        assert_eq!(
            predicate,
            SearchSpecification::<ProjectInstance>::new(Some("world"))
                .to_predicate()
                .unwrap()
        );
    }
}
