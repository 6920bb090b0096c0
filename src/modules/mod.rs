//! Entity modules. Each one defines its entity, DTO, searchable fields and
//! filter wiring; [`EntityQueries`] serves them all the same way.

pub mod data_sets;
pub mod fixtures;
pub mod logs;
pub mod project_instances;
pub mod translations;

use std::sync::Arc;

use crate::auth::{AccessPolicy, AuthorizationProvider, RootOnly, Unrestricted};
use crate::config::QuerySettings;
use crate::entity::IntoDto;
use crate::error::Result;
use crate::query::{
    Cancellation, EqualsFilter, FilterHandlerRegistry, ListRequest, PaginatedList, QueryOptions,
    QueryService, RangeFilter, SearchFilter, SearchFilterHandler, Searchable,
    filter::{EqualsFilterHandler, RangeFilterHandler},
};
use crate::source::Queryable;

pub use data_sets::DataSet;
pub use logs::Log;
pub use project_instances::ProjectInstance;
pub use translations::Translation;

/// Look up one entity by key.
#[derive(Debug, Clone)]
pub struct GetByIdQuery<K> {
    pub id: K,
    pub options: QueryOptions,
}

impl<K> GetByIdQuery<K> {
    pub fn new(id: K) -> Self {
        Self {
            id,
            options: QueryOptions::default(),
        }
    }
}

/// List and lookup handlers for one entity, returning DTOs.
pub struct EntityQueries<E: IntoDto> {
    service: QueryService<E>,
}

impl<E: IntoDto> EntityQueries<E> {
    pub fn new(service: QueryService<E>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &QueryService<E> {
        &self.service
    }

    pub async fn list(
        &self,
        request: &ListRequest,
        cancel: &Cancellation,
    ) -> Result<PaginatedList<E::Dto>> {
        self.service.list(request, E::to_dto, cancel).await
    }

    pub async fn get_by_id(
        &self,
        query: GetByIdQuery<E::Key>,
        cancel: &Cancellation,
    ) -> Result<Option<E::Dto>> {
        let found = self
            .service
            .get_by_id(query.id, Some(&query.options), cancel)
            .await?;
        Ok(found.as_ref().map(E::to_dto))
    }
}

/// Register the search, equality and range handlers for `E`.
pub fn register_standard_filters<E: Searchable>(registry: &mut FilterHandlerRegistry) {
    registry.register::<E, SearchFilter, _>(SearchFilterHandler::<E>::default());
    registry.register::<E, EqualsFilter, _>(EqualsFilterHandler::<E>::default());
    registry.register::<E, RangeFilter, _>(RangeFilterHandler::<E>::default());
}

/// Registry with every entity module wired, validated before use.
pub fn build_registry() -> Result<FilterHandlerRegistry> {
    let mut registry = FilterHandlerRegistry::new();
    register_standard_filters::<Log>(&mut registry);
    register_standard_filters::<ProjectInstance>(&mut registry);
    register_standard_filters::<Translation>(&mut registry);
    register_standard_filters::<DataSet>(&mut registry);

    registry.require::<Log, SearchFilter>()?;
    registry.require::<ProjectInstance, SearchFilter>()?;
    registry.require::<Translation, SearchFilter>()?;
    registry.require::<DataSet, SearchFilter>()?;
    Ok(registry)
}

/// Storage for every entity module.
pub struct Sources {
    pub logs: Arc<dyn Queryable<Log>>,
    pub project_instances: Arc<dyn Queryable<ProjectInstance>>,
    pub translations: Arc<dyn Queryable<Translation>>,
    pub data_sets: Arc<dyn Queryable<DataSet>>,
}

/// Per-request handlers for every entity module.
pub struct Modules {
    pub logs: EntityQueries<Log>,
    pub project_instances: EntityQueries<ProjectInstance>,
    pub translations: EntityQueries<Translation>,
    pub data_sets: EntityQueries<DataSet>,
}

impl Modules {
    /// Wire handlers for one caller. Logs are root-only; the rest are open.
    pub fn new(
        sources: &Sources,
        registry: Arc<FilterHandlerRegistry>,
        caller: Arc<dyn AuthorizationProvider>,
        settings: QuerySettings,
    ) -> Self {
        let root_only = RootOnly::new(caller);
        Self {
            logs: queries(&sources.logs, &registry, Arc::new(root_only), settings),
            project_instances: queries(
                &sources.project_instances,
                &registry,
                Arc::new(Unrestricted),
                settings,
            ),
            translations: queries(
                &sources.translations,
                &registry,
                Arc::new(Unrestricted),
                settings,
            ),
            data_sets: queries(&sources.data_sets, &registry, Arc::new(Unrestricted), settings),
        }
    }
}

fn queries<E: IntoDto>(
    source: &Arc<dyn Queryable<E>>,
    registry: &Arc<FilterHandlerRegistry>,
    policy: Arc<dyn AccessPolicy<E>>,
    settings: QuerySettings,
) -> EntityQueries<E> {
    let service = QueryService::new(Arc::clone(source), Arc::clone(registry), policy)
        .with_settings(settings);
    EntityQueries::new(service)
}
