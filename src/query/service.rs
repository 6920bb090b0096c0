//! The generic query pipeline shared by every entity module.
//!
//! Composition order is fixed: access policy, tracking, filters, ordering.
//! Paging happens last, in [`QueryService::execute_paginated_query`].

use std::sync::Arc;

use tracing::{debug, instrument};

use super::cancel::Cancellation;
use super::options::{ListRequest, QueryOptions};
use super::pagination::{PaginatedList, PaginationParameters};
use super::predicate::Predicate;
use super::registry::FilterHandlerRegistry;
use super::Query;
use crate::auth::AccessPolicy;
use crate::config::QuerySettings;
use crate::entity::Entity;
use crate::error::Result;
use crate::source::Queryable;

pub struct QueryService<E: Entity> {
    source: Arc<dyn Queryable<E>>,
    registry: Arc<FilterHandlerRegistry>,
    policy: Arc<dyn AccessPolicy<E>>,
    settings: QuerySettings,
}

impl<E: Entity> Clone for QueryService<E> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            registry: Arc::clone(&self.registry),
            policy: Arc::clone(&self.policy),
            settings: self.settings,
        }
    }
}

impl<E: Entity> QueryService<E> {
    /// The access policy is mandatory; pass [`Unrestricted`](crate::auth::Unrestricted)
    /// for entities without one.
    pub fn new(
        source: Arc<dyn Queryable<E>>,
        registry: Arc<FilterHandlerRegistry>,
        policy: Arc<dyn AccessPolicy<E>>,
    ) -> Self {
        Self {
            source,
            registry,
            policy,
            settings: QuerySettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: QuerySettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// The unrestricted base collection.
    pub fn default_query(&self) -> Query<E> {
        Query::all()
    }

    /// Compose `query` (or [`default_query`](Self::default_query)) with the
    /// access policy and `options`. No I/O beyond the policy's own lookup.
    #[instrument(level = "debug", skip_all, fields(entity = E::NAME))]
    pub async fn prepare_query(
        &self,
        query: Option<Query<E>>,
        options: Option<&QueryOptions>,
    ) -> Result<Query<E>> {
        let base = query.unwrap_or_else(|| self.default_query());
        let mut query = self.policy.restrict(base).await?;

        let Some(options) = options else {
            return Ok(query);
        };

        if options.as_no_tracking {
            query = query.no_tracking();
        }

        let mut applied = 0;
        for filter in options.filtering.active() {
            let predicate = self.registry.expression::<E>(filter.as_ref()).await?;
            query = query.filter(predicate);
            applied += 1;
        }

        if let Some(order) = options.ordering.resolve::<E>()? {
            query = query.order_by(order);
        }

        debug!(filters = applied, order = ?query.order(), "query prepared");
        Ok(query)
    }

    /// Count the filtered query, then fetch one page of it and project each
    /// row. The total never depends on the page window.
    #[instrument(level = "debug", skip_all, fields(entity = E::NAME))]
    pub async fn execute_paginated_query<D, F>(
        &self,
        query: Query<E>,
        pagination: &PaginationParameters,
        projector: F,
        cancel: &Cancellation,
    ) -> Result<PaginatedList<D>>
    where
        F: Fn(&E) -> D,
    {
        let window = pagination.resolve(&self.settings);
        if query.is_empty() {
            cancel.check()?;
            return Ok(PaginatedList::empty(window));
        }

        let total = cancel.run(self.source.count(&query.unpaged(), cancel)).await?;
        let rows = if window.skip >= total {
            Vec::new()
        } else {
            let page = query.paged(window.skip, window.take);
            cancel.run(self.source.fetch(&page, cancel)).await?
        };

        debug!(total, skip = window.skip, take = window.take, rows = rows.len(), "page fetched");
        let items = rows.iter().map(projector).collect();
        Ok(PaginatedList::new(items, total, window))
    }

    /// One row by key, through the same pipeline. `Ok(None)` when absent or
    /// not visible to the caller.
    #[instrument(level = "debug", skip_all, fields(entity = E::NAME, id = ?id))]
    pub async fn get_by_id(
        &self,
        id: E::Key,
        options: Option<&QueryOptions>,
        cancel: &Cancellation,
    ) -> Result<Option<E>> {
        let by_key = Query::all().filter(Predicate::eq(E::KEY, id)?);
        let query = self.prepare_query(Some(by_key), options).await?;
        if query.is_empty() {
            cancel.check()?;
            return Ok(None);
        }
        let mut rows = cancel.run(self.source.fetch(&query.paged(0, 1), cancel)).await?;
        Ok(rows.pop())
    }

    /// Prepare and page in one call.
    pub async fn list<D, F>(
        &self,
        request: &ListRequest,
        projector: F,
        cancel: &Cancellation,
    ) -> Result<PaginatedList<D>>
    where
        F: Fn(&E) -> D,
    {
        let query = self.prepare_query(None, Some(&request.options)).await?;
        self.execute_paginated_query(query, &request.pagination, projector, cancel)
            .await
    }
}
