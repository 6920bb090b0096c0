//! Declarative query composition.
//!
//! A [`Query`] is a plain value: a predicate, an optional ordering and a
//! paging window. [`QueryService`] builds it from caller options and hands it
//! to a [`Queryable`](crate::source::Queryable) source only for the terminal
//! count and fetch.

pub mod cancel;
pub mod filter;
pub mod options;
pub mod pagination;
pub mod predicate;
pub mod registry;
pub mod search;
pub mod service;

pub use cancel::{CancelHandle, Cancellation, cancellation};
pub use filter::{EqualsFilter, QueryFilter, RangeFilter, SearchFilter};
pub use options::{
    FilteringParameters, ListRequest, OrderBy, OrderDirection, OrderingParameters, QueryOptions,
};
pub use pagination::{PaginatedList, PaginationParameters, Window};
pub use predicate::{CompareOp, Expr, Predicate};
pub use registry::{FilterHandler, FilterHandlerRegistry};
pub use search::{SearchFilterHandler, SearchSpecification, Searchable};
pub use service::QueryService;

/// Whether materialized rows stay attached to storage-side tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tracking {
    #[default]
    Tracked,
    NoTracking,
}

/// A composed, backend-agnostic query over `E`.
///
/// The predicate can only be narrowed: [`Query::filter`] always conjoins.
pub struct Query<E> {
    predicate: Predicate<E>,
    order: Option<OrderBy>,
    skip: u64,
    take: Option<u64>,
    tracking: Tracking,
}

impl<E> Clone for Query<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            order: self.order,
            skip: self.skip,
            take: self.take,
            tracking: self.tracking,
        }
    }
}

impl<E> std::fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("predicate", &self.predicate)
            .field("order", &self.order)
            .field("skip", &self.skip)
            .field("take", &self.take)
            .field("tracking", &self.tracking)
            .finish()
    }
}

impl<E> Default for Query<E> {
    fn default() -> Self {
        Self::all()
    }
}

impl<E> Query<E> {
    /// Every row, provider order, no paging.
    pub fn all() -> Self {
        Self {
            predicate: Predicate::always(),
            order: None,
            skip: 0,
            take: None,
            tracking: Tracking::Tracked,
        }
    }

    pub fn filter(mut self, predicate: Predicate<E>) -> Self {
        self.predicate = self.predicate.and(predicate);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    pub fn no_tracking(mut self) -> Self {
        self.tracking = Tracking::NoTracking;
        self
    }

    pub fn paged(mut self, skip: u64, take: u64) -> Self {
        self.skip = skip;
        self.take = Some(take);
        self
    }

    /// Same rows, no window. Used for counting.
    pub fn unpaged(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            order: None,
            skip: 0,
            take: None,
            tracking: self.tracking,
        }
    }

    pub fn predicate(&self) -> &Predicate<E> {
        &self.predicate
    }

    pub fn order(&self) -> Option<OrderBy> {
        self.order
    }

    pub fn skip(&self) -> u64 {
        self.skip
    }

    pub fn take(&self) -> Option<u64> {
        self.take
    }

    pub fn tracking(&self) -> Tracking {
        self.tracking
    }

    /// True when no row can match, so storage need not be consulted.
    pub fn is_empty(&self) -> bool {
        self.predicate.is_never() || self.take == Some(0)
    }
}
