pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::entity::Entity;
use crate::error::Result;
use crate::query::{Cancellation, Query};

/// An ordered, filterable, countable collection of `E`.
///
/// These are the only suspension points in the pipeline. Implementations
/// must honour `cancel` and never return a partial result once it fires.
#[async_trait]
pub trait Queryable<E: Entity>: Send + Sync {
    /// Number of rows matching the predicate. Ordering and paging are ignored.
    async fn count(&self, query: &Query<E>, cancel: &Cancellation) -> Result<u64>;

    /// Rows matching the predicate, ordered and windowed.
    async fn fetch(&self, query: &Query<E>, cancel: &Cancellation) -> Result<Vec<E>>;
}
