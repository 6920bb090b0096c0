use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Queryable;
use crate::entity::{Entity, FieldValue};
use crate::error::Result;
use crate::query::{Cancellation, OrderDirection, Query};

/// In-process source. Provider order is insertion order.
pub struct MemorySource<E> {
    rows: RwLock<Vec<E>>,
}

impl<E: Entity> Default for MemorySource<E> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<E: Entity> MemorySource<E> {
    pub fn new(rows: Vec<E>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub async fn insert(&self, entity: E) {
        self.rows.write().await.push(entity);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl<E: Entity> Queryable<E> for MemorySource<E> {
    async fn count(&self, query: &Query<E>, cancel: &Cancellation) -> Result<u64> {
        cancel.check()?;
        let rows = self.rows.read().await;
        let count = rows.iter().filter(|e| query.predicate().matches(e)).count();
        cancel.check()?;
        Ok(count as u64)
    }

    async fn fetch(&self, query: &Query<E>, cancel: &Cancellation) -> Result<Vec<E>> {
        cancel.check()?;
        let rows = self.rows.read().await;
        let mut matched: Vec<&E> = rows
            .iter()
            .filter(|e| query.predicate().matches(e))
            .collect();

        if let Some(order) = query.order() {
            // Key tie-break keeps pages stable across equal sort values.
            let mut keyed: Vec<(FieldValue, FieldValue, &E)> = matched
                .into_iter()
                .map(|e| {
                    let value = e.field(order.field).unwrap_or(FieldValue::Null);
                    (value, e.key().into(), e)
                })
                .collect();
            keyed.sort_by(|a, b| {
                let ordering = a.0.sort_cmp(&b.0).then_with(|| a.1.sort_cmp(&b.1));
                match order.direction {
                    OrderDirection::Asc => ordering,
                    OrderDirection::Desc => ordering.reverse(),
                }
            });
            matched = keyed.into_iter().map(|(_, _, e)| e).collect();
        }

        let skip = usize::try_from(query.skip()).unwrap_or(usize::MAX);
        let take = query
            .take()
            .map_or(usize::MAX, |t| usize::try_from(t).unwrap_or(usize::MAX));
        let page = matched.into_iter().skip(skip).take(take).cloned().collect();
        cancel.check()?;
        Ok(page)
    }
}
