//! Runtime dispatch from (entity, filter) type pairs to predicate builders.
//!
//! Handlers are registered once at startup. The registry is then shared
//! read-only behind an `Arc`, so lookups take no locks.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::filter::QueryFilter;
use super::predicate::Predicate;
use crate::entity::Entity;
use crate::error::{QueryError, Result};

/// Maps one filter instance to a predicate over `E`.
#[async_trait]
pub trait FilterHandler<E: Entity, F: QueryFilter>: Send + Sync {
    async fn expression(&self, filter: &F) -> Result<Predicate<E>>;
}

#[async_trait]
trait ErasedHandler<E: Entity>: Send + Sync {
    async fn expression(&self, filter: &dyn QueryFilter) -> Result<Predicate<E>>;
}

struct Typed<F, H> {
    handler: H,
    _filter: PhantomData<fn(&F)>,
}

#[async_trait]
impl<E, F, H> ErasedHandler<E> for Typed<F, H>
where
    E: Entity,
    F: QueryFilter,
    H: FilterHandler<E, F>,
{
    async fn expression(&self, filter: &dyn QueryFilter) -> Result<Predicate<E>> {
        let typed = filter.as_any().downcast_ref::<F>().ok_or_else(|| {
            QueryError::InvalidFilter(format!(
                "handler for {} received `{}`",
                type_name::<F>(),
                filter.kind()
            ))
        })?;
        self.handler.expression(typed).await
    }
}

type HandlerKey = (TypeId, TypeId);

/// Holds every registered filter handler.
#[derive(Default)]
pub struct FilterHandlerRegistry {
    // Values are `Arc<dyn ErasedHandler<E>>` for the entity in the key.
    handlers: HashMap<HandlerKey, Box<dyn Any + Send + Sync>>,
}

impl FilterHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for filters of type `F` on entity `E`.
    /// A later registration for the same pair replaces the earlier one.
    pub fn register<E, F, H>(&mut self, handler: H)
    where
        E: Entity,
        F: QueryFilter,
        H: FilterHandler<E, F> + 'static,
    {
        let erased: Arc<dyn ErasedHandler<E>> = Arc::new(Typed {
            handler,
            _filter: PhantomData::<fn(&F)>,
        });
        self.handlers
            .insert((TypeId::of::<E>(), TypeId::of::<F>()), Box::new(erased));
    }

    pub fn is_registered<E: Entity, F: QueryFilter>(&self) -> bool {
        self.handlers
            .contains_key(&(TypeId::of::<E>(), TypeId::of::<F>()))
    }

    /// Fail fast at startup when wiring for a pair is missing.
    pub fn require<E: Entity, F: QueryFilter>(&self) -> Result<()> {
        if self.is_registered::<E, F>() {
            Ok(())
        } else {
            Err(QueryError::UnregisteredHandler {
                entity: E::NAME,
                filter: type_name::<F>(),
            })
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Build the predicate for `filter` on entity `E`.
    pub async fn expression<E: Entity>(&self, filter: &dyn QueryFilter) -> Result<Predicate<E>> {
        let key = (TypeId::of::<E>(), filter.as_any().type_id());
        let handler = self
            .handlers
            .get(&key)
            .and_then(|h| h.downcast_ref::<Arc<dyn ErasedHandler<E>>>());
        match handler {
            Some(handler) => handler.expression(filter).await,
            None => {
                warn!(
                    entity = E::NAME,
                    filter = filter.kind(),
                    "no filter handler registered"
                );
                Err(QueryError::UnregisteredHandler {
                    entity: E::NAME,
                    filter: filter.type_name(),
                })
            }
        }
    }
}

impl std::fmt::Debug for FilterHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterHandlerRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
