use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::AuthorizationProvider;
use crate::entity::Entity;
use crate::error::Result;
use crate::query::{Predicate, Query};

/// Narrows a base query to what the caller may see. Runs before every
/// caller-supplied filter, ordering and page window.
#[async_trait]
pub trait AccessPolicy<E: Entity>: Send + Sync {
    async fn restrict(&self, query: Query<E>) -> Result<Query<E>>;
}

/// No restriction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

#[async_trait]
impl<E: Entity> AccessPolicy<E> for Unrestricted {
    async fn restrict(&self, query: Query<E>) -> Result<Query<E>> {
        Ok(query)
    }
}

/// Only root callers see any rows. Everyone else gets an always-false
/// predicate: empty pages and absent lookups, never a permission error.
#[derive(Clone)]
pub struct RootOnly {
    provider: Arc<dyn AuthorizationProvider>,
}

impl RootOnly {
    pub fn new(provider: Arc<dyn AuthorizationProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<E: Entity> AccessPolicy<E> for RootOnly {
    async fn restrict(&self, query: Query<E>) -> Result<Query<E>> {
        if self.provider.has_root_access().await {
            return Ok(query);
        }
        debug!(entity = E::NAME, "caller lacks root access, restricting to no rows");
        Ok(query.filter(Predicate::never()))
    }
}
