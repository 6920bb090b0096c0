//! Caller identity as seen by the query layer, and the access policies
//! that restrict queries before any caller-supplied filter runs.

pub mod policy;

pub use policy::{AccessPolicy, RootOnly, Unrestricted};

use async_trait::async_trait;

use crate::consts::ROOT_ROLE;

/// Answers authorization questions for the current request.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    async fn has_root_access(&self) -> bool;
}

/// The authenticated caller of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    pub user: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn anonymous() -> Self {
        Self::new("anonymous")
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

#[async_trait]
impl AuthorizationProvider for Principal {
    async fn has_root_access(&self) -> bool {
        self.has_role(ROOT_ROLE)
    }
}

/// Fixed answer, for hosts that decide access up front.
#[derive(Debug, Clone, Copy)]
pub struct StaticAuthorization {
    pub root: bool,
}

#[async_trait]
impl AuthorizationProvider for StaticAuthorization {
    async fn has_root_access(&self) -> bool {
        self.root
    }
}
