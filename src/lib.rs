pub mod auth;
pub mod config;
pub mod consts;
pub mod entity;
pub mod error;
pub mod modules;
pub mod query;
pub mod source;

pub use error::{QueryError, Result};
