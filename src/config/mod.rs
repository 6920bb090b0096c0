//! Key-value configuration storage backed by SQLite, and the query
//! settings read from it.
//!
//! Shares a database with the entity tables of
//! [`SqliteSource`](crate::source::sqlite::SqliteSource), so pass the same path.

use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::Connection;

use crate::consts::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub const DEFAULT_PAGE_SIZE_KEY: &str = "query.default_page_size";
pub const MAX_PAGE_SIZE_KEY: &str = "query.max_page_size";

/// Paging limits applied by the query service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySettings {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl QuerySettings {
    /// Effective page size for a request. `0` means the default.
    pub fn page_size(&self, requested: u64) -> u64 {
        let size = if requested == 0 {
            self.default_page_size
        } else {
            requested
        };
        size.clamp(1, self.max_page_size.max(1))
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_page_size == 0 || self.max_page_size == 0 {
            bail!("page sizes must be positive");
        }
        if self.default_page_size > self.max_page_size {
            bail!(
                "default page size {} exceeds maximum {}",
                self.default_page_size,
                self.max_page_size
            );
        }
        Ok(())
    }
}

/// Persistent key-value configuration store.
pub struct Config {
    conn: Mutex<Connection>,
}

impl Config {
    /// Open or create the config table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open config database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create config table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("config connection poisoned"))
    }

    /// Get a config value by key.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Get and parse a config value.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.get(key)?
            .map(|raw| {
                raw.trim()
                    .parse()
                    .with_context(|| format!("invalid value `{raw}` for `{key}`"))
            })
            .transpose()
    }

    /// Set a config value (upsert).
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Remove a config key.
    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Stored query settings, falling back to built-in defaults per key.
    pub fn query_settings(&self) -> Result<QuerySettings> {
        let defaults = QuerySettings::default();
        let settings = QuerySettings {
            default_page_size: self
                .get_parsed(DEFAULT_PAGE_SIZE_KEY)?
                .unwrap_or(defaults.default_page_size),
            max_page_size: self
                .get_parsed(MAX_PAGE_SIZE_KEY)?
                .unwrap_or(defaults.max_page_size),
        };
        settings.validate().context("invalid query settings")?;
        Ok(settings)
    }
}
