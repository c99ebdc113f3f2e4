//! Persistence of validated invoices.

mod sqlite;

pub use sqlite::SqliteInvoiceStore;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::models::config::DatabaseConfig;
use crate::models::invoice::InvoiceData;

/// Identifier assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub i64);

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Append-only invoice storage.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Store one invoice and return its new id.
    async fn insert(&self, invoice: &InvoiceData) -> Result<InvoiceId, PersistenceError>;

    /// Release connections. Later inserts may fail.
    async fn close(&self) {}
}

/// How to open connections to the invoice database.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionFactory {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl ConnectionFactory {
    /// Factory for `url` with default pool settings.
    pub fn new(url: impl Into<String>) -> Self {
        let defaults = DatabaseConfig::default();
        Self {
            url: url.into(),
            max_connections: defaults.max_connections,
            acquire_timeout: Duration::from_secs(defaults.acquire_timeout_secs),
        }
    }

    /// Factory described by the database configuration section.
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            acquire_timeout: Duration::from_secs(config.acquire_timeout_secs),
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// An in-memory database lives as long as its only connection.
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:").with_max_connections(1)
    }
}
