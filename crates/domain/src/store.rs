//! Storage traits implemented by the persistence layer.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewPingRecord, PingRecord, Setting};

/// Errors raised by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// Key/value storage of site settings.
#[async_trait]
pub trait SettingStore: Send + Sync {
    /// All settings ordered by key, optionally narrowed to one group.
    async fn list(&self, group: Option<&str>) -> Result<Vec<Setting>, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Setting>, StoreError>;

    /// Creates the row on first write and overwrites it afterwards.
    async fn upsert(&self, key: &str, value: &str, group: &str) -> Result<Setting, StoreError>;

    /// Checks the backing store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Append-only log of keep-alive pings.
#[async_trait]
pub trait PingLogStore: Send + Sync {
    async fn append(&self, ping: NewPingRecord) -> Result<PingRecord, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;

    /// Newest first.
    async fn list_recent(&self, skip: i64, limit: i64) -> Result<Vec<PingRecord>, StoreError>;

    async fn latest(&self) -> Result<Option<PingRecord>, StoreError>;

    /// Deletes everything but the newest `keep` records and returns how many were removed.
    async fn prune(&self, keep: i64) -> Result<u64, StoreError>;
}
