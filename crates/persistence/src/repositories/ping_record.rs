//! Ping record repository for database operations.

use async_trait::async_trait;
use domain::models::{NewPingRecord, PingRecord};
use domain::store::{PingLogStore, StoreError};
use sqlx::PgPool;
use tracing::debug;

use crate::entities::{PingRecordEntity, PingStatusDb, PingTypeDb};
use crate::metrics::QueryTimer;

/// PostgreSQL-backed [`PingLogStore`].
#[derive(Clone)]
pub struct PgPingRepository {
    pool: PgPool,
}

impl PgPingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PingLogStore for PgPingRepository {
    async fn append(&self, ping: NewPingRecord) -> Result<PingRecord, StoreError> {
        let timer = QueryTimer::new("append_ping");
        let result = sqlx::query_as::<_, PingRecordEntity>(
            r#"
            INSERT INTO ping_records
                (timestamp, status, error, duration_ms, ping_type, is_running, enabled)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, timestamp, status, error, duration_ms, ping_type, is_running, enabled
            "#,
        )
        .bind(ping.timestamp)
        .bind(PingStatusDb::from(ping.status))
        .bind(&ping.error)
        .bind(ping.duration_ms)
        .bind(PingTypeDb::from(ping.ping_type))
        .bind(ping.is_running)
        .bind(ping.enabled)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(result?.into())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let timer = QueryTimer::new("count_pings");
        let result: Result<(i64,), sqlx::Error> =
            sqlx::query_as("SELECT COUNT(*) FROM ping_records")
                .fetch_one(&self.pool)
                .await;
        timer.record();

        Ok(result?.0)
    }

    async fn list_recent(&self, skip: i64, limit: i64) -> Result<Vec<PingRecord>, StoreError> {
        let timer = QueryTimer::new("list_recent_pings");
        let result = sqlx::query_as::<_, PingRecordEntity>(
            r#"
            SELECT id, timestamp, status, error, duration_ms, ping_type, is_running, enabled
            FROM ping_records
            ORDER BY timestamp DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(result?.into_iter().map(PingRecord::from).collect())
    }

    async fn latest(&self) -> Result<Option<PingRecord>, StoreError> {
        Ok(self.list_recent(0, 1).await?.into_iter().next())
    }

    async fn prune(&self, keep: i64) -> Result<u64, StoreError> {
        let timer = QueryTimer::new("prune_pings");
        let result = sqlx::query(
            r#"
            DELETE FROM ping_records
            WHERE id NOT IN (
                SELECT id FROM ping_records
                ORDER BY timestamp DESC, id DESC
                LIMIT $1
            )
            "#,
        )
        .bind(keep.max(0))
        .execute(&self.pool)
        .await;
        timer.record();

        let removed = result?.rows_affected();
        if removed > 0 {
            debug!(removed, keep, "Pruned ping records");
        }
        Ok(removed)
    }
}
