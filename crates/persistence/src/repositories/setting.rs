//! Setting repository for database operations.

use async_trait::async_trait;
use domain::models::Setting;
use domain::store::{SettingStore, StoreError};
use sqlx::PgPool;

use crate::entities::SettingEntity;
use crate::metrics::QueryTimer;

/// PostgreSQL-backed [`SettingStore`].
#[derive(Clone)]
pub struct PgSettingRepository {
    pool: PgPool,
}

impl PgSettingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingStore for PgSettingRepository {
    async fn list(&self, group: Option<&str>) -> Result<Vec<Setting>, StoreError> {
        let timer = QueryTimer::new("list_settings");
        let result = sqlx::query_as::<_, SettingEntity>(
            r#"
            SELECT key, value, group_name, updated_at
            FROM settings
            WHERE ($1::text IS NULL OR group_name = $1)
            ORDER BY key
            "#,
        )
        .bind(group)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        Ok(result?.into_iter().map(Setting::from).collect())
    }

    async fn get(&self, key: &str) -> Result<Option<Setting>, StoreError> {
        let timer = QueryTimer::new("get_setting");
        let result = sqlx::query_as::<_, SettingEntity>(
            r#"
            SELECT key, value, group_name, updated_at
            FROM settings
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(result?.map(Setting::from))
    }

    async fn upsert(&self, key: &str, value: &str, group: &str) -> Result<Setting, StoreError> {
        let timer = QueryTimer::new("upsert_setting");
        let result = sqlx::query_as::<_, SettingEntity>(
            r#"
            INSERT INTO settings (key, value, group_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET
                value = EXCLUDED.value,
                group_name = EXCLUDED.group_name,
                updated_at = NOW()
            RETURNING key, value, group_name, updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(group)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(result?.into())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
