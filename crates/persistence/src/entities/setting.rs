//! Setting entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::Setting;
use sqlx::FromRow;

/// Database row mapping for the settings table.
#[derive(Debug, Clone, FromRow)]
pub struct SettingEntity {
    pub key: String,
    pub value: String,
    pub group_name: String,
    pub updated_at: DateTime<Utc>,
}

impl From<SettingEntity> for Setting {
    fn from(entity: SettingEntity) -> Self {
        Setting {
            key: entity.key,
            value: entity.value,
            group: entity.group_name,
            updated_at: entity.updated_at,
        }
    }
}
