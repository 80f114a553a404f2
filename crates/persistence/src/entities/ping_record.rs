//! Ping record entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{PingRecord, PingStatus, PingType};
use sqlx::FromRow;

/// Database enum for ping_type that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ping_type", rename_all = "lowercase")]
pub enum PingTypeDb {
    Auto,
    Manual,
    Initial,
}

/// Database enum for ping_status that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ping_status", rename_all = "lowercase")]
pub enum PingStatusDb {
    Success,
    Error,
}

impl From<PingType> for PingTypeDb {
    fn from(value: PingType) -> Self {
        match value {
            PingType::Auto => PingTypeDb::Auto,
            PingType::Manual => PingTypeDb::Manual,
            PingType::Initial => PingTypeDb::Initial,
        }
    }
}

impl From<PingTypeDb> for PingType {
    fn from(value: PingTypeDb) -> Self {
        match value {
            PingTypeDb::Auto => PingType::Auto,
            PingTypeDb::Manual => PingType::Manual,
            PingTypeDb::Initial => PingType::Initial,
        }
    }
}

impl From<PingStatus> for PingStatusDb {
    fn from(value: PingStatus) -> Self {
        match value {
            PingStatus::Success => PingStatusDb::Success,
            PingStatus::Error => PingStatusDb::Error,
        }
    }
}

impl From<PingStatusDb> for PingStatus {
    fn from(value: PingStatusDb) -> Self {
        match value {
            PingStatusDb::Success => PingStatus::Success,
            PingStatusDb::Error => PingStatus::Error,
        }
    }
}

/// Database row mapping for the ping_records table.
#[derive(Debug, Clone, FromRow)]
pub struct PingRecordEntity {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub status: PingStatusDb,
    pub error: Option<String>,
    pub duration_ms: i64,
    pub ping_type: PingTypeDb,
    pub is_running: bool,
    pub enabled: bool,
}

impl From<PingRecordEntity> for PingRecord {
    fn from(entity: PingRecordEntity) -> Self {
        PingRecord {
            id: entity.id,
            timestamp: entity.timestamp,
            status: entity.status.into(),
            error: entity.error,
            duration_ms: entity.duration_ms,
            ping_type: entity.ping_type.into(),
            is_running: entity.is_running,
            enabled: entity.enabled,
        }
    }
}
