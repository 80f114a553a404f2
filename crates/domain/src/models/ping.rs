//! Keep-alive ping domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What triggered a ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PingType {
    /// Fired by the scheduler.
    Auto,
    /// Requested through the API.
    Manual,
    /// Recorded once at startup.
    Initial,
}

impl std::fmt::Display for PingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PingType::Auto => write!(f, "auto"),
            PingType::Manual => write!(f, "manual"),
            PingType::Initial => write!(f, "initial"),
        }
    }
}

impl std::str::FromStr for PingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(PingType::Auto),
            "manual" => Ok(PingType::Manual),
            "initial" => Ok(PingType::Initial),
            _ => Err(format!("Unknown ping type: {}", s)),
        }
    }
}

/// Outcome of a ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PingStatus {
    Success,
    Error,
}

impl std::fmt::Display for PingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PingStatus::Success => write!(f, "success"),
            PingStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for PingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(PingStatus::Success),
            "error" => Ok(PingStatus::Error),
            _ => Err(format!("Unknown ping status: {}", s)),
        }
    }
}

/// One appended keep-alive result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub status: PingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: i64,
    #[serde(rename = "type")]
    pub ping_type: PingType,
    /// Whether the monitor loop was running when the ping was taken.
    pub is_running: bool,
    /// Whether keep-alive was enabled when the ping was taken.
    pub enabled: bool,
}

/// A ping result before it is assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPingRecord {
    pub timestamp: DateTime<Utc>,
    pub status: PingStatus,
    pub error: Option<String>,
    pub duration_ms: i64,
    pub ping_type: PingType,
    pub is_running: bool,
    pub enabled: bool,
}

impl NewPingRecord {
    pub fn success(ping_type: PingType, duration_ms: i64) -> Self {
        Self {
            timestamp: Utc::now(),
            status: PingStatus::Success,
            error: None,
            duration_ms,
            ping_type,
            is_running: true,
            enabled: true,
        }
    }

    pub fn failure(ping_type: PingType, duration_ms: i64, error: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            status: PingStatus::Error,
            error: Some(error.into()),
            duration_ms,
            ping_type,
            is_running: true,
            enabled: true,
        }
    }

    /// Attaches the monitor state observed when the ping was taken.
    pub fn with_state(mut self, is_running: bool, enabled: bool) -> Self {
        self.is_running = is_running;
        self.enabled = enabled;
        self
    }

    pub fn into_record(self, id: i64) -> PingRecord {
        PingRecord {
            id,
            timestamp: self.timestamp,
            status: self.status,
            error: self.error,
            duration_ms: self.duration_ms,
            ping_type: self.ping_type,
            is_running: self.is_running,
            enabled: self.enabled,
        }
    }
}
