//! Background job that pings the keep-alive target.

use std::sync::Arc;

use domain::models::{PingStatus, PingType};

use super::scheduler::{Job, JobFrequency};
use crate::services::KeepAliveMonitor;

/// Records an `auto` ping every `keep_alive.interval_minutes`.
pub struct KeepAliveJob {
    monitor: Arc<KeepAliveMonitor>,
}

impl KeepAliveJob {
    pub fn new(monitor: Arc<KeepAliveMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait::async_trait]
impl Job for KeepAliveJob {
    fn name(&self) -> &'static str {
        "keep_alive"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.monitor.interval_minutes())
    }

    async fn execute(&self) -> Result<(), String> {
        let record = self
            .monitor
            .ping(PingType::Auto)
            .await
            .map_err(|e| format!("Failed to record ping: {}", e))?;

        match record.status {
            PingStatus::Success => Ok(()),
            PingStatus::Error => Err(record
                .error
                .unwrap_or_else(|| "Keep-alive ping failed".to_string())),
        }
    }
}
