//! Keep-alive monitor.
//!
//! Pings a health URL and appends every outcome to the ping log.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use domain::models::{NewPingRecord, PingRecord, PingType};
use domain::store::{PingLogStore, StoreError};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{KeepAliveConfig, ServerConfig};
use crate::middleware::metrics::record_keep_alive_ping;

/// Snapshot of the monitor returned by the status endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeepAliveStatus {
    pub enabled: bool,
    pub is_running: bool,
    pub interval_minutes: u64,
    pub target_url: String,
    pub last_ping: Option<PingRecord>,
}

pub struct KeepAliveMonitor {
    pings: Arc<dyn PingLogStore>,
    client: reqwest::Client,
    target_url: String,
    timeout: Duration,
    interval_minutes: u64,
    retention: i64,
    enabled: bool,
    running: AtomicBool,
}

impl KeepAliveMonitor {
    pub fn new(
        config: &KeepAliveConfig,
        server: &ServerConfig,
        pings: Arc<dyn PingLogStore>,
    ) -> Self {
        Self {
            pings,
            client: reqwest::Client::new(),
            target_url: config.resolved_target(server),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            interval_minutes: config.interval_minutes,
            retention: config.retention,
            enabled: config.enabled,
            running: AtomicBool::new(false),
        }
    }

    pub fn interval_minutes(&self) -> u64 {
        self.interval_minutes
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Marks whether the scheduled ping loop is active.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Pings the target once and records the outcome.
    ///
    /// HTTP failures are recorded as `error` pings; only a failing ping log is
    /// returned as an error.
    pub async fn ping(&self, ping_type: PingType) -> Result<PingRecord, StoreError> {
        let start = Instant::now();
        let response = self
            .client
            .get(&self.target_url)
            .timeout(self.timeout)
            .send()
            .await;
        let duration_ms = start.elapsed().as_millis() as i64;

        let ping = match response {
            Ok(resp) if resp.status().is_success() => NewPingRecord::success(ping_type, duration_ms),
            Ok(resp) => NewPingRecord::failure(
                ping_type,
                duration_ms,
                format!("Health check returned HTTP {}", resp.status().as_u16()),
            ),
            Err(e) => NewPingRecord::failure(ping_type, duration_ms, e.to_string()),
        }
        .with_state(self.is_running(), self.enabled);

        record_keep_alive_ping(ping.status);
        match &ping.error {
            None => info!(
                ping_type = %ping_type,
                duration_ms,
                target = %self.target_url,
                "Keep-alive ping succeeded"
            ),
            Some(error) => warn!(
                ping_type = %ping_type,
                duration_ms,
                target = %self.target_url,
                error = %error,
                "Keep-alive ping failed"
            ),
        }

        let record = self.pings.append(ping).await?;

        if self.retention > 0 {
            if let Err(e) = self.pings.prune(self.retention).await {
                warn!(error = %e, retention = self.retention, "Failed to prune ping records");
            }
        }

        Ok(record)
    }

    pub async fn status(&self) -> Result<KeepAliveStatus, StoreError> {
        Ok(KeepAliveStatus {
            enabled: self.enabled,
            is_running: self.is_running(),
            interval_minutes: self.interval_minutes,
            target_url: self.target_url.clone(),
            last_ping: self.pings.latest().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use domain::models::PingStatus;
    use persistence::MemoryPingLogStore;

    fn monitor(overrides: &[(&str, &str)]) -> (KeepAliveMonitor, Arc<MemoryPingLogStore>) {
        let config = Config::load_for_test(overrides).unwrap();
        let store = Arc::new(MemoryPingLogStore::new());
        let monitor = KeepAliveMonitor::new(&config.keep_alive, &config.server, store.clone());
        (monitor, store)
    }

    #[tokio::test]
    async fn test_ping_unreachable_target_records_error() {
        let (monitor, store) = monitor(&[("keep_alive.target_url", "http://127.0.0.1:1/api/health")]);

        let record = monitor.ping(PingType::Manual).await.unwrap();
        assert_eq!(record.status, PingStatus::Error);
        assert_eq!(record.ping_type, PingType::Manual);
        assert!(record.error.is_some());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ping_prunes_to_retention() {
        let (monitor, store) = monitor(&[
            ("keep_alive.target_url", "http://127.0.0.1:1/api/health"),
            ("keep_alive.retention", "2"),
        ]);

        for _ in 0..4 {
            monitor.ping(PingType::Auto).await.unwrap();
        }
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_status_reports_state() {
        let (monitor, _) = monitor(&[
            ("keep_alive.enabled", "true"),
            ("keep_alive.interval_minutes", "5"),
            ("keep_alive.target_url", "http://127.0.0.1:1/api/health"),
        ]);

        let status = monitor.status().await.unwrap();
        assert!(status.enabled);
        assert!(!status.is_running);
        assert_eq!(status.interval_minutes, 5);
        assert!(status.last_ping.is_none());

        monitor.set_running(true);
        let record = monitor.ping(PingType::Initial).await.unwrap();
        assert!(record.is_running);
        assert!(record.enabled);

        let status = monitor.status().await.unwrap();
        assert!(status.is_running);
        assert_eq!(status.last_ping.map(|p| p.id), Some(record.id));
    }
}
