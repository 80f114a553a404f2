//! In-memory store implementations.
//!
//! Non-durable stores used by the API integration tests and client round-trip tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use domain::models::{NewPingRecord, PingRecord, Setting};
use domain::store::{PingLogStore, SettingStore, StoreError};
use tokio::sync::RwLock;

/// [`SettingStore`] over a sorted map.
#[derive(Debug, Default)]
pub struct MemorySettingStore {
    rows: RwLock<BTreeMap<String, Setting>>,
}

impl MemorySettingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingStore for MemorySettingStore {
    async fn list(&self, group: Option<&str>) -> Result<Vec<Setting>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|setting| group.map_or(true, |g| setting.group == g))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<Setting>, StoreError> {
        Ok(self.rows.read().await.get(key).cloned())
    }

    async fn upsert(&self, key: &str, value: &str, group: &str) -> Result<Setting, StoreError> {
        let setting = Setting {
            key: key.to_string(),
            value: value.to_string(),
            group: group.to_string(),
            updated_at: Utc::now(),
        };
        self.rows
            .write()
            .await
            .insert(setting.key.clone(), setting.clone());
        Ok(setting)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PingLog {
    next_id: i64,
    records: Vec<PingRecord>,
}

impl PingLog {
    fn sorted_newest_first(&self) -> Vec<&PingRecord> {
        let mut records: Vec<&PingRecord> = self.records.iter().collect();
        records.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        records
    }
}

/// Append-only [`PingLogStore`] held in memory.
#[derive(Debug, Default)]
pub struct MemoryPingLogStore {
    log: RwLock<PingLog>,
}

impl MemoryPingLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PingLogStore for MemoryPingLogStore {
    async fn append(&self, ping: NewPingRecord) -> Result<PingRecord, StoreError> {
        let mut log = self.log.write().await;
        log.next_id += 1;
        let record = ping.into_record(log.next_id);
        log.records.push(record.clone());
        Ok(record)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.log.read().await.records.len() as i64)
    }

    async fn list_recent(&self, skip: i64, limit: i64) -> Result<Vec<PingRecord>, StoreError> {
        let log = self.log.read().await;
        Ok(log
            .sorted_newest_first()
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn latest(&self) -> Result<Option<PingRecord>, StoreError> {
        let log = self.log.read().await;
        Ok(log.sorted_newest_first().first().map(|r| (*r).clone()))
    }

    async fn prune(&self, keep: i64) -> Result<u64, StoreError> {
        let mut log = self.log.write().await;
        let keep = keep.max(0) as usize;
        if log.records.len() <= keep {
            return Ok(0);
        }

        let kept: Vec<i64> = log
            .sorted_newest_first()
            .into_iter()
            .take(keep)
            .map(|r| r.id)
            .collect();
        let before = log.records.len();
        log.records.retain(|r| kept.contains(&r.id));
        Ok((before - log.records.len()) as u64)
    }
}
