//! Session-scoped settings cache.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use domain::models::{BatchUpdateOutcome, SettingEntry, SettingKind, SettingValue, SettingsQuery};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::source::SettingsSource;

/// `key -> raw value` for every setting of the session.
pub type SettingsMap = BTreeMap<String, String>;

/// The settings of one client session.
///
/// Built with [`mount`](Self::mount) and shared by `Arc`. The whole mapping is
/// replaced after every successful fetch; readers never see a partial update.
/// Refreshes run one at a time, so a snapshot is never replaced by the result
/// of an earlier fetch. [`close`](Self::close) ends the session.
pub struct SettingsContext {
    source: Arc<dyn SettingsSource>,
    query: SettingsQuery,
    snapshot: watch::Receiver<Arc<SettingsMap>>,
    sender: Mutex<Option<watch::Sender<Arc<SettingsMap>>>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl SettingsContext {
    /// Creates the context and performs the initial fetch.
    ///
    /// A failed fetch leaves the mapping empty so every getter returns its
    /// fallback.
    pub async fn mount(source: Arc<dyn SettingsSource>, query: SettingsQuery) -> Arc<Self> {
        let (sender, snapshot) = watch::channel(Arc::new(SettingsMap::new()));
        let context = Arc::new(Self {
            source,
            query,
            snapshot,
            sender: Mutex::new(Some(sender)),
            refresh_lock: tokio::sync::Mutex::new(()),
        });

        if let Err(e) = context.refresh().await {
            warn!(error = %e, "Initial settings fetch failed, using defaults");
        }
        context
    }

    /// Refetches every setting and replaces the snapshot.
    ///
    /// On failure the previous snapshot is kept.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }

        // Held until the fetched snapshot is published
        let _guard = self.refresh_lock.lock().await;
        let settings = self.source.fetch_all(&self.query).await?;
        debug!(count = settings.len(), "Fetched settings");

        match self.sender().as_ref() {
            Some(sender) => {
                sender.send_replace(Arc::new(settings));
                Ok(())
            }
            None => Err(ClientError::Closed),
        }
    }

    /// Persists `entries` in one request, then refetches everything.
    ///
    /// A failed refetch is logged and the old snapshot stays in place; the
    /// write outcome is still returned.
    pub async fn batch_update(
        &self,
        entries: &[SettingEntry],
    ) -> Result<BatchUpdateOutcome, ClientError> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }

        let outcome = self.source.batch_update(entries).await?;
        if !outcome.is_complete() {
            warn!(
                updated = outcome.updated.len(),
                failed = outcome.failed.len(),
                "Settings batch partially saved"
            );
        }

        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Settings refetch after save failed");
        }
        Ok(outcome)
    }

    /// The stored value, or `fallback` when absent or empty.
    pub fn get_setting(&self, key: &str, fallback: &str) -> String {
        lookup(&self.snapshot.borrow(), key, fallback)
    }

    pub fn get_bool(&self, key: &str, fallback: bool) -> bool {
        match self.parse(key, SettingKind::Boolean) {
            Some(SettingValue::Boolean(value)) => value,
            _ => fallback,
        }
    }

    pub fn get_i64(&self, key: &str, fallback: i64) -> i64 {
        match self.parse(key, SettingKind::Integer) {
            Some(SettingValue::Integer(value)) => value,
            _ => fallback,
        }
    }

    /// Deserializes a JSON-text setting, or returns `fallback`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        let snapshot = self.snapshot.borrow();
        snapshot
            .get(key)
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(fallback)
    }

    /// The current mapping.
    pub fn snapshot(&self) -> Arc<SettingsMap> {
        self.snapshot.borrow().clone()
    }

    /// Subscribes to one key.
    pub fn use_setting(&self, key: &str, fallback: &str) -> SettingSubscription {
        let mut snapshot = self.snapshot.clone();
        // Only snapshots published after subscribing count as changes
        snapshot.borrow_and_update();

        SettingSubscription {
            key: key.to_string(),
            fallback: fallback.to_string(),
            snapshot,
        }
    }

    /// Ends the session. Subscribers waiting in
    /// [`SettingSubscription::changed`] receive [`ClientError::Closed`].
    pub fn close(&self) {
        if self.sender().take().is_some() {
            debug!("Settings context closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender().is_none()
    }

    fn sender(&self) -> MutexGuard<'_, Option<watch::Sender<Arc<SettingsMap>>>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn parse(&self, key: &str, kind: SettingKind) -> Option<SettingValue> {
        let snapshot = self.snapshot.borrow();
        let raw = snapshot.get(key).filter(|raw| !raw.is_empty())?;
        SettingValue::parse(kind, raw).ok()
    }
}

/// Live view of a single setting.
pub struct SettingSubscription {
    key: String,
    fallback: String,
    snapshot: watch::Receiver<Arc<SettingsMap>>,
}

impl SettingSubscription {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value in the latest snapshot, with the subscription's fallback.
    pub fn current(&self) -> String {
        lookup(&self.snapshot.borrow(), &self.key, &self.fallback)
    }

    /// Waits for the next snapshot and returns the new value.
    pub async fn changed(&mut self) -> Result<String, ClientError> {
        self.snapshot
            .changed()
            .await
            .map_err(|_| ClientError::Closed)?;
        Ok(self.current())
    }
}

fn lookup(settings: &SettingsMap, key: &str, fallback: &str) -> String {
    match settings.get(key) {
        Some(value) if !value.is_empty() => value.clone(),
        _ => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domain::models::FailedSetting;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// In-memory source that can be told to fail reads.
    #[derive(Default)]
    struct FakeSource {
        settings: Mutex<SettingsMap>,
        fail_fetch: AtomicBool,
        fetches: AtomicUsize,
    }

    impl FakeSource {
        fn with(entries: &[(&str, &str)]) -> Arc<Self> {
            let source = Self::default();
            {
                let mut settings = source.settings.lock().unwrap();
                for (key, value) in entries {
                    settings.insert(key.to_string(), value.to_string());
                }
            }
            Arc::new(source)
        }
    }

    #[async_trait]
    impl SettingsSource for FakeSource {
        async fn fetch_all(&self, query: &SettingsQuery) -> Result<SettingsMap, ClientError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(ClientError::Api {
                    status: 503,
                    code: "service_unavailable".into(),
                    message: "down".into(),
                });
            }
            let settings = self.settings.lock().unwrap();
            Ok(settings
                .iter()
                .filter(|(key, _)| match &query.group {
                    Some(group) => key.starts_with(&format!("{}.", group)),
                    None => true,
                })
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect())
        }

        async fn batch_update(
            &self,
            entries: &[SettingEntry],
        ) -> Result<BatchUpdateOutcome, ClientError> {
            let mut settings = self.settings.lock().unwrap();
            let mut outcome = BatchUpdateOutcome::default();
            for entry in entries {
                if entry.key.starts_with("readonly.") {
                    outcome.failed.push(FailedSetting {
                        key: entry.key.clone(),
                        message: "read only".into(),
                    });
                } else {
                    settings.insert(entry.key.clone(), entry.raw_value());
                    outcome.updated.push(entry.key.clone());
                }
            }
            Ok(outcome)
        }
    }

    /// Numbers each fetch; the fetch after [`hold_next`](Self::hold_next)
    /// waits for [`release`](Self::release).
    #[derive(Default)]
    struct SlowSource {
        fetches: AtomicUsize,
        hold: AtomicBool,
        gate: Notify,
    }

    impl SlowSource {
        fn hold_next(&self) {
            self.hold.store(true, Ordering::SeqCst);
        }

        fn release(&self) {
            self.gate.notify_one();
        }
    }

    #[async_trait]
    impl SettingsSource for SlowSource {
        async fn fetch_all(&self, _query: &SettingsQuery) -> Result<SettingsMap, ClientError> {
            let fetch = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            if self.hold.swap(false, Ordering::SeqCst) {
                self.gate.notified().await;
            }

            let mut settings = SettingsMap::new();
            settings.insert("general.revision".into(), fetch.to_string());
            Ok(settings)
        }

        async fn batch_update(
            &self,
            _entries: &[SettingEntry],
        ) -> Result<BatchUpdateOutcome, ClientError> {
            Ok(BatchUpdateOutcome::default())
        }
    }

    async fn mounted(entries: &[(&str, &str)]) -> (Arc<SettingsContext>, Arc<FakeSource>) {
        let source = FakeSource::with(entries);
        let context = SettingsContext::mount(source.clone(), SettingsQuery::default()).await;
        (context, source)
    }

    #[tokio::test]
    async fn test_mount_fetches_once() {
        let (context, source) = mounted(&[("general.siteName", "Blog")]).await;

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(context.get_setting("general.siteName", ""), "Blog");
        assert_eq!(context.get_setting("general.siteName", ""), "Blog");
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mount_failure_uses_fallbacks() {
        let source = FakeSource::with(&[("general.siteName", "Blog")]);
        source.fail_fetch.store(true, Ordering::SeqCst);

        let context = SettingsContext::mount(source, SettingsQuery::default()).await;
        assert!(context.snapshot().is_empty());
        assert_eq!(context.get_setting("general.siteName", "Default"), "Default");
    }

    #[tokio::test]
    async fn test_mount_with_group_query() {
        let source = FakeSource::with(&[("general.siteName", "Blog"), ("seo.metaTitle", "T")]);
        let query = SettingsQuery {
            group: Some("seo".into()),
            lang: None,
        };

        let context = SettingsContext::mount(source, query).await;
        assert_eq!(context.snapshot().len(), 1);
        assert_eq!(context.get_setting("seo.metaTitle", ""), "T");
    }

    #[tokio::test]
    async fn test_get_setting_fallbacks() {
        let (context, _) = mounted(&[("general.tagline", "")]).await;

        assert_eq!(context.get_setting("missing.key", "fallback"), "fallback");
        assert_eq!(context.get_setting("general.tagline", "fallback"), "fallback");
    }

    #[tokio::test]
    async fn test_typed_getters() {
        let (context, _) = mounted(&[
            ("appearance.darkMode", "true"),
            ("general.postsPerPage", "12"),
            ("general.broken", "twelve"),
            ("navigation.menu", r#"[{"label":"Home"}]"#),
        ])
        .await;

        assert!(context.get_bool("appearance.darkMode", false));
        assert!(context.get_bool("missing.flag", true));
        assert_eq!(context.get_i64("general.postsPerPage", 10), 12);
        assert_eq!(context.get_i64("general.broken", 10), 10);

        let menu: Vec<serde_json::Value> = context.get_json("navigation.menu", Vec::new());
        assert_eq!(menu[0]["label"], "Home");
        let missing: Vec<String> = context.get_json("missing.menu", vec!["x".into()]);
        assert_eq!(missing, vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn test_batch_update_refetches() {
        let (context, source) = mounted(&[]).await;

        let outcome = context
            .batch_update(&[SettingEntry::new("general.siteName", "Test")])
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(context.get_setting("general.siteName", ""), "Test");
    }

    #[tokio::test]
    async fn test_batch_update_partial_failure() {
        let (context, _) = mounted(&[]).await;

        let outcome = context
            .batch_update(&[
                SettingEntry::new("general.siteName", "Test"),
                SettingEntry::new("readonly.flag", "x"),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.updated, vec!["general.siteName".to_string()]);
        assert_eq!(outcome.failed[0].key, "readonly.flag");
        assert_eq!(context.get_setting("general.siteName", ""), "Test");
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_snapshot() {
        let (context, source) = mounted(&[("general.siteName", "Old")]).await;
        source.fail_fetch.store(true, Ordering::SeqCst);

        let outcome = context
            .batch_update(&[SettingEntry::new("general.siteName", "New")])
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(context.get_setting("general.siteName", ""), "Old");
        assert!(context.refresh().await.is_err());
    }

    #[tokio::test]
    async fn test_subscription_sees_updates() {
        let (context, _) = mounted(&[("appearance.theme", "light")]).await;
        let mut theme = context.use_setting("appearance.theme", "system");
        assert_eq!(theme.key(), "appearance.theme");
        assert_eq!(theme.current(), "light");

        context
            .batch_update(&[SettingEntry::new("appearance.theme", "dark")])
            .await
            .unwrap();

        assert_eq!(theme.changed().await.unwrap(), "dark");
    }

    #[tokio::test]
    async fn test_slow_fetch_never_overwrites_newer_snapshot() {
        let source = Arc::new(SlowSource::default());
        let context = SettingsContext::mount(source.clone(), SettingsQuery::default()).await;
        assert_eq!(context.get_setting("general.revision", ""), "1");

        source.hold_next();
        let slow = tokio::spawn({
            let context = context.clone();
            async move { context.refresh().await }
        });
        while source.fetches.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }

        let fast = tokio::spawn({
            let context = context.clone();
            async move { context.refresh().await }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        // The second refresh waits for the first to publish
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);

        source.release();
        slow.await.unwrap().unwrap();
        fast.await.unwrap().unwrap();

        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
        assert_eq!(context.get_setting("general.revision", ""), "3");
    }

    #[tokio::test]
    async fn test_close_ends_session() {
        let (context, _) = mounted(&[("appearance.theme", "light")]).await;
        let mut theme = context.use_setting("appearance.theme", "system");

        context.close();
        assert!(context.is_closed());
        assert!(matches!(theme.changed().await, Err(ClientError::Closed)));
        assert!(matches!(context.refresh().await, Err(ClientError::Closed)));
        assert!(matches!(
            context
                .batch_update(&[SettingEntry::new("appearance.theme", "dark")])
                .await,
            Err(ClientError::Closed)
        ));

        // Reads keep serving the last snapshot
        assert_eq!(context.get_setting("appearance.theme", ""), "light");
        assert_eq!(theme.current(), "light");
    }
}
