//! Settings service.
//!
//! Sits between the HTTP layer and a [`SettingStore`]: validates entries against
//! the [`SettingSchema`] before anything is written and applies language
//! selection on reads.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::models::setting::key_namespace;
use crate::models::{
    localize, BatchUpdateOutcome, FailedSetting, Setting, SettingEntry, SettingKind,
    SettingSchema, SettingsQuery,
};
use crate::store::{SettingStore, StoreError};

/// A field-level validation problem in a settings request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid settings: {} problem(s)", .0.len())]
    Invalid(Vec<FieldViolation>),

    #[error("Setting not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Settings operations over a pluggable store.
#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn SettingStore>,
    schema: Arc<SettingSchema>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingStore>, schema: SettingSchema) -> Self {
        Self {
            store,
            schema: Arc::new(schema),
        }
    }

    /// Checks the underlying store is reachable.
    pub async fn ping(&self) -> Result<(), SettingsError> {
        Ok(self.store.ping().await?)
    }

    /// Returns `key -> value` for every setting, optionally narrowed to a group.
    ///
    /// With `lang`, per-locale JSON objects that contain the language are
    /// replaced by the localized string. `Json` settings are never localized.
    pub async fn get_all(
        &self,
        query: &SettingsQuery,
    ) -> Result<BTreeMap<String, String>, SettingsError> {
        let rows = self.store.list(query.group.as_deref()).await?;
        debug!(count = rows.len(), group = ?query.group, lang = ?query.lang, "Loaded settings");

        let settings = rows
            .into_iter()
            .map(|setting| {
                let value = match query.lang.as_deref() {
                    Some(lang) if self.schema.kind_of(&setting.key) != SettingKind::Json => {
                        localize(&setting.value, lang).unwrap_or(setting.value)
                    }
                    _ => setting.value,
                };
                (setting.key, value)
            })
            .collect();

        Ok(settings)
    }

    pub async fn get(&self, key: &str) -> Result<Setting, SettingsError> {
        self.store
            .get(key)
            .await?
            .ok_or_else(|| SettingsError::NotFound(key.to_string()))
    }

    /// Writes every entry independently.
    ///
    /// All entries are validated first; any violation rejects the whole batch
    /// before the store is touched. After that the write is best-effort: a
    /// failing entry is reported in `failed` and earlier writes stay in place.
    pub async fn batch_update(
        &self,
        entries: Vec<SettingEntry>,
    ) -> Result<BatchUpdateOutcome, SettingsError> {
        let prepared = self.prepare(&entries)?;
        let mut outcome = BatchUpdateOutcome::default();

        for (key, value, group) in prepared {
            match self.store.upsert(&key, &value, &group).await {
                Ok(_) => outcome.updated.push(key),
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to write setting");
                    outcome.failed.push(FailedSetting {
                        key,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            updated = outcome.updated.len(),
            failed = outcome.failed.len(),
            "Settings batch update finished"
        );
        Ok(outcome)
    }

    /// Batch update restricted to keys under `section.`.
    ///
    /// Entries without an explicit group are stored under `section`.
    pub async fn update_section(
        &self,
        section: &str,
        mut entries: Vec<SettingEntry>,
    ) -> Result<BatchUpdateOutcome, SettingsError> {
        if let Err(e) = shared::validation::validate_setting_group(section) {
            return Err(SettingsError::Invalid(vec![FieldViolation::new(
                "section",
                e.message.map(|m| m.to_string()).unwrap_or_default(),
            )]));
        }

        let violations: Vec<FieldViolation> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| key_namespace(&entry.key) != section || !entry.key.contains('.'))
            .map(|(i, entry)| {
                FieldViolation::new(
                    format!("entries[{}].key", i),
                    format!("Setting '{}' does not belong to section '{}'", entry.key, section),
                )
            })
            .collect();
        if !violations.is_empty() {
            return Err(SettingsError::Invalid(violations));
        }

        for entry in &mut entries {
            if entry.group.is_none() {
                entry.group = Some(section.to_string());
            }
        }

        self.batch_update(entries).await
    }

    /// Validates entries and returns `(key, normalized value, group)` triples.
    fn prepare(
        &self,
        entries: &[SettingEntry],
    ) -> Result<Vec<(String, String, String)>, SettingsError> {
        if entries.is_empty() {
            return Err(SettingsError::Invalid(vec![FieldViolation::new(
                "entries",
                "At least one setting is required",
            )]));
        }

        let mut violations = Vec::new();
        let mut prepared = Vec::with_capacity(entries.len());

        for (i, entry) in entries.iter().enumerate() {
            if let Err(errors) = entry.validate() {
                for (field, errs) in errors.field_errors() {
                    for err in errs {
                        violations.push(FieldViolation::new(
                            format!("entries[{}].{}", i, field),
                            err.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| err.code.to_string()),
                        ));
                    }
                }
                continue;
            }

            match self.schema.normalize(&entry.key, &entry.raw_value()) {
                Ok(value) => prepared.push((entry.key.clone(), value, entry.resolved_group())),
                Err(e) => violations.push(FieldViolation::new(
                    format!("entries[{}].value", i),
                    format!(
                        "Setting '{}' expects a {} value: {}",
                        entry.key,
                        self.schema.kind_of(&entry.key),
                        e
                    ),
                )),
            }
        }

        if violations.is_empty() {
            Ok(prepared)
        } else {
            Err(SettingsError::Invalid(violations))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    /// Store that keeps rows in a map and fails writes for one chosen key.
    #[derive(Default)]
    struct TestStore {
        rows: Mutex<BTreeMap<String, Setting>>,
        fail_key: Option<String>,
    }

    #[async_trait]
    impl SettingStore for TestStore {
        async fn list(&self, group: Option<&str>) -> Result<Vec<Setting>, StoreError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .values()
                .filter(|s| group.map_or(true, |g| s.group == g))
                .cloned()
                .collect())
        }

        async fn get(&self, key: &str) -> Result<Option<Setting>, StoreError> {
            Ok(self.rows.lock().unwrap().get(key).cloned())
        }

        async fn upsert(&self, key: &str, value: &str, group: &str) -> Result<Setting, StoreError> {
            if self.fail_key.as_deref() == Some(key) {
                return Err(StoreError::Database("disk full".into()));
            }
            let setting = Setting {
                key: key.to_string(),
                value: value.to_string(),
                group: group.to_string(),
                updated_at: Utc::now(),
            };
            self.rows
                .lock()
                .unwrap()
                .insert(key.to_string(), setting.clone());
            Ok(setting)
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn service_with(store: TestStore) -> (SettingsService, Arc<TestStore>) {
        let store = Arc::new(store);
        let service = SettingsService::new(store.clone(), SettingSchema::default());
        (service, store)
    }

    fn service() -> (SettingsService, Arc<TestStore>) {
        service_with(TestStore::default())
    }

    #[tokio::test]
    async fn test_batch_update_then_get_all() {
        let (service, _) = service();
        let outcome = service
            .batch_update(vec![SettingEntry::new("general.siteName", "Test")])
            .await
            .unwrap();
        assert_eq!(outcome.updated, vec!["general.siteName".to_string()]);
        assert!(outcome.is_complete());

        let all = service.get_all(&SettingsQuery::default()).await.unwrap();
        assert_eq!(all.get("general.siteName").map(String::as_str), Some("Test"));
    }

    #[tokio::test]
    async fn test_batch_update_overwrites() {
        let (service, store) = service();
        service
            .batch_update(vec![SettingEntry::new("appearance.theme", "light")])
            .await
            .unwrap();
        service
            .batch_update(vec![SettingEntry::new("appearance.theme", "dark")])
            .await
            .unwrap();

        let rows = store.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows["appearance.theme"].value, "dark");
        assert_eq!(rows["appearance.theme"].group, "appearance");
    }

    #[tokio::test]
    async fn test_batch_update_normalizes_typed_values() {
        let (service, store) = service();
        service
            .batch_update(vec![
                SettingEntry::new("appearance.darkMode", "TRUE"),
                SettingEntry::new("general.postsPerPage", " 12 "),
            ])
            .await
            .unwrap();

        let rows = store.rows.lock().unwrap();
        assert_eq!(rows["appearance.darkMode"].value, "true");
        assert_eq!(rows["general.postsPerPage"].value, "12");
    }

    #[tokio::test]
    async fn test_batch_update_rejects_invalid_before_writing() {
        let (service, store) = service();
        let err = service
            .batch_update(vec![
                SettingEntry::new("general.siteName", "Blog"),
                SettingEntry::new("appearance.darkMode", "maybe"),
                SettingEntry::new("nodot", "x"),
            ])
            .await
            .unwrap_err();

        match err {
            SettingsError::Invalid(violations) => {
                let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
                assert!(fields.contains(&"entries[1].value"));
                assert!(fields.contains(&"entries[2].key"));
            }
            other => panic!("Expected Invalid, got {:?}", other),
        }
        assert!(store.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_update_empty_is_invalid() {
        let (service, _) = service();
        let err = service.batch_update(vec![]).await.unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_batch_update_is_best_effort() {
        let (service, store) = service_with(TestStore {
            fail_key: Some("seo.metaTitle".into()),
            ..Default::default()
        });

        let outcome = service
            .batch_update(vec![
                SettingEntry::new("general.siteName", "Blog"),
                SettingEntry::new("seo.metaTitle", r#"{"en":"Blog"}"#),
                SettingEntry::new("appearance.theme", "dark"),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.updated, vec!["general.siteName", "appearance.theme"]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].key, "seo.metaTitle");
        assert!(outcome.failed[0].message.contains("disk full"));
        assert_eq!(store.rows.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_all_filters_by_group() {
        let (service, _) = service();
        service
            .batch_update(vec![
                SettingEntry::new("general.siteName", "Blog"),
                SettingEntry::new("appearance.theme", "dark"),
            ])
            .await
            .unwrap();

        let query = SettingsQuery {
            group: Some("appearance".into()),
            lang: None,
        };
        let all = service.get_all(&query).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("appearance.theme"));
    }

    #[tokio::test]
    async fn test_get_all_localizes() {
        let (service, _) = service();
        service
            .batch_update(vec![
                SettingEntry::new("general.siteDescription", r#"{"en":"Hello","fr":"Bonjour"}"#),
                SettingEntry::new("general.siteName", "Blog"),
                SettingEntry::new("navigation.menu", r#"{"fr":"not a locale map"}"#),
            ])
            .await
            .unwrap();

        let query = SettingsQuery {
            group: None,
            lang: Some("fr".into()),
        };
        let all = service.get_all(&query).await.unwrap();
        assert_eq!(all["general.siteDescription"], "Bonjour");
        assert_eq!(all["general.siteName"], "Blog");
        assert_eq!(all["navigation.menu"], r#"{"fr":"not a locale map"}"#);

        let query = SettingsQuery {
            group: None,
            lang: Some("de".into()),
        };
        let all = service.get_all(&query).await.unwrap();
        assert_eq!(all["general.siteDescription"], r#"{"en":"Hello","fr":"Bonjour"}"#);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (service, _) = service();
        let err = service.get("missing.key").await.unwrap_err();
        assert!(matches!(err, SettingsError::NotFound(key) if key == "missing.key"));
    }

    #[tokio::test]
    async fn test_update_section_defaults_group() {
        let (service, store) = service();
        service
            .update_section(
                "social",
                vec![
                    SettingEntry::new("social.links", r#"["https://example.com"]"#),
                    SettingEntry::new("social.handle", "@blog").with_group("profile"),
                ],
            )
            .await
            .unwrap();

        let rows = store.rows.lock().unwrap();
        assert_eq!(rows["social.links"].group, "social");
        assert_eq!(rows["social.handle"].group, "profile");
    }

    #[tokio::test]
    async fn test_update_section_rejects_foreign_keys() {
        let (service, store) = service();
        let err = service
            .update_section(
                "social",
                vec![
                    SettingEntry::new("social.links", "[]"),
                    SettingEntry::new("seo.metaTitle", "x"),
                ],
            )
            .await
            .unwrap_err();

        match err {
            SettingsError::Invalid(violations) => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].field, "entries[1].key");
            }
            other => panic!("Expected Invalid, got {:?}", other),
        }
        assert!(store.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_section_rejects_bad_section() {
        let (service, _) = service();
        let err = service
            .update_section("bad section", vec![SettingEntry::new("a.b", "c")])
            .await
            .unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(v) if v[0].field == "section"));
    }
}
