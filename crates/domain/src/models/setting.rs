//! Setting domain models for site configuration management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use validator::Validate;

/// Value type expected for a setting key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    Text,
    Boolean,
    Integer,
    /// Serialized JSON array or object.
    Json,
    /// JSON object mapping language codes to strings.
    Localized,
}

impl std::fmt::Display for SettingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingKind::Text => write!(f, "text"),
            SettingKind::Boolean => write!(f, "boolean"),
            SettingKind::Integer => write!(f, "integer"),
            SettingKind::Json => write!(f, "json"),
            SettingKind::Localized => write!(f, "localized"),
        }
    }
}

/// A typed setting value parsed from its stored text.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Text(String),
    Boolean(bool),
    Integer(i64),
    Json(serde_json::Value),
    Localized(BTreeMap<String, String>),
}

/// Reasons a raw value does not match its declared kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingValueError {
    #[error("expected 'true' or 'false'")]
    InvalidBoolean,
    #[error("expected an integer")]
    InvalidInteger,
    #[error("expected a JSON array or object")]
    NotStructured,
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("expected a JSON object of language code to text")]
    InvalidLocalized,
}

impl SettingValue {
    /// Parses stored text according to `kind`.
    pub fn parse(kind: SettingKind, raw: &str) -> Result<Self, SettingValueError> {
        match kind {
            SettingKind::Text => Ok(SettingValue::Text(raw.to_string())),
            SettingKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(SettingValue::Boolean(true)),
                "false" => Ok(SettingValue::Boolean(false)),
                _ => Err(SettingValueError::InvalidBoolean),
            },
            SettingKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(SettingValue::Integer)
                .map_err(|_| SettingValueError::InvalidInteger),
            SettingKind::Json => {
                let value: serde_json::Value = serde_json::from_str(raw)
                    .map_err(|e| SettingValueError::InvalidJson(e.to_string()))?;
                if value.is_array() || value.is_object() {
                    Ok(SettingValue::Json(value))
                } else {
                    Err(SettingValueError::NotStructured)
                }
            }
            SettingKind::Localized => serde_json::from_str::<BTreeMap<String, String>>(raw)
                .map(SettingValue::Localized)
                .map_err(|_| SettingValueError::InvalidLocalized),
        }
    }

    /// Renders the canonical stored text for this value.
    pub fn to_raw(&self) -> String {
        match self {
            SettingValue::Text(s) => s.clone(),
            SettingValue::Boolean(b) => b.to_string(),
            SettingValue::Integer(i) => i.to_string(),
            SettingValue::Json(v) => v.to_string(),
            SettingValue::Localized(map) => {
                serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
            }
        }
    }
}

/// Explicit mapping of setting keys to their value kinds.
///
/// Keys not registered here are treated as [`SettingKind::Text`].
#[derive(Debug, Clone)]
pub struct SettingSchema {
    kinds: HashMap<String, SettingKind>,
}

impl SettingSchema {
    /// Creates a schema with no registered keys.
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// Registers `key` with the given kind.
    pub fn with(mut self, key: &str, kind: SettingKind) -> Self {
        self.kinds.insert(key.to_string(), kind);
        self
    }

    pub fn kind_of(&self, key: &str) -> SettingKind {
        self.kinds.get(key).copied().unwrap_or(SettingKind::Text)
    }

    /// Validates `raw` against the key's kind and returns canonical stored text.
    ///
    /// An empty string clears the setting and is accepted for every kind.
    pub fn normalize(&self, key: &str, raw: &str) -> Result<String, SettingValueError> {
        if raw.is_empty() {
            return Ok(String::new());
        }
        SettingValue::parse(self.kind_of(key), raw).map(|v| v.to_raw())
    }
}

impl Default for SettingSchema {
    /// The site settings known to the front-end and admin panel.
    fn default() -> Self {
        Self::empty()
            .with("general.siteName", SettingKind::Text)
            .with("general.siteDescription", SettingKind::Localized)
            .with("general.postsPerPage", SettingKind::Integer)
            .with("general.defaultLanguage", SettingKind::Text)
            .with("appearance.theme", SettingKind::Text)
            .with("appearance.darkMode", SettingKind::Boolean)
            .with("appearance.primaryColor", SettingKind::Text)
            .with("navigation.menu", SettingKind::Json)
            .with("social.links", SettingKind::Json)
            .with("seo.metaTitle", SettingKind::Localized)
            .with("seo.metaDescription", SettingKind::Localized)
            .with("comments.enabled", SettingKind::Boolean)
    }
}

/// A persisted setting row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub group: String,
    pub updated_at: DateTime<Utc>,
}

/// One `{key, value, group}` element of a batch update request.
///
/// `value` accepts any JSON; non-string values are serialized to text.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SettingEntry {
    #[validate(custom(function = "shared::validation::validate_setting_key"))]
    pub key: String,

    pub value: serde_json::Value,

    #[validate(custom(function = "shared::validation::validate_setting_group"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl SettingEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: serde_json::Value::String(value.into()),
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// The value as stored text. `null` becomes the empty (cleared) value.
    pub fn raw_value(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// The explicit group, or the key's namespace (text before the first dot).
    pub fn resolved_group(&self) -> String {
        match &self.group {
            Some(group) => group.clone(),
            None => key_namespace(&self.key).to_string(),
        }
    }
}

/// Returns the namespace portion of a dot-namespaced key.
pub fn key_namespace(key: &str) -> &str {
    key.split('.').next().unwrap_or(key)
}

/// Filters for listing settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct SettingsQuery {
    #[validate(custom(function = "shared::validation::validate_setting_group"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    #[validate(custom(function = "shared::validation::validate_language"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// A setting whose write failed during a batch update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedSetting {
    pub key: String,
    pub message: String,
}

/// Outcome of a best-effort batch update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateOutcome {
    pub updated: Vec<String>,
    pub failed: Vec<FailedSetting>,
}

impl BatchUpdateOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Selects the `lang` variant of a per-locale JSON object.
///
/// Falls back to the primary subtag (`pt` for `pt-BR`). Returns `None` when the
/// value is not a JSON object or carries no matching entry.
pub fn localize(raw: &str, lang: &str) -> Option<String> {
    let trimmed = raw.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw).ok()?;

    let primary = lang.split('-').next().unwrap_or(lang);
    let value = map.get(lang).or_else(|| map.get(primary))?;

    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
