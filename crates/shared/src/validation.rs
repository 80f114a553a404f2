//! Common validation utilities.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

/// Maximum length of a setting key.
pub const MAX_SETTING_KEY_LENGTH: usize = 128;

/// Maximum length of a setting group name.
pub const MAX_SETTING_GROUP_LENGTH: usize = 64;

lazy_static! {
    /// `section.name[.more]` with at least one dot.
    static ref SETTING_KEY_REGEX: Regex =
        Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*(\.[A-Za-z0-9_-]+)+$").unwrap();
    static ref SETTING_GROUP_REGEX: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").unwrap();
    /// BCP-47 style primary language with optional region, e.g. `en` or `pt-BR`.
    static ref LANGUAGE_REGEX: Regex = Regex::new(r"^[a-z]{2,3}(-[A-Za-z]{2})?$").unwrap();
}

/// Validates that a setting key is dot-namespaced (e.g. `appearance.theme`).
pub fn validate_setting_key(key: &str) -> Result<(), ValidationError> {
    if key.len() > MAX_SETTING_KEY_LENGTH {
        let mut err = ValidationError::new("setting_key_length");
        err.message = Some(
            format!(
                "Setting key must be at most {} characters",
                MAX_SETTING_KEY_LENGTH
            )
            .into(),
        );
        return Err(err);
    }

    if SETTING_KEY_REGEX.is_match(key) {
        Ok(())
    } else {
        let mut err = ValidationError::new("setting_key_format");
        err.message = Some("Setting key must be dot-namespaced, e.g. 'general.siteName'".into());
        Err(err)
    }
}

/// Validates a setting group name.
pub fn validate_setting_group(group: &str) -> Result<(), ValidationError> {
    if !group.is_empty()
        && group.len() <= MAX_SETTING_GROUP_LENGTH
        && SETTING_GROUP_REGEX.is_match(group)
    {
        Ok(())
    } else {
        let mut err = ValidationError::new("setting_group_format");
        err.message = Some("Group must be alphanumeric and start with a letter".into());
        Err(err)
    }
}

/// Validates a language code used to select localized setting values.
pub fn validate_language(lang: &str) -> Result<(), ValidationError> {
    if LANGUAGE_REGEX.is_match(lang) {
        Ok(())
    } else {
        let mut err = ValidationError::new("language_format");
        err.message = Some("Language must be a code like 'en' or 'pt-BR'".into());
        Err(err)
    }
}
