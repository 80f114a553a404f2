//! Settings endpoint handlers.

use std::collections::BTreeMap;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use domain::models::{BatchUpdateOutcome, Setting, SettingEntry, SettingsQuery};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_settings_written;
use crate::routes::ApiResponse;

/// GET /api/v1/settings?group=&lang=
///
/// All settings as `key -> value`.
///
/// Empty `group` or `lang` parameters are ignored.
pub async fn get_settings(
    State(state): State<AppState>,
    query: Result<Query<SettingsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<BTreeMap<String, String>>>, ApiError> {
    let Query(mut query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    query.group = query.group.filter(|g| !g.is_empty());
    query.lang = query.lang.filter(|l| !l.is_empty());
    query.validate()?;

    let settings = state.settings.get_all(&query).await?;
    Ok(Json(ApiResponse::ok(settings)))
}

/// GET /api/v1/settings/:key
pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<Setting>>, ApiError> {
    if let Err(e) = shared::validation::validate_setting_key(&key) {
        return Err(ApiError::Validation(
            e.message.map(|m| m.to_string()).unwrap_or_default(),
        ));
    }

    let setting = state.settings.get(&key).await?;
    Ok(Json(ApiResponse::ok(setting)))
}

/// POST /api/v1/settings/batch
///
/// Best-effort write of `[{key, value, group?}]`.
pub async fn batch_update(
    State(state): State<AppState>,
    body: Result<Json<Vec<SettingEntry>>, JsonRejection>,
) -> Result<Json<ApiResponse<BatchUpdateOutcome>>, ApiError> {
    let Json(entries) = body.map_err(|e| ApiError::Validation(e.body_text()))?;
    let count = entries.len();

    let outcome = state.settings.batch_update(entries).await?;
    record_settings_written(outcome.updated.len(), outcome.failed.len());
    info!(
        requested = count,
        updated = outcome.updated.len(),
        failed = outcome.failed.len(),
        "Settings batch saved"
    );

    Ok(Json(ApiResponse::ok(outcome)))
}

/// PATCH /api/v1/settings/:section
///
/// Batch write restricted to one section.
pub async fn update_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
    body: Result<Json<Vec<SettingEntry>>, JsonRejection>,
) -> Result<Json<ApiResponse<BatchUpdateOutcome>>, ApiError> {
    let Json(entries) = body.map_err(|e| ApiError::Validation(e.body_text()))?;

    let outcome = state.settings.update_section(&section, entries).await?;
    record_settings_written(outcome.updated.len(), outcome.failed.len());
    info!(
        section = %section,
        updated = outcome.updated.len(),
        failed = outcome.failed.len(),
        "Settings section saved"
    );

    Ok(Json(ApiResponse::ok(outcome)))
}
