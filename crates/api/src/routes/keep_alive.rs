//! Keep-alive monitor endpoint handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use domain::models::{PingRecord, PingType};
use serde::Deserialize;
use shared::pagination::{get_pagination_params, paginate_results};

use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::{ApiResponse, PagedResponse};
use crate::services::KeepAliveStatus;

/// Raw `page` / `limit` query values; normalised by the pagination helper.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// GET /api/v1/keep-alive/status
pub async fn status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<KeepAliveStatus>>, ApiError> {
    let status = state.keep_alive.status().await?;
    Ok(Json(ApiResponse::ok(status)))
}

/// POST /api/v1/keep-alive/ping
///
/// Pings now and records a `manual` entry.
pub async fn ping(State(state): State<AppState>) -> Result<Json<ApiResponse<PingRecord>>, ApiError> {
    let record = state.keep_alive.ping(PingType::Manual).await?;
    Ok(Json(ApiResponse::ok(record)))
}

/// GET /api/v1/keep-alive/history?page=&limit=
///
/// Newest first.
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<PagedResponse<PingRecord>>, ApiError> {
    let params = get_pagination_params(
        query.page.as_deref(),
        query.limit.as_deref(),
        &state.config.pagination.options(),
    );

    let page = paginate_results(
        params,
        state.pings.count(),
        state.pings.list_recent(params.skip, params.limit),
    )
    .await?;

    Ok(Json(page.into()))
}
