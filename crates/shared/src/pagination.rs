//! Offset pagination utilities shared by every list endpoint.

use serde::Serialize;
use std::future::Future;

/// Bounds applied when normalising raw pagination input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationOptions {
    pub default_page: i64,
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_limit: 10,
            max_limit: 100,
        }
    }
}

/// Normalised pagination parameters.
///
/// Invariants: `page >= 1`, `1 <= limit <= max_limit`, `skip == (page - 1) * limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationParams {
    pub page: i64,
    pub limit: i64,
    pub skip: i64,
}

/// Parses untrusted `page` / `limit` query values into bounded parameters.
///
/// Missing or non-numeric values fall back to the configured defaults, then
/// `page` is clamped to at least 1 and `limit` to `[1, max_limit]`.
pub fn get_pagination_params(
    raw_page: Option<&str>,
    raw_limit: Option<&str>,
    options: &PaginationOptions,
) -> PaginationParams {
    let max_limit = options.max_limit.max(1);

    let page = parse_or(raw_page, options.default_page).max(1);
    let limit = parse_or(raw_limit, options.default_limit).clamp(1, max_limit);
    let skip = (page - 1).saturating_mul(limit);

    PaginationParams { page, limit, skip }
}

fn parse_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(default)
}

/// Page position and total row count used to build the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

/// Pagination metadata of a list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub per_page: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// Uniform `{data, pagination}` list envelope.
#[derive(Debug, Clone, Serialize)]
pub struct PaginationResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Builds the list envelope for one page of results.
pub fn create_pagination_response<T>(info: PageInfo, data: Vec<T>) -> PaginationResponse<T> {
    let limit = info.limit.max(1);
    let total = info.total.max(0);
    let total_pages = total / limit + i64::from(total % limit != 0);

    PaginationResponse {
        data,
        pagination: PaginationMeta {
            total,
            total_pages,
            current_page: info.page,
            per_page: limit,
            has_next_page: info.page < total_pages,
            has_prev_page: info.page > 1,
        },
    }
}

/// Runs the count query and the page query concurrently and composes the envelope.
///
/// Both futures are polled together; the first error aborts and is returned.
pub async fn paginate_results<T, E, C, P>(
    params: PaginationParams,
    count: C,
    page: P,
) -> Result<PaginationResponse<T>, E>
where
    C: Future<Output = Result<i64, E>>,
    P: Future<Output = Result<Vec<T>, E>>,
{
    let (total, data) = tokio::try_join!(count, page)?;

    Ok(create_pagination_response(
        PageInfo {
            page: params.page,
            limit: params.limit,
            total,
        },
        data,
    ))
}
