//! Admin authentication middleware.
//!
//! Mutating settings and keep-alive routes require
//! `Authorization: Bearer <security.admin_token>`. An empty configured token
//! turns the check off.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::crypto::secrets_match;

use crate::app::AppState;
use crate::error::ApiError;

pub async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let expected = &state.config.security.admin_token;
    if expected.is_empty() {
        return next.run(req).await;
    }

    let authorized = bearer_token(req.headers()).map(|token| secrets_match(token, expected));

    match authorized {
        Some(true) => next.run(req).await,
        Some(false) => {
            tracing::warn!(path = %req.uri().path(), "Rejected invalid admin token");
            ApiError::Unauthorized("Invalid admin token".into()).into_response()
        }
        None => ApiError::Unauthorized("Missing admin token".into()).into_response(),
    }
}

/// Extracts the token of an `Authorization: Bearer ...` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
