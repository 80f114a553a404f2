//! Anti-forgery token middleware.
//!
//! Safe methods and exempt paths receive a fresh token in the `X-CSRF-Token`
//! response header. Every other request must carry a token in that header or
//! in the `_csrf` field of a JSON body.
//!
//! Only the presence of a token is checked; tokens are not bound to a session
//! or compared against an issued value.
// TODO: bind issued tokens to the admin session and compare on mutating requests.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::crypto::generate_token;
use tracing::debug;

use crate::app::AppState;
use crate::error::ApiError;

/// Header carrying the token in both directions.
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// JSON body field accepted in place of the header.
pub const CSRF_BODY_FIELD: &str = "_csrf";

pub async fn csrf_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let csrf = &state.config.csrf;
    if !csrf.enabled {
        return next.run(req).await;
    }

    if is_exempt(req.method(), req.uri().path(), &csrf.exempt_paths) {
        return with_fresh_token(next.run(req).await);
    }

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match extract_token(req, state.config.server.max_body_size).await {
        Ok((Some(_), req)) => with_fresh_token(next.run(req).await),
        Ok((None, _)) => {
            debug!(method = %method, path = %path, "Rejected request without CSRF token");
            ApiError::CsrfTokenMissing.into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Safe methods and requests under an exempt path prefix skip the token check.
///
/// A trailing `*` on an exempt entry is ignored, so `/api/health*` and
/// `/api/health` are equivalent.
pub fn is_exempt(method: &Method, path: &str, exempt_paths: &[String]) -> bool {
    if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
        return true;
    }
    exempt_paths.iter().any(|exempt| {
        let prefix = exempt.trim_end_matches('*');
        !prefix.is_empty() && path.starts_with(prefix)
    })
}

/// Looks for a token in the header, then in a JSON body.
///
/// A JSON body is buffered (up to `limit` bytes) and handed back inside the
/// returned request.
async fn extract_token(
    req: Request<Body>,
    limit: usize,
) -> Result<(Option<String>, Request<Body>), ApiError> {
    if let Some(token) = header_token(req.headers()) {
        return Ok((Some(token), req));
    }
    if !is_json(req.headers()) {
        return Ok((None, req));
    }

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| ApiError::PayloadTooLarge)?;
    let token = body_token(&bytes);

    Ok((token, Request::from_parts(parts, Body::from(bytes))))
}

fn header_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
}

fn body_token(bytes: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    value
        .get(CSRF_BODY_FIELD)?
        .as_str()
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn with_fresh_token(mut response: Response) -> Response {
    if let Ok(value) = HeaderValue::from_str(&generate_token()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static("x-csrf-token"), value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exempt() -> Vec<String> {
        vec!["/api/health".to_string()]
    }

    #[test]
    fn test_safe_methods_are_exempt() {
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            assert!(is_exempt(&method, "/api/v1/settings", &exempt()));
        }
    }

    #[test]
    fn test_mutating_methods_are_protected() {
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            assert!(!is_exempt(&method, "/api/v1/settings/batch", &exempt()));
        }
    }

    #[test]
    fn test_exempt_path_prefix() {
        assert!(is_exempt(&Method::POST, "/api/health", &exempt()));
        assert!(is_exempt(&Method::POST, "/api/health/ready", &exempt()));
        assert!(is_exempt(
            &Method::POST,
            "/api/health/live",
            &["/api/health*".to_string()]
        ));
        assert!(!is_exempt(&Method::POST, "/api/v1/health", &exempt()));
        assert!(!is_exempt(&Method::POST, "/anything", &["*".to_string()]));
    }

    #[test]
    fn test_header_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(header_token(&headers), None);

        headers.insert("x-csrf-token", HeaderValue::from_static("   "));
        assert_eq!(header_token(&headers), None);

        headers.insert("x-csrf-token", HeaderValue::from_static("abc"));
        assert_eq!(header_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn test_body_token() {
        assert_eq!(
            body_token(br#"{"_csrf":"tok","key":"a.b"}"#).as_deref(),
            Some("tok")
        );
        assert_eq!(body_token(br#"{"_csrf":""}"#), None);
        assert_eq!(body_token(br#"{"_csrf":42}"#), None);
        assert_eq!(body_token(br#"[{"_csrf":"tok"}]"#), None);
        assert_eq!(body_token(b"not json"), None);
    }

    #[test]
    fn test_is_json() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(is_json(&headers));
    }

    #[tokio::test]
    async fn test_extract_token_rebuilds_body() {
        let req = Request::builder()
            .method(Method::POST)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"_csrf":"tok"}"#))
            .unwrap();

        let (token, req) = extract_token(req, 1024).await.unwrap();
        assert_eq!(token.as_deref(), Some("tok"));

        let bytes = axum::body::to_bytes(req.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], br#"{"_csrf":"tok"}"#);
    }

    #[tokio::test]
    async fn test_extract_token_body_limit() {
        let req = Request::builder()
            .method(Method::POST)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(vec![b' '; 64]))
            .unwrap();

        let err = extract_token(req, 16).await.unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge));
    }

    #[test]
    fn test_fresh_token_header() {
        let response = with_fresh_token(Response::new(Body::empty()));
        let token = response.headers().get(CSRF_HEADER).unwrap();
        assert_eq!(token.len(), 43);
    }
}
