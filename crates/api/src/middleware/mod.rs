//! HTTP middleware components.

pub mod auth;
pub mod csrf;
pub mod logging;
pub mod metrics;
pub mod security_headers;
pub mod trace_id;

pub use auth::require_admin;
pub use csrf::{csrf_middleware, CSRF_BODY_FIELD, CSRF_HEADER};
pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use security_headers::security_headers_middleware;
pub use trace_id::{trace_id, RequestId, REQUEST_ID_HEADER};
