use axum::{
    http::HeaderName,
    middleware,
    routing::{get, patch, post},
    Router,
};
use domain::models::SettingSchema;
use domain::services::SettingsService;
use domain::store::{PingLogStore, SettingStore};
use persistence::{MemoryPingLogStore, MemorySettingStore, PgPingRepository, PgSettingRepository};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::error::internal_error_details;
use crate::middleware::{
    csrf_middleware, metrics_handler, metrics_middleware, require_admin,
    security_headers_middleware, trace_id,
};
use crate::routes::{health, keep_alive, settings};
use crate::services::KeepAliveMonitor;

/// Storage backends the application runs on.
#[derive(Clone)]
pub struct Stores {
    pub settings: Arc<dyn SettingStore>,
    pub pings: Arc<dyn PingLogStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            settings: Arc::new(PgSettingRepository::new(pool.clone())),
            pings: Arc::new(PgPingRepository::new(pool)),
        }
    }

    /// Non-durable stores, used by tests and local demos.
    pub fn in_memory() -> Self {
        Self {
            settings: Arc::new(MemorySettingStore::new()),
            pings: Arc::new(MemoryPingLogStore::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub settings: SettingsService,
    pub pings: Arc<dyn PingLogStore>,
    pub keep_alive: Arc<KeepAliveMonitor>,
}

impl AppState {
    pub fn new(config: Config, stores: Stores) -> Self {
        let keep_alive = Arc::new(KeepAliveMonitor::new(
            &config.keep_alive,
            &config.server,
            stores.pings.clone(),
        ));

        Self {
            settings: SettingsService::new(stores.settings, SettingSchema::default()),
            pings: stores.pings,
            keep_alive,
            config: Arc::new(config),
        }
    }
}

pub fn create_app(config: Config, stores: Stores) -> Router {
    router(AppState::new(config, stores))
}

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();
    let csrf_header = HeaderName::from_static("x-csrf-token");
    let request_id_header = HeaderName::from_static("x-request-id");

    let cors = if config.security.cors_origins.is_empty() {
        // Development: allow any origin
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };
    let cors = cors.expose_headers([csrf_header, request_id_header]);

    // Mutating routes (admin token when configured)
    let admin_routes = Router::new()
        .route("/api/v1/settings/batch", post(settings::batch_update))
        // Same path as the GET by key; the segment is the section name here
        .route("/api/v1/settings/:key", patch(settings::update_section))
        .route("/api/v1/keep-alive/ping", post(keep_alive::ping))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Public read routes
    let public_routes = Router::new()
        .route("/api/v1/settings", get(settings::get_settings))
        .route("/api/v1/settings/:key", get(settings::get_setting))
        .route("/api/v1/keep-alive/status", get(keep_alive::status))
        .route("/api/v1/keep-alive/history", get(keep_alive::history))
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Global middleware (order matters: bottom layers run first)
    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            internal_error_details,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), csrf_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
