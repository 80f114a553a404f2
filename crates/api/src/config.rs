use serde::Deserialize;
use shared::pagination::PaginationOptions;
use std::net::SocketAddr;

pub use persistence::db::DatabaseConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub csrf: CsrfConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub keep_alive: KeepAliveConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Upper bound on JSON bodies buffered by the CSRF middleware.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json` or `pretty`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Bearer token required on mutating routes. Empty disables the check.
    #[serde(default)]
    pub admin_token: String,

    /// `production` hides internal error details from responses.
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub hsts_enabled: bool,
}

impl SecurityConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            admin_token: String::new(),
            environment: default_environment(),
            hsts_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsrfConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Path prefixes that never require a token.
    #[serde(default = "default_csrf_exempt_paths")]
    pub exempt_paths: Vec<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exempt_paths: default_csrf_exempt_paths(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_limit")]
    pub default_limit: i64,

    #[serde(default = "default_max_page_limit")]
    pub max_limit: i64,
}

impl PaginationConfig {
    pub fn options(&self) -> PaginationOptions {
        PaginationOptions {
            default_page: 1,
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_page_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeepAliveConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_keep_alive_interval")]
    pub interval_minutes: u64,

    /// URL to ping. Empty means this server's own `/api/health`.
    #[serde(default)]
    pub target_url: String,

    #[serde(default = "default_keep_alive_timeout")]
    pub timeout_secs: u64,

    /// Number of newest ping records to keep. 0 keeps everything.
    #[serde(default)]
    pub retention: i64,
}

impl KeepAliveConfig {
    /// The configured target, or the local health endpoint of `server`.
    pub fn resolved_target(&self, server: &ServerConfig) -> String {
        if !self.target_url.is_empty() {
            return self.target_url.clone();
        }
        let host = match server.host.as_str() {
            "0.0.0.0" => "127.0.0.1",
            "::" => "[::1]",
            other => other,
        };
        format!("http://{}:{}/api/health", host, server.port)
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: default_keep_alive_interval(),
            target_url: String::new(),
            timeout_secs: default_keep_alive_timeout(),
            retention: 0,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    1_048_576
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_environment() -> String {
    "development".to_string()
}
fn default_true() -> bool {
    true
}
fn default_csrf_exempt_paths() -> Vec<String> {
    vec!["/api/health".to_string()]
}
fn default_page_limit() -> i64 {
    10
}
fn default_max_page_limit() -> i64 {
    100
}
fn default_keep_alive_interval() -> u64 {
    14
}
fn default_keep_alive_timeout() -> u64 {
    10
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Embedded copy of the defaults used by [`Config::load_for_test`].
const TEST_DEFAULTS: &str = r#"
    [server]
    host = "127.0.0.1"
    port = 8080
    request_timeout_secs = 30
    max_body_size = 1048576

    [database]
    url = ""
    max_connections = 5
    min_connections = 1

    [logging]
    level = "info"
    format = "pretty"

    [security]
    cors_origins = []
    admin_token = ""
    environment = "development"

    [csrf]
    enabled = true
    exempt_paths = ["/api/health"]

    [pagination]
    default_limit = 10
    max_limit = 100

    [keep_alive]
    enabled = false
    interval_minutes = 14
    target_url = ""
    timeout_secs = 2
    retention = 0
"#;

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with BLOG__ prefix, e.g. `BLOG__DATABASE__URL`
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("BLOG")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("security.cors_origins")
                    .with_list_parse_key("csrf.exempt_paths"),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Builds a configuration from embedded defaults plus `overrides`,
    /// without reading files or the environment. Not validated.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(TEST_DEFAULTS, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "BLOG__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.socket_addr().is_err() {
            return Err(ConfigValidationError::InvalidValue(format!(
                "Invalid server address {}:{}",
                self.server.host, self.server.port
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.pagination.max_limit < 1 {
            return Err(ConfigValidationError::InvalidValue(
                "pagination.max_limit must be at least 1".to_string(),
            ));
        }

        if self.keep_alive.enabled && self.keep_alive.interval_minutes == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "keep_alive.interval_minutes must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
