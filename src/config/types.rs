// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub static_files: StaticFilesConfig,
    pub not_found: NotFoundConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub keep_alive: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Minimum level written: error, warn, info or debug
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    /// Upper bound for an aggregated request body; 0 disables the check
    pub max_body_size: u64,
    #[serde(default)]
    pub cors: CorsConfig,
}

/// Headers injected on every matched route when CORS is enabled
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    #[serde(default = "default_allow_origin")]
    pub allow_origin: String,
    #[serde(default = "default_allow_methods")]
    pub allow_methods: String,
    #[serde(default = "default_allow_headers")]
    pub allow_headers: String,
}

fn default_allow_origin() -> String {
    "*".to_string()
}

fn default_allow_methods() -> String {
    "GET, POST, PUT, PATCH, DELETE, OPTIONS".to_string()
}

fn default_allow_headers() -> String {
    "Content-Type, Authorization".to_string()
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: default_allow_origin(),
            allow_methods: default_allow_methods(),
            allow_headers: default_allow_headers(),
        }
    }
}

/// Static asset fallback configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StaticFilesConfig {
    /// Requests under this prefix never reach the route table
    pub prefix: String,
    /// Directory the request path is resolved against
    pub root: String,
    /// Maximum thumbnails encoded at the same time
    pub thumbnail_concurrency: usize,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            prefix: "/music".to_string(),
            root: "public".to_string(),
            thumbnail_concurrency: 4,
        }
    }
}

/// Not-found document location
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct NotFoundConfig {
    pub page: String,
}

impl Default for NotFoundConfig {
    fn default() -> Self {
        Self {
            page: "views/404.html".to_string(),
        }
    }
}
