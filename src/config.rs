//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//!
//! # Identity
//!
//! - `SESSIONS_FILE`: JSON file of bearer sessions (unset = every caller is anonymous)
//! - `ADMIN_EMAILS`: Comma-separated emails granted the admin role at startup
//!
//! # Quotas
//!
//! - `QUOTA_OVERRIDES`: Replace entries of the standard quota table, formatted
//!   `name=rate/window_ms/capacity` and separated by `,` or `;`
//!   (e.g. `sendMessage=10/60000/10`)
//! - `API_RATE_LIMIT`: Charge every request against `apiCall` (default: true)
//! - `QUOTA_BYPASS_PATHS`: Paths exempt from `apiCall` (default: `/health,/ready`)
//! - `QUOTA_HOUSEKEEPING_INTERVAL_SECS`: Idle bucket eviction interval (default: 60)
//!
//! # Limits
//!
//! - `MAX_REQUEST_BODY_SIZE`: Maximum request body in bytes (default: 10MB)
//! - `MAX_UPLOAD_BYTES`: Maximum uploaded file size (default: 5MB)
//! - `MAX_STORED_BYTES`: Total file bytes held in memory (default: 256MB)
//! - `MESSAGE_LIST_MAX`: Maximum items per list request (default: 100)

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::quota::{QuotaDefinition, QuotaTable};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server bind address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    // =========================================================================
    // Identity Configuration
    // =========================================================================
    /// Sessions file for the static session provider
    pub sessions_file: Option<PathBuf>,

    /// Emails holding the admin role at startup
    pub admin_emails: Vec<String>,

    // =========================================================================
    // Quota Configuration
    // =========================================================================
    /// Overrides applied on top of the standard quota table
    pub quota_overrides: Vec<QuotaDefinition>,

    /// Whether every request is charged against `apiCall`
    pub api_rate_limit_enabled: bool,

    /// Paths that never consume `apiCall` quota (exact match)
    pub quota_bypass_paths: Vec<String>,

    /// How often idle quota buckets are evicted
    pub quota_housekeeping_interval: Duration,

    // =========================================================================
    // Limits Configuration
    // =========================================================================
    /// Maximum request body size in bytes (default: 10MB)
    pub max_request_body_size: usize,

    /// Maximum uploaded file size in bytes (default: 5MB)
    pub max_upload_bytes: usize,

    /// Total bytes of stored file payloads (default: 256MB)
    pub max_stored_bytes: usize,

    /// Maximum items returned by one list request (default: 100)
    pub message_list_max: usize,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Allowed CORS origins (default: ["*"] for development)
    pub cors_allowed_origins: Vec<String>,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Prometheus metrics port (0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Automatically loads `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if a variable cannot be parsed or the
    /// resulting configuration is invalid.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,

            // Identity
            sessions_file: env::var("SESSIONS_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            admin_emails: Self::parse_list("ADMIN_EMAILS", ""),

            // Quotas
            quota_overrides: parse_quota_overrides(
                &env::var("QUOTA_OVERRIDES").unwrap_or_default(),
            )?,
            api_rate_limit_enabled: Self::parse_env("API_RATE_LIMIT", true)?,
            quota_bypass_paths: Self::parse_list("QUOTA_BYPASS_PATHS", "/health,/ready")
                .into_iter()
                .filter(|p| p.starts_with('/'))
                .collect(),
            quota_housekeeping_interval: Duration::from_secs(Self::parse_env(
                "QUOTA_HOUSEKEEPING_INTERVAL_SECS",
                60,
            )?),

            // Limits
            max_request_body_size: Self::parse_env("MAX_REQUEST_BODY_SIZE", 10 * 1024 * 1024)?, // 10MB
            max_upload_bytes: Self::parse_env("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            max_stored_bytes: Self::parse_env("MAX_STORED_BYTES", 256 * 1024 * 1024)?,
            message_list_max: Self::parse_env("MESSAGE_LIST_MAX", 100)?,

            // Security
            cors_allowed_origins: Self::parse_list("CORS_ALLOWED_ORIGINS", "*"),

            // Observability
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> AppResult<()> {
        if self.max_request_body_size == 0 {
            return Err(AppError::ConfigError(
                "MAX_REQUEST_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.max_upload_bytes == 0 || self.max_upload_bytes > self.max_request_body_size {
            return Err(AppError::ConfigError(format!(
                "MAX_UPLOAD_BYTES ({}) must be between 1 and MAX_REQUEST_BODY_SIZE ({})",
                self.max_upload_bytes, self.max_request_body_size
            )));
        }

        if self.max_stored_bytes < self.max_upload_bytes {
            return Err(AppError::ConfigError(format!(
                "MAX_STORED_BYTES ({}) must be at least MAX_UPLOAD_BYTES ({})",
                self.max_stored_bytes, self.max_upload_bytes
            )));
        }

        if self.message_list_max == 0 {
            return Err(AppError::ConfigError(
                "MESSAGE_LIST_MAX must be greater than 0".to_string(),
            ));
        }

        if self.quota_housekeeping_interval.is_zero() {
            return Err(AppError::ConfigError(
                "QUOTA_HOUSEKEEPING_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        // Surfaces capacity < rate and similar table errors at startup
        self.quota_table()?;

        Ok(())
    }

    /// The standard quota table with `QUOTA_OVERRIDES` applied.
    pub fn quota_table(&self) -> AppResult<QuotaTable> {
        Ok(QuotaTable::standard().with_overrides(&self.quota_overrides)?)
    }

    /// Get the server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if metrics endpoint is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics server address.
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Parse an environment variable with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse a comma-separated list, dropping empty entries.
    fn parse_list(name: &str, default: &str) -> Vec<String> {
        env::var(name)
            .unwrap_or_else(|_| default.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Parse `QUOTA_OVERRIDES`. Entries are separated by `,` or `;`; blank input
/// means no overrides.
pub fn parse_quota_overrides(raw: &str) -> AppResult<Vec<QuotaDefinition>> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            QuotaDefinition::parse_override(entry)
                .map_err(|e| AppError::ConfigError(format!("Invalid QUOTA_OVERRIDES: {e}")))
        })
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            // Identity
            sessions_file: None,
            admin_emails: vec![],
            // Quotas
            quota_overrides: vec![],
            api_rate_limit_enabled: true,
            quota_bypass_paths: vec!["/health".to_string(), "/ready".to_string()],
            quota_housekeeping_interval: Duration::from_secs(60),
            // Limits
            max_request_body_size: 10 * 1024 * 1024, // 10MB
            max_upload_bytes: 5 * 1024 * 1024,
            max_stored_bytes: 256 * 1024 * 1024,
            message_list_max: 100,
            // Security
            cors_allowed_origins: vec!["*".to_string()],
            // Observability
            metrics_port: 9090,
        }
    }
}
