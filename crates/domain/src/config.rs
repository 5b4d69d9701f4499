//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_LOGIN_PATH, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS, ERROR_LOG_CAPACITY,
    GLOBAL_COOLDOWN_MAX_MS, GLOBAL_COOLDOWN_MIN_MS, INITIAL_BACKOFF_MS, MAX_BACKOFF_MS,
    MAX_JITTER_MS, MIN_BACKOFF_SLEEP_MS, RETRYABLE_STATUSES, ROUTE_COOLDOWN_MIN_MS,
};

/// Top-level configuration of the REST client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Configured API origin; empty or absent means same-origin
    pub api_base_url: Option<String>,
    /// Host the application is served from (drives the local dev fallback)
    pub host: Option<String>,
    pub timeout_secs: u64,
    /// Directory for the persistent key-value store; in-memory when absent
    pub storage_dir: Option<PathBuf>,
    /// Path the session observer redirects to after a 401
    pub login_path: String,
    pub error_log_capacity: usize,
    pub retry: RetryConfig,
    pub fallback_messages: FallbackMessages,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            host: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            storage_dir: None,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            error_log_capacity: ERROR_LOG_CAPACITY,
            retry: RetryConfig::default(),
            fallback_messages: FallbackMessages::default(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        if self.error_log_capacity == 0 {
            return Err("error_log_capacity must be greater than 0".to_string());
        }
        if !self.login_path.starts_with('/') {
            return Err(format!("login_path must start with '/': {}", self.login_path));
        }
        self.retry.validate()
    }
}

/// A URL family that gets its own per-resource cooldown instead of retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownRoute {
    /// Prefix of the cooldown key (`<family>:<resource>`)
    pub family: String,
    /// Substring of the request URL that selects this family
    pub path_fragment: String,
    /// Query parameter identifying the resource
    pub key_param: String,
}

impl CooldownRoute {
    pub fn new(
        family: impl Into<String>,
        path_fragment: impl Into<String>,
        key_param: impl Into<String>,
    ) -> Self {
        Self {
            family: family.into(),
            path_fragment: path_fragment.into(),
            key_param: key_param.into(),
        }
    }
}

/// Retry and cooldown policy for GET requests
///
/// Durations are stored in milliseconds so the struct reads the same in
/// JSON and TOML files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries for GETs outside any cooldown route
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Exclusive upper bound of the uniform jitter
    pub max_jitter_ms: u64,
    pub global_cooldown_min_ms: u64,
    pub global_cooldown_max_ms: u64,
    pub route_cooldown_min_ms: u64,
    pub min_backoff_sleep_ms: u64,
    pub retryable_statuses: Vec<u16>,
    /// Checked in order; the first fragment found in the URL wins
    pub cooldown_routes: Vec<CooldownRoute>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
            max_backoff_ms: MAX_BACKOFF_MS,
            max_jitter_ms: MAX_JITTER_MS,
            global_cooldown_min_ms: GLOBAL_COOLDOWN_MIN_MS,
            global_cooldown_max_ms: GLOBAL_COOLDOWN_MAX_MS,
            route_cooldown_min_ms: ROUTE_COOLDOWN_MIN_MS,
            min_backoff_sleep_ms: MIN_BACKOFF_SLEEP_MS,
            retryable_statuses: RETRYABLE_STATUSES.to_vec(),
            cooldown_routes: vec![
                CooldownRoute::new("messages", "/messages", "chatId"),
                CooldownRoute::new("chats", "/chats", "userId"),
            ],
        }
    }
}

impl RetryConfig {
    /// Create a new configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Backoff before jitter for the given zero-based attempt, capped
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let factor = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self.initial_backoff_ms.saturating_mul(factor).min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    pub fn global_cooldown_min(&self) -> Duration {
        Duration::from_millis(self.global_cooldown_min_ms)
    }

    pub fn global_cooldown_max(&self) -> Duration {
        Duration::from_millis(self.global_cooldown_max_ms)
    }

    pub fn route_cooldown_min(&self) -> Duration {
        Duration::from_millis(self.route_cooldown_min_ms)
    }

    pub fn min_backoff_sleep(&self) -> Duration {
        Duration::from_millis(self.min_backoff_sleep_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_backoff_ms == 0 {
            return Err("initial_backoff_ms must be greater than 0".to_string());
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err("max_backoff_ms must be >= initial_backoff_ms".to_string());
        }
        if self.global_cooldown_max_ms < self.global_cooldown_min_ms {
            return Err("global_cooldown_max_ms must be >= global_cooldown_min_ms".to_string());
        }
        let incomplete = |r: &&CooldownRoute| r.family.is_empty() || r.path_fragment.is_empty();
        if let Some(route) = self.cooldown_routes.iter().find(incomplete) {
            return Err(format!("cooldown route needs a family and a path fragment: {route:?}"));
        }
        Ok(())
    }
}

/// Builder for `RetryConfig`
#[derive(Debug)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.config.initial_backoff_ms = duration_ms(backoff);
        self
    }

    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.config.max_backoff_ms = duration_ms(backoff);
        self
    }

    pub fn max_jitter(mut self, jitter: Duration) -> Self {
        self.config.max_jitter_ms = duration_ms(jitter);
        self
    }

    pub fn no_jitter(self) -> Self {
        self.max_jitter(Duration::ZERO)
    }

    pub fn retryable_statuses(mut self, statuses: impl Into<Vec<u16>>) -> Self {
        self.config.retryable_statuses = statuses.into();
        self
    }

    pub fn cooldown_routes(mut self, routes: Vec<CooldownRoute>) -> Self {
        self.config.cooldown_routes = routes;
        self
    }

    pub fn build(self) -> Result<RetryConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Fixed user-facing messages used when the server sends no usable text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackMessages {
    /// 413
    pub payload_too_large: String,
    /// 502 and 504
    pub unavailable: String,
    /// Any other 5xx
    pub server_error: String,
}

impl Default for FallbackMessages {
    fn default() -> Self {
        Self {
            payload_too_large: "Payload too large. Try a smaller file.".to_string(),
            unavailable: "Service temporarily unavailable. Please try again shortly.".to_string(),
            server_error: "Internal server error. Please try again later.".to_string(),
        }
    }
}

impl FallbackMessages {
    /// Fixed message for a status, if it has one
    pub fn for_status(&self, status: u16) -> Option<&str> {
        match status {
            413 => Some(self.payload_too_large.as_str()),
            502 | 504 => Some(self.unavailable.as_str()),
            s if s >= 500 => Some(self.server_error.as_str()),
            _ => None,
        }
    }

    /// Fixed message for a status, or the generic `HTTP <status>` text
    pub fn message_for(&self, status: u16) -> String {
        self.for_status(status).map_or_else(|| format!("HTTP {status}"), str::to_string)
    }
}
