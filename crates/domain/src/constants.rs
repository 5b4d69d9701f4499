//! Client constants
//!
//! Centralized location for storage keys and fixed policy values shared by
//! every layer of the client.

/// Keys used in the persistent key-value store
pub mod storage_keys {
    /// Bearer token written by the login flow
    pub const TOKEN: &str = "token";
    /// Serialized identity of the signed-in user
    pub const USER: &str = "user";
    /// Role of the signed-in user
    pub const ROLE: &str = "role";
    /// Diagnostics log of failed requests (JSON array, newest first)
    pub const ERROR_LOG: &str = "api_error_log";

    /// Keys removed when the server rejects the session
    pub const SESSION_KEYS: [&str; 3] = [TOKEN, USER, ROLE];
}

// Base URL resolution
pub const LOCAL_DEV_ORIGIN: &str = "http://localhost:5000";
pub const LOCAL_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

// Session handling
pub const DEFAULT_LOGIN_PATH: &str = "/login";

// Error log
pub const ERROR_LOG_CAPACITY: usize = 200;

// Transport
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const USER_AGENT: &str = concat!("backoffice-client/", env!("CARGO_PKG_VERSION"));

// Retry/backoff defaults (milliseconds unless noted)
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const INITIAL_BACKOFF_MS: u64 = 400;
pub const MAX_BACKOFF_MS: u64 = 3000;
pub const MAX_JITTER_MS: u64 = 350;
pub const GLOBAL_COOLDOWN_MIN_MS: u64 = 1500;
pub const GLOBAL_COOLDOWN_MAX_MS: u64 = 8000;
pub const ROUTE_COOLDOWN_MIN_MS: u64 = 2000;
pub const MIN_BACKOFF_SLEEP_MS: u64 = 200;
pub const RETRYABLE_STATUSES: [u16; 4] = [429, 502, 503, 504];
