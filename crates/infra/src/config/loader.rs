//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file if one exists (values already set win)
//! 2. Attempts to load from environment variables
//! 3. If the origin variable is missing, falls back to loading from file
//! 4. Searches multiple paths for config files
//! 5. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `BACKOFFICE_API_BASE_URL`: API origin (required, may be empty)
//! - `BACKOFFICE_HOST`: Host the admin app is served from
//! - `BACKOFFICE_TIMEOUT_SECS`: Request timeout in seconds
//! - `BACKOFFICE_STORAGE_DIR`: Directory for the persistent store
//! - `BACKOFFICE_LOGIN_PATH`: Redirect target after a 401
//! - `BACKOFFICE_MAX_RETRIES`: Retries for generic GETs
//! - `BACKOFFICE_RETRY_JITTER`: Whether backoff uses jitter (true/false)
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./backoffice.{json,toml}` or `./config.{json,toml}`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names relative to the executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use backoffice_domain::{ApiError, ClientConfig, Result};

const FILE_STEMS: [&str; 2] = ["backoffice", "config"];
const EXTENSIONS: [&str; 2] = ["json", "toml"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variable is missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `ApiError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<ClientConfig> {
    // A missing .env file is the normal case
    dotenvy::dotenv().ok();

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `BACKOFFICE_API_BASE_URL` must be present (an empty value selects
/// same-origin requests); everything else falls back to defaults.
///
/// # Errors
/// Returns `ApiError::Config` if the required variable is missing or a
/// value is invalid.
pub fn load_from_env() -> Result<ClientConfig> {
    let defaults = ClientConfig::default();
    let mut config =
        ClientConfig { api_base_url: Some(env_var("BACKOFFICE_API_BASE_URL")?), ..defaults };

    config.host = optional_env("BACKOFFICE_HOST");
    config.storage_dir = optional_env("BACKOFFICE_STORAGE_DIR").map(PathBuf::from);
    if let Some(login_path) = optional_env("BACKOFFICE_LOGIN_PATH") {
        config.login_path = login_path;
    }
    if let Some(timeout) = env_parse::<u64>("BACKOFFICE_TIMEOUT_SECS", "timeout")? {
        config.timeout_secs = timeout;
    }
    if let Some(max_retries) = env_parse::<u32>("BACKOFFICE_MAX_RETRIES", "max retries")? {
        config.retry.max_retries = max_retries;
    }
    if !env_bool("BACKOFFICE_RETRY_JITTER", true) {
        config.retry.max_jitter_ms = 0;
    }

    config.validate().map_err(ApiError::Config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `ApiError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - A value fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ApiError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => discover_config_path().ok_or_else(|| {
            ApiError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ApiError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate().map_err(ApiError::Config)?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `ApiError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ApiError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ApiError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(ApiError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Search multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn discover_config_path() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.extend([exe_dir.to_path_buf(), exe_dir.join(".."), exe_dir.join("../..")]);
        }
    }

    roots
        .iter()
        .flat_map(|root| {
            FILE_STEMS.iter().flat_map(move |stem| {
                EXTENSIONS.iter().map(move |ext| root.join(format!("{stem}.{ext}")))
            })
        })
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `ApiError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| ApiError::Config(format!("Missing required environment variable: {}", key)))
}

/// Optional environment variable; empty values count as unset
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parse an optional numeric environment variable
///
/// # Errors
/// Returns `ApiError::Config` if the variable is set but does not parse.
fn env_parse<T>(key: &str, what: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)
        .map(|raw| raw.parse::<T>().map_err(|e| ApiError::Config(format!("Invalid {what}: {e}"))))
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
