//! API origin resolution
//!
//! The origin is derived once at startup from the configured value and the
//! host the application runs on. An empty origin means requests are sent
//! to the same origin, i.e. paths are used as-is.

use std::fmt;

use backoffice_domain::constants::{LOCAL_DEV_ORIGIN, LOCAL_HOSTS};
use once_cell::sync::Lazy;
use regex::Regex;

static SCHEME_ONLY: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:/{0,2}$").ok());

/// Resolve the API origin.
///
/// Whitespace is trimmed, `/` and scheme-only values such as `https://`
/// count as empty, an empty value on a local host falls back to the local
/// development origin, and one trailing slash is removed.
pub fn resolve_base_url(configured: Option<&str>, host: Option<&str>) -> String {
    let mut base = configured.map(str::trim).unwrap_or_default();

    if base == "/" || is_scheme_only(base) {
        base = "";
    }

    if base.is_empty() && host.is_some_and(is_local_host) {
        base = LOCAL_DEV_ORIGIN;
    }

    base.strip_suffix('/').unwrap_or(base).to_string()
}

fn is_scheme_only(value: &str) -> bool {
    SCHEME_ONLY.as_ref().is_some_and(|re| re.is_match(value))
}

fn is_local_host(host: &str) -> bool {
    let host = host.trim();
    LOCAL_HOSTS.iter().any(|local| local.eq_ignore_ascii_case(host))
}

/// Resolved API origin, never ending with `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseUrl(String);

impl BaseUrl {
    pub fn resolve(configured: Option<&str>, host: Option<&str>) -> Self {
        Self(resolve_base_url(configured, host))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether requests go to the same origin (no prefix)
    pub fn is_same_origin(&self) -> bool {
        self.0.is_empty()
    }

    /// Prefix `path` with the origin; `path` is expected to start with `/`.
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BaseUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
