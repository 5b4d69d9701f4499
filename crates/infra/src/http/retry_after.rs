//! `Retry-After` header parsing

use std::time::{Duration, SystemTime};

use backoffice_core::Clock;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Obsolete HTTP-date forms: RFC 850 and ANSI C `asctime()`, both GMT
const OBSOLETE_DATE_FORMATS: [&str; 2] = ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"];

/// Parse a `Retry-After` value into a delay.
///
/// Accepts delta-seconds or an HTTP-date; a date in the past yields zero.
/// Anything else is ignored.
pub fn parse_retry_after(value: &str, now: SystemTime) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.bytes().all(|b| b.is_ascii_digit()) {
        return value.parse::<u64>().ok().map(Duration::from_secs);
    }

    let at = parse_http_date(value)?;
    let now: DateTime<Utc> = now.into();
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc2822(value) {
        return Some(at.with_timezone(&Utc));
    }

    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    OBSOLETE_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&collapsed, format).ok())
        .map(|naive| naive.and_utc())
}

/// Read the `Retry-After` header of a response, in milliseconds.
pub fn retry_after_ms(headers: &HeaderMap, clock: &dyn Clock) -> Option<u64> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let delay = parse_retry_after(raw, clock.system_time())?;
    Some(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
}
