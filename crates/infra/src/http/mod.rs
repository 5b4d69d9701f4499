//! HTTP transport and the policies layered on it

pub mod base_url;
pub mod client;
pub mod cooldown;
pub mod response_handler;
pub mod retry;
pub mod retry_after;

pub use base_url::{resolve_base_url, BaseUrl};
pub use client::{HttpClient, HttpClientBuilder};
pub use cooldown::CooldownState;
pub use response_handler::{normalize_error_body, ErrorBody, ResponseHandler};
pub use retry::{cooldown_key, CooldownWindow, RetryEngine, RetryOutcome, RouteClass};
pub use retry_after::{parse_retry_after, retry_after_ms};
