//! # Backoffice Infrastructure
//!
//! The REST client and the adapters behind the ports of `backoffice-core`.
//!
//! This crate contains:
//! - HTTP transport, base URL resolution and response normalization
//! - The GET retry engine with global and per-route cooldowns
//! - `ApiClient` with its verb functions
//! - Key-value storage backends and the error log
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `backoffice-core`
//! - Depends on `backoffice-domain` and `backoffice-core`
//! - Contains all "impure" code (network, file system, timers)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod storage;
pub mod testing;
pub mod time;

// Re-export commonly used items
pub use api::{ApiClient, ApiClientBuilder, LoginRedirect, StoredTokenProvider};
pub use http::{BaseUrl, CooldownState, RetryEngine, RetryOutcome};
pub use storage::{ErrorLog, FileStore, MemoryStore};
pub use time::TokioSleeper;
