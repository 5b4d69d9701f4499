//! # Backoffice Domain
//!
//! Plain data shared by every layer of the backoffice REST client.
//!
//! This crate contains:
//! - The client error type (`ApiError`) and its categories
//! - Configuration structures (`ClientConfig`, `RetryConfig`, ...)
//! - Persisted diagnostic records (`ErrorLogEntry`)
//! - Storage keys and policy constants
//!
//! ## Architecture
//! - No dependencies on other backoffice crates
//! - No I/O, no async runtime

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
