//! Backoffice REST API client
//!
//! This module provides the verb functions the admin pages call. It handles
//! bearer authentication, session invalidation on 401 and retry-wrapped
//! reads on top of the [`crate::http`] transport.
//!
//! # Architecture
//!
//! - `auth`: token lookup and `Authorization` header construction
//! - `session`: clearing stored credentials and redirecting to login
//! - `client`: `ApiClient` and its builder

pub mod auth;
pub mod client;
pub mod session;

pub use auth::{auth_headers, load_auth_headers, StaticTokenProvider, StoredTokenProvider};
pub use client::{ApiClient, ApiClientBuilder};
pub use session::{clear_session, LoginRedirect};
