//! # Backoffice Core
//!
//! Port interfaces of the REST client - no infrastructure dependencies.
//!
//! This crate contains:
//! - Persistent key-value storage port
//! - Session ports (token source, 401 observer, navigation)
//! - Time ports (clock and sleeper) so backoff logic stays testable
//!
//! ## Architecture Principles
//! - Only depends on `backoffice-domain`
//! - No HTTP, file system, or runtime code
//! - All external dependencies via traits

pub mod session;
pub mod storage;
pub mod time;

pub use session::ports::{AccessTokenProvider, Navigator, NoopSessionObserver, SessionObserver};
pub use storage::ports::KeyValueStore;
pub use time::{Clock, Sleeper, SystemClock};
