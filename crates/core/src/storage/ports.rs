//! Port interface for persistent key-value storage
//!
//! The client keeps its bearer token, the signed-in identity, and the
//! diagnostics log in a string-keyed store that survives reloads. The login
//! flow writes the token through the same store.

use backoffice_domain::Result;

/// String key-value store shared between the client and the login flow
///
/// Implementations must be safe to call from many tasks at once. Every
/// operation is synchronous and short; none of them may block on the network.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}
