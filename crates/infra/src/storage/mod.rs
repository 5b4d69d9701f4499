//! Key-value storage backends and the diagnostics log built on them

pub mod error_log;
pub mod file;
pub mod memory;

pub use error_log::ErrorLog;
pub use file::FileStore;
pub use memory::MemoryStore;
