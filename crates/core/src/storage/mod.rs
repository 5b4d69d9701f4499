//! Persistent client-side storage

pub mod ports;
