//! Session state shared with the login flow

pub mod ports;
