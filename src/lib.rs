//! VahanaIO - control daemon for a WiFi toy vehicle
//!
//! A TCP socket accepts single-character drive/light commands and an
//! actuator controller maps them onto H-bridge direction pins and two
//! auxiliary outputs. The one invariant that matters: motors are never
//! left energized across a disconnect, timeout, or malformed input.

pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod hal;
pub mod server;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
