//! Hardware capabilities consumed by the core
//!
//! The daemon does not drive electronics directly; it talks to two
//! externally provided capabilities behind traits:
//!
//! - [`GpioBank`]: "set pin P to logic level L"
//! - [`RadioLink`]: WiFi interface readiness and local address
//!
//! Real backends live beside a mock used by the test suite.

pub mod mock;
pub mod radio;
pub mod sysfs;

use crate::config::GpioConfig;
use crate::error::{Error, Result};
use std::time::Duration;

pub use mock::MockGpio;
pub use radio::{RadioLink, SysRadio};
pub use sysfs::SysfsGpio;

/// Logic level of an output pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Sysfs value byte for this level
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }
}

impl From<bool> for Level {
    fn from(on: bool) -> Self {
        if on { Self::High } else { Self::Low }
    }
}

/// Output pin bank
///
/// Implementations own whatever handle the platform needs (sysfs files,
/// memory-mapped registers behind a vendor blob, a test journal). Pins are
/// identified by their platform GPIO number.
pub trait GpioBank: Send {
    /// Drive a single pin to the given level
    fn set_pin(&mut self, pin: u8, level: Level) -> Result<()>;

    /// Drive several pins as one operation
    ///
    /// This is the atomic apply point for drive transitions: a caller that
    /// hands over a full pin assignment must never observe a partial update
    /// through any other handle to the same bank.
    fn set_pins(&mut self, assignments: &[(u8, Level)]) -> Result<()> {
        for &(pin, level) in assignments {
            self.set_pin(pin, level)?;
        }
        Ok(())
    }
}

/// Create a GPIO backend based on configuration
pub fn create_gpio(config: &GpioConfig) -> Result<Box<dyn GpioBank>> {
    match config.backend.as_str() {
        "sysfs" => Ok(Box::new(SysfsGpio::new(&config.sysfs_root))),
        "mock" => Ok(Box::new(MockGpio::new())),
        other => Err(Error::UnknownBackend(other.to_string())),
    }
}

/// Cycle every given pin high then low, logging each step
///
/// Startup wiring check: run with motors off the ground. Any backend error
/// aborts the test and is returned to the caller.
pub fn self_test(gpio: &mut dyn GpioBank, pins: &[u8]) -> Result<()> {
    log::info!("GPIO self-test: {} pins", pins.len());
    for &pin in pins {
        gpio.set_pin(pin, Level::High)?;
        log::info!("  pin {} = ON", pin);
        std::thread::sleep(Duration::from_millis(200));
        gpio.set_pin(pin, Level::Low)?;
        log::info!("  pin {} = OFF", pin);
        std::thread::sleep(Duration::from_millis(200));
    }
    log::info!("GPIO self-test complete");
    Ok(())
}
