//! Configuration for the VahanaIO daemon
//!
//! Loads configuration from a TOML file with the minimal parameters needed
//! to serve the command socket and drive the vehicle outputs.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub pins: PinConfig,
    pub gpio: GpioConfig,
    pub radio: RadioConfig,
    pub logging: LoggingConfig,
}

/// TCP command server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// TCP bind address for inbound commands
    ///
    /// Examples:
    /// - `0.0.0.0:5006` - Bind to all interfaces on port 5006
    /// - `127.0.0.1:5006` - Localhost only
    pub bind_address: String,

    /// Dead-man window in seconds: a session that receives no data for this
    /// long is considered lost and the motors are stopped
    pub read_timeout_secs: u64,

    /// Send `OK\n` / `ERR\n` acknowledgement bytes per command
    pub send_ack: bool,
}

/// Output pin assignment (BCM/GPIO numbers)
///
/// `in1`/`in2` form H-bridge channel A, `in3`/`in4` channel B. Exactly one
/// of each pair may be high at a time; both-low is stop/coast.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PinConfig {
    pub in1: u8,
    pub in2: u8,
    pub in3: u8,
    pub in4: u8,
    /// Auxiliary output 1 (lights)
    pub aux1: u8,
    /// Auxiliary output 2 (lights)
    pub aux2: u8,
}

/// GPIO backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GpioConfig {
    /// Backend name: `sysfs` (kernel GPIO) or `mock` (no hardware)
    pub backend: String,

    /// Root of the sysfs GPIO tree
    pub sysfs_root: String,

    /// Cycle every output pin high/low at startup, logging each step
    pub self_test: bool,
}

/// Radio (WiFi) interface configuration
///
/// Association and AP bring-up belong to the OS/vendor stack; the daemon
/// only waits for the interface to come up and reports its address.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RadioConfig {
    /// `ap` (device hosts its own network) or `sta` (device joins one)
    pub mode: String,

    /// Network interface name to probe
    pub interface: String,

    /// Seconds to wait for the interface before serving anyway
    pub ready_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration matching the reference vehicle wiring
    pub fn vehicle_defaults() -> Self {
        Self {
            network: NetworkConfig {
                bind_address: "0.0.0.0:5006".to_string(),
                read_timeout_secs: 5,
                send_ack: false,
            },
            pins: PinConfig {
                in1: 19,
                in2: 21,
                in3: 22,
                in4: 23,
                aux1: 16,
                aux2: 14,
            },
            gpio: GpioConfig {
                backend: "sysfs".to_string(),
                sysfs_root: "/sys/class/gpio".to_string(),
                self_test: false,
            },
            radio: RadioConfig {
                mode: "ap".to_string(),
                interface: "wlan0".to_string(),
                ready_timeout_secs: 20,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::vehicle_defaults()
    }
}

impl PinConfig {
    /// All configured output pins, drive channels first
    pub fn all(&self) -> [u8; 6] {
        [self.in1, self.in2, self.in3, self.in4, self.aux1, self.aux2]
    }
}
