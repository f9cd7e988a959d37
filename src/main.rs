//! VahanaIO - control daemon for a WiFi toy vehicle
//!
//! Accepts single-character drive/light commands over TCP (default port
//! 5006) and drives the H-bridge direction pins plus two auxiliary
//! outputs. WiFi association and GPIO electrical details stay with the
//! platform; this daemon owns the command protocol and the dead-man
//! safety behavior in between.

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use vahana_io::config::AppConfig;
use vahana_io::controller::Controller;
use vahana_io::error::{Error, Result};
use vahana_io::hal::radio::{RadioLink, SysRadio, wait_ready};
use vahana_io::hal::{create_gpio, self_test};
use vahana_io::server::CommandServer;

/// Config path used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "/etc/vahanaio.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `vahana-io <path>` (positional)
/// - `vahana-io --config <path>` (flag-based)
/// - `vahana-io -c <path>` (short flag)
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

/// Load configuration, returning it with a description of its source
///
/// An explicitly given path must load; the default path falls back to the
/// built-in defaults when absent so the device boots headless.
fn load_config() -> Result<(AppConfig, String)> {
    match parse_config_path() {
        Some(path) => {
            let config = AppConfig::from_file(&path)?;
            Ok((config, path))
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            let config = AppConfig::from_file(DEFAULT_CONFIG_PATH)?;
            Ok((config, DEFAULT_CONFIG_PATH.to_string()))
        }
        None => Ok((AppConfig::default(), "built-in defaults".to_string())),
    }
}

fn main() -> Result<()> {
    let (config, config_source) = load_config()?;

    // Initialize logger; RUST_LOG overrides the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.logging.level),
    )
    .init();

    log::info!("VahanaIO v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", config_source);
    log::info!(
        "Radio: {} mode on {}",
        config.radio.mode,
        config.radio.interface
    );

    // Create GPIO backend; pins go to a known-safe state before the
    // socket ever opens
    let mut gpio = create_gpio(&config.gpio)?;
    if config.gpio.self_test {
        self_test(gpio.as_mut(), &config.pins.all())?;
    }
    let mut controller = Controller::new(gpio, config.pins)?;

    // Set up shutdown signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    // Wait for the radio; a missing link is not fatal, the socket still
    // listens and a late-joining client finds it
    let radio = SysRadio::new(&config.radio);
    if wait_ready(&radio, Duration::from_secs(config.radio.ready_timeout_secs)) {
        match radio.local_address() {
            Some(ip) => log::info!("Radio up, IP: {}", ip),
            None => log::info!("Radio up (no address assigned yet)"),
        }
    } else {
        log::warn!(
            "Radio interface {} not ready after {}s, serving anyway",
            config.radio.interface,
            config.radio.ready_timeout_secs
        );
    }

    let server = CommandServer::bind(&config.network, Arc::clone(&running))?;
    log::info!("VahanaIO running. Press Ctrl-C to stop.");

    server.run(&mut controller)?;

    // Shutdown: motors safe, socket dropped, radio teardown belongs to
    // the OS stack
    log::info!("Shutting down...");
    controller.force_stop()?;

    log::info!("VahanaIO stopped");
    Ok(())
}
