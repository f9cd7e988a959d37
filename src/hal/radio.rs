//! Radio (WiFi) interface probe
//!
//! Association and access-point bring-up are owned by the OS/vendor radio
//! stack; the daemon only needs to know when the link is usable and what
//! address to print for the operator.

use crate::config::RadioConfig;
use std::fs;
use std::net::{IpAddr, UdpSocket};
use std::time::Duration;

/// Radio link capability consumed by the bootstrap
pub trait RadioLink {
    /// Link is up and traffic can flow
    fn is_ready(&self) -> bool;

    /// Address a client should connect to, if one is assigned yet
    fn local_address(&self) -> Option<IpAddr>;
}

/// Radio probe backed by the kernel's view of a network interface
pub struct SysRadio {
    interface: String,
}

impl SysRadio {
    pub fn new(config: &RadioConfig) -> Self {
        Self {
            interface: config.interface.clone(),
        }
    }
}

impl RadioLink for SysRadio {
    fn is_ready(&self) -> bool {
        let path = format!("/sys/class/net/{}/operstate", self.interface);
        match fs::read_to_string(&path) {
            Ok(state) => {
                let state = state.trim();
                // APs without carrier detection report "unknown" while up
                state == "up" || state == "unknown"
            }
            Err(_) => false,
        }
    }

    fn local_address(&self) -> Option<IpAddr> {
        // Routing probe: connecting a UDP socket picks the source address
        // for that destination without sending a packet. With no route yet
        // (AP mode before the first client) this is simply None.
        let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
        socket.connect("8.8.8.8:53").ok()?;
        let addr = socket.local_addr().ok()?.ip();
        if addr.is_unspecified() { None } else { Some(addr) }
    }
}

/// Wait for the radio to come up, logging a per-second countdown
///
/// Returns whether the link became ready within the timeout. Callers are
/// expected to keep serving either way: a late-joining radio still finds
/// the command socket listening.
pub fn wait_ready(radio: &dyn RadioLink, timeout: Duration) -> bool {
    let mut remaining = timeout.as_secs();
    loop {
        if radio.is_ready() {
            return true;
        }
        if remaining == 0 {
            return false;
        }
        log::info!("Waiting for radio... {}", remaining);
        std::thread::sleep(Duration::from_secs(1));
        remaining -= 1;
    }
}
