//! Sysfs GPIO backend
//!
//! Drives output pins through the kernel's legacy sysfs GPIO interface:
//! `export`, then `gpioN/direction` = `out`, then `gpioN/value` writes.
//! Pins are exported lazily on first use and left exported on exit so a
//! restart finds them in a known-low state after the shutdown stop.

use super::{GpioBank, Level};
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Kernel sysfs GPIO bank
pub struct SysfsGpio {
    root: PathBuf,
    exported: HashSet<u8>,
}

impl SysfsGpio {
    /// Create a bank rooted at the given sysfs directory
    /// (normally `/sys/class/gpio`)
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            exported: HashSet::new(),
        }
    }

    fn pin_dir(&self, pin: u8) -> PathBuf {
        self.root.join(format!("gpio{}", pin))
    }

    /// Export the pin and set it as an output, once per pin
    fn ensure_output(&mut self, pin: u8) -> Result<()> {
        if self.exported.contains(&pin) {
            return Ok(());
        }

        let dir = self.pin_dir(pin);
        if !dir.exists() {
            // EBUSY from export means someone already exported it; only
            // fail if the pin directory still does not show up.
            if let Err(e) = fs::write(self.root.join("export"), pin.to_string())
                && !dir.exists()
            {
                return Err(Error::Gpio { pin, source: e });
            }
        }

        fs::write(dir.join("direction"), "out").map_err(|e| Error::Gpio { pin, source: e })?;

        log::debug!("Exported pin {} as output", pin);
        self.exported.insert(pin);
        Ok(())
    }
}

impl GpioBank for SysfsGpio {
    fn set_pin(&mut self, pin: u8, level: Level) -> Result<()> {
        self.ensure_output(pin)?;
        let value = if level == Level::High { "1" } else { "0" };
        fs::write(self.pin_dir(pin).join("value"), value)
            .map_err(|e| Error::Gpio { pin, source: e })
    }
}
