//! Mock GPIO bank for testing

use super::{GpioBank, Level};
use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock GPIO bank for unit testing
///
/// Clones share the same inner state, so a test can keep one handle for
/// assertions while the code under test owns another.
#[derive(Clone)]
pub struct MockGpio {
    inner: Arc<Mutex<MockGpioInner>>,
}

struct MockGpioInner {
    levels: HashMap<u8, Level>,
    journal: Vec<(u8, Level)>,
}

impl MockGpio {
    /// Create a new mock bank with no pins driven
    pub fn new() -> Self {
        MockGpio {
            inner: Arc::new(Mutex::new(MockGpioInner {
                levels: HashMap::new(),
                journal: Vec::new(),
            })),
        }
    }

    /// Last level written to a pin, if any
    pub fn level(&self, pin: u8) -> Option<Level> {
        let inner = self.inner.lock().unwrap();
        inner.levels.get(&pin).copied()
    }

    /// Levels of the given pins as 0/1 bytes (unwritten pins read as 0)
    pub fn levels(&self, pins: &[u8]) -> Vec<u8> {
        let inner = self.inner.lock().unwrap();
        pins.iter()
            .map(|p| inner.levels.get(p).copied().unwrap_or(Level::Low).as_u8())
            .collect()
    }

    /// Every write in order, including redundant ones
    pub fn journal(&self) -> Vec<(u8, Level)> {
        let inner = self.inner.lock().unwrap();
        inner.journal.clone()
    }

    /// Number of individual pin writes so far
    pub fn write_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.journal.len()
    }

    /// Clear the write journal (levels are kept)
    pub fn clear_journal(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.journal.clear();
    }
}

impl GpioBank for MockGpio {
    fn set_pin(&mut self, pin: u8, level: Level) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.levels.insert(pin, level);
        inner.journal.push((pin, level));
        Ok(())
    }

    // Lock held across the whole assignment: readers through other handles
    // never observe a partially applied transition.
    fn set_pins(&mut self, assignments: &[(u8, Level)]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        for &(pin, level) in assignments {
            inner.levels.insert(pin, level);
            inner.journal.push((pin, level));
        }
        Ok(())
    }
}

impl Default for MockGpio {
    fn default() -> Self {
        Self::new()
    }
}
