//! Actuator controller for the vehicle outputs
//!
//! Owns the exclusive drive state and the two auxiliary outputs, and
//! translates commands into pin-level assignments. Direction changes go
//! through one bulk write so no collaborator ever observes a half-applied
//! transition (an H-bridge channel with both pins high is a short).

use crate::command::Command;
use crate::config::PinConfig;
use crate::error::Result;
use crate::hal::{GpioBank, Level};

/// Exclusive drive state of the two H-bridge channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveState {
    Forward,
    Backward,
    RotateLeft,
    RotateRight,
    #[default]
    Stop,
}

impl DriveState {
    /// (IN1, IN2, IN3, IN4) levels for this state
    ///
    /// IN1/IN2 drive channel A, IN3/IN4 channel B. Every row keeps at most
    /// one pin per channel high; Stop is both channels low.
    fn levels(self) -> [Level; 4] {
        use Level::{High, Low};
        match self {
            Self::Forward => [High, Low, High, Low],
            Self::Backward => [Low, High, Low, High],
            Self::RotateLeft => [Low, High, High, Low],
            Self::RotateRight => [High, Low, Low, High],
            Self::Stop => [Low, Low, Low, Low],
        }
    }
}

/// Owns the drive state, aux outputs, and the GPIO handle
///
/// Instantiated once at process start and handed by mutable reference into
/// the session-serving loop; there is no other path to the pins.
pub struct Controller {
    gpio: Box<dyn GpioBank>,
    pins: PinConfig,
    drive: DriveState,
    aux1: bool,
    aux2: bool,
}

impl Controller {
    /// Create the controller and drive the power-on safe state (Stop, aux off)
    pub fn new(gpio: Box<dyn GpioBank>, pins: PinConfig) -> Result<Self> {
        let mut controller = Self {
            gpio,
            pins,
            drive: DriveState::Stop,
            aux1: false,
            aux2: false,
        };
        controller.write_drive(DriveState::Stop)?;
        controller.write_aux(1, false)?;
        controller.write_aux(2, false)?;
        Ok(controller)
    }

    /// Current drive state
    pub fn drive_state(&self) -> DriveState {
        self.drive
    }

    /// Current aux output states (aux1, aux2)
    pub fn aux_states(&self) -> (bool, bool) {
        (self.aux1, self.aux2)
    }

    /// Execute a command
    ///
    /// Total over the command alphabet; the only failure source is the GPIO
    /// backend. State is updated after the pins, never before.
    pub fn apply(&mut self, cmd: Command) -> Result<()> {
        match cmd {
            Command::Forward => self.set_drive(DriveState::Forward),
            Command::Backward => self.set_drive(DriveState::Backward),
            Command::RotateLeft => self.set_drive(DriveState::RotateLeft),
            Command::RotateRight => self.set_drive(DriveState::RotateRight),
            Command::Stop => self.set_drive(DriveState::Stop),
            Command::Aux1On => self.set_aux(1, true),
            Command::Aux1Off => self.set_aux(1, false),
            Command::Aux2On => self.set_aux(2, true),
            Command::Aux2Off => self.set_aux(2, false),
        }
    }

    /// Unconditionally drive Stop; aux outputs are left as they are
    ///
    /// Dead-man path: called on every session end and at shutdown, and safe
    /// to call repeatedly. Always writes the pins, even when the state
    /// already reads Stop.
    pub fn force_stop(&mut self) -> Result<()> {
        self.write_drive(DriveState::Stop)?;
        self.drive = DriveState::Stop;
        log::info!("Drive: forced {:?}", self.drive);
        self.log_pin_state();
        Ok(())
    }

    fn set_drive(&mut self, state: DriveState) -> Result<()> {
        if state == self.drive {
            // Re-applying the active state is a no-op: no pin flicker
            log::debug!("Drive: {:?} already active", state);
            return Ok(());
        }
        self.write_drive(state)?;
        self.drive = state;
        log::info!("Drive: {:?}", state);
        self.log_pin_state();
        Ok(())
    }

    fn set_aux(&mut self, output: u8, on: bool) -> Result<()> {
        self.write_aux(output, on)?;
        if output == 1 {
            self.aux1 = on;
        } else {
            self.aux2 = on;
        }
        log::info!("Aux{}: {}", output, if on { "ON" } else { "OFF" });
        Ok(())
    }

    /// Single apply point for direction pins: all four in one bulk write
    fn write_drive(&mut self, state: DriveState) -> Result<()> {
        let [in1, in2, in3, in4] = state.levels();
        self.gpio.set_pins(&[
            (self.pins.in1, in1),
            (self.pins.in2, in2),
            (self.pins.in3, in3),
            (self.pins.in4, in4),
        ])
    }

    fn write_aux(&mut self, output: u8, on: bool) -> Result<()> {
        let pin = if output == 1 {
            self.pins.aux1
        } else {
            self.pins.aux2
        };
        self.gpio.set_pin(pin, Level::from(on))
    }

    fn log_pin_state(&self) {
        let [in1, in2, in3, in4] = self.drive.levels();
        log::debug!(
            "Pin states -> IN1:{} IN2:{} IN3:{} IN4:{}",
            in1.as_u8(),
            in2.as_u8(),
            in3.as_u8(),
            in4.as_u8()
        );
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        let _ = self.force_stop();
    }
}
