//! # Actuator Module
//!
//! Everything the control loop drives: the wheel motors and servos, the LED
//! lights and the gamepad rumble.
//!
//! This module handles:
//! - The [`MotorActuator`] interface and its two backends: [`dummy::DummyRover`]
//!   (logs only) and [`serial::SerialRover`] (companion motor board)
//! - Best-effort feedback through [`indicator::LightIndicator`] and
//!   [`indicator::HapticIndicator`]
//!
//! The backend is chosen once at startup from the configuration, never by
//! falling back at call time.

pub mod dummy;
pub mod indicator;
pub mod serial;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::config::Config;
use crate::drive::WheelActuation;
use crate::error::Result;

/// Motor and steering servo interface.
///
/// Calls are awaited inline by the control loop and are expected to be fast
/// relative to the poll period.
#[async_trait]
pub trait MotorActuator: Send {
    /// Sets the four steering servos and both motor rails.
    ///
    /// A stationary actuation coasts the motors instead of driving them at
    /// zero duty cycle.
    async fn apply(&mut self, wheels: &WheelActuation) -> Result<()>;

    /// Cuts motor power and lets the rover roll to a stop.
    async fn coast(&mut self) -> Result<()>;

    /// Stops the motors quickly and straightens the wheels.
    async fn brake(&mut self) -> Result<()>;

    /// Releases the hardware. No further calls are made afterwards.
    async fn release(&mut self) -> Result<()>;
}

/// Actuator backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorBackend {
    /// Log every call, touch no hardware.
    Dummy,
    /// Companion motor board on a serial port.
    Serial,
}

/// Opens the configured actuator backend.
///
/// # Errors
///
/// Returns an error if the serial backend is selected and no port can be
/// opened. There is no fallback to the dummy backend.
pub fn open_backend(config: &Config) -> Result<Box<dyn MotorActuator>> {
    match config.actuator.backend {
        ActuatorBackend::Dummy => {
            info!("Using dummy actuator backend (no motors will move)");
            Ok(Box::new(dummy::DummyRover::new()))
        }
        ActuatorBackend::Serial => {
            let rover = serial::SerialRover::open(&config.actuator, serial::ServoMap::from(&config.chassis))?;
            info!("Using serial actuator backend at {}", rover.device_path());
            Ok(Box::new(rover))
        }
    }
}
