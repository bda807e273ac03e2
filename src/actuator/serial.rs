//! # Serial Actuator Module
//!
//! Drives the rover through a companion motor board on a serial port.
//!
//! The board speaks the rover library's call vocabulary, one command per
//! line:
//!
//! | Line | Effect |
//! |------|--------|
//! | `servo <id> <deg>` | Set one steering servo |
//! | `forward <n>` / `reverse <n>` | All motors, same speed |
//! | `turn_forward <l> <r>` / `turn_reverse <l> <r>` | Per-side speeds |
//! | `stop` | Coast |
//! | `brake` | Brake |
//! | `cleanup` | Release the hardware |
//!
//! Each call is written as one buffer and flushed, so a cycle's servo and
//! motor lines always reach the board together.

use std::fmt::Write as _;
use std::io;

use async_trait::async_trait;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use super::MotorActuator;
use crate::config::{ActuatorConfig, ChassisConfig};
use crate::drive::WheelActuation;
use crate::error::{Result, RoverError};

/// Default motor board device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC boards
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Byte link to the motor board.
#[async_trait]
pub trait MotorLink: Send {
    /// Writes and flushes one command buffer.
    async fn send(&mut self, data: &[u8]) -> io::Result<()>;
}

#[async_trait]
impl MotorLink for tokio_serial::SerialStream {
    async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.write_all(data).await?;
        self.flush().await
    }
}

/// Servo channel of each steered wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoMap {
    pub front_left: u8,
    pub front_right: u8,
    pub rear_left: u8,
    pub rear_right: u8,
}

impl From<&ChassisConfig> for ServoMap {
    fn from(chassis: &ChassisConfig) -> Self {
        Self {
            front_left: chassis.servo_front_left,
            front_right: chassis.servo_front_right,
            rear_left: chassis.servo_rear_left,
            rear_right: chassis.servo_rear_right,
        }
    }
}

/// Motor board on a serial link.
pub struct SerialRover<L: MotorLink = tokio_serial::SerialStream> {
    link: L,
    servos: ServoMap,
    device_path: String,
}

impl<L: MotorLink> std::fmt::Debug for SerialRover<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialRover")
            .field("device_path", &self.device_path)
            .field("servos", &self.servos)
            .finish_non_exhaustive()
    }
}

impl SerialRover {
    /// Opens the configured port, or the first default path that works.
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if none of the candidate paths opens.
    pub fn open(config: &ActuatorConfig, servos: ServoMap) -> Result<Self> {
        let configured = [config.port.as_str()];
        let paths: &[&str] = if config.port.is_empty() {
            DEFAULT_DEVICE_PATHS
        } else {
            &configured
        };

        for path in paths {
            debug!("Trying to open motor board at {}", path);

            match open_port(path, config.baud_rate) {
                Ok(port) => {
                    info!("Opened motor board at {} ({} baud)", path, config.baud_rate);
                    return Ok(Self::with_link(port, servos, path));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                }
            }
        }

        Err(RoverError::SerialPortNotFound(paths.join(", ")))
    }
}

/// Opens a serial port at 8N1 without flow control.
fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| RoverError::Serial(format!("Failed to open {}: {}", path, e)))
}

impl<L: MotorLink> SerialRover<L> {
    /// Wraps an already open link.
    pub fn with_link(link: L, servos: ServoMap, device_path: &str) -> Self {
        Self {
            link,
            servos,
            device_path: device_path.to_string(),
        }
    }

    /// Device path of the motor board.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    async fn send(&mut self, commands: &str) -> Result<()> {
        self.link
            .send(commands.as_bytes())
            .await
            .map_err(|e| RoverError::Actuator(format!("Failed to write to {}: {}", self.device_path, e)))?;
        debug!("Sent motor commands: {:?}", commands);
        Ok(())
    }

    fn servo_lines(&self, out: &mut String, angles: [i32; 4]) {
        let ids = [
            self.servos.front_left,
            self.servos.front_right,
            self.servos.rear_left,
            self.servos.rear_right,
        ];
        for (id, angle) in ids.iter().zip(angles) {
            let _ = writeln!(out, "servo {} {}", id, angle);
        }
    }
}

/// Motor line for a pair of rail speeds.
fn motor_line(left: i32, right: i32) -> Result<String> {
    let line = match (left, right) {
        (0, 0) => "stop".to_string(),
        (l, r) if l == r && l > 0 => format!("forward {}", l),
        (l, r) if l == r => format!("reverse {}", -l),
        (l, r) if l >= 0 && r >= 0 => format!("turn_forward {} {}", l, r),
        (l, r) if l <= 0 && r <= 0 => format!("turn_reverse {} {}", -l, -r),
        (l, r) => {
            return Err(RoverError::Actuator(format!(
                "rails cannot run in opposite directions (left {}, right {})",
                l, r
            )))
        }
    };
    Ok(line)
}

#[async_trait]
impl<L: MotorLink> MotorActuator for SerialRover<L> {
    async fn apply(&mut self, wheels: &WheelActuation) -> Result<()> {
        let motors = motor_line(wheels.left_speed(), wheels.right_speed())?;

        let mut commands = String::new();
        self.servo_lines(
            &mut commands,
            [
                wheels.front_left.angle_deg,
                wheels.front_right.angle_deg,
                wheels.rear_left.angle_deg,
                wheels.rear_right.angle_deg,
            ],
        );
        commands.push_str(&motors);
        commands.push('\n');

        self.send(&commands).await
    }

    async fn coast(&mut self) -> Result<()> {
        self.send("stop\n").await
    }

    async fn brake(&mut self) -> Result<()> {
        let mut commands = String::from("brake\n");
        self.servo_lines(&mut commands, [0; 4]);
        self.send(&commands).await
    }

    async fn release(&mut self) -> Result<()> {
        self.send("cleanup\n").await
    }
}
