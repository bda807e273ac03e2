//! # Drive Module
//!
//! Motion-control kinematics for the six-wheeled, four-steered rover.
//!
//! This module handles:
//! - Mixing joystick axes into a rover-level [`MotionCommand`]
//! - Ackermann steering geometry ([`ackerman::AckermanSolver`])
//! - Simple steering (all wheels share one angle and one speed)
//!
//! All six drive motors are wired as two rails (left and right), so a
//! [`WheelActuation`] only carries per-side speeds: front and rear wheels on
//! the same side always run at the same speed.

pub mod ackerman;
pub mod mixer;

use serde::Deserialize;

/// Maximum actuator duty cycle magnitude (percent).
pub const MAX_DUTY_PERCENT: f64 = 100.0;

/// Steering mode, selected from the configuration at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveMode {
    /// All wheels share one steering angle (front) / mirrored angle (rear)
    /// and one speed.
    Simple,
    /// Inner and outer wheels get different angles and speeds.
    Ackermann,
}

impl std::fmt::Display for DriveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriveMode::Simple => write!(f, "simple"),
            DriveMode::Ackermann => write!(f, "ackermann"),
        }
    }
}

impl std::str::FromStr for DriveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(DriveMode::Simple),
            "ackermann" | "ackerman" => Ok(DriveMode::Ackermann),
            other => Err(format!("unknown drive mode '{}'", other)),
        }
    }
}

/// Normalized joystick sample, one per poll cycle.
///
/// All axes are in `-1.0..=1.0`; up and right are positive.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisSample {
    /// Left stick horizontal.
    pub lx: f64,
    /// Left stick vertical (speed).
    pub ly: f64,
    /// Right stick horizontal (steering).
    pub rx: f64,
    /// Right stick vertical.
    pub ry: f64,
}

/// Rover-level intent: where to steer and how fast.
///
/// `direction_deg == None` keeps the previously applied direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionCommand {
    /// Bicycle steering angle in degrees, positive turns right.
    pub direction_deg: Option<f64>,
    /// Chassis speed in percent of the maximum duty cycle.
    pub speed_percent: f64,
}

impl MotionCommand {
    /// Creates a command with both values clamped to `±max_dir` and `±100`.
    #[must_use]
    pub fn new(direction_deg: Option<f64>, speed_percent: f64, max_dir: f64) -> Self {
        Self {
            direction_deg: direction_deg.map(|d| d.clamp(-max_dir, max_dir)),
            speed_percent: speed_percent.clamp(-MAX_DUTY_PERCENT, MAX_DUTY_PERCENT),
        }
    }

    /// A command that holds the rover still with straight wheels.
    #[must_use]
    pub fn halt() -> Self {
        Self {
            direction_deg: Some(0.0),
            speed_percent: 0.0,
        }
    }
}

/// Steering angle and speed for a single wheel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WheelCommand {
    /// Servo angle in degrees.
    pub angle_deg: i32,
    /// Motor speed in percent (`-100..=100`).
    pub speed_percent: i32,
}

impl WheelCommand {
    /// Creates a wheel command, clamping the speed to the duty cycle range.
    #[must_use]
    pub fn new(angle_deg: i32, speed_percent: i32) -> Self {
        Self {
            angle_deg,
            speed_percent: speed_percent.clamp(-100, 100),
        }
    }
}

/// Per-wheel actuation for the four steered wheels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WheelActuation {
    pub front_left: WheelCommand,
    pub front_right: WheelCommand,
    pub rear_left: WheelCommand,
    pub rear_right: WheelCommand,
}

impl WheelActuation {
    /// Builds the actuation from the front wheels: rear angles are mirrored,
    /// rear speeds follow the front wheel on the same side.
    #[must_use]
    pub fn from_front(front_left: WheelCommand, front_right: WheelCommand) -> Self {
        Self {
            front_left,
            front_right,
            rear_left: WheelCommand::new(-front_left.angle_deg, front_left.speed_percent),
            rear_right: WheelCommand::new(-front_right.angle_deg, front_right.speed_percent),
        }
    }

    /// Simple steering: one angle for the front wheels, its mirror for the
    /// rear wheels, and one speed for every motor.
    ///
    /// # Examples
    ///
    /// ```
    /// use rover_drive::drive::WheelActuation;
    ///
    /// let wheels = WheelActuation::simple(15.7, 40.2);
    /// assert_eq!(wheels.front_left.angle_deg, 15);
    /// assert_eq!(wheels.rear_right.angle_deg, -15);
    /// assert_eq!(wheels.rear_left.speed_percent, 40);
    /// ```
    #[must_use]
    pub fn simple(direction_deg: f64, speed_percent: f64) -> Self {
        let front = WheelCommand::new(direction_deg as i32, speed_percent as i32);
        Self::from_front(front, front)
    }

    /// Left rail speed.
    #[must_use]
    pub fn left_speed(&self) -> i32 {
        self.front_left.speed_percent
    }

    /// Right rail speed.
    #[must_use]
    pub fn right_speed(&self) -> i32 {
        self.front_right.speed_percent
    }

    /// True when neither motor rail should turn.
    #[must_use]
    pub fn is_stationary(&self) -> bool {
        self.left_speed() == 0 && self.right_speed() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_command_clamps() {
        let cmd = MotionCommand::new(Some(120.0), 250.0, 30.0);
        assert_eq!(cmd.direction_deg, Some(30.0));
        assert_eq!(cmd.speed_percent, 100.0);

        let cmd = MotionCommand::new(Some(-45.0), -101.0, 30.0);
        assert_eq!(cmd.direction_deg, Some(-30.0));
        assert_eq!(cmd.speed_percent, -100.0);
    }

    #[test]
    fn test_motion_command_equality_by_value() {
        let a = MotionCommand::new(Some(10.0), 20.0, 30.0);
        let b = MotionCommand::new(Some(10.0), 20.0, 30.0);
        assert_eq!(a, b);
        assert_ne!(a, MotionCommand::new(None, 20.0, 30.0));
    }

    #[test]
    fn test_wheel_command_clamps_speed() {
        assert_eq!(WheelCommand::new(10, 180).speed_percent, 100);
        assert_eq!(WheelCommand::new(10, -180).speed_percent, -100);
    }

    #[test]
    fn test_simple_steering_mirrors_rear() {
        let wheels = WheelActuation::simple(-20.0, -35.0);
        assert_eq!(wheels.front_left, WheelCommand::new(-20, -35));
        assert_eq!(wheels.front_right, WheelCommand::new(-20, -35));
        assert_eq!(wheels.rear_left, WheelCommand::new(20, -35));
        assert_eq!(wheels.rear_right, WheelCommand::new(20, -35));
        assert!(!wheels.is_stationary());
    }

    #[test]
    fn test_halt_is_stationary() {
        let cmd = MotionCommand::halt();
        let wheels = WheelActuation::simple(cmd.direction_deg.unwrap_or(0.0), cmd.speed_percent);
        assert!(wheels.is_stationary());
    }

    #[test]
    fn test_drive_mode_parsing() {
        assert_eq!("simple".parse::<DriveMode>(), Ok(DriveMode::Simple));
        assert_eq!("Ackermann".parse::<DriveMode>(), Ok(DriveMode::Ackermann));
        assert!("tank".parse::<DriveMode>().is_err());
        assert_eq!(DriveMode::Ackermann.to_string(), "ackermann");
    }
}
