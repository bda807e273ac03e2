//! # Axis Mixer Module
//!
//! Converts normalized joystick axes into rover speed and steering direction.
//!
//! ## Speed
//!
//! [`mix_speed`] turns a throttle/yaw pair into one (or two) motor powers.
//! The `max(1, ...)` denominator never amplifies inputs already below unit
//! magnitude and keeps the result within `max_speed`.
//!
//! ## Direction
//!
//! [`mix_direction`] turns a stick position into a steering angle using
//! `atan2(left_right, |forward_back|)`, so pulling the stick back steers in
//! the same left/right sense as pushing it forward.
//!
//! ## Usage
//!
//! ```
//! use rover_drive::drive::mixer::{mix_direction, mix_speed};
//!
//! let (speed, _) = mix_speed(0.0, 0.5, 100.0);
//! assert_eq!(speed, 50.0);
//!
//! let dir = mix_direction(0.5, 0.5, 30.0);
//! assert!((dir - 15.0).abs() < 1e-9);
//! ```

use std::f64::consts::PI;

use super::{AxisSample, DriveMode, MotionCommand, MAX_DUTY_PERCENT};

/// Mixes a yaw/throttle pair into motor powers.
///
/// # Arguments
///
/// * `yaw` - Yaw axis value (-1.0 to 1.0)
/// * `throttle` - Throttle axis value (-1.0 to 1.0)
/// * `max_speed` - Largest magnitude the mixer may return
///
/// # Returns
///
/// When `yaw == 0`, a single power in the first slot and `0.0` in the
/// second. Otherwise `(power_left, power_right)`.
#[must_use]
pub fn mix_speed(yaw: f64, throttle: f64, max_speed: f64) -> (f64, f64) {
    if yaw == 0.0 {
        let scale = max_speed / throttle.abs().max(1.0);
        return (throttle * scale, 0.0);
    }

    let left = throttle + yaw;
    let right = throttle - yaw;
    let scale = max_speed / left.abs().max(right.abs()).max(1.0);
    (left * scale, right * scale)
}

/// Mixes a stick position into a steering angle in degrees.
///
/// # Arguments
///
/// * `left_right` - Horizontal axis (-1.0 to 1.0), right is positive
/// * `forward_back` - Vertical axis (-1.0 to 1.0), only its magnitude matters
/// * `max_dir` - Largest angle magnitude the mixer may return
#[must_use]
pub fn mix_direction(left_right: f64, forward_back: f64, max_dir: f64) -> f64 {
    let angle = (2.0 / PI) * left_right.atan2(forward_back.abs());
    let scale = max_dir / angle.abs().max(1.0);
    angle * scale
}

/// Turns a full [`AxisSample`] into a [`MotionCommand`] for one drive mode.
///
/// Speed comes from the left stick's vertical axis, direction from the right
/// stick.
#[derive(Debug, Clone, Copy)]
pub struct MotionMixer {
    mode: DriveMode,
    max_speed: f64,
    max_dir: f64,
}

impl MotionMixer {
    /// Creates a mixer.
    ///
    /// `max_speed` is clamped to the duty cycle range and `max_dir` to 90°.
    #[must_use]
    pub fn new(mode: DriveMode, max_speed: f64, max_dir: f64) -> Self {
        Self {
            mode,
            max_speed: max_speed.clamp(0.0, MAX_DUTY_PERCENT),
            max_dir: max_dir.clamp(0.0, 90.0),
        }
    }

    /// Drive mode this mixer was built for.
    #[must_use]
    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    /// Steering bound in degrees.
    #[must_use]
    pub fn max_dir(&self) -> f64 {
        self.max_dir
    }

    /// Mixes one sample.
    ///
    /// # Examples
    ///
    /// ```
    /// use rover_drive::drive::{AxisSample, DriveMode};
    /// use rover_drive::drive::mixer::MotionMixer;
    ///
    /// let mixer = MotionMixer::new(DriveMode::Simple, 100.0, 30.0);
    /// let cmd = mixer.mix(&AxisSample { lx: 0.0, ly: 0.5, rx: 1.0, ry: 0.0 });
    /// assert_eq!(cmd.speed_percent, 50.0);
    /// assert_eq!(cmd.direction_deg, Some(30.0));
    /// ```
    #[must_use]
    pub fn mix(&self, sample: &AxisSample) -> MotionCommand {
        let (speed, _) = mix_speed(0.0, sample.ly, self.max_speed);
        let direction = mix_direction(sample.rx, sample.ry, self.max_dir);
        MotionCommand::new(Some(direction), speed, self.max_dir)
    }
}
