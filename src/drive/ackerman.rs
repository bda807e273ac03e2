//! # Ackermann Steering Module
//!
//! Converts a bicycle-model steering angle and a chassis speed into per-wheel
//! steering angles and per-side speeds, so that all wheels trace concentric
//! arcs around one turn center.
//!
//! ## Geometry
//!
//! With `D` the chassis width/length ratio and `δ` the bicycle angle:
//!
//! | Quantity | Formula |
//! |----------|---------|
//! | Inner wheel angle | `atan2(1, cot δ − D)` |
//! | Outer wheel angle | `atan2(1, cot δ + D)` |
//! | Outer speed scale | `sqrt(tan² δ + (1 + D·tan δ)²)` |
//! | Inner speed scale | `sqrt(tan² δ + (1 − D·tan δ)²)` |
//!
//! The bicycle angle saturates at `atan2(1, 1.2·D)`, i.e. a minimum turn
//! radius of 0.6 chassis widths. For the default chassis this limits the
//! inner wheel to about 78°.
//!
//! A positive angle turns right: the left side is then outer (smaller angle,
//! faster) and the right side inner.
//!
//! ## Usage
//!
//! ```
//! use rover_drive::drive::ackerman::AckermanSolver;
//!
//! let mut solver = AckermanSolver::new(80.0 / 77.0);
//! let wheels = solver.solve(Some(0.0), 50.0)?;
//! assert_eq!(wheels.front_left.angle_deg, 0);
//! assert_eq!(wheels.rear_right.speed_percent, 50);
//! # Ok::<(), rover_drive::error::RoverError>(())
//! ```

use super::{WheelActuation, WheelCommand, MAX_DUTY_PERCENT};
use crate::error::{Result, RoverError};

/// Minimum turn radius as a fraction of the chassis width, doubled.
const MIN_TURN_RADIUS_FACTOR: f64 = 1.2;

/// Ackermann steering solver.
///
/// Owns the last commanded direction so that a command without a direction
/// keeps steering where the rover was already steering.
#[derive(Debug, Clone)]
pub struct AckermanSolver {
    /// Chassis width / length ratio (`D`).
    width_to_length: f64,
    /// Last non-null direction in degrees.
    last_direction_deg: f64,
}

impl AckermanSolver {
    /// Creates a solver for a chassis with the given width/length ratio.
    #[must_use]
    pub fn new(width_to_length: f64) -> Self {
        Self {
            width_to_length,
            last_direction_deg: 0.0,
        }
    }

    /// Largest bicycle steering angle in radians.
    #[must_use]
    pub fn max_steering_rad(&self) -> f64 {
        1.0_f64.atan2(MIN_TURN_RADIUS_FACTOR * self.width_to_length)
    }

    /// Largest bicycle steering angle in degrees.
    #[must_use]
    pub fn max_steering_deg(&self) -> f64 {
        self.max_steering_rad().to_degrees()
    }

    /// Direction used when a command carries no direction.
    #[must_use]
    pub fn last_direction_deg(&self) -> f64 {
        self.last_direction_deg
    }

    /// Solves the wheel actuation for one command.
    ///
    /// # Arguments
    ///
    /// * `direction_deg` - Bicycle steering angle (-90 to 90), or `None` to
    ///   keep the previous direction
    /// * `speed_percent` - Chassis speed (-100 to 100)
    ///
    /// # Errors
    ///
    /// Returns `Geometry` if the inputs or any intermediate value are not
    /// finite.
    pub fn solve(&mut self, direction_deg: Option<f64>, speed_percent: f64) -> Result<WheelActuation> {
        let dir_deg = match direction_deg {
            Some(dir) => {
                self.last_direction_deg = dir;
                dir
            }
            None => self.last_direction_deg,
        };

        self.solve_geometry(dir_deg, speed_percent)
    }

    fn solve_geometry(&self, dir_deg: f64, speed_percent: f64) -> Result<WheelActuation> {
        if !dir_deg.is_finite() || !speed_percent.is_finite() {
            return Err(RoverError::Geometry(format!(
                "non-finite command (direction {}, speed {})",
                dir_deg, speed_percent
            )));
        }

        let mut speed = speed_percent.clamp(-MAX_DUTY_PERCENT, MAX_DUTY_PERCENT);

        if dir_deg == 0.0 {
            let straight = WheelCommand::new(0, speed as i32);
            return Ok(WheelActuation::from_front(straight, straight));
        }

        let d = self.width_to_length;
        let dir_rad = dir_deg.to_radians().abs().min(self.max_steering_rad());
        let tan = dir_rad.tan();
        let cot = 1.0 / tan;

        let inner_angle = 1.0_f64.atan2(cot - d).to_degrees();
        let outer_angle = 1.0_f64.atan2(cot + d).to_degrees();

        let (outer_scale, inner_scale) = if speed != 0.0 {
            (
                (tan * tan + (1.0 + d * tan).powi(2)).sqrt(),
                (tan * tan + (1.0 - d * tan).powi(2)).sqrt(),
            )
        } else {
            (1.0, 1.0)
        };

        // The outer wheels must stay within the duty cycle
        if speed.abs() * outer_scale > MAX_DUTY_PERCENT {
            speed = speed.signum() * MAX_DUTY_PERCENT / outer_scale;
        }

        let outer_speed = speed * outer_scale;
        let inner_speed = speed * inner_scale;

        for (name, value) in [
            ("inner angle", inner_angle),
            ("outer angle", outer_angle),
            ("outer speed", outer_speed),
            ("inner speed", inner_speed),
        ] {
            if !value.is_finite() {
                return Err(RoverError::Geometry(format!(
                    "{} is not finite for direction {}°",
                    name, dir_deg
                )));
            }
        }

        let outer = |sign: f64| WheelCommand::new((sign * outer_angle) as i32, outer_speed as i32);
        let inner = |sign: f64| WheelCommand::new((sign * inner_angle) as i32, inner_speed as i32);

        let (front_left, front_right) = if dir_deg > 0.0 {
            // Right turn: left side is outer
            (outer(1.0), inner(1.0))
        } else {
            (inner(-1.0), outer(-1.0))
        };

        Ok(WheelActuation::from_front(front_left, front_right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_RATIO: f64 = 80.0 / 77.0;

    fn solver() -> AckermanSolver {
        AckermanSolver::new(DEFAULT_RATIO)
    }

    #[test]
    fn test_straight_line_fast_path() {
        let wheels = solver().solve(Some(0.0), 50.0).unwrap();
        for wheel in [wheels.front_left, wheels.front_right, wheels.rear_left, wheels.rear_right] {
            assert_eq!(wheel, WheelCommand::new(0, 50));
        }
    }

    #[test]
    fn test_straight_line_all_speeds() {
        let mut solver = solver();
        for speed in [-100, -73, -1, 0, 1, 42, 100] {
            let wheels = solver.solve(Some(0.0), speed as f64).unwrap();
            assert_eq!(wheels.front_left.angle_deg, 0);
            assert_eq!(wheels.front_right.angle_deg, 0);
            assert_eq!(wheels.left_speed(), speed);
            assert_eq!(wheels.right_speed(), speed);
        }
    }

    #[test]
    fn test_max_steering_angle() {
        let solver = solver();
        let expected = 1.0_f64.atan2(1.2 * DEFAULT_RATIO);
        assert!((solver.max_steering_rad() - expected).abs() < 1e-12);
        assert!((solver.max_steering_deg() - 38.73).abs() < 0.05);
    }

    #[test]
    fn test_inner_wheel_angle_at_clamp_boundary() {
        let mut solver = solver();
        let boundary = solver.max_steering_deg();
        let wheels = solver.solve(Some(boundary), 10.0).unwrap();

        let expected_inner = 1.0_f64.atan2(0.2 * DEFAULT_RATIO).to_degrees();
        assert_eq!(wheels.front_right.angle_deg, expected_inner as i32);
        assert_eq!(wheels.front_right.angle_deg, 78);
    }

    #[test]
    fn test_clamp_is_saturating() {
        let mut solver = solver();
        let boundary = solver.max_steering_deg();
        let at = solver.solve(Some(boundary), 40.0).unwrap();
        for beyond in [boundary + 0.5, 60.0, 89.9, 90.0] {
            assert_eq!(solver.solve(Some(beyond), 40.0).unwrap(), at);
        }

        let at_neg = solver.solve(Some(-boundary), 40.0).unwrap();
        assert_eq!(solver.solve(Some(-90.0), 40.0).unwrap(), at_neg);
    }

    #[test]
    fn test_right_turn_left_side_outer() {
        let wheels = solver().solve(Some(20.0), 50.0).unwrap();

        // Inner (right) wheel steers harder, outer (left) wheel runs faster
        assert!(wheels.front_right.angle_deg > wheels.front_left.angle_deg);
        assert!(wheels.front_left.angle_deg > 0);
        assert!(wheels.left_speed() > wheels.right_speed());
        assert!(wheels.right_speed() > 0);
    }

    #[test]
    fn test_left_turn_mirrors_right_turn() {
        let mut solver = solver();
        let right = solver.solve(Some(25.0), 60.0).unwrap();
        let left = solver.solve(Some(-25.0), 60.0).unwrap();

        assert_eq!(left.front_left.angle_deg, -right.front_right.angle_deg);
        assert_eq!(left.front_right.angle_deg, -right.front_left.angle_deg);
        assert_eq!(left.left_speed(), right.right_speed());
        assert_eq!(left.right_speed(), right.left_speed());
    }

    #[test]
    fn test_rear_wheels_mirror_front() {
        let mut solver = solver();
        for dir in [-38.0, -12.5, 7.0, 30.0] {
            let wheels = solver.solve(Some(dir), -45.0).unwrap();
            assert_eq!(wheels.rear_left.angle_deg, -wheels.front_left.angle_deg);
            assert_eq!(wheels.rear_right.angle_deg, -wheels.front_right.angle_deg);
            assert_eq!(wheels.rear_left.speed_percent, wheels.front_left.speed_percent);
            assert_eq!(wheels.rear_right.speed_percent, wheels.front_right.speed_percent);
        }
    }

    #[test]
    fn test_outer_speed_never_exceeds_duty_cycle() {
        let mut solver = solver();
        for dir in -90..=90 {
            for speed in (-100..=100).step_by(5) {
                let wheels = solver.solve(Some(dir as f64), speed as f64).unwrap();
                assert!(wheels.left_speed().abs() <= 100, "dir {} speed {}", dir, speed);
                assert!(wheels.right_speed().abs() <= 100, "dir {} speed {}", dir, speed);
            }
        }
    }

    #[test]
    fn test_full_reverse_keeps_direction_of_travel() {
        let wheels = solver().solve(Some(30.0), -100.0).unwrap();
        assert!(wheels.left_speed() < 0);
        assert!(wheels.right_speed() < 0);
        assert!(wheels.left_speed() >= -100);
    }

    #[test]
    fn test_zero_speed_while_steering() {
        let wheels = solver().solve(Some(15.0), 0.0).unwrap();
        assert!(wheels.is_stationary());
        assert!(wheels.front_left.angle_deg > 0);
    }

    #[test]
    fn test_none_direction_repeats_last() {
        let mut solver = solver();
        let first = solver.solve(Some(18.0), 30.0).unwrap();
        assert_eq!(solver.last_direction_deg(), 18.0);

        let repeated = solver.solve(None, 30.0).unwrap();
        assert_eq!(first, repeated);

        let faster = solver.solve(None, 60.0).unwrap();
        assert_eq!(faster.front_left.angle_deg, first.front_left.angle_deg);
        assert!(faster.left_speed() > first.left_speed());
    }

    #[test]
    fn test_none_direction_defaults_to_straight() {
        let wheels = solver().solve(None, 25.0).unwrap();
        assert_eq!(wheels.front_left, WheelCommand::new(0, 25));
    }

    #[test]
    fn test_non_finite_input_is_geometry_error() {
        let mut solver = solver();
        assert!(matches!(
            solver.solve(Some(f64::NAN), 10.0),
            Err(RoverError::Geometry(_))
        ));
        assert!(matches!(
            solver.solve(Some(10.0), f64::INFINITY),
            Err(RoverError::Geometry(_))
        ));
    }
}
