//! # Calibration Module
//!
//! Normalizes raw stick readings and applies dead zones and hot zones.
//!
//! ## Dead Zone
//!
//! Small stick movements near center are mapped to 0.0 to stop the rover from
//! creeping when the sticks are released.
//!
//! ## Hot Zone
//!
//! Stick positions close to full deflection are mapped to ±1.0, so the rover
//! reaches full speed even on worn sticks that never quite hit their end stop.
//! Values in between are scaled linearly over the remaining range.
//!
//! ## Usage
//!
//! ```
//! use rover_drive::controller::calibration::Calibration;
//!
//! let cal = Calibration::new(0.05, 0.05);
//!
//! // Within dead zone
//! assert_eq!(cal.apply(0.03), 0.0);
//!
//! // Within hot zone
//! assert_eq!(cal.apply(-0.97), -1.0);
//! ```

/// Raw axis range reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    /// Raw value at full negative deflection.
    pub min: i32,
    /// Raw value at full positive deflection.
    pub max: i32,
}

impl Default for AxisRange {
    fn default() -> Self {
        Self { min: 0, max: 255 }
    }
}

impl AxisRange {
    /// Creates a range, swapping the bounds if given in reverse.
    #[must_use]
    pub fn new(min: i32, max: i32) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Raw value at rest.
    #[must_use]
    pub fn center(&self) -> f64 {
        (self.min as f64 + self.max as f64) / 2.0
    }

    /// Maps a raw reading to `-1.0..=1.0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rover_drive::controller::calibration::AxisRange;
    ///
    /// let range = AxisRange::new(0, 255);
    /// assert_eq!(range.normalize(0), -1.0);
    /// assert_eq!(range.normalize(255), 1.0);
    /// ```
    #[must_use]
    pub fn normalize(&self, raw: i32) -> f64 {
        let half_span = (self.max as f64 - self.min as f64) / 2.0;
        if half_span <= 0.0 {
            return 0.0;
        }
        ((raw as f64 - self.center()) / half_span).clamp(-1.0, 1.0)
    }
}

/// Dead zone and hot zone for a normalized axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Dead zone as a fraction (0.0 to 0.25).
    dead_zone: f64,
    /// Hot zone as a fraction (0.0 to 0.25).
    hot_zone: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            dead_zone: 0.05,
            hot_zone: 0.05,
        }
    }
}

impl Calibration {
    /// Creates a calibration; both zones are clamped to `0.0..=0.25`.
    #[must_use]
    pub fn new(dead_zone: f64, hot_zone: f64) -> Self {
        Self {
            dead_zone: dead_zone.clamp(0.0, 0.25),
            hot_zone: hot_zone.clamp(0.0, 0.25),
        }
    }

    /// Creates a calibration that passes values through unchanged.
    #[must_use]
    pub fn linear() -> Self {
        Self {
            dead_zone: 0.0,
            hot_zone: 0.0,
        }
    }

    /// Returns the configured dead zone.
    #[must_use]
    pub fn dead_zone(&self) -> f64 {
        self.dead_zone
    }

    /// Returns the configured hot zone.
    #[must_use]
    pub fn hot_zone(&self) -> f64 {
        self.hot_zone
    }

    /// Applies dead zone and hot zone to a normalized input.
    #[must_use]
    pub fn apply(&self, input: f64) -> f64 {
        let magnitude = input.abs();

        if magnitude <= self.dead_zone {
            return 0.0;
        }
        if magnitude >= 1.0 - self.hot_zone {
            return input.signum();
        }

        let span = 1.0 - self.dead_zone - self.hot_zone;
        input.signum() * (magnitude - self.dead_zone) / span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_default_zones() {
        let cal = Calibration::default();
        assert_eq!(cal.dead_zone(), 0.05);
        assert_eq!(cal.hot_zone(), 0.05);
    }

    #[test]
    fn test_zones_are_clamped() {
        let cal = Calibration::new(-0.1, 0.9);
        assert_eq!(cal.dead_zone(), 0.0);
        assert_eq!(cal.hot_zone(), 0.25);
    }

    #[test]
    fn test_dead_zone() {
        let cal = Calibration::new(0.1, 0.0);
        assert_eq!(cal.apply(0.0), 0.0);
        assert_eq!(cal.apply(0.1), 0.0);
        assert_eq!(cal.apply(-0.05), 0.0);
        assert!(cal.apply(0.11) > 0.0);
    }

    #[test]
    fn test_hot_zone() {
        let cal = Calibration::new(0.0, 0.1);
        assert_eq!(cal.apply(0.91), 1.0);
        assert_eq!(cal.apply(-0.95), -1.0);
        assert!(cal.apply(0.89) < 1.0);
    }

    #[test]
    fn test_linear_between_zones() {
        let cal = Calibration::new(0.1, 0.1);
        // Midpoint of the live range maps to 0.5
        assert!((cal.apply(0.5) - 0.5).abs() < EPS);
        assert!((cal.apply(-0.5) + 0.5).abs() < EPS);
        assert!((cal.apply(0.3) - 0.25).abs() < EPS);
    }

    #[test]
    fn test_linear_passthrough() {
        let cal = Calibration::linear();
        for v in [-1.0, -0.42, 0.0, 0.17, 1.0] {
            assert!((cal.apply(v) - v).abs() < EPS);
        }
    }

    #[test]
    fn test_output_is_monotonic() {
        let cal = Calibration::default();
        let mut prev = cal.apply(-1.0);
        for i in -100..=100 {
            let out = cal.apply(i as f64 / 100.0);
            assert!(out >= prev);
            assert!((-1.0..=1.0).contains(&out));
            prev = out;
        }
    }

    #[test]
    fn test_axis_range_normalize() {
        let range = AxisRange::default();
        assert_eq!(range.normalize(0), -1.0);
        assert_eq!(range.normalize(255), 1.0);
        assert!(range.normalize(128).abs() < 0.01);
        assert_eq!(range.normalize(-20), -1.0);
        assert_eq!(range.normalize(400), 1.0);
    }

    #[test]
    fn test_axis_range_signed() {
        let range = AxisRange::new(32767, -32768);
        assert_eq!(range.min, -32768);
        assert!(range.normalize(0).abs() < 0.001);
        assert_eq!(range.normalize(32767), 1.0);
    }

    #[test]
    fn test_degenerate_range() {
        let range = AxisRange::new(10, 10);
        assert_eq!(range.normalize(10), 0.0);
        assert_eq!(range.normalize(99), 0.0);
    }
}
