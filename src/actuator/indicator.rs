//! Light and rumble feedback for the operator.
//!
//! Both channels are best effort: the control loop logs a failed call and
//! carries on.

use tracing::{debug, info};

use crate::error::Result;

/// What the LED pixels should show.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightPattern {
    /// Process started, waiting for a controller.
    Startup,
    /// Controller bound.
    Connected,
    /// Rover moving; `direction_deg` is the commanded bicycle angle.
    Moving { forward: bool, direction_deg: f64 },
    /// Rover stationary.
    Halted,
    /// Shutting down.
    Terminating,
}

/// Rumble patterns played on the gamepad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HapticPattern {
    /// Controller bound.
    Connected,
    /// Control loop stopping.
    Goodbye,
}

#[cfg_attr(test, mockall::automock)]
pub trait LightIndicator: Send {
    fn show(&mut self, pattern: LightPattern) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
pub trait HapticIndicator: Send {
    fn rumble(&mut self, pattern: HapticPattern) -> Result<()>;
}

/// Indicator that only logs the requested patterns.
#[derive(Debug, Default)]
pub struct LogIndicator {
    last_light: Option<LightPattern>,
}

impl LogIndicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent light pattern.
    #[must_use]
    pub fn last_light(&self) -> Option<LightPattern> {
        self.last_light
    }
}

impl LightIndicator for LogIndicator {
    fn show(&mut self, pattern: LightPattern) -> Result<()> {
        if self.last_light != Some(pattern) {
            match pattern {
                LightPattern::Moving { forward, direction_deg } => debug!(
                    "Lights: {} lamps, indicator {:+.0}°",
                    if forward { "head" } else { "reversing" },
                    direction_deg
                ),
                other => debug!("Lights: {:?}", other),
            }
        }
        self.last_light = Some(pattern);
        Ok(())
    }
}

impl HapticIndicator for LogIndicator {
    fn rumble(&mut self, pattern: HapticPattern) -> Result<()> {
        info!("Rumble: {:?}", pattern);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_indicator_tracks_last_pattern() {
        let mut lights = LogIndicator::new();
        assert_eq!(lights.last_light(), None);

        lights.show(LightPattern::Startup).unwrap();
        lights
            .show(LightPattern::Moving {
                forward: false,
                direction_deg: -12.0,
            })
            .unwrap();
        assert_eq!(
            lights.last_light(),
            Some(LightPattern::Moving {
                forward: false,
                direction_deg: -12.0
            })
        );
    }

    #[test]
    fn test_log_indicator_rumble_never_fails() {
        let mut haptics = LogIndicator::new();
        assert!(haptics.rumble(HapticPattern::Connected).is_ok());
        assert!(haptics.rumble(HapticPattern::Goodbye).is_ok());
    }
}
