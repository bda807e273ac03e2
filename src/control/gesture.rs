//! # Gesture Module
//!
//! Held-button gestures:
//!
//! | Gesture | Buttons | Event |
//! |---------|---------|-------|
//! | Shutdown | Square + Circle | [`ControlEvent::ShutdownRequested`] |
//! | Reboot | Triangle + Cross | [`ControlEvent::RebootRequested`] |
//! | Stop | Home | [`ControlEvent::Stop`] (`UserRequested`) |
//!
//! A gesture fires when every one of its buttons reports a hold time at or
//! above the threshold in the same sample. Nothing is carried over between
//! samples. After firing, a gesture stays quiet until all of its buttons
//! have been released.

use tracing::{debug, info};

use super::{ControlEvent, StopReason};
use crate::config::GestureConfig;
use crate::controller::Button;

/// Per-gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    /// No button of the gesture is pressed.
    Idle,
    /// At least one button is pressed, threshold not yet met by all.
    Accumulating,
    /// Event emitted; waiting for release.
    Fired,
}

#[derive(Debug)]
struct Gesture {
    name: &'static str,
    buttons: &'static [Button],
    threshold_s: f64,
    event: ControlEvent,
    state: GestureState,
}

impl Gesture {
    fn update<F>(&mut self, hold: &F) -> Option<ControlEvent>
    where
        F: Fn(Button) -> Option<f64>,
    {
        let any_pressed = self.buttons.iter().any(|&b| hold(b).is_some());
        let all_held = self
            .buttons
            .iter()
            .all(|&b| hold(b).map_or(false, |held| held >= self.threshold_s));

        let previous = self.state;
        self.state = match (previous, any_pressed, all_held) {
            (GestureState::Fired, true, _) => GestureState::Fired,
            (_, _, true) => GestureState::Fired,
            (_, true, false) => GestureState::Accumulating,
            (_, false, _) => GestureState::Idle,
        };

        if previous != self.state {
            debug!("Gesture {}: {:?} -> {:?}", self.name, previous, self.state);
        }

        (previous != GestureState::Fired && self.state == GestureState::Fired).then_some(self.event)
    }
}

/// Turns button hold durations into [`ControlEvent`]s.
#[derive(Debug)]
pub struct GestureDetector {
    gestures: [Gesture; 3],
}

impl GestureDetector {
    #[must_use]
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            gestures: [
                Gesture {
                    name: "shutdown",
                    buttons: &[Button::Square, Button::Circle],
                    threshold_s: config.shutdown_hold_s,
                    event: ControlEvent::ShutdownRequested,
                    state: GestureState::Idle,
                },
                Gesture {
                    name: "reboot",
                    buttons: &[Button::Triangle, Button::Cross],
                    threshold_s: config.reboot_hold_s,
                    event: ControlEvent::RebootRequested,
                    state: GestureState::Idle,
                },
                Gesture {
                    name: "home",
                    buttons: &[Button::Home],
                    threshold_s: config.home_hold_s,
                    event: ControlEvent::Stop(StopReason::UserRequested),
                    state: GestureState::Idle,
                },
            ],
        }
    }

    /// Evaluates one sample. `hold` returns the seconds a button has been
    /// held, or `None` when it is released.
    ///
    /// Gestures are evaluated shutdown, reboot, home; at most one event is
    /// returned per sample and later gestures are not evaluated after a
    /// firing.
    pub fn update<F>(&mut self, hold: F) -> Option<ControlEvent>
    where
        F: Fn(Button) -> Option<f64>,
    {
        for gesture in &mut self.gestures {
            if let Some(event) = gesture.update(&hold) {
                info!("Gesture {} fired: {}", gesture.name, event);
                return Some(event);
            }
        }
        None
    }

    /// State of the gesture that emits `event`.
    #[must_use]
    pub fn state_of(&self, event: ControlEvent) -> Option<GestureState> {
        self.gestures
            .iter()
            .find(|g| g.event == event)
            .map(|g| g.state)
    }

    /// Forgets all progress, e.g. after the controller was lost.
    pub fn reset(&mut self) {
        for gesture in &mut self.gestures {
            gesture.state = GestureState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GestureConfig {
        GestureConfig {
            home_hold_s: 3.0,
            shutdown_hold_s: 3.0,
            reboot_hold_s: 3.0,
        }
    }

    /// Hold function from a list of (button, seconds)
    fn holds(list: &[(Button, f64)]) -> impl Fn(Button) -> Option<f64> + '_ {
        move |button| list.iter().find(|(b, _)| *b == button).map(|(_, s)| *s)
    }

    #[test]
    fn test_nothing_pressed() {
        let mut detector = GestureDetector::new(&config());
        assert_eq!(detector.update(holds(&[])), None);
        assert_eq!(
            detector.state_of(ControlEvent::ShutdownRequested),
            Some(GestureState::Idle)
        );
    }

    #[test]
    fn test_shutdown_pair_fires_once() {
        let mut detector = GestureDetector::new(&config());
        let both = [(Button::Square, 3.5), (Button::Circle, 3.5)];

        assert_eq!(detector.update(holds(&both)), Some(ControlEvent::ShutdownRequested));
        // Still held: no second event
        assert_eq!(detector.update(holds(&both)), None);
        assert_eq!(
            detector.state_of(ControlEvent::ShutdownRequested),
            Some(GestureState::Fired)
        );
    }

    #[test]
    fn test_rearms_after_release() {
        let mut detector = GestureDetector::new(&config());
        let both = [(Button::Triangle, 4.0), (Button::Cross, 4.0)];

        assert_eq!(detector.update(holds(&both)), Some(ControlEvent::RebootRequested));
        // Releasing one button is not enough
        assert_eq!(detector.update(holds(&[(Button::Cross, 5.0)])), None);
        assert_eq!(
            detector.state_of(ControlEvent::RebootRequested),
            Some(GestureState::Fired)
        );
        assert_eq!(detector.update(holds(&[])), None);
        assert_eq!(
            detector.state_of(ControlEvent::RebootRequested),
            Some(GestureState::Idle)
        );
        assert_eq!(detector.update(holds(&both)), Some(ControlEvent::RebootRequested));
    }

    #[test]
    fn test_pair_requires_same_sample() {
        let mut detector = GestureDetector::new(&config());

        // Square held well past the threshold on its own
        assert_eq!(detector.update(holds(&[(Button::Square, 5.0)])), None);
        assert_eq!(
            detector.state_of(ControlEvent::ShutdownRequested),
            Some(GestureState::Accumulating)
        );

        // Circle pressed afterwards, still below threshold
        let staggered = [(Button::Square, 5.5), (Button::Circle, 0.5)];
        assert_eq!(detector.update(holds(&staggered)), None);

        let staggered = [(Button::Square, 7.9), (Button::Circle, 2.9)];
        assert_eq!(detector.update(holds(&staggered)), None);

        // Both above threshold in the same sample
        let both = [(Button::Square, 8.0), (Button::Circle, 3.0)];
        assert_eq!(detector.update(holds(&both)), Some(ControlEvent::ShutdownRequested));
    }

    #[test]
    fn test_no_carry_over_between_samples() {
        let mut detector = GestureDetector::new(&config());

        // Each button crosses the threshold, but never together
        assert_eq!(detector.update(holds(&[(Button::Square, 3.2)])), None);
        assert_eq!(detector.update(holds(&[])), None);
        assert_eq!(detector.update(holds(&[(Button::Circle, 3.2)])), None);
        assert_eq!(
            detector.state_of(ControlEvent::ShutdownRequested),
            Some(GestureState::Accumulating)
        );
    }

    #[test]
    fn test_home_alone_stops() {
        let mut detector = GestureDetector::new(&config());
        assert_eq!(detector.update(holds(&[(Button::Home, 2.9)])), None);
        assert_eq!(
            detector.update(holds(&[(Button::Home, 3.0)])),
            Some(ControlEvent::Stop(StopReason::UserRequested))
        );
    }

    #[test]
    fn test_shutdown_evaluated_before_home() {
        let mut detector = GestureDetector::new(&config());
        let all = [
            (Button::Home, 9.0),
            (Button::Square, 9.0),
            (Button::Circle, 9.0),
        ];
        assert_eq!(detector.update(holds(&all)), Some(ControlEvent::ShutdownRequested));
    }

    #[test]
    fn test_thresholds_per_gesture() {
        let mut detector = GestureDetector::new(&GestureConfig {
            home_hold_s: 1.0,
            shutdown_hold_s: 5.0,
            reboot_hold_s: 3.0,
        });
        let pair = [(Button::Square, 4.0), (Button::Circle, 4.0)];
        assert_eq!(detector.update(holds(&pair)), None);
        assert_eq!(
            detector.update(holds(&[(Button::Home, 1.0)])),
            Some(ControlEvent::Stop(StopReason::UserRequested))
        );
    }

    #[test]
    fn test_reset() {
        let mut detector = GestureDetector::new(&config());
        detector.update(holds(&[(Button::Home, 4.0)]));
        detector.reset();
        assert_eq!(
            detector.state_of(ControlEvent::Stop(StopReason::UserRequested)),
            Some(GestureState::Idle)
        );
    }
}
