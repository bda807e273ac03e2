//! # Controller Input Mapper Module
//!
//! This module parses raw evdev events from the gamepad and folds them into a
//! [`GamepadState`]: raw stick readings and the instant each tracked button
//! went down.
//!
//! ## Axis Codes (EV_ABS)
//!
//! | Axis | evdev Code | Use |
//! |------|------------|-----|
//! | Left Stick X | ABS_X | Unused |
//! | Left Stick Y | ABS_Y | Speed |
//! | Right Stick X | ABS_RX or ABS_Z | Steering |
//! | Right Stick Y | ABS_RY or ABS_RZ | Steering (magnitude only) |
//!
//! Xbox-layout pads put the right stick on ABS_RX/ABS_RY and the analog
//! triggers on ABS_Z/ABS_RZ; older Sony drivers use ABS_Z/ABS_RZ for the
//! stick. See [`StickLayout`].
//!
//! Each axis is normalized with its own [`AxisRange`], read from the device
//! at bind. evdev reports Y axes growing downwards; [`EventMapper::axes`]
//! flips them so that pushing a stick up is positive.
//!
//! ## Button Codes (EV_KEY)
//!
//! | Button | evdev Code | Use |
//! |--------|------------|-----|
//! | Cross (×) | BTN_SOUTH | Reboot (with Triangle) |
//! | Circle (○) | BTN_EAST | Shutdown (with Square) |
//! | Square (□) | BTN_WEST | Shutdown (with Circle) |
//! | Triangle (△) | BTN_NORTH | Reboot (with Cross) |
//! | Home | BTN_MODE | Stop program |

use std::time::Instant;

use evdev::{AbsoluteAxisType, InputEvent, InputEventKind, Key};
use serde::Deserialize;

use super::calibration::{AxisRange, Calibration};
use super::Button;
use crate::drive::AxisSample;

/// Which axes carry the right stick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RightStickAxes {
    /// ABS_RX/ABS_RY when the pad reports both, ABS_Z/ABS_RZ otherwise.
    #[default]
    Auto,
    /// ABS_RX/ABS_RY.
    RxRy,
    /// ABS_Z/ABS_RZ.
    ZRz,
}

impl RightStickAxes {
    /// Resolves the layout for a pad that does or does not report
    /// ABS_RX and ABS_RY.
    #[must_use]
    pub fn layout(self, has_rx_ry: bool) -> StickLayout {
        match self {
            RightStickAxes::Auto if has_rx_ry => StickLayout::RX_RY,
            RightStickAxes::Auto => StickLayout::Z_RZ,
            RightStickAxes::RxRy => StickLayout::RX_RY,
            RightStickAxes::ZRz => StickLayout::Z_RZ,
        }
    }
}

/// evdev axis codes of both sticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StickLayout {
    pub left_x: AbsoluteAxisType,
    pub left_y: AbsoluteAxisType,
    pub right_x: AbsoluteAxisType,
    pub right_y: AbsoluteAxisType,
}

impl StickLayout {
    /// Right stick on ABS_Z/ABS_RZ.
    pub const Z_RZ: Self = Self {
        left_x: AbsoluteAxisType::ABS_X,
        left_y: AbsoluteAxisType::ABS_Y,
        right_x: AbsoluteAxisType::ABS_Z,
        right_y: AbsoluteAxisType::ABS_RZ,
    };

    /// Right stick on ABS_RX/ABS_RY.
    pub const RX_RY: Self = Self {
        left_x: AbsoluteAxisType::ABS_X,
        left_y: AbsoluteAxisType::ABS_Y,
        right_x: AbsoluteAxisType::ABS_RX,
        right_y: AbsoluteAxisType::ABS_RY,
    };
}

impl Default for StickLayout {
    fn default() -> Self {
        Self::Z_RZ
    }
}

/// Raw range of each stick axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StickRanges {
    pub left_x: AxisRange,
    pub left_y: AxisRange,
    pub right_x: AxisRange,
    pub right_y: AxisRange,
}

impl StickRanges {
    /// Same range on every axis.
    #[must_use]
    pub fn uniform(range: AxisRange) -> Self {
        Self {
            left_x: range,
            left_y: range,
            right_x: range,
            right_y: range,
        }
    }

    /// Ranges from `range_of`, which is called with each axis code of
    /// `layout`.
    pub fn from_layout<F>(layout: StickLayout, mut range_of: F) -> Self
    where
        F: FnMut(AbsoluteAxisType) -> AxisRange,
    {
        Self {
            left_x: range_of(layout.left_x),
            left_y: range_of(layout.left_y),
            right_x: range_of(layout.right_x),
            right_y: range_of(layout.right_y),
        }
    }
}

/// Raw controller state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamepadState {
    /// Left stick X, raw.
    pub left_stick_x: i32,
    /// Left stick Y, raw (grows downwards).
    pub left_stick_y: i32,
    /// Right stick X, raw.
    pub right_stick_x: i32,
    /// Right stick Y, raw (grows downwards).
    pub right_stick_y: i32,
    /// When each tracked button was pressed, indexed by [`Button::index`].
    pressed_at: [Option<Instant>; Button::COUNT],
}

impl GamepadState {
    /// Creates a state with every stick axis at the center of its range and
    /// all buttons released.
    #[must_use]
    pub fn centered(ranges: &StickRanges) -> Self {
        let center = |range: AxisRange| range.center().round() as i32;
        Self {
            left_stick_x: center(ranges.left_x),
            left_stick_y: center(ranges.left_y),
            right_stick_x: center(ranges.right_x),
            right_stick_y: center(ranges.right_y),
            pressed_at: [None; Button::COUNT],
        }
    }

    /// True while the button is held down.
    #[must_use]
    pub fn is_pressed(&self, button: Button) -> bool {
        self.pressed_at[button.index()].is_some()
    }

    /// Seconds between the button press and `now`, or `None` if released.
    #[must_use]
    pub fn held_seconds(&self, button: Button, now: Instant) -> Option<f64> {
        self.pressed_at[button.index()]
            .map(|pressed| now.saturating_duration_since(pressed).as_secs_f64())
    }
}

/// Parses raw evdev events and maintains gamepad state.
///
/// Not thread-safe; used from the control loop only.
#[derive(Debug)]
pub struct EventMapper {
    state: GamepadState,
    layout: StickLayout,
    ranges: StickRanges,
    calibration: Calibration,
}

impl Default for EventMapper {
    fn default() -> Self {
        Self::new(AxisRange::default(), Calibration::default())
    }
}

impl EventMapper {
    /// Creates a mapper for sticks on ABS_Z/ABS_RZ reporting within `range`.
    ///
    /// [`EventMapper::configure`] replaces both once the device is known.
    #[must_use]
    pub fn new(range: AxisRange, calibration: Calibration) -> Self {
        let ranges = StickRanges::uniform(range);
        Self {
            state: GamepadState::centered(&ranges),
            layout: StickLayout::default(),
            ranges,
            calibration,
        }
    }

    /// Switches to the axis codes and ranges of a newly bound pad and resets
    /// the state.
    pub fn configure(&mut self, layout: StickLayout, ranges: StickRanges) {
        self.layout = layout;
        self.ranges = ranges;
        self.reset();
    }

    #[must_use]
    pub fn layout(&self) -> StickLayout {
        self.layout
    }

    #[must_use]
    pub fn ranges(&self) -> &StickRanges {
        &self.ranges
    }

    /// Returns a reference to the current raw state.
    #[must_use]
    pub fn state(&self) -> &GamepadState {
        &self.state
    }

    /// Processes one evdev event received at `now`.
    ///
    /// Key repeat events (value 2) keep the first press instant.
    pub fn process_event(&mut self, event: &InputEvent, now: Instant) {
        match event.kind() {
            InputEventKind::AbsAxis(axis) => self.process_axis_event(axis, event.value()),
            InputEventKind::Key(key) => self.process_key_event(key, event.value() != 0, now),
            _ => {
                // Sync, misc and motion sensor events carry nothing we use
            }
        }
    }

    fn process_axis_event(&mut self, axis: AbsoluteAxisType, value: i32) {
        let layout = self.layout;
        let slot = if axis == layout.left_x {
            &mut self.state.left_stick_x
        } else if axis == layout.left_y {
            &mut self.state.left_stick_y
        } else if axis == layout.right_x {
            &mut self.state.right_stick_x
        } else if axis == layout.right_y {
            &mut self.state.right_stick_y
        } else {
            // Triggers, d-pad hats and motion sensors
            return;
        };
        *slot = value;
    }

    fn process_key_event(&mut self, key: Key, pressed: bool, now: Instant) {
        let button = match key {
            Key::BTN_SOUTH => Button::Cross,
            Key::BTN_EAST => Button::Circle,
            Key::BTN_WEST => Button::Square,
            Key::BTN_NORTH => Button::Triangle,
            Key::BTN_MODE => Button::Home,
            _ => return,
        };

        let slot = &mut self.state.pressed_at[button.index()];
        match (pressed, *slot) {
            (true, None) => *slot = Some(now),
            (true, Some(_)) => {}
            (false, _) => *slot = None,
        }
    }

    /// Normalized, calibrated stick positions with up and right positive.
    #[must_use]
    pub fn axes(&self) -> AxisSample {
        let axis = |raw: i32, range: AxisRange| self.calibration.apply(range.normalize(raw));
        let ranges = &self.ranges;
        AxisSample {
            lx: axis(self.state.left_stick_x, ranges.left_x),
            ly: -axis(self.state.left_stick_y, ranges.left_y),
            rx: axis(self.state.right_stick_x, ranges.right_x),
            ry: -axis(self.state.right_stick_y, ranges.right_y),
        }
    }

    /// Seconds the button has been held at `now`.
    #[must_use]
    pub fn held_seconds(&self, button: Button, now: Instant) -> Option<f64> {
        self.state.held_seconds(button, now)
    }

    /// Resets all state (centered sticks, released buttons).
    ///
    /// Used when the controller link drops so that a stale stick position
    /// is never replayed after reconnecting.
    pub fn reset(&mut self) {
        self.state = GamepadState::centered(&self.ranges);
    }
}
