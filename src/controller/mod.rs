//! # Controller Module
//!
//! Gamepad input handling.
//!
//! This module handles:
//! - Gamepad detection and connection via evdev ([`gamepad`])
//! - Folding raw events into stick positions and button press times ([`mapper`])
//! - Applying dead zones and hot zones to stick axes ([`calibration`])
//! - Force-feedback rumble on the bound pad ([`rumble`])
//! - The [`InputSource`] abstraction consumed by the control loop

pub mod calibration;
pub mod gamepad;
pub mod mapper;
pub mod rumble;

use async_trait::async_trait;

use crate::drive::AxisSample;
use crate::error::Result;

/// Buttons the control loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// Cross (×) - BTN_SOUTH.
    Cross,
    /// Circle (○) - BTN_EAST.
    Circle,
    /// Square (□) - BTN_WEST.
    Square,
    /// Triangle (△) - BTN_NORTH.
    Triangle,
    /// Home / analog / PS button - BTN_MODE.
    Home,
}

impl Button {
    /// Every tracked button.
    pub const ALL: [Button; 5] = [
        Button::Cross,
        Button::Circle,
        Button::Square,
        Button::Triangle,
        Button::Home,
    ];

    /// Number of tracked buttons.
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index, for per-button arrays.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Button::Cross => 0,
            Button::Circle => 1,
            Button::Square => 2,
            Button::Triangle => 3,
            Button::Home => 4,
        }
    }
}

/// Source of gamepad samples.
///
/// Implementations own the link to the physical controller. The control loop
/// calls [`InputSource::refresh`] once per cycle and then reads the latest
/// stick positions and button hold times.
#[async_trait]
pub trait InputSource: Send {
    /// Binds to a controller and returns its name.
    ///
    /// # Errors
    ///
    /// `ControllerNotFound` when no controller is available yet.
    async fn bind(&mut self) -> Result<String>;

    /// True while the controller link is up.
    fn is_connected(&self) -> bool;

    /// Waits (bounded by the source's own read timeout) for new input.
    ///
    /// A lost link is reported through [`InputSource::is_connected`], not as
    /// an error.
    async fn refresh(&mut self);

    /// Latest normalized stick positions.
    fn poll_axes(&self) -> AxisSample;

    /// Seconds the button has been held, or `None` when it is released.
    fn poll_button_hold(&self, button: Button) -> Option<f64>;

    /// Drops the controller link.
    fn release(&mut self);
}
