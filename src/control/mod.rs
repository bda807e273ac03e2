//! # Control Module
//!
//! The teleoperation state machine.
//!
//! This module handles:
//! - Turning held buttons into discrete events ([`gesture`])
//! - Keeping the supervisor's watchdog fed ([`heartbeat`])
//! - Binding the controller, driving the rover and shutting down cleanly
//!   ([`control_loop`])
//!
//! ## Lifecycle
//!
//! ```text
//! Disconnected ──bind──▶ Bound ──▶ Driving ──event/interrupt──▶ Stopping ──▶ Terminated
//!      ▲                              │
//!      └────────── link lost ─────────┘
//! ```

pub mod control_loop;
pub mod gesture;
pub mod heartbeat;

/// Why the loop stopped without a power request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Home button held.
    UserRequested,
    /// SIGINT or SIGTERM.
    Interrupted,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::UserRequested => write!(f, "program stopped by the user"),
            StopReason::Interrupted => write!(f, "termination signal received"),
        }
    }
}

/// Event that ends the control loop. Consumed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Stop(StopReason),
    ShutdownRequested,
    RebootRequested,
}

impl std::fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlEvent::Stop(reason) => write!(f, "stop ({})", reason),
            ControlEvent::ShutdownRequested => write!(f, "shutdown requested"),
            ControlEvent::RebootRequested => write!(f, "reboot requested"),
        }
    }
}

/// Control loop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for a controller.
    Disconnected,
    /// Controller bound, feedback not yet played.
    Bound,
    /// Polling the controller and driving.
    Driving,
    /// Shutting the rover down because of the event.
    Stopping(ControlEvent),
    /// Done; the loop returns the event.
    Terminated(ControlEvent),
}
