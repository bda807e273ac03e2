//! # Error Types
//!
//! Custom error types for Rover Drive using `thiserror`.

use thiserror::Error;

/// Main error type for Rover Drive
#[derive(Debug, Error)]
pub enum RoverError {
    /// No gamepad could be bound (transient, retried by the control loop)
    #[error("No controller found")]
    ControllerNotFound,

    /// Gamepad I/O errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// Motor actuator errors
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// Serial link errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Steering geometry produced a numerically invalid result
    #[error("Steering geometry error: {0}")]
    Geometry(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Rover Drive
pub type Result<T> = std::result::Result<T, RoverError>;
