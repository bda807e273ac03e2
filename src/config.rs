//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::actuator::ActuatorBackend;
use crate::controller::mapper::RightStickAxes;
use crate::drive::DriveMode;
use crate::error::{Result, RoverError};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub chassis: ChassisConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub gestures: GestureConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub actuator: ActuatorConfig,
    #[serde(default)]
    pub power: PowerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Drive mode and limits
#[derive(Debug, Deserialize, Clone)]
pub struct DriveConfig {
    #[serde(default = "default_mode")]
    pub mode: DriveMode,

    /// Speed at full stick deflection (percent)
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,

    #[serde(default = "default_max_dir_simple_deg")]
    pub max_dir_simple_deg: f64,

    #[serde(default = "default_max_dir_ackermann_deg")]
    pub max_dir_ackermann_deg: f64,
}

/// Chassis geometry and servo wiring
#[derive(Debug, Deserialize, Clone)]
pub struct ChassisConfig {
    /// Track width divided by wheelbase
    #[serde(default = "default_width_to_length")]
    pub width_to_length: f64,

    #[serde(default = "default_servo_front_left")]
    pub servo_front_left: u8,

    #[serde(default = "default_servo_rear_left")]
    pub servo_rear_left: u8,

    #[serde(default = "default_servo_front_right")]
    pub servo_front_right: u8,

    #[serde(default = "default_servo_rear_right")]
    pub servo_rear_right: u8,
}

/// Controller configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    /// Empty to auto-detect
    #[serde(default)]
    pub device_path: String,

    #[serde(default = "default_dead_zone")]
    pub dead_zone: f64,

    #[serde(default = "default_hot_zone")]
    pub hot_zone: f64,

    #[serde(default = "default_axis_min")]
    pub axis_min: i32,

    #[serde(default = "default_axis_max")]
    pub axis_max: i32,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    /// Axes carrying the right stick
    #[serde(default)]
    pub right_stick: RightStickAxes,

    /// Rumble the bound pad on connect and shutdown
    #[serde(default)]
    pub force_feedback: bool,
}

/// Button hold thresholds (seconds)
#[derive(Debug, Deserialize, Clone)]
pub struct GestureConfig {
    #[serde(default = "default_hold_s")]
    pub home_hold_s: f64,

    #[serde(default = "default_hold_s")]
    pub shutdown_hold_s: f64,

    #[serde(default = "default_hold_s")]
    pub reboot_hold_s: f64,
}

/// Supervisor watchdog configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HeartbeatConfig {
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,
}

/// Motor backend configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ActuatorConfig {
    #[serde(default = "default_backend")]
    pub backend: ActuatorBackend,

    /// Serial device; empty to try the default paths
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Shell commands run for power gestures
#[derive(Debug, Deserialize, Clone)]
pub struct PowerConfig {
    #[serde(default = "default_shutdown_command")]
    pub shutdown_command: String,

    #[serde(default = "default_reboot_command")]
    pub reboot_command: String,
}

/// Log file configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Empty to log to the console only
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

// Default value functions
fn default_mode() -> DriveMode { DriveMode::Ackermann }
fn default_max_speed() -> f64 { 100.0 }
fn default_max_dir_simple_deg() -> f64 { 30.0 }
fn default_max_dir_ackermann_deg() -> f64 { 45.0 }

fn default_width_to_length() -> f64 { 80.0 / 77.0 }
fn default_servo_front_left() -> u8 { 9 }
fn default_servo_rear_left() -> u8 { 11 }
fn default_servo_front_right() -> u8 { 15 }
fn default_servo_rear_right() -> u8 { 13 }

fn default_dead_zone() -> f64 { 0.05 }
fn default_hot_zone() -> f64 { 0.05 }
fn default_axis_min() -> i32 { 0 }
fn default_axis_max() -> i32 { 255 }
fn default_read_timeout_ms() -> u64 { 50 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_hold_s() -> f64 { 3.0 }

fn default_watchdog_interval_ms() -> u64 { 15000 }

fn default_backend() -> ActuatorBackend { ActuatorBackend::Dummy }
fn default_baud_rate() -> u32 { 115200 }

fn default_shutdown_command() -> String { "sudo shutdown now".to_string() }
fn default_reboot_command() -> String { "sudo reboot".to_string() }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_file_prefix() -> String { "driverover.log".to_string() }

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            max_speed: default_max_speed(),
            max_dir_simple_deg: default_max_dir_simple_deg(),
            max_dir_ackermann_deg: default_max_dir_ackermann_deg(),
        }
    }
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            width_to_length: default_width_to_length(),
            servo_front_left: default_servo_front_left(),
            servo_rear_left: default_servo_rear_left(),
            servo_front_right: default_servo_front_right(),
            servo_rear_right: default_servo_rear_right(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            dead_zone: default_dead_zone(),
            hot_zone: default_hot_zone(),
            axis_min: default_axis_min(),
            axis_max: default_axis_max(),
            read_timeout_ms: default_read_timeout_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
            right_stick: RightStickAxes::default(),
            force_feedback: false,
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            home_hold_s: default_hold_s(),
            shutdown_hold_s: default_hold_s(),
            reboot_hold_s: default_hold_s(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            watchdog_interval_ms: default_watchdog_interval_ms(),
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            port: String::new(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            shutdown_command: default_shutdown_command(),
            reboot_command: default_reboot_command(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            file_prefix: default_file_prefix(),
        }
    }
}

impl ControllerConfig {
    /// Backoff between bind attempts.
    #[must_use]
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

impl HeartbeatConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rover_drive::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Steering bound for the configured drive mode.
    #[must_use]
    pub fn max_dir_deg(&self) -> f64 {
        match self.drive.mode {
            DriveMode::Simple => self.drive.max_dir_simple_deg,
            DriveMode::Ackermann => self.drive.max_dir_ackermann_deg,
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Validate drive limits
        if !(0.0..=100.0).contains(&self.drive.max_speed) {
            return Err(invalid("max_speed must be between 0 and 100"));
        }

        if !(0.0..=90.0).contains(&self.drive.max_dir_simple_deg) {
            return Err(invalid("max_dir_simple_deg must be between 0 and 90"));
        }

        if !(0.0..=90.0).contains(&self.drive.max_dir_ackermann_deg) {
            return Err(invalid("max_dir_ackermann_deg must be between 0 and 90"));
        }

        // Validate chassis geometry
        if !(self.chassis.width_to_length > 0.0 && self.chassis.width_to_length.is_finite()) {
            return Err(invalid("width_to_length must be a positive number"));
        }

        let servos = [
            self.chassis.servo_front_left,
            self.chassis.servo_rear_left,
            self.chassis.servo_front_right,
            self.chassis.servo_rear_right,
        ];
        for (i, id) in servos.iter().enumerate() {
            if servos[..i].contains(id) {
                return Err(invalid(format!("servo id {} is assigned to more than one wheel", id)));
            }
        }

        // Validate controller calibration
        if !(0.0..=0.25).contains(&self.controller.dead_zone) {
            return Err(invalid("dead_zone must be between 0.0 and 0.25"));
        }

        if !(0.0..=0.25).contains(&self.controller.hot_zone) {
            return Err(invalid("hot_zone must be between 0.0 and 0.25"));
        }

        if self.controller.axis_min >= self.controller.axis_max {
            return Err(invalid("axis_min must be less than axis_max"));
        }

        if self.controller.read_timeout_ms == 0 || self.controller.read_timeout_ms > 1000 {
            return Err(invalid("read_timeout_ms must be between 1 and 1000"));
        }

        if self.controller.reconnect_interval_ms == 0 || self.controller.reconnect_interval_ms > 60000 {
            return Err(invalid("reconnect_interval_ms must be between 1 and 60000"));
        }

        // Validate gesture thresholds
        for (name, value) in [
            ("home_hold_s", self.gestures.home_hold_s),
            ("shutdown_hold_s", self.gestures.shutdown_hold_s),
            ("reboot_hold_s", self.gestures.reboot_hold_s),
        ] {
            if !(value > 0.0 && value <= 60.0) {
                return Err(invalid(format!("{} must be between 0 and 60 seconds", name)));
            }
        }

        // Watchdog must stay well above the input read timeout
        if self.heartbeat.watchdog_interval_ms < 3 * self.controller.read_timeout_ms {
            return Err(invalid("watchdog_interval_ms must be at least three read timeouts"));
        }

        // Validate serial settings
        if ![9600, 57600, 115200, 230400, 460800, 921600].contains(&self.actuator.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 57600, 115200, 230400, 460800, 921600",
            ));
        }

        // Validate power commands
        if self.power.shutdown_command.trim().is_empty() || self.power.reboot_command.trim().is_empty() {
            return Err(invalid("power commands cannot be empty"));
        }

        // Log directory may be empty (console only), the prefix may not
        if self.logging.file_prefix.is_empty() {
            return Err(invalid("logging file_prefix cannot be empty"));
        }

        Ok(())
    }
}

fn invalid<T: std::fmt::Display>(msg: T) -> RoverError {
    RoverError::Config(toml::de::Error::custom(msg))
}
