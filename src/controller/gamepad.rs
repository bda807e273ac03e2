//! # Gamepad Module
//!
//! This module handles gamepad detection, connection, and input reading
//! using the Linux evdev interface.
//!
//! ## Controller Detection
//!
//! Unless a device path is configured, the first `/dev/input/event*` device
//! that reports both stick axes (`ABS_X`, `ABS_Y`) and a south face button
//! (`BTN_SOUTH`) is used. This matches USB wireless gamepads as well as
//! DualShock/DualSense controllers.
//!
//! ## Axis Ranges
//!
//! At bind the right stick layout is resolved (see
//! [`RightStickAxes`](super::mapper::RightStickAxes)) and each stick axis's
//! minimum and maximum are read from the kernel's absinfo. The configured
//! `axis_min`/`axis_max` only apply to axes whose absinfo is missing or
//! empty.
//!
//! ## Reading
//!
//! Events are read from the evdev tokio stream. One call to
//! [`InputSource::refresh`] waits up to the read timeout for a `SYN_REPORT`,
//! then drains every report already queued so the loop always acts on the
//! newest sample.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use evdev::{
    AbsoluteAxisType, Device, EventStream, InputEvent, InputEventKind, Key, Synchronization,
};
use tracing::{debug, info, warn};

use super::calibration::{AxisRange, Calibration};
use super::mapper::{EventMapper, RightStickAxes, StickLayout, StickRanges};
use super::rumble::GamepadRumble;
use super::{Button, InputSource};
use crate::config::ControllerConfig;
use crate::drive::AxisSample;
use crate::error::{Result, RoverError};

/// Directory scanned for input devices.
const INPUT_DIR: &str = "/dev/input";

/// Upper bound on events consumed by one refresh.
const MAX_EVENTS_PER_REFRESH: usize = 1024;

/// An open controller link.
struct GamepadLink {
    stream: EventStream,
    device_path: String,
}

/// Source of raw evdev events.
#[async_trait]
pub(crate) trait EventSource: Send {
    async fn next_event(&mut self) -> io::Result<InputEvent>;
}

#[async_trait]
impl EventSource for EventStream {
    async fn next_event(&mut self) -> io::Result<InputEvent> {
        EventStream::next_event(self).await
    }
}

/// Feeds events from `source` into `mapper`.
///
/// Waits until `deadline` for the first `SYN_REPORT`, then keeps reading
/// only while events are ready without blocking. Returns the number of
/// complete reports consumed.
pub(crate) async fn read_reports<S>(
    source: &mut S,
    mapper: &mut EventMapper,
    deadline: tokio::time::Instant,
) -> io::Result<usize>
where
    S: EventSource + ?Sized,
{
    let mut reports = 0;

    for _ in 0..MAX_EVENTS_PER_REFRESH {
        let next = if reports == 0 {
            tokio::time::timeout_at(deadline, source.next_event()).await
        } else {
            tokio::time::timeout(Duration::ZERO, source.next_event()).await
        };

        // Idle sticks, or nothing more queued
        let Ok(event) = next else {
            break;
        };
        let event = event?;

        mapper.process_event(&event, Instant::now());
        if matches!(
            event.kind(),
            InputEventKind::Synchronization(Synchronization::SYN_REPORT)
        ) {
            reports += 1;
        }
    }

    Ok(reports)
}

/// Range for an axis from its kernel absinfo bounds, or `fallback` when the
/// device reports an empty range.
#[must_use]
pub fn range_from_absinfo(minimum: i32, maximum: i32, fallback: AxisRange) -> AxisRange {
    if minimum < maximum {
        AxisRange::new(minimum, maximum)
    } else {
        fallback
    }
}

/// Evdev gamepad handle.
///
/// Starts unbound; [`InputSource::bind`] opens the device.
pub struct Gamepad {
    /// Configured device path, `None` to auto-detect.
    device_path: Option<PathBuf>,
    read_timeout: Duration,
    right_stick: RightStickAxes,
    /// Used for axes without absinfo.
    fallback_range: AxisRange,
    mapper: EventMapper,
    link: Option<GamepadLink>,
    /// Bound device path, shared with rumble handles.
    bound: Arc<Mutex<Option<PathBuf>>>,
}

impl std::fmt::Debug for Gamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamepad")
            .field("device_path", &self.device_path)
            .field("read_timeout", &self.read_timeout)
            .field("connected", &self.link.is_some())
            .finish_non_exhaustive()
    }
}

impl Gamepad {
    /// Creates an unbound gamepad from the controller configuration.
    #[must_use]
    pub fn new(config: &ControllerConfig) -> Self {
        let device_path = if config.device_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(&config.device_path))
        };

        let fallback_range = AxisRange::new(config.axis_min, config.axis_max);
        Self {
            device_path,
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            right_stick: config.right_stick,
            fallback_range,
            mapper: EventMapper::new(
                fallback_range,
                Calibration::new(config.dead_zone, config.hot_zone),
            ),
            link: None,
            bound: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle that plays force feedback on whichever pad is bound.
    #[must_use]
    pub fn rumble_handle(&self) -> GamepadRumble {
        GamepadRumble::new(self.bound.clone())
    }

    fn set_bound(&self, path: Option<PathBuf>) {
        let mut bound = match self.bound.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *bound = path;
    }

    /// Stick layout and per-axis ranges of `device`.
    fn stick_geometry(&self, device: &Device) -> (StickLayout, StickRanges) {
        let has_rx_ry = device.supported_absolute_axes().map_or(false, |axes| {
            axes.contains(AbsoluteAxisType::ABS_RX) && axes.contains(AbsoluteAxisType::ABS_RY)
        });
        let layout = self.right_stick.layout(has_rx_ry);

        let ranges = match device.get_abs_state() {
            Ok(abs) => StickRanges::from_layout(layout, |axis| {
                abs.get(axis.0 as usize).map_or(self.fallback_range, |info| {
                    range_from_absinfo(info.minimum, info.maximum, self.fallback_range)
                })
            }),
            Err(e) => {
                warn!("Could not read axis ranges, using {:?}: {}", self.fallback_range, e);
                StickRanges::uniform(self.fallback_range)
            }
        };

        (layout, ranges)
    }

    /// Path of the bound device, if any.
    #[must_use]
    pub fn device_path(&self) -> Option<&str> {
        self.link.as_ref().map(|link| link.device_path.as_str())
    }

    /// Opens the configured device, or scans for the first gamepad.
    fn open_device(&self) -> Result<(Device, PathBuf)> {
        if let Some(path) = &self.device_path {
            return Device::open(path)
                .map(|device| (device, path.clone()))
                .map_err(|e| {
                    debug!("Could not open {}: {}", path.display(), e);
                    RoverError::ControllerNotFound
                });
        }

        let input_dir = Path::new(INPUT_DIR);
        let mut entries: Vec<PathBuf> = std::fs::read_dir(input_dir)
            .map_err(|e| {
                debug!("Failed to read {}: {}", INPUT_DIR, e);
                RoverError::ControllerNotFound
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().starts_with("event"))
                    .unwrap_or(false)
            })
            .collect();

        // Deterministic selection when several pads are connected
        entries.sort();

        for path in entries {
            match Device::open(&path) {
                Ok(device) => {
                    debug!(
                        "Found input device: {} ({})",
                        path.display(),
                        device.name().unwrap_or("unnamed")
                    );
                    if is_gamepad(&device) {
                        return Ok((device, path));
                    }
                }
                Err(e) => {
                    // Permission denied or device vanished - skip it
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(RoverError::ControllerNotFound)
    }
}

/// True for devices with two stick axes and a south face button.
fn is_gamepad(device: &Device) -> bool {
    let has_sticks = device.supported_absolute_axes().map_or(false, |axes| {
        axes.contains(AbsoluteAxisType::ABS_X) && axes.contains(AbsoluteAxisType::ABS_Y)
    });
    let has_buttons = device
        .supported_keys()
        .map_or(false, |keys| keys.contains(Key::BTN_SOUTH));
    has_sticks && has_buttons
}

#[async_trait]
impl InputSource for Gamepad {
    async fn bind(&mut self) -> Result<String> {
        let (device, path) = self.open_device()?;
        let name = device.name().unwrap_or("Gamepad").to_string();
        let device_path = path.to_string_lossy().to_string();
        let (layout, ranges) = self.stick_geometry(&device);

        let stream = device
            .into_event_stream()
            .map_err(|e| RoverError::Controller(format!("Failed to stream {}: {}", device_path, e)))?;

        info!("Controller found: {} at {}", name, device_path);
        debug!("Stick axes {:?}, ranges {:?}", layout, ranges);
        self.mapper.configure(layout, ranges);
        self.link = Some(GamepadLink { stream, device_path });
        self.set_bound(Some(path));
        Ok(name)
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    async fn refresh(&mut self) {
        let Some(link) = self.link.as_mut() else {
            return;
        };

        let deadline = tokio::time::Instant::now() + self.read_timeout;
        match read_reports(&mut link.stream, &mut self.mapper, deadline).await {
            Ok(reports) if reports > 1 => debug!("Caught up on {} queued reports", reports),
            Ok(_) => {}
            Err(e) => {
                info!("Controller disconnected ({}): {}", link.device_path, e);
                self.link = None;
                self.set_bound(None);
                self.mapper.reset();
            }
        }
    }

    fn poll_axes(&self) -> AxisSample {
        self.mapper.axes()
    }

    fn poll_button_hold(&self, button: Button) -> Option<f64> {
        self.mapper.held_seconds(button, Instant::now())
    }

    fn release(&mut self) {
        if let Some(link) = self.link.take() {
            debug!("Released controller at {}", link.device_path);
        }
        self.set_bound(None);
        self.mapper.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use evdev::EventType;

    fn test_config(device_path: &str) -> ControllerConfig {
        ControllerConfig {
            device_path: device_path.to_string(),
            dead_zone: 0.05,
            hot_zone: 0.05,
            axis_min: 0,
            axis_max: 255,
            read_timeout_ms: 20,
            reconnect_interval_ms: 1000,
            right_stick: RightStickAxes::Auto,
            force_feedback: false,
        }
    }

    /// Events already queued by the kernel; blocks forever once empty.
    struct QueuedEvents(VecDeque<io::Result<InputEvent>>);

    impl QueuedEvents {
        fn reports(ly: &[i32]) -> Self {
            let mut events = VecDeque::new();
            for value in ly {
                events.push_back(Ok(axis(AbsoluteAxisType::ABS_Y, *value)));
                events.push_back(Ok(syn_report()));
            }
            Self(events)
        }
    }

    #[async_trait]
    impl EventSource for QueuedEvents {
        async fn next_event(&mut self) -> io::Result<InputEvent> {
            match self.0.pop_front() {
                Some(event) => event,
                None => std::future::pending().await,
            }
        }
    }

    fn axis(axis: AbsoluteAxisType, value: i32) -> InputEvent {
        InputEvent::new(EventType::ABSOLUTE, axis.0, value)
    }

    fn syn_report() -> InputEvent {
        InputEvent::new(EventType::SYNCHRONIZATION, Synchronization::SYN_REPORT.0, 0)
    }

    fn deadline() -> tokio::time::Instant {
        tokio::time::Instant::now() + Duration::from_millis(20)
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_drains_queued_reports() {
        let mut mapper = EventMapper::new(AxisRange::default(), Calibration::linear());
        let mut source = QueuedEvents::reports(&[0, 255, 40]);

        let reports = read_reports(&mut source, &mut mapper, deadline()).await.unwrap();
        assert_eq!(reports, 3);
        assert_eq!(mapper.state().left_stick_y, 40);
        assert!(source.0.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_idle_returns_at_deadline() {
        let mut mapper = EventMapper::default();
        let mut source = QueuedEvents(VecDeque::new());

        let started = tokio::time::Instant::now();
        let reports = read_reports(&mut source, &mut mapper, deadline()).await.unwrap();
        assert_eq!(reports, 0);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_keeps_partial_report() {
        let mut mapper = EventMapper::default();
        let mut source = QueuedEvents(VecDeque::from([Ok(axis(AbsoluteAxisType::ABS_Y, 7))]));

        let reports = read_reports(&mut source, &mut mapper, deadline()).await.unwrap();
        assert_eq!(reports, 0);
        assert_eq!(mapper.state().left_stick_y, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_read_error_after_reports() {
        let mut mapper = EventMapper::default();
        let mut source = QueuedEvents::reports(&[10]);
        source.0.push_back(Err(io::Error::from_raw_os_error(19)));

        let result = read_reports(&mut source, &mut mapper, deadline()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_range_from_absinfo() {
        let fallback = AxisRange::default();
        assert_eq!(
            range_from_absinfo(-32768, 32767, fallback),
            AxisRange::new(-32768, 32767)
        );
        assert_eq!(range_from_absinfo(0, 1023, fallback), AxisRange::new(0, 1023));
        // Axis without absinfo
        assert_eq!(range_from_absinfo(0, 0, fallback), fallback);
    }

    #[test]
    fn test_rumble_handle_unbound() {
        let pad = Gamepad::new(&test_config(""));
        assert!(pad.rumble_handle().bound_path().is_none());
    }

    #[test]
    fn test_new_is_unbound() {
        let pad = Gamepad::new(&test_config(""));
        assert!(!pad.is_connected());
        assert!(pad.device_path().is_none());
        assert_eq!(pad.poll_axes(), AxisSample::default());
        assert_eq!(pad.poll_button_hold(Button::Home), None);
    }

    #[tokio::test]
    async fn test_bind_missing_configured_device() {
        let mut pad = Gamepad::new(&test_config("/dev/input/nonexistent_event_device"));
        let result = pad.bind().await;
        assert!(matches!(result, Err(RoverError::ControllerNotFound)));
        assert!(!pad.is_connected());
    }

    #[tokio::test]
    async fn test_refresh_without_link_returns_immediately() {
        let mut pad = Gamepad::new(&test_config(""));
        pad.refresh().await;
        assert!(!pad.is_connected());
    }

    // Integration test - only runs with real hardware
    #[tokio::test]
    #[ignore]
    async fn test_bind_with_real_hardware() {
        let mut pad = Gamepad::new(&test_config(""));
        let name = pad.bind().await.expect("Controller not found");
        println!("Bound to {} at {:?}", name, pad.device_path());
        assert!(pad.is_connected());

        println!("Move the sticks within 5 seconds...");
        for _ in 0..250 {
            pad.refresh().await;
            let axes = pad.poll_axes();
            if axes != AxisSample::default() {
                return;
            }
        }
        panic!("No stick movement received from controller");
    }
}
