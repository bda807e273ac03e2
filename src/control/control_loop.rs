//! # Control Loop Module
//!
//! Single-threaded state machine that owns every collaborator.
//!
//! ## Cycle
//!
//! While [`LoopState::Driving`], each cycle:
//!
//! 1. Waits for controller input (bounded by the input's read timeout)
//! 2. Mixes the sticks into a [`MotionCommand`]
//! 3. Actuates only if the command differs from the last applied one
//! 4. Feeds button hold times to the [`GestureDetector`]
//! 5. Checks the interrupt flag
//! 6. Feeds the watchdog when due
//!
//! The interrupt flag is only read between actuator calls, so a cycle always
//! completes before the loop stops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::gesture::GestureDetector;
use super::heartbeat::Heartbeat;
use super::{ControlEvent, LoopState, StopReason};
use crate::actuator::indicator::{HapticIndicator, HapticPattern, LightIndicator, LightPattern};
use crate::actuator::MotorActuator;
use crate::config::Config;
use crate::controller::InputSource;
use crate::drive::ackerman::AckermanSolver;
use crate::drive::mixer::MotionMixer;
use crate::drive::{DriveMode, MotionCommand, WheelActuation};
use crate::error::{Result, RoverError};
use crate::supervisor::power::PowerController;
use crate::supervisor::LivenessSink;

/// Everything the loop talks to.
pub struct Collaborators {
    pub input: Box<dyn InputSource>,
    pub motors: Box<dyn MotorActuator>,
    pub lights: Box<dyn LightIndicator>,
    pub haptics: Box<dyn HapticIndicator>,
    pub liveness: Box<dyn LivenessSink>,
    pub power: Box<dyn PowerController>,
}

/// Teleoperation control loop.
pub struct ControlLoop {
    io: Collaborators,
    mixer: MotionMixer,
    solver: AckermanSolver,
    gestures: GestureDetector,
    heartbeat: Heartbeat,
    reconnect_interval: Duration,
    interrupt: Arc<AtomicBool>,
    state: LoopState,
    last_applied: Option<MotionCommand>,
    power_requested: bool,
}

impl ControlLoop {
    /// Builds the loop from the configuration.
    ///
    /// Setting `interrupt` asks the loop to stop at the end of the current
    /// cycle.
    #[must_use]
    pub fn new(config: &Config, io: Collaborators, interrupt: Arc<AtomicBool>) -> Self {
        Self {
            io,
            mixer: MotionMixer::new(config.drive.mode, config.drive.max_speed, config.max_dir_deg()),
            solver: AckermanSolver::new(config.chassis.width_to_length),
            gestures: GestureDetector::new(&config.gestures),
            heartbeat: Heartbeat::new(config.heartbeat.interval()),
            reconnect_interval: config.controller.reconnect_interval(),
            interrupt,
            state: LoopState::Disconnected,
            last_applied: None,
            power_requested: false,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Runs until a stop event or interrupt and returns that event.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal faults (the steering geometry
    /// producing non-finite values). The motors are coasted and released
    /// before the error is returned.
    pub async fn run(mut self) -> Result<ControlEvent> {
        info!(
            "Control loop starting ({} mode, max direction {}°)",
            self.mixer.mode(),
            self.mixer.max_dir()
        );
        if let Err(e) = self.io.liveness.notify_ready() {
            warn!("Failed to notify supervisor: {}", e);
        }
        self.show(LightPattern::Startup);

        loop {
            let next = match self.state {
                LoopState::Disconnected => self.connect().await,
                LoopState::Bound => self.on_bound(),
                LoopState::Driving => match self.cycle().await {
                    Ok(next) => next,
                    Err(e) => {
                        error!("Fatal control loop error: {}", e);
                        self.emergency_stop().await;
                        return Err(e);
                    }
                },
                LoopState::Stopping(event) => self.shut_down(event).await,
                LoopState::Terminated(event) => return Ok(event),
            };
            self.transition(next);
        }
    }

    fn transition(&mut self, next: LoopState) {
        if next != self.state {
            debug!("Control loop: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    async fn connect(&mut self) -> LoopState {
        if self.interrupted() {
            return LoopState::Stopping(ControlEvent::Stop(StopReason::Interrupted));
        }

        match self.io.input.bind().await {
            Ok(name) => {
                info!("Controller found: {}", name);
                LoopState::Bound
            }
            Err(e) => {
                match e {
                    RoverError::ControllerNotFound => info!("No controller found yet. Keep trying!"),
                    other => warn!("Failed to bind controller: {}", other),
                }
                tokio::time::sleep(self.reconnect_interval).await;
                self.idle().await;
                LoopState::Disconnected
            }
        }
    }

    /// Waits between bind attempts and keeps the watchdog fed.
    async fn idle(&mut self) {
        tokio::time::sleep(self.heartbeat.idle_period()).await;
        self.heartbeat.beat(self.io.liveness.as_mut());
    }

    fn on_bound(&mut self) -> LoopState {
        self.heartbeat.beat(self.io.liveness.as_mut());
        if let Err(e) = self.io.haptics.rumble(HapticPattern::Connected) {
            debug!("Rumble failed: {}", e);
        }
        self.show(LightPattern::Connected);
        self.gestures.reset();
        self.last_applied = None;
        LoopState::Driving
    }

    async fn cycle(&mut self) -> Result<LoopState> {
        self.io.input.refresh().await;
        if !self.io.input.is_connected() {
            return Ok(self.on_link_lost().await);
        }

        let command = self.mixer.mix(&self.io.input.poll_axes());
        if self.last_applied != Some(command) {
            self.drive(command).await?;
        }

        let input = &self.io.input;
        if let Some(event) = self.gestures.update(|button| input.poll_button_hold(button)) {
            return Ok(LoopState::Stopping(event));
        }

        if self.interrupted() {
            return Ok(LoopState::Stopping(ControlEvent::Stop(StopReason::Interrupted)));
        }

        self.heartbeat.tick(self.io.liveness.as_mut());
        Ok(LoopState::Driving)
    }

    /// Applies a changed command. Actuator failures leave the previous
    /// command authoritative so the write is retried next cycle.
    async fn drive(&mut self, command: MotionCommand) -> Result<()> {
        let wheels = match self.mixer.mode() {
            DriveMode::Simple => {
                let direction = command
                    .direction_deg
                    .or_else(|| self.last_applied.and_then(|last| last.direction_deg))
                    .unwrap_or(0.0);
                WheelActuation::simple(direction, command.speed_percent)
            }
            DriveMode::Ackermann => self.solver.solve(command.direction_deg, command.speed_percent)?,
        };

        match self.io.motors.apply(&wheels).await {
            Ok(()) => {
                debug!(
                    "Applied direction {:?}, speed {:.1} -> {:?}",
                    command.direction_deg, command.speed_percent, wheels
                );
                self.last_applied = Some(command);
                let pattern = if command.speed_percent == 0.0 {
                    LightPattern::Halted
                } else {
                    LightPattern::Moving {
                        forward: command.speed_percent > 0.0,
                        direction_deg: command.direction_deg.unwrap_or(0.0),
                    }
                };
                self.show(pattern);
            }
            Err(e) => warn!("Actuator write failed, retrying next cycle: {}", e),
        }
        Ok(())
    }

    async fn on_link_lost(&mut self) -> LoopState {
        info!("Controller disconnected, stopping the rover");
        if let Err(e) = self.io.motors.brake().await {
            warn!("Failed to brake: {}", e);
        }
        self.last_applied = None;
        self.gestures.reset();
        self.show(LightPattern::Startup);
        self.idle().await;
        LoopState::Disconnected
    }

    async fn shut_down(&mut self, event: ControlEvent) -> LoopState {
        info!("Stopping: {}", event);

        if let Err(e) = self.io.motors.coast().await {
            warn!("Failed to stop motors: {}", e);
        }
        if let Err(e) = self.io.haptics.rumble(HapticPattern::Goodbye) {
            debug!("Rumble failed: {}", e);
        }
        self.show(LightPattern::Terminating);
        if let Err(e) = self.io.motors.release().await {
            warn!("Failed to release actuator: {}", e);
        }
        self.io.input.release();
        info!("Stop rover and clean exit.");

        if let Err(e) = self.io.liveness.notify_stopping() {
            warn!("Failed to notify supervisor: {}", e);
        }

        if !self.power_requested {
            let result = match event {
                ControlEvent::ShutdownRequested => {
                    self.power_requested = true;
                    info!("Initiate shutdown!");
                    self.io.power.request_shutdown()
                }
                ControlEvent::RebootRequested => {
                    self.power_requested = true;
                    info!("Initiate reboot!");
                    self.io.power.request_reboot()
                }
                ControlEvent::Stop(_) => Ok(()),
            };
            if let Err(e) = result {
                error!("Power request failed: {}", e);
            }
        }

        LoopState::Terminated(event)
    }

    async fn emergency_stop(&mut self) {
        if let Err(e) = self.io.motors.coast().await {
            warn!("Failed to stop motors: {}", e);
        }
        if let Err(e) = self.io.motors.release().await {
            warn!("Failed to release actuator: {}", e);
        }
        self.io.input.release();
        self.state = LoopState::Terminated(ControlEvent::Stop(StopReason::Interrupted));
    }

    fn show(&mut self, pattern: LightPattern) {
        if let Err(e) = self.io.lights.show(pattern) {
            debug!("Lights failed: {}", e);
        }
    }
}
