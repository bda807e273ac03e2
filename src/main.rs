//! # Rover Drive
//!
//! Drive a six-wheeled, four-steered rover with a gamepad.
//!
//! Left stick up/down sets the speed, the right stick steers. Hold Home to
//! stop the program, Square + Circle to shut the computer down and
//! Triangle + Cross to reboot it.
//!
//! # Examples
//!
//! ```bash
//! rover-drive --config config/default.toml --mode simple
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use rover_drive::actuator::indicator::{HapticIndicator, LogIndicator};
use rover_drive::actuator::open_backend;
use rover_drive::config::{Config, LoggingConfig};
use rover_drive::control::control_loop::{Collaborators, ControlLoop};
use rover_drive::controller::gamepad::Gamepad;
use rover_drive::drive::DriveMode;
use rover_drive::supervisor::power::CommandPower;
use rover_drive::supervisor::{self, LivenessSink, NoSupervisor};

#[derive(Parser, Debug)]
#[clap(version, about = "Drive a six-wheeled rover with a gamepad")]
struct Opts {
    /// Configuration file; built-in defaults are used if it does not exist
    #[clap(long, default_value = "config/default.toml")]
    config: PathBuf,
    /// Drive mode override (simple or ackermann)
    #[clap(long)]
    mode: Option<DriveMode>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let opts = Opts::parse();

    let config_found = opts.config.exists();
    let mut config = if config_found {
        Config::load(&opts.config)
            .with_context(|| format!("Failed to load {}", opts.config.display()))?
    } else {
        Config::default()
    };

    let _log_guard = init_logging(&config.logging)?;
    info!("Rover Drive v{} starting...", env!("CARGO_PKG_VERSION"));
    if !config_found {
        warn!("{} not found, using built-in defaults", opts.config.display());
    }

    if let Some(mode) = opts.mode {
        config.drive.mode = mode;
    }
    if let Some(watchdog) = supervisor::watchdog_interval_from_env() {
        info!("Using systemd watchdog interval of {:?}", watchdog);
        config.heartbeat.watchdog_interval_ms = watchdog.as_millis() as u64;
    }
    config.validate()?;

    let interrupt = Arc::new(AtomicBool::new(false));
    install_signal_handlers(interrupt.clone())?;

    let liveness: Box<dyn LivenessSink> = match supervisor::open_liveness_sink() {
        Ok(sink) => sink,
        Err(e) => {
            warn!("SystemD notifications unavailable: {}", e);
            Box::new(NoSupervisor)
        }
    };

    let gamepad = Gamepad::new(&config.controller);
    let haptics: Box<dyn HapticIndicator> = if config.controller.force_feedback {
        Box::new(gamepad.rumble_handle())
    } else {
        warn!("Force-feedback events are not enabled");
        Box::new(LogIndicator::new())
    };

    let io = Collaborators {
        input: Box::new(gamepad),
        motors: open_backend(&config).context("No motor backend available")?,
        lights: Box::new(LogIndicator::new()),
        haptics,
        liveness,
        power: Box::new(CommandPower::new(&config.power)),
    };

    info!("Use the left stick to set the speed and the right stick to steer. Hold Home to exit");
    let event = ControlLoop::new(&config, io, interrupt).run().await?;
    info!("Rover Drive stopped: {}", event);

    Ok(())
}

/// Console logging plus a daily rolling file when `log_dir` is set.
///
/// The returned guard flushes the file writer on drop.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    if config.log_dir.is_empty() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
        return Ok(None);
    }

    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory {}", config.log_dir))?;
    let appender = tracing_appender::rolling::daily(&config.log_dir, &config.file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

/// Sets `flag` on SIGINT or SIGTERM. The control loop checks it once per
/// cycle.
fn install_signal_handlers(flag: Arc<AtomicBool>) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                _ = sigint.recv() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
            };
            info!("Received {}, stopping after the current cycle", name);
            flag.store(true, Ordering::SeqCst);
        }
    });

    Ok(())
}
