//! System power requests triggered by controller gestures.

use std::process::Command;

use tracing::{debug, info, warn};

use crate::config::PowerConfig;
use crate::error::{Result, RoverError};

#[cfg_attr(test, mockall::automock)]
pub trait PowerController: Send {
    /// Powers the computer off.
    fn request_shutdown(&mut self) -> Result<()>;

    /// Restarts the computer.
    fn request_reboot(&mut self) -> Result<()>;
}

/// Runs the configured shell commands.
///
/// Only the first request is honored; anything after it is ignored with a
/// warning.
#[derive(Debug)]
pub struct CommandPower {
    shutdown_command: String,
    reboot_command: String,
    requested: bool,
}

impl CommandPower {
    #[must_use]
    pub fn new(config: &PowerConfig) -> Self {
        Self {
            shutdown_command: config.shutdown_command.clone(),
            reboot_command: config.reboot_command.clone(),
            requested: false,
        }
    }

    fn run(&mut self, what: &str, command: &str) -> Result<()> {
        if self.requested {
            warn!("Ignoring {} request, a power request was already made", what);
            return Ok(());
        }
        self.requested = true;

        info!("{} initiated with `{}`", what, command);
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()?;

        debug!(
            "{} cmd: output: {}, error: {}",
            what,
            String::from_utf8_lossy(&output.stdout).trim(),
            String::from_utf8_lossy(&output.stderr).trim()
        );

        if output.status.success() {
            Ok(())
        } else {
            Err(RoverError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("`{}` exited with {}", command, output.status),
            )))
        }
    }
}

impl PowerController for CommandPower {
    fn request_shutdown(&mut self) -> Result<()> {
        let command = self.shutdown_command.clone();
        self.run("Shutdown", &command)
    }

    fn request_reboot(&mut self) -> Result<()> {
        let command = self.reboot_command.clone();
        self.run("Reboot", &command)
    }
}
