//! # Supervisor Module
//!
//! Talks to whatever supervises the process.
//!
//! This module handles:
//! - Liveness notifications to systemd (`READY=1`, `WATCHDOG=1`, `STOPPING=1`)
//! - The watchdog interval systemd hands us through `WATCHDOG_USEC`
//! - System shutdown and reboot requests ([`power`])

pub mod power;

use std::io;
use std::os::unix::net::UnixDatagram;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::Result;

/// Environment variable naming the systemd notification socket.
const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

/// Environment variable carrying the watchdog interval in microseconds.
const WATCHDOG_USEC_ENV: &str = "WATCHDOG_USEC";

/// Target of the periodic heartbeat.
///
/// Failures are logged by the caller and never stop the control loop.
#[cfg_attr(test, mockall::automock)]
pub trait LivenessSink: Send {
    /// Startup finished.
    fn notify_ready(&mut self) -> Result<()>;

    /// The control loop is still cycling.
    fn notify_alive(&mut self) -> Result<()>;

    /// Clean exit in progress.
    fn notify_stopping(&mut self) -> Result<()>;
}

/// sd_notify(3) over the `$NOTIFY_SOCKET` datagram socket.
#[derive(Debug)]
pub struct SystemdNotifier {
    socket: UnixDatagram,
    address: String,
}

impl SystemdNotifier {
    /// Connects to `$NOTIFY_SOCKET`, or returns `None` when not started by
    /// systemd.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is set but the socket cannot be
    /// created.
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var(NOTIFY_SOCKET_ENV) {
            Ok(address) if !address.is_empty() => {
                let notifier = Self::connect(&address)?;
                info!("SystemD features used: READY=1, WATCHDOG=1, STOPPING=1");
                Ok(Some(notifier))
            }
            _ => Ok(None),
        }
    }

    /// Creates a notifier for `address`; a leading `@` names an abstract socket.
    pub fn connect(address: &str) -> Result<Self> {
        let socket = UnixDatagram::unbound()?;
        Ok(Self {
            socket,
            address: address.to_string(),
        })
    }

    fn send(&self, state: &str) -> io::Result<()> {
        if let Some(name) = self.address.strip_prefix('@') {
            use std::os::linux::net::SocketAddrExt;
            let addr = std::os::unix::net::SocketAddr::from_abstract_name(name.as_bytes())?;
            self.socket.send_to_addr(state.as_bytes(), &addr)?;
        } else {
            self.socket.send_to(state.as_bytes(), &self.address)?;
        }
        debug!("Sent {} to {}", state, self.address);
        Ok(())
    }
}

impl LivenessSink for SystemdNotifier {
    fn notify_ready(&mut self) -> Result<()> {
        Ok(self.send("READY=1")?)
    }

    fn notify_alive(&mut self) -> Result<()> {
        Ok(self.send("WATCHDOG=1")?)
    }

    fn notify_stopping(&mut self) -> Result<()> {
        Ok(self.send("STOPPING=1")?)
    }
}

/// Liveness sink used when no supervisor is listening.
#[derive(Debug, Default)]
pub struct NoSupervisor;

impl LivenessSink for NoSupervisor {
    fn notify_ready(&mut self) -> Result<()> {
        Ok(())
    }

    fn notify_alive(&mut self) -> Result<()> {
        Ok(())
    }

    fn notify_stopping(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Opens the systemd notifier if `$NOTIFY_SOCKET` is set.
pub fn open_liveness_sink() -> Result<Box<dyn LivenessSink>> {
    Ok(match SystemdNotifier::from_env()? {
        Some(notifier) => Box::new(notifier),
        None => {
            debug!("{} not set, liveness notifications disabled", NOTIFY_SOCKET_ENV);
            Box::new(NoSupervisor)
        }
    })
}

/// Watchdog interval from `WATCHDOG_USEC`, if systemd set one.
#[must_use]
pub fn watchdog_interval_from_env() -> Option<Duration> {
    parse_watchdog_usec(std::env::var(WATCHDOG_USEC_ENV).ok().as_deref())
}

fn parse_watchdog_usec(value: Option<&str>) -> Option<Duration> {
    value?
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|&usec| usec > 0)
        .map(Duration::from_micros)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_watchdog_usec() {
        assert_eq!(parse_watchdog_usec(Some("15000000")), Some(Duration::from_secs(15)));
        assert_eq!(parse_watchdog_usec(Some(" 500000 ")), Some(Duration::from_millis(500)));
        assert_eq!(parse_watchdog_usec(Some("0")), None);
        assert_eq!(parse_watchdog_usec(Some("soon")), None);
        assert_eq!(parse_watchdog_usec(None), None);
    }

    #[test]
    fn test_notifier_sends_states() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notify.sock");
        let listener = UnixDatagram::bind(&path).unwrap();

        let mut notifier = SystemdNotifier::connect(path.to_str().unwrap()).unwrap();
        notifier.notify_ready().unwrap();
        notifier.notify_alive().unwrap();
        notifier.notify_stopping().unwrap();

        let mut buf = [0u8; 64];
        for expected in ["READY=1", "WATCHDOG=1", "STOPPING=1"] {
            let n = listener.recv(&mut buf).unwrap();
            assert_eq!(&buf[..n], expected.as_bytes());
        }
    }

    #[test]
    fn test_notifier_without_listener_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.sock");
        let mut notifier = SystemdNotifier::connect(path.to_str().unwrap()).unwrap();
        assert!(notifier.notify_alive().is_err());
    }

    #[test]
    fn test_no_supervisor_is_silent() {
        let mut sink = NoSupervisor;
        assert!(sink.notify_ready().is_ok());
        assert!(sink.notify_alive().is_ok());
        assert!(sink.notify_stopping().is_ok());
    }
}
