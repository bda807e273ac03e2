//! Watchdog pacing for the liveness sink.

use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use crate::supervisor::LivenessSink;

/// Decides when the supervisor needs another liveness signal.
#[derive(Debug)]
pub struct Heartbeat {
    watchdog: Duration,
    last_beat: Instant,
}

impl Heartbeat {
    /// Starts counting from now.
    #[must_use]
    pub fn new(watchdog: Duration) -> Self {
        Self {
            watchdog,
            last_beat: Instant::now(),
        }
    }

    /// True once more than half the watchdog interval passed since the last
    /// signal.
    #[must_use]
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_beat) > self.watchdog / 2
    }

    /// Sleep between controller bind attempts.
    #[must_use]
    pub fn idle_period(&self) -> Duration {
        self.watchdog / 3
    }

    /// Signals unconditionally. Failures are logged only.
    pub fn beat(&mut self, sink: &mut dyn LivenessSink) {
        if let Err(e) = sink.notify_alive() {
            warn!("Failed to notify supervisor: {}", e);
        }
        self.last_beat = Instant::now();
    }

    /// Signals if due; returns whether a signal was sent.
    pub fn tick(&mut self, sink: &mut dyn LivenessSink) -> bool {
        if self.is_due(Instant::now()) {
            self.beat(sink);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoverError;
    use crate::supervisor::MockLivenessSink;

    #[tokio::test(start_paused = true)]
    async fn test_due_after_half_interval() {
        let mut sink = MockLivenessSink::new();
        sink.expect_notify_alive().times(1).returning(|| Ok(()));

        let mut heartbeat = Heartbeat::new(Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(!heartbeat.tick(&mut sink), "exactly half is not yet due");

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(heartbeat.tick(&mut sink));
        assert!(!heartbeat.tick(&mut sink), "timer restarts after a beat");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_notify_is_not_fatal() {
        let mut sink = MockLivenessSink::new();
        sink.expect_notify_alive()
            .times(2)
            .returning(|| Err(RoverError::Io(std::io::Error::from(std::io::ErrorKind::NotFound))));

        let mut heartbeat = Heartbeat::new(Duration::from_secs(2));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(heartbeat.tick(&mut sink));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(heartbeat.tick(&mut sink));
    }

    #[test]
    fn test_idle_period_is_a_third() {
        let heartbeat = Heartbeat::new(Duration::from_secs(15));
        assert_eq!(heartbeat.idle_period(), Duration::from_secs(5));
    }
}
