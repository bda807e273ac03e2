//! Actuator backend for running without rover hardware.

use async_trait::async_trait;
use tracing::info;

use super::MotorActuator;
use crate::drive::WheelActuation;
use crate::error::Result;

/// Logs what would have been sent to the motors.
#[derive(Debug, Default)]
pub struct DummyRover {
    applied: u64,
}

impl DummyRover {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of actuations applied so far.
    #[must_use]
    pub fn applied(&self) -> u64 {
        self.applied
    }
}

#[async_trait]
impl MotorActuator for DummyRover {
    async fn apply(&mut self, wheels: &WheelActuation) -> Result<()> {
        self.applied += 1;
        info!(
            "Dummy: direction (left={}, right={}), speed (left={}, right={})",
            wheels.front_left.angle_deg,
            wheels.front_right.angle_deg,
            wheels.left_speed(),
            wheels.right_speed()
        );
        Ok(())
    }

    async fn coast(&mut self) -> Result<()> {
        info!("Dummy: motors coast to stop");
        Ok(())
    }

    async fn brake(&mut self) -> Result<()> {
        info!("Dummy: motors stop quickly");
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        info!("Dummy: rover cleanup");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::WheelActuation;

    #[tokio::test]
    async fn test_dummy_never_fails() {
        let mut rover = DummyRover::new();
        assert!(rover.apply(&WheelActuation::simple(10.0, 20.0)).await.is_ok());
        assert!(rover.coast().await.is_ok());
        assert!(rover.brake().await.is_ok());
        assert!(rover.release().await.is_ok());
        assert_eq!(rover.applied(), 1);
    }
}
