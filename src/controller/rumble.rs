//! Force-feedback rumble on the bound gamepad.
//!
//! The rumble handle opens its own file descriptor on the pad so it never
//! competes with the event stream owned by [`Gamepad`](super::gamepad::Gamepad).
//! It follows the pad across reconnects through the shared bound path.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use evdev::{Device, FFEffect, FFEffectData, FFEffectKind, FFEffectType, FFReplay, FFTrigger};
use tracing::debug;

use crate::actuator::indicator::{HapticIndicator, HapticPattern};
use crate::error::{Result, RoverError};

/// Effect and play count for a pattern.
#[must_use]
pub fn effect_for(pattern: HapticPattern) -> (FFEffectData, i32) {
    let (magnitude, length_ms, count) = match pattern {
        // Two short pulses
        HapticPattern::Connected => (0x8000, 500, 2),
        HapticPattern::Goodbye => (0xFFFF, 1000, 1),
    };

    let data = FFEffectData {
        direction: 0,
        trigger: FFTrigger::default(),
        replay: FFReplay {
            length: length_ms,
            delay: 0,
        },
        kind: FFEffectKind::Rumble {
            strong_magnitude: magnitude,
            weak_magnitude: magnitude,
        },
    };
    (data, count)
}

/// Plays [`HapticPattern`]s on the pad bound by the gamepad it came from.
pub struct GamepadRumble {
    bound: Arc<Mutex<Option<PathBuf>>>,
    device: Option<(PathBuf, Device)>,
    /// Kept alive while playing; dropping an effect erases it.
    effect: Option<FFEffect>,
}

impl std::fmt::Debug for GamepadRumble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GamepadRumble")
            .field("bound", &self.bound_path())
            .field("playing", &self.effect.is_some())
            .finish_non_exhaustive()
    }
}

impl GamepadRumble {
    pub(crate) fn new(bound: Arc<Mutex<Option<PathBuf>>>) -> Self {
        Self {
            bound,
            device: None,
            effect: None,
        }
    }

    /// Path of the pad currently bound, if any.
    #[must_use]
    pub fn bound_path(&self) -> Option<PathBuf> {
        match self.bound.lock() {
            Ok(bound) => bound.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Opens `path` for force feedback unless it is already open.
    fn device_for(&mut self, path: &Path) -> Result<&mut Device> {
        let stale = self.device.as_ref().map_or(true, |(open, _)| open != path);
        if stale {
            self.device = None;
            let device = Device::open(path).map_err(|e| {
                RoverError::Controller(format!("Failed to open {} for rumble: {}", path.display(), e))
            })?;
            let has_rumble = device
                .supported_ff()
                .map_or(false, |effects| effects.contains(FFEffectType::FF_RUMBLE));
            if !has_rumble {
                return Err(RoverError::Controller(format!(
                    "{} has no rumble motors",
                    path.display()
                )));
            }
            self.device = Some((path.to_path_buf(), device));
        }

        self.device
            .as_mut()
            .map(|(_, device)| device)
            .ok_or_else(|| RoverError::Controller("rumble device closed".to_string()))
    }
}

impl HapticIndicator for GamepadRumble {
    fn rumble(&mut self, pattern: HapticPattern) -> Result<()> {
        // Replacing the effect erases the previous one
        self.effect = None;

        let Some(path) = self.bound_path() else {
            debug!("Rumble {:?} skipped, no controller bound", pattern);
            self.device = None;
            return Ok(());
        };

        let (data, count) = effect_for(pattern);
        let device = self.device_for(&path)?;
        let mut effect = device
            .upload_ff_effect(data)
            .map_err(|e| RoverError::Controller(format!("Failed to upload rumble effect: {}", e)))?;
        effect
            .play(count)
            .map_err(|e| RoverError::Controller(format!("Failed to play rumble effect: {}", e)))?;

        debug!("Rumble {:?} on {}", pattern, path.display());
        self.effect = Some(effect);
        Ok(())
    }
}
