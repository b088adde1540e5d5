use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{info, warn};

use super::actuation::{ActuationLimits, INTENSITY_CEILING, INTENSITY_FLOOR};
use super::input::InputAction;

pub const DEFAULT_TUNING_STEP: f64 = 10.0;

static LIMITS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_limits_lock_poison_once(operation: &'static str) {
    if LIMITS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "limits lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TuningError {
    #[error("max intensity {value} is outside [0, 100]")]
    OutOfRange { value: f64 },
    #[error("max intensity {value} is below the configured minimum {min}")]
    BelowMinimum { value: f64, min: f64 },
}

/// Shared view of the live actuation limits.
#[derive(Clone, Debug)]
pub struct LimitsHandle {
    limits: Arc<RwLock<ActuationLimits>>,
}

impl LimitsHandle {
    pub fn new(limits: ActuationLimits) -> Self {
        Self {
            limits: Arc::new(RwLock::new(limits)),
        }
    }

    pub fn snapshot(&self) -> ActuationLimits {
        match self.limits.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_limits_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    fn update(&self, apply: impl FnOnce(&mut ActuationLimits)) -> ActuationLimits {
        match self.limits.write() {
            Ok(mut guard) => {
                apply(&mut *guard);
                *guard
            }
            Err(poisoned) => {
                warn_limits_lock_poison_once("write");
                let mut guard = poisoned.into_inner();
                apply(&mut *guard);
                *guard
            }
        }
    }
}

/// Adjusts the upper intensity bound. The only writer of [`LimitsHandle`].
#[derive(Clone, Debug)]
pub struct TuningController {
    limits: LimitsHandle,
    step: f64,
}

impl TuningController {
    pub fn new(limits: LimitsHandle, step: f64) -> Self {
        Self { limits, step }
    }

    pub fn limits(&self) -> &LimitsHandle {
        &self.limits
    }

    /// Steps `max` up or down. The result stays within `[min, 100]`. Actions
    /// other than raise/lower leave the limits untouched.
    pub fn apply(&self, action: InputAction) -> ActuationLimits {
        let delta = match action {
            InputAction::RaiseMax => self.step,
            InputAction::LowerMax => -self.step,
            InputAction::Quit => return self.limits.snapshot(),
        };
        let updated = self.limits.update(|limits| {
            limits.max = (limits.max + delta).clamp(limits.min, INTENSITY_CEILING);
        });
        info!(max = updated.max, min = updated.min, "max_intensity_changed");
        updated
    }

    pub fn set_max(&self, value: f64) -> Result<ActuationLimits, TuningError> {
        if !(INTENSITY_FLOOR..=INTENSITY_CEILING).contains(&value) {
            warn!(value, "max_intensity_rejected");
            return Err(TuningError::OutOfRange { value });
        }
        let current = self.limits.snapshot();
        if value < current.min {
            warn!(value, min = current.min, "max_intensity_rejected");
            return Err(TuningError::BelowMinimum {
                value,
                min: current.min,
            });
        }
        let updated = self.limits.update(|limits| limits.max = value);
        info!(max = updated.max, min = updated.min, "max_intensity_changed");
        Ok(updated)
    }
}
