use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const VIBRATE_ACTION: &str = "Vibrate";
pub const INTENSITY_FLOOR: f64 = 0.0;
pub const INTENSITY_CEILING: f64 = 100.0;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("actuator at {address} is unreachable: {source}")]
    Unreachable {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("actuator link is not connected")]
    NotConnected,
    #[error("actuator link i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("actuator rejected command: {0}")]
    Rejected(String),
}

/// Remote device transport. Commands are fire-and-forget: implementations
/// send and return without waiting for an acknowledgement.
#[async_trait]
pub trait ActuatorLink: Send + Sync {
    async fn connect(&self, address: &str) -> Result<(), ActuatorError>;

    async fn command(&self, device: &str, action: &str, intensity: f64) -> Result<(), ActuatorError>;

    async fn disconnect(&self) -> Result<(), ActuatorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuationLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for ActuationLimits {
    fn default() -> Self {
        Self {
            min: 10.0,
            max: 50.0,
        }
    }
}

impl ActuationLimits {
    pub fn is_valid(&self) -> bool {
        let in_range = |value: f64| (INTENSITY_FLOOR..=INTENSITY_CEILING).contains(&value);
        in_range(self.min) && in_range(self.max) && self.min <= self.max
    }
}

/// `max * (1 - offset / fov)`, clamped into `[limits.min, limits.max]`.
pub fn intensity_for(angular_offset: f64, fov_degrees: f64, limits: ActuationLimits) -> f64 {
    let normalized = angular_offset / fov_degrees;
    let raw = limits.max * (1.0 - normalized);
    limits.min.max(limits.max.min(raw))
}

pub struct ActuationMapper {
    link: Option<Arc<dyn ActuatorLink>>,
    device: String,
    fov_degrees: f64,
}

impl ActuationMapper {
    pub fn new(link: Option<Arc<dyn ActuatorLink>>, device: impl Into<String>, fov_degrees: f64) -> Self {
        Self {
            link,
            device: device.into(),
            fov_degrees,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }

    /// Issues one intensity command for the given offset. Returns the issued
    /// intensity, or `None` when there is no link.
    pub async fn actuate(&self, angular_offset: f64, limits: ActuationLimits) -> Option<f64> {
        let link = self.link.as_ref()?;
        let intensity = intensity_for(angular_offset, self.fov_degrees, limits);
        match link.command(&self.device, VIBRATE_ACTION, intensity).await {
            Ok(()) => debug!(device = %self.device, angular_offset, intensity, "actuator_command"),
            Err(error) => warn!(
                device = %self.device,
                intensity,
                error = %error,
                "actuator_command_failed"
            ),
        }
        Some(intensity)
    }

    pub async fn disconnect(&self) {
        let Some(link) = self.link.as_ref() else {
            return;
        };
        match link.disconnect().await {
            Ok(()) => info!(device = %self.device, "actuator_disconnected"),
            Err(error) => warn!(device = %self.device, error = %error, "actuator_disconnect_failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeActuator, LinkEvent};

    const LIMITS: ActuationLimits = ActuationLimits {
        min: 10.0,
        max: 50.0,
    };

    #[test]
    fn zero_offset_drives_maximum() {
        assert_eq!(intensity_for(0.0, 30.0, LIMITS), 50.0);
    }

    #[test]
    fn offset_at_fov_edge_drives_minimum() {
        assert_eq!(intensity_for(30.0, 30.0, LIMITS), 10.0);
    }

    #[test]
    fn intermediate_offset_scales_linearly() {
        let intensity = intensity_for(10.0, 30.0, LIMITS);
        assert!((intensity - 100.0 / 3.0).abs() < 1e-9, "intensity {intensity}");
    }

    #[test]
    fn intensity_is_bounded_and_non_increasing() {
        let mut previous = f64::INFINITY;
        for step in 0..=300 {
            let offset = f64::from(step) * 0.1;
            let intensity = intensity_for(offset, 30.0, LIMITS);
            assert!((LIMITS.min..=LIMITS.max).contains(&intensity));
            assert!(intensity <= previous, "rose at offset {offset}");
            previous = intensity;
        }
    }

    #[test]
    fn default_limits_are_valid() {
        assert!(ActuationLimits::default().is_valid());
        assert!(!ActuationLimits { min: 60.0, max: 50.0 }.is_valid());
        assert!(!ActuationLimits { min: -1.0, max: 50.0 }.is_valid());
        assert!(!ActuationLimits { min: 0.0, max: 101.0 }.is_valid());
    }

    #[tokio::test]
    async fn unlinked_mapper_is_silent_no_op() {
        let mapper = ActuationMapper::new(None, "toy", 30.0);
        assert!(!mapper.is_linked());
        assert_eq!(mapper.actuate(0.0, LIMITS).await, None);
        mapper.disconnect().await;
    }

    #[tokio::test]
    async fn linked_mapper_sends_vibrate_command() {
        let link = Arc::new(FakeActuator::default());
        let mapper = ActuationMapper::new(Some(link.clone()), "toy", 30.0);

        let issued = mapper.actuate(15.0, LIMITS).await;

        assert_eq!(issued, Some(25.0));
        assert_eq!(
            link.events(),
            vec![LinkEvent::Command {
                device: "toy".to_string(),
                action: VIBRATE_ACTION.to_string(),
                intensity: 25.0,
            }]
        );
    }

    #[tokio::test]
    async fn command_failure_is_swallowed_without_retry() {
        let link = Arc::new(FakeActuator::rejecting_commands());
        let mapper = ActuationMapper::new(Some(link.clone()), "toy", 30.0);

        assert_eq!(mapper.actuate(0.0, LIMITS).await, Some(50.0));
        assert!(link.events().is_empty());
    }

    #[tokio::test]
    async fn disconnect_reaches_link() {
        let link = Arc::new(FakeActuator::default());
        let mapper = ActuationMapper::new(Some(link.clone()), "toy", 30.0);
        mapper.disconnect().await;
        assert_eq!(link.events(), vec![LinkEvent::Disconnect]);
    }
}
