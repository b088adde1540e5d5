//! In-memory collaborators shared by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::app::{ActuatorError, ActuatorLink, OverlayRenderer, SurfaceId};
use crate::telemetry::{HostHandle, MemoryAccess, MemoryError, ProcessRef, ReadRequest};

#[derive(Debug, Default)]
pub(crate) struct FakeMemory {
    regions: Mutex<HashMap<u64, Vec<u8>>>,
    processes: Vec<ProcessRef>,
    stall: Option<Duration>,
    lookup_stall: Option<Duration>,
    reads: Mutex<Vec<u64>>,
}

impl FakeMemory {
    pub(crate) fn with_process(mut self, name: &str, handle: u64) -> Self {
        self.processes.push(ProcessRef {
            name: name.to_string(),
            handle: HostHandle(handle),
        });
        self
    }

    pub(crate) fn with_floats(mut self, address: u64, values: &[f32]) -> Self {
        let bytes = values.iter().flat_map(|value| value.to_le_bytes()).collect();
        self.regions_mut().insert(address, bytes);
        self
    }

    pub(crate) fn with_u32(mut self, address: u64, value: u32) -> Self {
        self.regions_mut().insert(address, value.to_le_bytes().to_vec());
        self
    }

    pub(crate) fn with_stall(mut self, stall: Duration) -> Self {
        self.stall = Some(stall);
        self
    }

    pub(crate) fn with_lookup_stall(mut self, stall: Duration) -> Self {
        self.lookup_stall = Some(stall);
        self
    }

    /// Makes later reads at `address` fail.
    pub(crate) fn forget(&self, address: u64) {
        self.regions.lock().expect("regions lock").remove(&address);
    }

    fn regions_mut(&mut self) -> &mut HashMap<u64, Vec<u8>> {
        self.regions.get_mut().expect("regions lock")
    }

    pub(crate) fn read_addresses(&self) -> Vec<u64> {
        self.reads.lock().expect("reads lock").clone()
    }
}

#[async_trait]
impl MemoryAccess for FakeMemory {
    async fn list_processes(&self, name: &str) -> Result<Vec<ProcessRef>, MemoryError> {
        if let Some(stall) = self.lookup_stall {
            tokio::time::sleep(stall).await;
        }
        Ok(self
            .processes
            .iter()
            .filter(|process| process.name == name)
            .cloned()
            .collect())
    }

    async fn read(&self, _handle: HostHandle, request: ReadRequest) -> Result<Vec<u8>, MemoryError> {
        if let Some(stall) = self.stall {
            tokio::time::sleep(stall).await;
        }
        let address = request.effective_address()?;
        self.reads.lock().expect("reads lock").push(address);
        self.regions
            .lock()
            .expect("regions lock")
            .get(&address)
            .cloned()
            .ok_or_else(|| MemoryError::Read {
                address,
                len: request.byte_len(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LinkEvent {
    Connect(String),
    Command {
        device: String,
        action: String,
        intensity: f64,
    },
    Disconnect,
}

#[derive(Debug, Default)]
pub(crate) struct FakeActuator {
    events: Mutex<Vec<LinkEvent>>,
    unreachable: bool,
    reject_commands: bool,
}

impl FakeActuator {
    pub(crate) fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub(crate) fn rejecting_commands() -> Self {
        Self {
            reject_commands: true,
            ..Self::default()
        }
    }

    pub(crate) fn events(&self) -> Vec<LinkEvent> {
        self.events.lock().expect("events lock").clone()
    }

    pub(crate) fn intensities(&self) -> Vec<f64> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LinkEvent::Command { intensity, .. } => Some(intensity),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: LinkEvent) {
        self.events.lock().expect("events lock").push(event);
    }
}

#[async_trait]
impl ActuatorLink for FakeActuator {
    async fn connect(&self, address: &str) -> Result<(), ActuatorError> {
        if self.unreachable {
            return Err(ActuatorError::Unreachable {
                address: address.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }
        self.record(LinkEvent::Connect(address.to_string()));
        Ok(())
    }

    async fn command(&self, device: &str, action: &str, intensity: f64) -> Result<(), ActuatorError> {
        if self.reject_commands {
            return Err(ActuatorError::Rejected(format!("{device} refused {action}")));
        }
        self.record(LinkEvent::Command {
            device: device.to_string(),
            action: action.to_string(),
            intensity,
        });
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ActuatorError> {
        self.record(LinkEvent::Disconnect);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingOverlay {
    pub(crate) surface_title: Option<String>,
    pub(crate) boxes: Arc<Mutex<Vec<(f64, f64, f64)>>>,
}

impl RecordingOverlay {
    pub(crate) fn with_surface(title: &str) -> Self {
        Self {
            surface_title: Some(title.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn drawn(&self) -> Vec<(f64, f64, f64)> {
        self.boxes.lock().expect("boxes lock").clone()
    }
}

impl OverlayRenderer for RecordingOverlay {
    fn find_surface(&mut self, title: &str) -> Option<SurfaceId> {
        (self.surface_title.as_deref() == Some(title)).then_some(SurfaceId(1))
    }

    fn draw_box(&mut self, _surface: SurfaceId, center_x: f64, center_y: f64, half_size: f64) {
        self.boxes
            .lock()
            .expect("boxes lock")
            .push((center_x, center_y, half_size));
    }
}
