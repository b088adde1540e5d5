use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use tracing::warn;

use crate::math::Vec3;

use super::memory::{HostHandle, MemoryAccess, MemoryError, ReadRequest, ValueKind};
use super::state::Orientation;

#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    F32(Vec<f32>),
    U32(Vec<u32>),
}

#[derive(Debug, Error)]
enum SampleError {
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error("read timed out after {0:?}")]
    Timeout(Duration),
    #[error("expected {expected} bytes, got {actual}")]
    ShortBuffer { expected: usize, actual: usize },
    #[error("value {index} is not finite")]
    NonFinite { index: usize },
}

/// Wraps a [`MemoryAccess`] so that every failure turns into `None` and a
/// warning. Each read is bounded by `read_timeout`.
#[derive(Clone)]
pub struct ResilientSampler {
    memory: Arc<dyn MemoryAccess>,
    read_timeout: Duration,
}

impl ResilientSampler {
    pub fn new(memory: Arc<dyn MemoryAccess>, read_timeout: Duration) -> Self {
        Self {
            memory,
            read_timeout,
        }
    }

    pub fn memory(&self) -> &Arc<dyn MemoryAccess> {
        &self.memory
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub async fn read(&self, handle: HostHandle, request: ReadRequest) -> Option<Sample> {
        match self.try_read(handle, request).await {
            Ok(sample) => Some(sample),
            Err(error) => {
                warn!(
                    address = request.address,
                    offset = request.offset,
                    kind = ?request.kind,
                    error = %error,
                    "read_failed"
                );
                None
            }
        }
    }

    pub async fn read_orientation(&self, handle: HostHandle, address: u64) -> Option<Orientation> {
        match self.read(handle, ReadRequest::floats(address, 0, 2)).await? {
            Sample::F32(values) => Some(Orientation {
                pitch: f64::from(values[0]),
                yaw: f64::from(values[1]),
            }),
            Sample::U32(_) => None,
        }
    }

    pub async fn read_position(&self, handle: HostHandle, base: u64, offset: u64) -> Option<Vec3> {
        match self.read(handle, ReadRequest::floats(base, offset, 3)).await? {
            Sample::F32(values) => Some(Vec3::new(
                f64::from(values[0]),
                f64::from(values[1]),
                f64::from(values[2]),
            )),
            Sample::U32(_) => None,
        }
    }

    pub async fn read_pointer(&self, handle: HostHandle, address: u64) -> Option<u64> {
        match self.read(handle, ReadRequest::pointer(address)).await? {
            Sample::U32(values) => Some(u64::from(values[0])),
            Sample::F32(_) => None,
        }
    }

    async fn try_read(&self, handle: HostHandle, request: ReadRequest) -> Result<Sample, SampleError> {
        request.effective_address()?;
        let bytes = timeout(self.read_timeout, self.memory.read(handle, request))
            .await
            .map_err(|_| SampleError::Timeout(self.read_timeout))??;
        decode_sample(&bytes, request)
    }
}

fn decode_sample(bytes: &[u8], request: ReadRequest) -> Result<Sample, SampleError> {
    let expected = request.byte_len();
    if bytes.len() < expected {
        return Err(SampleError::ShortBuffer {
            expected,
            actual: bytes.len(),
        });
    }

    let words = bytes[..expected]
        .chunks_exact(request.kind.width())
        .map(|chunk| [chunk[0], chunk[1], chunk[2], chunk[3]]);
    match request.kind {
        ValueKind::F32 => {
            let values = words.map(f32::from_le_bytes).collect::<Vec<_>>();
            if let Some(index) = values.iter().position(|value| !value.is_finite()) {
                return Err(SampleError::NonFinite { index });
            }
            Ok(Sample::F32(values))
        }
        ValueKind::U32 => Ok(Sample::U32(words.map(u32::from_le_bytes).collect())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeMemory;

    fn build_sampler(memory: FakeMemory) -> ResilientSampler {
        ResilientSampler::new(Arc::new(memory), Duration::from_millis(50))
    }

    #[tokio::test]
    async fn reads_orientation_pair() {
        let sampler = build_sampler(FakeMemory::default().with_floats(0x10, &[12.5, -45.0]));
        let orientation = sampler
            .read_orientation(HostHandle(1), 0x10)
            .await
            .expect("orientation");
        assert_eq!(orientation, Orientation { pitch: 12.5, yaw: -45.0 });
    }

    #[tokio::test]
    async fn reads_position_at_base_plus_offset() {
        let sampler =
            build_sampler(FakeMemory::default().with_floats(0x1100, &[1.0, 2.0, 3.0]));
        let position = sampler
            .read_position(HostHandle(1), 0x1000, 0x100)
            .await
            .expect("position");
        assert_eq!(position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[tokio::test]
    async fn reads_pointer_as_u32() {
        let sampler = build_sampler(FakeMemory::default().with_u32(0x20, 0xDEAD_BEEF));
        assert_eq!(
            sampler.read_pointer(HostHandle(1), 0x20).await,
            Some(0xDEAD_BEEF)
        );
    }

    #[tokio::test]
    async fn backend_failure_becomes_none() {
        let sampler = build_sampler(FakeMemory::default());
        assert_eq!(sampler.read_orientation(HostHandle(1), 0x10).await, None);
        assert_eq!(sampler.read_pointer(HostHandle(1), 0x10).await, None);
    }

    #[tokio::test]
    async fn short_buffer_becomes_none() {
        let sampler = build_sampler(FakeMemory::default().with_floats(0x10, &[1.0]));
        assert_eq!(sampler.read_orientation(HostHandle(1), 0x10).await, None);
    }

    #[tokio::test]
    async fn non_finite_floats_are_rejected() {
        let nan_pitch = build_sampler(FakeMemory::default().with_floats(0x10, &[f32::NAN, 3.0]));
        assert_eq!(nan_pitch.read_orientation(HostHandle(1), 0x10).await, None);

        let infinite_z =
            build_sampler(FakeMemory::default().with_floats(0x10, &[1.0, 2.0, f32::INFINITY]));
        assert_eq!(infinite_z.read_position(HostHandle(1), 0x10, 0).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_read_times_out() {
        let memory = FakeMemory::default()
            .with_u32(0x10, 5)
            .with_stall(Duration::from_secs(3600));
        let sampler = build_sampler(memory);
        assert_eq!(sampler.read_pointer(HostHandle(1), 0x10).await, None);
    }

    #[tokio::test]
    async fn overflowing_address_becomes_none() {
        let sampler = build_sampler(FakeMemory::default());
        assert_eq!(
            sampler.read_position(HostHandle(1), u64::MAX, 0x10).await,
            None
        );
    }
}
