use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

static HOST_SLOT_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_host_slot_poison_once(operation: &'static str) {
    if HOST_SLOT_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "host slot lock poisoned; recovered inner value");
    }
}

/// Opaque reference to an attached host process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRef {
    pub name: String,
    pub handle: HostHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    F32,
    U32,
}

impl ValueKind {
    pub const fn width(self) -> usize {
        match self {
            ValueKind::F32 | ValueKind::U32 => 4,
        }
    }
}

/// `count` values of `kind`, read at `address + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub address: u64,
    pub offset: u64,
    pub kind: ValueKind,
    pub count: usize,
}

impl ReadRequest {
    pub const fn floats(address: u64, offset: u64, count: usize) -> Self {
        Self {
            address,
            offset,
            kind: ValueKind::F32,
            count,
        }
    }

    pub const fn pointer(address: u64) -> Self {
        Self {
            address,
            offset: 0,
            kind: ValueKind::U32,
            count: 1,
        }
    }

    pub fn effective_address(&self) -> Result<u64, MemoryError> {
        self.address
            .checked_add(self.offset)
            .ok_or(MemoryError::AddressOverflow {
                address: self.address,
                offset: self.offset,
            })
    }

    pub const fn byte_len(&self) -> usize {
        self.kind.width() * self.count
    }
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("process lookup for '{name}' failed: {source}")]
    Lookup {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("read of {len} bytes at {address:#x} failed: {source}")]
    Read {
        address: u64,
        len: usize,
        #[source]
        source: io::Error,
    },
    #[error("address {address:#x} plus offset {offset:#x} overflows")]
    AddressOverflow { address: u64, offset: u64 },
    #[error("memory backend failed: {0}")]
    Backend(String),
}

/// Raw access to another process's memory. Reads return little-endian bytes,
/// exactly `request.byte_len()` of them on success.
#[async_trait]
pub trait MemoryAccess: Send + Sync {
    async fn list_processes(&self, name: &str) -> Result<Vec<ProcessRef>, MemoryError>;

    async fn read(&self, handle: HostHandle, request: ReadRequest) -> Result<Vec<u8>, MemoryError>;
}

/// The cached host handle. Filled on first successful attach and emptied only
/// by [`HostSlot::release`].
#[derive(Debug, Default)]
pub struct HostSlot {
    handle: Mutex<Option<HostHandle>>,
}

impl HostSlot {
    pub fn current(&self) -> Option<HostHandle> {
        match self.handle.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_host_slot_poison_once("current");
                *poisoned.into_inner()
            }
        }
    }

    pub fn attach(&self, handle: HostHandle) {
        match self.handle.lock() {
            Ok(mut guard) => *guard = Some(handle),
            Err(poisoned) => {
                warn_host_slot_poison_once("attach");
                *poisoned.into_inner() = Some(handle);
            }
        }
        info!(handle = handle.0, "host_attached");
    }

    pub fn release(&self) -> Option<HostHandle> {
        let released = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => {
                warn_host_slot_poison_once("release");
                poisoned.into_inner().take()
            }
        };
        if let Some(handle) = released {
            info!(handle = handle.0, "host_released");
        }
        released
    }
}
