mod memory;
mod sampler;
mod scanner;
mod state;

pub use memory::{
    HostHandle, HostSlot, MemoryAccess, MemoryError, ProcessRef, ReadRequest, ValueKind,
};
pub use sampler::{ResilientSampler, Sample};
pub use scanner::{
    rank_candidates, EntityCandidate, EntityScanner, ScanConfig, DEFAULT_ENTITY_SLOTS,
    DEFAULT_FOV_DEGREES, DEFAULT_SLOT_STRIDE,
};
pub use state::{
    clamp_pitch, wrap_yaw, Orientation, PlayerState, StateStore, PITCH_LIMIT_DEGREES,
};
