use crate::math::{angular_offset, planar_distance, Vec3};

use super::memory::HostHandle;
use super::sampler::ResilientSampler;
use super::state::PlayerState;

pub const DEFAULT_FOV_DEGREES: f64 = 30.0;
pub const DEFAULT_ENTITY_SLOTS: usize = 64;
pub const DEFAULT_SLOT_STRIDE: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityCandidate {
    pub slot: usize,
    pub position: Vec3,
    pub angular_offset: f64,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanConfig {
    pub fov_degrees: f64,
    pub entity_slots: usize,
    pub slot_stride: u64,
    pub position_offset: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            fov_degrees: DEFAULT_FOV_DEGREES,
            entity_slots: DEFAULT_ENTITY_SLOTS,
            slot_stride: DEFAULT_SLOT_STRIDE,
            position_offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EntityScanner {
    config: ScanConfig,
}

impl EntityScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Walks the entity table at `table_base` and returns the entities inside
    /// the field of view, ranked by angular offset.
    pub async fn scan(
        &self,
        sampler: &ResilientSampler,
        handle: HostHandle,
        table_base: u64,
        player: &PlayerState,
    ) -> Vec<EntityCandidate> {
        let mut candidates = Vec::new();
        for slot in 0..self.config.entity_slots {
            let Some(slot_address) = self.slot_address(table_base, slot) else {
                continue;
            };
            let entity_base = match sampler.read_pointer(handle, slot_address).await {
                Some(0) | None => continue,
                Some(address) => address,
            };
            let Some(position) = sampler
                .read_position(handle, entity_base, self.config.position_offset)
                .await
            else {
                continue;
            };
            if let Some(candidate) = self.evaluate(slot, position, player) {
                candidates.push(candidate);
            }
        }
        rank_candidates(&mut candidates);
        candidates
    }

    /// `None` when the entity lies outside the field of view.
    pub fn evaluate(
        &self,
        slot: usize,
        position: Vec3,
        player: &PlayerState,
    ) -> Option<EntityCandidate> {
        let from = player.position.planar();
        let to = position.planar();
        let offset = angular_offset(from, to, player.orientation.yaw);
        if offset > self.config.fov_degrees {
            return None;
        }
        Some(EntityCandidate {
            slot,
            position,
            angular_offset: offset,
            distance: planar_distance(from, to),
        })
    }

    fn slot_address(&self, table_base: u64, slot: usize) -> Option<u64> {
        (slot as u64)
            .checked_mul(self.config.slot_stride)
            .and_then(|offset| table_base.checked_add(offset))
    }
}

/// Stable ascending sort by angular offset; equal offsets keep scan order.
pub fn rank_candidates(candidates: &mut [EntityCandidate]) {
    candidates.sort_by(|a, b| a.angular_offset.total_cmp(&b.angular_offset));
}
