//! Simulation bookkeeping: the tick counter and a deterministic state hash.

use crate::arena::SegmentArena;
use crate::fixed::{LineDist, Ticks};
use crate::lane::Lane;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Mutable simulation state tracked alongside the segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimState {
    /// Current tick counter. Incremented by 1 for each tick.
    pub tick: Ticks,
}

impl SimState {
    /// Create a new simulation state starting at tick 0.
    pub fn new() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for desync detection.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Start a new hash.
    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    /// Feed a u64 into the hash.
    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    /// Feed a u32 into the hash.
    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write(&v.to_le_bytes());
    }

    /// Feed a distance into the hash.
    pub fn write_dist(&mut self, v: LineDist) {
        self.write(&v.to_thousandths().to_le_bytes());
    }

    /// Finalize and return the hash value.
    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

fn hash_lane(hash: &mut StateHash, lane: &Lane) {
    hash.write_u64(lane.len() as u64);
    hash.write_u64(lane.active_index() as u64);
    hash.write_dist(lane.back_distance());
    for it in lane.items() {
        hash.write_dist(it.gap);
        hash.write_u32(it.item.0);
    }
}

/// Hash every segment's shape and lane contents in arena order.
///
/// Segment handles are not hashed, only what they hold, so two worlds built
/// by the same sequence of edits hash equal.
pub fn hash_segments(arena: &SegmentArena) -> u64 {
    let mut hash = StateHash::new();
    hash.write_u64(arena.len() as u64);
    for (_, segment) in arena.iter() {
        hash.write_u32(segment.length);
        hash.write_u32(segment.belt.0);
        hash.write_u32(segment.direction as u32);
        hash.write_u32(segment.termination as u32);
        hash.write_i32(segment.head_adjustment);
        hash.write_i32(segment.target_insert_offset);
        hash.write(&[segment.target.is_some() as u8]);
        hash_lane(&mut hash, &segment.left);
        hash_lane(&mut hash, &segment.right);
    }
    hash.finish()
}
