//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::arena::SegmentArena;
use crate::fixed::LineDist;
use crate::geometry::{Direction, ITEM_SPACING, Side};
use crate::id::*;
use crate::lane::Lane;
use crate::registry::{BeltRegistry, BeltRegistryBuilder};
use crate::segment::{Segment, TerminationType};

// ===========================================================================
// Distance helper
// ===========================================================================

pub fn dist(v: f64) -> LineDist {
    LineDist::from_f64(v)
}

// ===========================================================================
// Item constructors
// ===========================================================================

pub fn iron_ore() -> ItemTypeId {
    ItemTypeId(0)
}
pub fn copper_ore() -> ItemTypeId {
    ItemTypeId(1)
}
pub fn iron_plate() -> ItemTypeId {
    ItemTypeId(2)
}
pub fn gear() -> ItemTypeId {
    ItemTypeId(3)
}

// ===========================================================================
// Belt registry
// ===========================================================================

/// Belt types of the standard registry.
#[derive(Debug, Clone, Copy)]
pub struct StandardBelts {
    pub basic: BeltTypeId,
    pub fast: BeltTypeId,
    pub express: BeltTypeId,
}

/// Three belt tiers at 0.031, 0.062 and 0.094 tiles per tick.
pub fn standard_registry() -> (BeltRegistry, StandardBelts) {
    let mut b = BeltRegistryBuilder::new();
    let basic = b.register_belt("transport-belt", dist(0.031));
    let fast = b.register_belt("fast-transport-belt", dist(0.062));
    let express = b.register_belt("express-transport-belt", dist(0.094));
    let registry = b.build().expect("standard belts are valid");
    (
        registry,
        StandardBelts {
            basic,
            fast,
            express,
        },
    )
}

/// A registry with a single belt of the given speed.
pub fn single_belt_registry(speed: f64) -> (BeltRegistry, BeltTypeId) {
    let mut b = BeltRegistryBuilder::new();
    let belt = b.register_belt("belt", dist(speed));
    (b.build().expect("belt speed in range"), belt)
}

// ===========================================================================
// Segment constructors
// ===========================================================================

pub fn straight_segment(direction: Direction, belt: BeltTypeId, length: u32) -> Segment {
    Segment::new(direction, belt, length)
}

pub fn bent_segment(
    direction: Direction,
    belt: BeltTypeId,
    length: u32,
    termination: TerminationType,
) -> Segment {
    let mut seg = Segment::new(direction, belt, length);
    seg.termination = termination;
    seg
}

/// Fill `side` of `segment` with `count` items, fully compressed from the
/// head.
pub fn fill_compressed(segment: &mut Segment, side: Side, item: ItemTypeId, count: usize) {
    for i in 0..count {
        let offset = if i == 0 { LineDist::ZERO } else { ITEM_SPACING };
        segment.append_item(side, offset, item);
    }
}

/// A chain of `count` straight segments of `length` tiles, each targeting
/// the next. Returns the handles head of chain last.
pub fn straight_chain(
    arena: &mut SegmentArena,
    belt: BeltTypeId,
    count: usize,
    length: u32,
) -> Vec<SegmentId> {
    let mut ids = Vec::with_capacity(count);
    let mut next: Option<SegmentId> = None;
    for _ in 0..count {
        let mut seg = straight_segment(Direction::North, belt, length);
        seg.set_target(next, 0);
        let id = arena.insert(seg);
        ids.push(id);
        next = Some(id);
    }
    ids.reverse();
    ids
}

// ===========================================================================
// Assertions
// ===========================================================================

pub fn lane_positions(lane: &Lane) -> Vec<LineDist> {
    lane.positions().map(|(p, _)| p).collect()
}

/// Panics if any two adjacent items on `lane` are closer than one spacing,
/// or if the cached back distance disagrees with the gaps.
pub fn assert_lane_consistent(lane: &Lane) {
    for (i, it) in lane.items().iter().enumerate().skip(1) {
        assert!(
            it.gap >= ITEM_SPACING,
            "items {} and {} are {} apart",
            i - 1,
            i,
            it.gap
        );
    }
    let sum: LineDist = lane.items().iter().map(|it| it.gap).sum();
    assert_eq!(lane.back_distance(), sum, "back distance out of sync");
}

pub fn assert_arena_consistent(arena: &SegmentArena) {
    for (id, seg) in arena.iter() {
        assert!(seg.length >= 1, "segment {id:?} has zero length");
        assert_ne!(seg.target, Some(id), "segment {id:?} targets itself");
        assert_lane_consistent(&seg.left);
        assert_lane_consistent(&seg.right);
    }
}
