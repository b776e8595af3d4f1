//! A run of same-direction conveyor tiles sharing a left and a right lane.
//!
//! Tiles are numbered from the head: index 0 is the tile items leave from.
//! Lane coordinates start at the head too, but a bent head shortens each
//! lane by a fixed amount, so tile `i` begins at lane position
//! `i - head_deduction(side)`.
//!
//! # Absolute addressing
//!
//! `head_adjustment` counts how many tiles the head has moved forward since
//! the segment was created. Callers that keep offsets across edits (tile
//! bookkeeping, inserters) store `offset - head_adjustment` and go through
//! the `_abs` methods, which add it back. When the head grows by one tile
//! both the adjustment and every lane item shift by one, so an absolute
//! offset keeps naming the same item.

use crate::fixed::LineDist;
use crate::geometry::{
    BEND_LEFT_L_REDUCTION, BEND_LEFT_R_REDUCTION, BEND_RIGHT_L_REDUCTION, BEND_RIGHT_R_REDUCTION,
    Direction, Side, TARGET_SIDE_ONLY_REDUCTION,
};
use crate::id::{BeltTypeId, ItemTypeId, SegmentId};
use crate::lane::{Lane, LaneItem};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Termination
// ---------------------------------------------------------------------------

/// How the head of a segment hands items to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TerminationType {
    /// Passes straight into the target's tail, or drops off the end.
    Straight,
    /// Turns left into the target; the corner tile belongs to the target.
    BendLeft,
    /// Turns right into the target.
    BendRight,
    /// Side-loads onto the target's left lane only.
    LeftOnly,
    /// Side-loads onto the target's right lane only.
    RightOnly,
}

impl TerminationType {
    pub fn is_bend(self) -> bool {
        matches!(self, TerminationType::BendLeft | TerminationType::BendRight)
    }

    pub fn is_side_only(self) -> bool {
        matches!(self, TerminationType::LeftOnly | TerminationType::RightOnly)
    }

    /// Side-loading lanes insert mid-lane, where a gap can open at any time,
    /// so they are retried every tick instead of stalling.
    pub fn can_stall(self) -> bool {
        !self.is_side_only()
    }
}

/// Distance the source termination removes from `side` of the source lane.
fn source_deduction(side: Side, termination: TerminationType) -> LineDist {
    use TerminationType::*;
    match (side, termination) {
        (_, Straight) => LineDist::ZERO,
        (Side::Left, BendLeft | LeftOnly) => BEND_LEFT_L_REDUCTION,
        (Side::Left, BendRight | RightOnly) => BEND_RIGHT_L_REDUCTION,
        (Side::Right, BendLeft | LeftOnly) => BEND_LEFT_R_REDUCTION,
        (Side::Right, BendRight | RightOnly) => BEND_RIGHT_R_REDUCTION,
    }
}

/// Distance a segment's own head termination removes from `side`.
fn target_deduction(side: Side, termination: TerminationType) -> LineDist {
    use TerminationType::*;
    match (side, termination) {
        (_, Straight) => LineDist::ZERO,
        (Side::Left, BendLeft) => BEND_LEFT_L_REDUCTION,
        (Side::Left, BendRight) => BEND_RIGHT_L_REDUCTION,
        (Side::Right, BendLeft) => BEND_LEFT_R_REDUCTION,
        (Side::Right, BendRight) => BEND_RIGHT_R_REDUCTION,
        (_, LeftOnly | RightOnly) => TARGET_SIDE_ONLY_REDUCTION,
    }
}

/// Total distance to subtract from a landing offset when an item leaves
/// `side` of a segment terminating with `source` and lands on a segment
/// terminating with `target`.
///
/// A side-loading source feeds one target lane from both of its lanes, so
/// the target lane's deduction is used for both.
pub fn termination_deduction(
    side: Side,
    source: TerminationType,
    target: TerminationType,
) -> LineDist {
    let landing_side = match source {
        TerminationType::LeftOnly => Side::Left,
        TerminationType::RightOnly => Side::Right,
        _ => side,
    };
    source_deduction(side, source) + target_deduction(landing_side, target)
}

/// Subtract [`termination_deduction`] from `offset` in place.
pub fn apply_termination_deduction(
    side: Side,
    source: TerminationType,
    target: TerminationType,
    offset: &mut LineDist,
) {
    *offset -= termination_deduction(side, source, target);
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub direction: Direction,
    pub termination: TerminationType,
    pub belt: BeltTypeId,
    /// Length in tiles, including a bent head's corner tile.
    pub length: u32,
    pub left: Lane,
    pub right: Lane,
    pub target: Option<SegmentId>,
    /// Where a side-loading head lands on the target, in the target's
    /// absolute addressing.
    pub target_insert_offset: i32,
    pub head_adjustment: i32,
}

impl Segment {
    pub fn new(direction: Direction, belt: BeltTypeId, length: u32) -> Self {
        debug_assert!(length >= 1, "segment length must be at least one tile");
        Self {
            direction,
            termination: TerminationType::Straight,
            belt,
            length,
            left: Lane::new(),
            right: Lane::new(),
            target: None,
            target_insert_offset: 0,
            head_adjustment: 0,
        }
    }

    pub fn side(&self, side: Side) -> &Lane {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut Lane {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub fn get_side(&self, is_left: bool) -> &Lane {
        self.side(Side::from_left(is_left))
    }

    pub fn length_dist(&self) -> LineDist {
        LineDist::from_tiles(i64::from(self.length))
    }

    pub fn item_count(&self) -> usize {
        self.left.len() + self.right.len()
    }

    pub fn is_active(&self) -> bool {
        self.left.is_active() || self.right.is_active()
    }

    pub fn set_target(&mut self, target: Option<SegmentId>, insert_offset: i32) {
        self.target = target;
        self.target_insert_offset = insert_offset;
    }

    /// How far this segment's own head termination shortens `side`.
    pub fn head_deduction(&self, side: Side) -> LineDist {
        target_deduction(side, self.termination)
    }

    // -----------------------------------------------------------------------
    // Lane delegation
    // -----------------------------------------------------------------------

    pub fn can_insert(&self, side: Side, offset: LineDist, item_offset: i32) -> bool {
        self.side(side).can_insert(offset, item_offset)
    }

    pub fn append_item(&mut self, side: Side, offset: LineDist, item: ItemTypeId) {
        self.side_mut(side).append_item(offset, item);
    }

    pub fn insert_item(&mut self, side: Side, offset: LineDist, item: ItemTypeId, item_offset: i32) {
        self.side_mut(side).insert_item(offset, item, item_offset);
    }

    pub fn try_insert_item(
        &mut self,
        side: Side,
        offset: LineDist,
        item: ItemTypeId,
        item_offset: i32,
    ) -> bool {
        self.side_mut(side).try_insert_item(offset, item, item_offset)
    }

    pub fn get_item(&self, side: Side, offset: LineDist, epsilon: LineDist) -> Option<(usize, LaneItem)> {
        self.side(side).get_item(offset, epsilon)
    }

    pub fn try_pop_item(&mut self, side: Side, offset: LineDist, epsilon: LineDist) -> Option<ItemTypeId> {
        self.side_mut(side).try_pop_item(offset, epsilon)
    }

    // -----------------------------------------------------------------------
    // Absolute addressing
    // -----------------------------------------------------------------------

    fn head_adjustment_dist(&self) -> LineDist {
        LineDist::from_tiles(i64::from(self.head_adjustment))
    }

    /// Convert a lane offset into a stable absolute one.
    pub fn offset_abs(&self, offset: LineDist) -> LineDist {
        offset - self.head_adjustment_dist()
    }

    pub fn can_insert_abs(&self, side: Side, offset: LineDist) -> bool {
        self.can_insert(side, offset, self.head_adjustment)
    }

    pub fn insert_item_abs(&mut self, side: Side, offset: LineDist, item: ItemTypeId) {
        let adjust = self.head_adjustment;
        self.insert_item(side, offset, item, adjust);
    }

    pub fn try_insert_item_abs(&mut self, side: Side, offset: LineDist, item: ItemTypeId) -> bool {
        let adjust = self.head_adjustment;
        self.try_insert_item(side, offset, item, adjust)
    }

    pub fn get_item_abs(&self, side: Side, offset: LineDist, epsilon: LineDist) -> Option<(usize, LaneItem)> {
        self.get_item(side, offset + self.head_adjustment_dist(), epsilon)
    }

    pub fn try_pop_item_abs(&mut self, side: Side, offset: LineDist, epsilon: LineDist) -> Option<ItemTypeId> {
        let offset = offset + self.head_adjustment_dist();
        self.try_pop_item(side, offset, epsilon)
    }

    // -----------------------------------------------------------------------
    // Resizing
    // -----------------------------------------------------------------------

    /// Grow by one tile at the head. Lane items are not moved; callers
    /// re-base them with [`Segment::rebase_lanes`].
    pub fn lengthen_front(&mut self) {
        self.length += 1;
        self.head_adjustment += 1;
    }

    /// Shrink by one tile at the head.
    pub fn shorten_front(&mut self) {
        debug_assert!(self.length > 1, "cannot shorten a one-tile segment");
        self.length -= 1;
        self.head_adjustment -= 1;
    }

    /// Shift both lanes by `delta`, returning items pushed past the head.
    pub fn rebase_lanes(&mut self, delta: LineDist) -> Vec<ItemTypeId> {
        let mut spilled = self.left.rebase(delta);
        spilled.extend(self.right.rebase(delta));
        spilled
    }

    pub fn reactivate(&mut self) {
        self.left.reactivate();
        self.right.reactivate();
    }
}
