//! Per-tick conveyor update.
//!
//! A tick runs two strictly ordered phases over every segment:
//!
//! 1. **Movement**: each lane's active item (and, implicitly, everything
//!    behind it) advances by the belt speed.
//! 2. **Transition**: items that reached the head are handed to the target
//!    segment, and items that caught up with the one ahead are compressed
//!    so the next free item becomes the mover.
//!
//! Every segment finishes movement before any transition runs, so an item
//! handed off this tick never moves twice.

use crate::arena::SegmentArena;
use crate::fixed::LineDist;
use crate::geometry::{ITEM_SPACING, Side};
use crate::id::{ItemTypeId, SegmentId};
use crate::lane::Lane;
use crate::registry::BeltRegistry;
use crate::segment::{Segment, TerminationType, termination_deduction};

/// Everything a tick reads besides the segments themselves.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub registry: &'a BeltRegistry,
}

/// Counters for a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Lanes whose active item moved in phase 1.
    pub lanes_moved: u32,
    /// Items handed from one segment to another.
    pub transfers: u32,
    /// Hand-offs refused by a full target.
    pub blocked: u32,
    /// Lanes that stalled this tick.
    pub stalled: u32,
    /// Stalled lanes woken because their target made room.
    pub reactivated: u32,
}

/// Advance every segment in `arena` by one tick.
pub fn tick_update(arena: &mut SegmentArena, ctx: &TickContext<'_>) -> TickStats {
    let ids = arena.ids();
    let mut stats = TickStats::default();

    // Phase 1: movement.
    for &id in &ids {
        let Some(speed) = segment_speed(arena, id, ctx) else {
            continue;
        };
        if let Some(segment) = arena.get_mut(id) {
            for side in Side::BOTH {
                if move_lane(segment.side_mut(side), speed) {
                    stats.lanes_moved += 1;
                }
            }
        }
    }

    // Phase 2: transition.
    for &id in &ids {
        let Some(speed) = segment_speed(arena, id, ctx) else {
            continue;
        };
        for side in Side::BOTH {
            transition_lane(arena, id, side, speed, &mut stats);
        }
    }

    log::trace!(
        "tick: {} lanes moved, {} transfers, {} blocked, {} stalled",
        stats.lanes_moved,
        stats.transfers,
        stats.blocked,
        stats.stalled
    );
    stats
}

fn segment_speed(arena: &SegmentArena, id: SegmentId, ctx: &TickContext<'_>) -> Option<LineDist> {
    let segment = arena.get(id)?;
    let speed = ctx.registry.speed(segment.belt);
    if speed.is_none() {
        log::warn!("segment {id:?} uses unregistered belt {:?}", segment.belt);
    }
    speed
}

// ---------------------------------------------------------------------------
// Phase 1
// ---------------------------------------------------------------------------

fn move_lane(lane: &mut Lane, speed: LineDist) -> bool {
    if !lane.is_active() {
        return false;
    }
    let active = lane.active;
    lane.items[active].gap -= speed;
    lane.back_distance -= speed;
    true
}

// ---------------------------------------------------------------------------
// Phase 2
// ---------------------------------------------------------------------------

/// Where an item leaving a segment's head lands on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Landing {
    side: Side,
    offset: LineDist,
}

/// Landing point on `target` for an item that left `side` of `source`
/// having travelled `overshoot` past the head.
fn landing(source: &Segment, side: Side, target: &Segment, overshoot: LineDist) -> Landing {
    let (landing_side, base) = match source.termination {
        TerminationType::LeftOnly | TerminationType::RightOnly => {
            let fed = Side::from_left(source.termination == TerminationType::LeftOnly);
            let insert_at = 1 + source.target_insert_offset + target.head_adjustment;
            (fed, LineDist::from_tiles(i64::from(insert_at)))
        }
        _ => (side, target.length_dist()),
    };
    let offset = base - overshoot - termination_deduction(side, source.termination, target.termination);
    Landing {
        side: landing_side,
        offset: offset.max(LineDist::ZERO),
    }
}

fn transition_lane(
    arena: &mut SegmentArena,
    id: SegmentId,
    side: Side,
    speed: LineDist,
    stats: &mut TickStats,
) {
    let Some(segment) = arena.get(id) else {
        return;
    };
    let target = segment.target;
    debug_assert!(target != Some(id), "segment {id:?} targets itself");
    let lane = segment.side(side);

    if lane.is_stalled() {
        if let Some(target_id) = target {
            probe_stalled(arena, id, target_id, side, speed, stats);
        }
        return;
    }
    if !lane.is_active() {
        return;
    }

    let index = lane.active;
    let gap = lane.items[index].gap;

    if index > 0 {
        if gap > ITEM_SPACING {
            return;
        }
        let Some(lane) = arena.get_mut(id).map(|seg| seg.side_mut(side)) else {
            return;
        };
        compress(lane, index, ITEM_SPACING - gap);
        let next = advance_next_item(lane, index + 1, speed);
        lane.active = next.unwrap_or(0);
        return;
    }

    if gap > LineDist::ZERO {
        return;
    }
    let overshoot = -gap;
    let item = lane.items[0].item;

    if let Some(target_id) = target {
        if try_hand_off(arena, id, target_id, side, item, overshoot) {
            if let Some(lane) = arena.get_mut(id).map(|seg| seg.side_mut(side)) {
                pop_front(lane);
            }
            stats.transfers += 1;
            return;
        }
        stats.blocked += 1;
    }

    let Some(segment) = arena.get_mut(id) else {
        return;
    };
    let can_stall = segment.termination.can_stall();
    let lane = segment.side_mut(side);
    compress(lane, 0, overshoot);
    match advance_next_item(lane, 1, speed) {
        // With a target the front stays active so the hand-off is retried.
        Some(next) if target.is_none() => lane.active = next,
        Some(_) => lane.active = 0,
        None if target.is_some() && can_stall => {
            lane.stall();
            stats.stalled += 1;
        }
        None => lane.active = 0,
    }
}

/// Try to insert `item` into the target. Returns whether it was accepted.
fn try_hand_off(
    arena: &mut SegmentArena,
    id: SegmentId,
    target_id: SegmentId,
    side: Side,
    item: ItemTypeId,
    overshoot: LineDist,
) -> bool {
    let (Some(source), Some(target)) = (arena.get(id), arena.get(target_id)) else {
        log::warn!("segment {id:?} hands off to missing target {target_id:?}");
        return false;
    };
    let land = landing(source, side, target, overshoot);
    arena
        .get_mut(target_id)
        .is_some_and(|target| target.side_mut(land.side).try_insert_item(land.offset, item, 0))
}

/// Wake a stalled lane once its front item would fit on the target after
/// one more step.
fn probe_stalled(
    arena: &mut SegmentArena,
    id: SegmentId,
    target_id: SegmentId,
    side: Side,
    speed: LineDist,
    stats: &mut TickStats,
) {
    let (Some(source), Some(target)) = (arena.get(id), arena.get(target_id)) else {
        return;
    };
    let land = landing(source, side, target, speed);
    if !target.side(land.side).can_insert(land.offset, 0) {
        return;
    }
    if let Some(segment) = arena.get_mut(id) {
        segment.side_mut(side).reactivate();
        stats.reactivated += 1;
    }
}

/// Clamp the item at `index` back by `overshoot`, keeping `back_distance`
/// equal to the sum of gaps.
fn compress(lane: &mut Lane, index: usize, overshoot: LineDist) {
    lane.items[index].gap += overshoot;
    lane.back_distance += overshoot;
}

/// Move the first item at or after `from` that still has room, by at most
/// `speed`. Returns its index.
fn advance_next_item(lane: &mut Lane, from: usize, speed: LineDist) -> Option<usize> {
    for index in from..lane.items.len() {
        let gap = lane.items[index].gap;
        if gap > ITEM_SPACING {
            let step = speed.min(gap - ITEM_SPACING);
            lane.items[index].gap -= step;
            lane.back_distance -= step;
            return Some(index);
        }
    }
    None
}

/// Drop the front item after a successful hand-off. Its (negative) gap is
/// folded into the next item, which has travelled the same distance.
fn pop_front(lane: &mut Lane) {
    let Some(front) = lane.items.pop_front() else {
        return;
    };
    match lane.items.front_mut() {
        Some(next) => next.gap += front.gap,
        None => lane.back_distance = LineDist::ZERO,
    }
}
