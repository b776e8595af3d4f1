//! Placement and removal of conveyor tiles.
//!
//! Placing a tile either extends a neighbouring segment or starts a new
//! one, then links it to the segments it points into or that point into
//! it. Removing a tile shortens, splits or destroys its segment. After
//! either edit every neighbour re-derives how its feeders terminate: a lone
//! feeder from the side of a tile with nothing behind it bends into it,
//! anything else side-loads.
//!
//! All distances on a bent or side-loading head are corrected by the lane
//! deductions so items keep their world position across every edit. Items
//! that end up on no tile are returned to the caller.

use crate::{ConveyorGrid, ConveyorTile, GridPosition};
use beltway_core::arena::SegmentArena;
use beltway_core::fixed::LineDist;
use beltway_core::geometry::{Direction, Side};
use beltway_core::id::{BeltTypeId, ItemTypeId, SegmentId};
use beltway_core::segment::{Segment, TerminationType};

/// Errors from placement and removal.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("tile {0:?} is already occupied")]
    Occupied(GridPosition),
    #[error("no conveyor at {0:?}")]
    Empty(GridPosition),
    #[error("unknown belt type {0:?}")]
    UnknownBelt(BeltTypeId),
    #[error("tile {0:?} references a segment that no longer exists")]
    DanglingTile(GridPosition),
}

/// Mutable view over the parts of the world a placement touches.
pub struct Connector<'a> {
    arena: &'a mut SegmentArena,
    grid: &'a mut ConveyorGrid,
    max_segment_length: u32,
}

impl<'a> Connector<'a> {
    pub fn new(arena: &'a mut SegmentArena, grid: &'a mut ConveyorGrid, max_segment_length: u32) -> Self {
        debug_assert!(max_segment_length >= 1);
        Self {
            arena,
            grid,
            max_segment_length,
        }
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    /// Place a conveyor tile. Returns items pushed off a lane when a
    /// feeder's head changed shape.
    pub fn connect(
        &mut self,
        pos: GridPosition,
        direction: Direction,
        belt: BeltTypeId,
    ) -> Result<Vec<ItemTypeId>, ConnectError> {
        if self.grid.is_occupied(pos) {
            return Err(ConnectError::Occupied(pos));
        }
        self.group_or_create(pos, direction, belt);
        self.neighbor_connect(pos);

        let mut spilled = self.update_neighbor_termination(pos);
        for dir in Direction::all() {
            let n = pos.step(dir);
            if self.grid.is_occupied(n) {
                spilled.extend(self.on_neighbor_update(n));
            }
        }
        Ok(spilled)
    }

    fn group_or_create(&mut self, pos: GridPosition, direction: Direction, belt: BeltTypeId) -> SegmentId {
        // Extend the segment ahead at its tail.
        if let Some(ahead) = self.grid.get(pos.step(direction)).copied()
            && let Some(seg) = self.arena.get_mut(ahead.segment)
            && groupable(seg, direction, belt, self.max_segment_length)
            && ahead.struct_index + 1 == seg.length as i32
        {
            seg.length += 1;
            self.grid.insert(
                pos,
                ConveyorTile {
                    segment: ahead.segment,
                    struct_index: ahead.struct_index + 1,
                },
            );
            self.arena.retain(ahead.segment);
            log::debug!("grouped {pos:?} onto tail of segment {:?}", ahead.segment);
            return ahead.segment;
        }

        // Extend the segment behind at its head.
        if let Some(behind) = self.grid.get(pos.offset_by(direction, -1)).copied()
            && let Some(seg) = self.arena.get_mut(behind.segment)
            && groupable(seg, direction, belt, self.max_segment_length)
            && behind.struct_index == 0
            && seg.termination == TerminationType::Straight
        {
            seg.lengthen_front();
            // Moving the head forward never pushes items past it.
            let spilled = seg.rebase_lanes(LineDist::ONE);
            debug_assert!(spilled.is_empty());
            self.grid.insert(
                pos,
                ConveyorTile {
                    segment: behind.segment,
                    struct_index: 0,
                },
            );
            self.arena.retain(behind.segment);
            self.renumber(behind.segment, pos, 0);
            log::debug!("grouped {pos:?} onto head of segment {:?}", behind.segment);
            return behind.segment;
        }

        let id = self.arena.insert(Segment::new(direction, belt, 1));
        self.grid.insert(
            pos,
            ConveyorTile {
                segment: id,
                struct_index: 0,
            },
        );
        self.arena.retain(id);
        log::debug!("created segment {id:?} at {pos:?} facing {direction:?}");
        id
    }

    /// Link the tile at `pos` with neighbours it points into or that point
    /// into it. Head-on pairs are left unlinked.
    fn neighbor_connect(&mut self, pos: GridPosition) {
        let Some(origin) = self.grid.get(pos).copied() else {
            return;
        };
        let Some(origin_dir) = self.arena.get(origin.segment).map(|s| s.direction) else {
            return;
        };

        for dir in Direction::all() {
            let Some((_, neighbor)) = self.grid.neighbor(pos, dir) else {
                continue;
            };
            if neighbor.segment == origin.segment {
                continue;
            }
            let Some(neighbor_dir) = self.arena.get(neighbor.segment).map(|s| s.direction) else {
                continue;
            };
            let origin_can = origin_dir == dir;
            let neighbor_can = neighbor_dir == dir.invert();
            // A neighbour heading into `pos` can no longer reach past it.
            if neighbor_can
                && let Some(seg) = self.arena.get_mut(neighbor.segment)
                && seg.target.is_some_and(|t| t != origin.segment)
            {
                seg.set_target(None, 0);
                log::debug!("cleared target of segment {:?} blocked at {pos:?}", neighbor.segment);
            }
            if origin_can == neighbor_can {
                continue;
            }

            let (from, to) = if origin_can {
                (origin.segment, neighbor)
            } else {
                (neighbor.segment, origin)
            };
            self.link(from, to);
        }
    }

    /// Point `from` at the segment owning tile `to`.
    fn link(&mut self, from: SegmentId, to: ConveyorTile) {
        let Some(to_adjust) = self.arena.get(to.segment).map(|s| s.head_adjustment) else {
            return;
        };
        if let Some(seg) = self.arena.get_mut(from) {
            seg.set_target(Some(to.segment), to.struct_index - to_adjust);
            log::debug!("segment {from:?} now feeds {:?}", to.segment);
        }
    }

    // -----------------------------------------------------------------------
    // Termination classification
    // -----------------------------------------------------------------------

    fn on_neighbor_update(&mut self, pos: GridPosition) -> Vec<ItemTypeId> {
        if let Some(tile) = self.grid.get(pos).copied()
            && let Some(seg) = self.arena.get_mut(tile.segment)
        {
            seg.reactivate();
        }
        self.update_neighbor_termination(pos)
    }

    /// Re-derive the termination of every segment feeding the tile at `pos`
    /// from its side.
    fn update_neighbor_termination(&mut self, pos: GridPosition) -> Vec<ItemTypeId> {
        let Some(tile) = self.grid.get(pos).copied() else {
            return Vec::new();
        };
        let Some(dir) = self.arena.get(tile.segment).map(|s| s.direction) else {
            return Vec::new();
        };

        let has_behind = self
            .grid
            .neighbor(pos, dir.invert())
            .and_then(|(_, t)| self.arena.get(t.segment))
            .is_some_and(|s| s.direction == dir);
        let left = self.side_feeder(pos, dir.rotate_ccw(), tile.segment);
        let right = self.side_feeder(pos, dir.rotate_cw(), tile.segment);
        let bends = !has_behind && (left.is_some() != right.is_some());

        let mut spilled = Vec::new();
        if let Some((fpos, fid)) = left {
            let ttype = if bends {
                TerminationType::BendLeft
            } else {
                TerminationType::LeftOnly
            };
            spilled.extend(self.change_termination(fid, fpos, ttype));
        }
        if let Some((fpos, fid)) = right {
            let ttype = if bends {
                TerminationType::BendRight
            } else {
                TerminationType::RightOnly
            };
            spilled.extend(self.change_termination(fid, fpos, ttype));
        }
        spilled
    }

    /// A segment whose head sits one step toward `side_dir` from `pos`,
    /// facing `pos` and feeding `target`.
    fn side_feeder(
        &self,
        pos: GridPosition,
        side_dir: Direction,
        target: SegmentId,
    ) -> Option<(GridPosition, SegmentId)> {
        let (fpos, tile) = self.grid.neighbor(pos, side_dir)?;
        if tile.segment == target {
            return None;
        }
        let seg = self.arena.get(tile.segment)?;
        (seg.direction == side_dir.invert() && seg.target == Some(target)).then_some((fpos, tile.segment))
    }

    /// Give feeder `id`, whose head tile is at `head`, a bent or side-loading
    /// termination, keeping its items in place.
    fn change_termination(
        &mut self,
        id: SegmentId,
        head: GridPosition,
        ttype: TerminationType,
    ) -> Vec<ItemTypeId> {
        let Some(seg) = self.arena.get_mut(id) else {
            return Vec::new();
        };
        let old = seg.termination;
        if old == ttype {
            return Vec::new();
        }
        debug_assert!(ttype != TerminationType::Straight);

        let old_ded = Side::BOTH.map(|side| seg.head_deduction(side));
        seg.termination = ttype;
        let was_straight = old == TerminationType::Straight;
        if was_straight {
            // The corner tile, owned by the target, becomes index 0.
            seg.lengthen_front();
        }

        let mut spilled = Vec::new();
        for (side, old_ded) in Side::BOTH.into_iter().zip(old_ded) {
            let new_ded = seg.head_deduction(side);
            let delta = if was_straight {
                LineDist::ONE - new_ded
            } else {
                old_ded - new_ded
            };
            spilled.extend(seg.side_mut(side).rebase(delta));
        }

        self.renumber(id, head, 1);
        log::debug!("segment {id:?} termination {old:?} -> {ttype:?}");
        spilled
    }

    // -----------------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------------

    /// Remove the conveyor tile at `pos`. Returns every item that was on it,
    /// plus any pushed off a neighbour whose head straightened.
    pub fn disconnect(&mut self, pos: GridPosition) -> Result<Vec<ItemTypeId>, ConnectError> {
        let tile = self.grid.get(pos).copied().ok_or(ConnectError::Empty(pos))?;
        let id = tile.segment;
        let (length, termination) = self
            .arena
            .get(id)
            .map(|s| (s.length as i32, s.termination))
            .ok_or(ConnectError::DanglingTile(pos))?;

        let mut spilled = self.neighbor_disconnect(pos, id);

        let head_index = if termination == TerminationType::Straight {
            0
        } else {
            1
        };
        let index = tile.struct_index;
        if length - head_index == 1 {
            spilled.extend(self.destroy(pos, id));
        } else if index == head_index {
            spilled.extend(self.remove_head(pos, id));
        } else if index == length - 1 {
            spilled.extend(self.remove_tail(pos, id, index));
        } else {
            spilled.extend(self.split(pos, id, index));
        }

        for dir in Direction::all() {
            let n = pos.step(dir);
            if self.grid.is_occupied(n) {
                spilled.extend(self.on_neighbor_update(n));
            }
        }
        Ok(spilled)
    }

    /// Unlink every neighbour whose head points into `pos`. Bent heads lose
    /// their corner tile and go back to straight.
    fn neighbor_disconnect(&mut self, pos: GridPosition, removed: SegmentId) -> Vec<ItemTypeId> {
        let mut spilled = Vec::new();
        for dir in Direction::all() {
            let Some((npos, neighbor)) = self.grid.neighbor(pos, dir) else {
                continue;
            };
            if neighbor.segment == removed {
                continue;
            }
            let Some(seg) = self.arena.get_mut(neighbor.segment) else {
                continue;
            };
            if seg.direction != dir.invert() || seg.target != Some(removed) {
                continue;
            }
            seg.set_target(None, 0);
            if seg.termination == TerminationType::Straight {
                continue;
            }

            let old_ded = Side::BOTH.map(|side| seg.head_deduction(side));
            seg.shorten_front();
            for (side, ded) in Side::BOTH.into_iter().zip(old_ded) {
                spilled.extend(seg.side_mut(side).rebase(-(LineDist::ONE - ded)));
            }
            seg.termination = TerminationType::Straight;
            self.renumber(neighbor.segment, npos, 0);
            log::debug!("segment {:?} straightened after losing its target", neighbor.segment);
        }
        spilled
    }

    fn destroy(&mut self, pos: GridPosition, id: SegmentId) -> Vec<ItemTypeId> {
        self.grid.remove(pos);
        let segment = self.arena.release(id).or_else(|| {
            log::warn!("segment {id:?} still referenced after its last tile was removed");
            self.arena.remove(id)
        });
        let mut spilled = Vec::new();
        if let Some(mut segment) = segment {
            spilled.extend(segment.left.drain());
            spilled.extend(segment.right.drain());
        }
        self.arena.clear_targets_to(id);
        log::debug!("destroyed segment {id:?}");
        spilled
    }

    fn remove_head(&mut self, pos: GridPosition, id: SegmentId) -> Vec<ItemTypeId> {
        let Some(seg) = self.arena.get_mut(id) else {
            return Vec::new();
        };
        let direction = seg.direction;
        let mut spilled = Vec::new();
        if seg.termination == TerminationType::Straight {
            seg.shorten_front();
            spilled.extend(seg.rebase_lanes(-LineDist::ONE));
        } else {
            // Both the removed tile and the corner ahead of it go.
            let old_ded = Side::BOTH.map(|side| seg.head_deduction(side));
            seg.shorten_front();
            seg.shorten_front();
            for (side, ded) in Side::BOTH.into_iter().zip(old_ded) {
                spilled.extend(seg.side_mut(side).rebase(ded - LineDist::from_tiles(2)));
            }
            seg.termination = TerminationType::Straight;
        }
        seg.set_target(None, 0);

        self.grid.remove(pos);
        self.arena.release(id);
        self.renumber(id, pos.offset_by(direction, -1), 0);
        log::debug!("removed head tile {pos:?} of segment {id:?}");
        spilled
    }

    fn remove_tail(&mut self, pos: GridPosition, id: SegmentId, index: i32) -> Vec<ItemTypeId> {
        let Some(seg) = self.arena.get_mut(id) else {
            return Vec::new();
        };
        seg.length = index as u32;
        let mut spilled = Vec::new();
        for side in Side::BOTH {
            let cut = LineDist::from_tiles(i64::from(index)) - seg.head_deduction(side);
            spilled.extend(seg.side_mut(side).truncate(cut.max(LineDist::ZERO)));
        }
        self.grid.remove(pos);
        self.arena.release(id);
        log::debug!("removed tail tile {pos:?} of segment {id:?}");
        spilled
    }

    /// Split at a middle tile. The part ahead keeps `id`; the part behind
    /// becomes a new straight segment feeding it.
    fn split(&mut self, pos: GridPosition, id: SegmentId, index: i32) -> Vec<ItemTypeId> {
        let Some(front) = self.arena.get_mut(id) else {
            return Vec::new();
        };
        let direction = front.direction;
        let rear_len = front.length as i32 - index - 1;

        let mut rear = Segment::new(direction, front.belt, rear_len as u32);
        rear.head_adjustment = front.head_adjustment - index - 1;
        rear.set_target(Some(id), index - 1 - front.head_adjustment);

        let mut spilled = Vec::new();
        for side in Side::BOTH {
            let ded = front.head_deduction(side);
            let cut_start = LineDist::from_tiles(i64::from(index)) - ded;
            let cut_end = LineDist::from_tiles(i64::from(index + 1)) - ded;
            let (removed, behind) = front.side_mut(side).split_at(cut_start, cut_end);
            spilled.extend(removed);
            *rear.side_mut(side) = behind;
        }
        front.length = index as u32;
        let rear_adjust = rear.head_adjustment;
        let rear_id = self.arena.insert(rear);

        self.grid.remove(pos);
        self.arena.release(id);

        for k in 0..rear_len {
            let q = pos.offset_by(direction, -(k + 1));
            if let Some(tile) = self.grid.get_mut(q) {
                tile.segment = rear_id;
                tile.struct_index = k;
            }
            self.arena.release(id);
            self.arena.retain(rear_id);

            for side_dir in [direction.rotate_cw(), direction.rotate_ccw()] {
                self.repoint(q.step(side_dir), side_dir.invert(), id, rear_id, k - rear_adjust);
            }
        }
        let past_tail = pos.offset_by(direction, -(rear_len + 1));
        self.repoint(past_tail, direction, id, rear_id, rear_len - 1 - rear_adjust);

        log::debug!("split segment {id:?} at {pos:?}; rear is {rear_id:?}");
        spilled
    }

    /// If the segment at `pos` faces `facing` and feeds `old`, feed `new`.
    fn repoint(
        &mut self,
        pos: GridPosition,
        facing: Direction,
        old: SegmentId,
        new: SegmentId,
        insert_offset: i32,
    ) {
        let Some(tile) = self.grid.get(pos).copied() else {
            return;
        };
        if let Some(seg) = self.arena.get_mut(tile.segment)
            && seg.direction == facing
            && seg.target == Some(old)
        {
            seg.set_target(Some(new), insert_offset);
        }
    }

    // -----------------------------------------------------------------------
    // Bookkeeping
    // -----------------------------------------------------------------------

    /// Number the tiles of `id` from `start` backwards, beginning at
    /// `first_index`.
    fn renumber(&mut self, id: SegmentId, start: GridPosition, first_index: i32) {
        let Some((direction, length)) = self.arena.get(id).map(|s| (s.direction, s.length as i32)) else {
            return;
        };
        let mut pos = start;
        for index in first_index..length {
            match self.grid.get_mut(pos) {
                Some(tile) if tile.segment == id => tile.struct_index = index,
                _ => break,
            }
            pos = pos.offset_by(direction, -1);
        }
    }
}

fn groupable(seg: &Segment, direction: Direction, belt: BeltTypeId, max_length: u32) -> bool {
    seg.direction == direction && seg.belt == belt && seg.length < max_length
}

#[cfg(test)]
mod tests {
    use super::*;
    use beltway_core::id::BeltTypeId;
    use beltway_core::test_utils::*;

    const BELT: BeltTypeId = BeltTypeId(0);
    const OTHER_BELT: BeltTypeId = BeltTypeId(1);

    struct Fixture {
        arena: SegmentArena,
        grid: ConveyorGrid,
        max: u32,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                arena: SegmentArena::new(),
                grid: ConveyorGrid::new(),
                max: 256,
            }
        }

        fn place(&mut self, x: i32, y: i32, dir: Direction) -> Vec<ItemTypeId> {
            Connector::new(&mut self.arena, &mut self.grid, self.max)
                .connect(GridPosition::new(x, y), dir, BELT)
                .unwrap()
        }

        fn remove(&mut self, x: i32, y: i32) -> Vec<ItemTypeId> {
            Connector::new(&mut self.arena, &mut self.grid, self.max)
                .disconnect(GridPosition::new(x, y))
                .unwrap()
        }

        fn tile(&self, x: i32, y: i32) -> ConveyorTile {
            *self.grid.get(GridPosition::new(x, y)).unwrap()
        }

        fn seg(&self, x: i32, y: i32) -> &Segment {
            self.arena.get(self.tile(x, y).segment).unwrap()
        }

        fn assert_refcounts(&self) {
            for id in self.arena.ids() {
                let tiles = self.grid.tiles_of(id).len() as u32;
                assert_eq!(self.arena.tile_refs(id), tiles, "segment {id:?}");
            }
        }
    }

    #[test]
    fn placing_behind_extends_tail() {
        let mut f = Fixture::new();
        f.place(0, 0, Direction::North);
        f.place(0, 1, Direction::North);
        assert_eq!(f.arena.len(), 1);
        assert_eq!(f.seg(0, 0).length, 2);
        assert_eq!(f.seg(0, 0).head_adjustment, 0);
        assert_eq!(f.tile(0, 1).struct_index, 1);
        f.assert_refcounts();
    }

    #[test]
    fn placing_ahead_extends_head() {
        let mut f = Fixture::new();
        f.place(0, 1, Direction::North);
        f.place(0, 0, Direction::North);
        assert_eq!(f.arena.len(), 1);
        let seg = f.seg(0, 0);
        assert_eq!(seg.length, 2);
        assert_eq!(seg.head_adjustment, 1);
        assert_eq!(f.tile(0, 0).struct_index, 0);
        assert_eq!(f.tile(0, 1).struct_index, 1);
    }

    #[test]
    fn extending_head_keeps_items_in_place() {
        let mut f = Fixture::new();
        f.place(0, 1, Direction::North);
        let id = f.tile(0, 1).segment;
        f.arena.get_mut(id).unwrap().append_item(Side::Left, dist(0.5), iron_ore());
        f.place(0, 0, Direction::North);
        let seg = f.arena.get(id).unwrap();
        assert_eq!(lane_positions(&seg.left), vec![dist(1.5)]);
        assert!(seg.get_item_abs(Side::Left, dist(0.5), dist(0.01)).is_some());
    }

    #[test]
    fn different_belts_do_not_group() {
        let mut f = Fixture::new();
        f.place(0, 0, Direction::East);
        Connector::new(&mut f.arena, &mut f.grid, f.max)
            .connect(GridPosition::new(-1, 0), Direction::East, OTHER_BELT)
            .unwrap();
        assert_eq!(f.arena.len(), 2);
        assert_eq!(f.seg(-1, 0).target, Some(f.tile(0, 0).segment));
        assert_eq!(f.seg(-1, 0).termination, TerminationType::Straight);
    }

    #[test]
    fn max_length_caps_grouping() {
        let mut f = Fixture::new();
        f.max = 2;
        for y in 0..3 {
            f.place(0, y, Direction::North);
        }
        assert_eq!(f.arena.len(), 2);
        assert_eq!(f.seg(0, 0).length, 2);
        assert_eq!(f.seg(0, 2).length, 1);
        assert_eq!(f.seg(0, 2).target, Some(f.tile(0, 1).segment));
    }

    #[test]
    fn occupied_tile_is_rejected() {
        let mut f = Fixture::new();
        f.place(0, 0, Direction::North);
        let err = Connector::new(&mut f.arena, &mut f.grid, f.max)
            .connect(GridPosition::new(0, 0), Direction::East, BELT)
            .unwrap_err();
        assert!(matches!(err, ConnectError::Occupied(_)));
    }

    #[test]
    fn head_on_tiles_are_not_linked() {
        let mut f = Fixture::new();
        f.place(0, 0, Direction::East);
        f.place(1, 0, Direction::West);
        assert!(f.seg(0, 0).target.is_none());
        assert!(f.seg(1, 0).target.is_none());
    }

    #[test]
    fn lone_side_feeder_bends() {
        let mut f = Fixture::new();
        f.place(1, 0, Direction::East);
        f.place(1, 1, Direction::North);
        f.place(1, 2, Direction::North);

        let feeder = f.seg(1, 1);
        assert_eq!(feeder.termination, TerminationType::BendRight);
        assert_eq!(feeder.target, Some(f.tile(1, 0).segment));
        // The corner counts toward the feeder's length.
        assert_eq!(feeder.length, 3);
        assert_eq!(feeder.head_adjustment, 1);
        assert_eq!(f.tile(1, 1).struct_index, 1);
        assert_eq!(f.tile(1, 2).struct_index, 2);
        f.assert_refcounts();
    }

    #[test]
    fn feeder_bends_left_from_the_other_side() {
        let mut f = Fixture::new();
        f.place(1, 0, Direction::East);
        f.place(1, -1, Direction::South);
        assert_eq!(f.seg(1, -1).termination, TerminationType::BendLeft);
    }

    #[test]
    fn belt_behind_turns_bend_into_side_load() {
        let mut f = Fixture::new();
        f.place(1, 0, Direction::East);
        f.place(1, 1, Direction::North);
        f.place(0, 0, Direction::East);

        assert_eq!(f.arena.len(), 2);
        let feeder = f.seg(1, 1);
        assert_eq!(feeder.termination, TerminationType::RightOnly);
        // Target's tile (1, 0) is now index 0 of a two-tile segment.
        assert_eq!(feeder.target_insert_offset, 0);
        assert_eq!(f.tile(1, 1).struct_index, 1);
    }

    #[test]
    fn two_side_feeders_both_side_load() {
        let mut f = Fixture::new();
        f.place(1, 0, Direction::East);
        f.place(1, 1, Direction::North);
        f.place(1, -1, Direction::South);
        assert_eq!(f.seg(1, 1).termination, TerminationType::RightOnly);
        assert_eq!(f.seg(1, -1).termination, TerminationType::LeftOnly);
    }

    #[test]
    fn bend_rebases_feeder_items() {
        let mut f = Fixture::new();
        f.place(1, 1, Direction::North);
        let id = f.tile(1, 1).segment;
        f.arena.get_mut(id).unwrap().append_item(Side::Left, dist(0.5), iron_ore());
        f.arena.get_mut(id).unwrap().append_item(Side::Right, dist(0.5), iron_ore());
        f.place(1, 0, Direction::East);

        let feeder = f.arena.get(id).unwrap();
        assert_eq!(feeder.termination, TerminationType::BendRight);
        // Tile 1 starts at 1 - 0.3 on the left lane and 1 - 0.7 on the right.
        assert_eq!(lane_positions(&feeder.left), vec![dist(1.2)]);
        assert_eq!(lane_positions(&feeder.right), vec![dist(0.8)]);
    }

    #[test]
    fn removing_target_straightens_feeder() {
        let mut f = Fixture::new();
        f.place(1, 0, Direction::East);
        f.place(1, 1, Direction::North);
        f.place(1, 2, Direction::North);
        let id = f.tile(1, 1).segment;
        f.arena.get_mut(id).unwrap().append_item(Side::Left, dist(1.2), iron_ore());

        let spilled = f.remove(1, 0);
        assert!(spilled.is_empty());
        let feeder = f.arena.get(id).unwrap();
        assert_eq!(feeder.termination, TerminationType::Straight);
        assert!(feeder.target.is_none());
        assert_eq!(feeder.length, 2);
        assert_eq!(feeder.head_adjustment, 0);
        assert_eq!(f.tile(1, 1).struct_index, 0);
        assert_eq!(lane_positions(&feeder.left), vec![dist(0.5)]);
        f.assert_refcounts();
    }

    #[test]
    fn removing_only_tile_destroys_segment() {
        let mut f = Fixture::new();
        f.place(0, 0, Direction::North);
        let id = f.tile(0, 0).segment;
        f.arena.get_mut(id).unwrap().append_item(Side::Right, dist(0.5), gear());
        let spilled = f.remove(0, 0);
        assert_eq!(spilled, vec![gear()]);
        assert!(f.arena.is_empty());
        assert_eq!(f.grid.tile_count(), 0);
    }

    #[test]
    fn removing_empty_tile_fails() {
        let mut f = Fixture::new();
        let err = Connector::new(&mut f.arena, &mut f.grid, f.max)
            .disconnect(GridPosition::new(4, 4))
            .unwrap_err();
        assert!(matches!(err, ConnectError::Empty(_)));
    }

    #[test]
    fn removing_head_shortens_and_spills() {
        let mut f = Fixture::new();
        for y in 0..3 {
            f.place(0, y, Direction::North);
        }
        let id = f.tile(0, 0).segment;
        let seg = f.arena.get_mut(id).unwrap();
        seg.append_item(Side::Left, dist(0.5), iron_ore());
        seg.append_item(Side::Left, dist(1.0), copper_ore());

        let spilled = f.remove(0, 0);
        assert_eq!(spilled, vec![iron_ore()]);
        let seg = f.arena.get(id).unwrap();
        assert_eq!(seg.length, 2);
        assert_eq!(seg.head_adjustment, -1);
        assert_eq!(f.tile(0, 1).struct_index, 0);
        assert_eq!(lane_positions(&seg.left), vec![dist(0.5)]);
    }

    #[test]
    fn removing_tail_spills_its_items() {
        let mut f = Fixture::new();
        for y in 0..3 {
            f.place(0, y, Direction::North);
        }
        let id = f.tile(0, 0).segment;
        let seg = f.arena.get_mut(id).unwrap();
        seg.append_item(Side::Right, dist(0.5), iron_ore());
        seg.append_item(Side::Right, dist(2.0), copper_ore());

        let spilled = f.remove(0, 2);
        assert_eq!(spilled, vec![copper_ore()]);
        assert_eq!(f.arena.get(id).unwrap().length, 2);
        f.assert_refcounts();
    }

    #[test]
    fn removing_middle_splits_rear_into_feeder() {
        let mut f = Fixture::new();
        for y in 0..3 {
            f.place(0, y, Direction::North);
        }
        let id = f.tile(0, 0).segment;
        let seg = f.arena.get_mut(id).unwrap();
        seg.append_item(Side::Left, dist(0.5), iron_ore());
        seg.append_item(Side::Left, dist(1.0), gear());
        seg.append_item(Side::Left, dist(1.0), copper_ore());

        let spilled = f.remove(0, 1);
        assert_eq!(spilled, vec![gear()]);
        assert_eq!(f.arena.len(), 2);

        let front = f.seg(0, 0);
        assert_eq!(front.length, 1);
        assert_eq!(lane_positions(&front.left), vec![dist(0.5)]);

        let rear_id = f.tile(0, 2).segment;
        let rear = f.arena.get(rear_id).unwrap();
        assert_ne!(rear_id, id);
        assert_eq!(rear.length, 1);
        assert_eq!(rear.target, Some(id));
        assert_eq!(rear.head_adjustment, -2);
        assert_eq!(f.tile(0, 2).struct_index, 0);
        assert_eq!(lane_positions(&rear.left), vec![dist(0.5)]);
        // Absolute addressing is unchanged for the moved item.
        assert!(rear.get_item_abs(Side::Left, dist(2.5), dist(0.01)).is_some());
        f.assert_refcounts();
    }

    #[test]
    fn split_repoints_side_feeders() {
        let mut f = Fixture::new();
        for x in 0..4 {
            f.place(x, 0, Direction::West);
        }
        // Side-load into (2, 0) from the south.
        f.place(2, 1, Direction::North);
        let feeder = f.tile(2, 1).segment;
        assert_eq!(f.arena.get(feeder).unwrap().termination, TerminationType::LeftOnly);

        f.remove(1, 0);
        let rear = f.tile(2, 0).segment;
        assert_ne!(rear, f.tile(0, 0).segment);
        let feeder = f.arena.get(feeder).unwrap();
        assert_eq!(feeder.target, Some(rear));
        assert_eq!(feeder.target_insert_offset, 2);
        f.assert_refcounts();
    }

    #[test]
    fn refilling_gap_rejoins_front() {
        let mut f = Fixture::new();
        for y in 0..3 {
            f.place(0, y, Direction::North);
        }
        f.remove(0, 1);
        f.place(0, 1, Direction::North);
        assert_eq!(f.arena.len(), 2);
        assert_eq!(f.seg(0, 0).length, 2);
        assert_eq!(f.seg(0, 2).target, Some(f.tile(0, 0).segment));
        f.assert_refcounts();
    }
}
