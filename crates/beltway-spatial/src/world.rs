//! The conveyor world: segment arena, tile grid and belt registry behind a
//! single owner.

use crate::connector::{ConnectError, Connector};
use crate::{ConveyorGrid, ConveyorTile, GridPosition};
use beltway_core::arena::SegmentArena;
use beltway_core::fixed::{LineDist, Ticks};
use beltway_core::geometry::{Direction, Side};
use beltway_core::id::{BeltTypeId, ItemTypeId, SegmentId};
use beltway_core::lane::DEFAULT_PICK_EPSILON;
use beltway_core::registry::BeltRegistry;
use beltway_core::segment::Segment;
use beltway_core::sim::{SimState, hash_segments};
use beltway_core::tick::{TickContext, TickStats, tick_update};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Grouping stops once a segment spans this many tiles.
    pub max_segment_length: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_segment_length: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// ConveyorWorld
// ---------------------------------------------------------------------------

/// Owns every segment and tile. Ticks and placements both need `&mut self`,
/// so they can never interleave.
#[derive(Debug, Clone)]
pub struct ConveyorWorld {
    pub(crate) arena: SegmentArena,
    pub(crate) grid: ConveyorGrid,
    pub(crate) registry: BeltRegistry,
    pub(crate) config: WorldConfig,
    pub(crate) sim: SimState,
    pub(crate) last_hash: u64,
}

impl ConveyorWorld {
    pub fn new(registry: BeltRegistry, config: WorldConfig) -> Self {
        Self {
            arena: SegmentArena::new(),
            grid: ConveyorGrid::new(),
            registry,
            config,
            sim: SimState::new(),
            last_hash: 0,
        }
    }

    // -- Placement --

    /// Place a conveyor tile facing `direction`. Returns items knocked off
    /// neighbouring belts whose heads changed shape.
    pub fn place_conveyor(
        &mut self,
        pos: GridPosition,
        direction: Direction,
        belt: BeltTypeId,
    ) -> Result<Vec<ItemTypeId>, ConnectError> {
        if self.registry.get(belt).is_none() {
            return Err(ConnectError::UnknownBelt(belt));
        }
        Connector::new(&mut self.arena, &mut self.grid, self.config.max_segment_length)
            .connect(pos, direction, belt)
    }

    /// Remove the conveyor tile at `pos`, returning every item that fell off.
    pub fn remove_conveyor(&mut self, pos: GridPosition) -> Result<Vec<ItemTypeId>, ConnectError> {
        Connector::new(&mut self.arena, &mut self.grid, self.config.max_segment_length)
            .disconnect(pos)
    }

    // -- Simulation --

    /// Advance every belt by one tick.
    pub fn tick_update(&mut self) -> TickStats {
        let ctx = TickContext {
            registry: &self.registry,
        };
        let stats = tick_update(&mut self.arena, &ctx);
        self.sim.tick += 1;
        self.last_hash = hash_segments(&self.arena);
        stats
    }

    pub fn tick(&self) -> Ticks {
        self.sim.tick
    }

    /// Hash computed at the end of the last tick, or 0 before the first.
    pub fn state_hash(&self) -> u64 {
        self.last_hash
    }

    // -- Inserter helpers --

    /// Insert `item` on `side` of the tile at `pos`, `offset_in_tile` from
    /// the tile's leading edge. Fails on an empty tile or a crowded spot.
    pub fn try_insert_item_at(
        &mut self,
        pos: GridPosition,
        side: Side,
        offset_in_tile: LineDist,
        item: ItemTypeId,
    ) -> bool {
        let Some((tile, segment)) = self.tile_segment_mut(pos) else {
            return false;
        };
        let lane_offset = tile_lane_offset(segment, tile, side, offset_in_tile);
        let abs = segment.offset_abs(lane_offset);
        segment.try_insert_item_abs(side, abs, item)
    }

    /// Take the item closest to `offset_in_tile` on `side` of the tile at
    /// `pos`, if one lies within pick range.
    pub fn try_pop_item_at(
        &mut self,
        pos: GridPosition,
        side: Side,
        offset_in_tile: LineDist,
    ) -> Option<ItemTypeId> {
        let (tile, segment) = self.tile_segment_mut(pos)?;
        let lane_offset = tile_lane_offset(segment, tile, side, offset_in_tile);
        let abs = segment.offset_abs(lane_offset);
        segment.try_pop_item_abs(side, abs, DEFAULT_PICK_EPSILON)
    }

    fn tile_segment_mut(&mut self, pos: GridPosition) -> Option<(ConveyorTile, &mut Segment)> {
        let tile = *self.grid.get(pos)?;
        let segment = self.arena.get_mut(tile.segment)?;
        Some((tile, segment))
    }

    // -- Queries --

    pub fn tile(&self, pos: GridPosition) -> Option<&ConveyorTile> {
        self.grid.get(pos)
    }

    pub fn segment_at(&self, pos: GridPosition) -> Option<&Segment> {
        self.grid.get(pos).and_then(|tile| self.arena.get(tile.segment))
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.arena.get(id)
    }

    /// Direct access for tools and tests that seed lanes.
    pub fn segment_mut(&mut self, id: SegmentId) -> Option<&mut Segment> {
        self.arena.get_mut(id)
    }

    pub fn arena(&self) -> &SegmentArena {
        &self.arena
    }

    pub fn grid(&self) -> &ConveyorGrid {
        &self.grid
    }

    pub fn registry(&self) -> &BeltRegistry {
        &self.registry
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn segment_count(&self) -> usize {
        self.arena.len()
    }

    pub fn item_count(&self) -> usize {
        self.arena.item_count()
    }
}

/// Lane offset of a point `offset_in_tile` into `tile`, clamped to the head.
fn tile_lane_offset(segment: &Segment, tile: ConveyorTile, side: Side, offset_in_tile: LineDist) -> LineDist {
    let offset = LineDist::from_tiles(i64::from(tile.struct_index)) + offset_in_tile - segment.head_deduction(side);
    offset.max(LineDist::ZERO)
}
