//! Tile grid for conveyor placement and the world that ties it to the
//! segment arena.
//!
//! Every occupied tile records which segment it belongs to and its index
//! within that segment, counted from the segment head. The [`connector`]
//! keeps these records consistent as tiles are placed and removed, and
//! [`world::ConveyorWorld`] bundles grid, arena and belt registry behind one
//! `&mut` so a tick never observes a half-edited segment graph.

use beltway_core::geometry::Direction;
use beltway_core::id::SegmentId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod connector;
pub mod snapshot;
pub mod world;

pub use connector::ConnectError;
pub use snapshot::SnapshotError;
pub use world::{ConveyorWorld, WorldConfig};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A position on the 2D grid. `y` grows southward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring position one step in `dir`.
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.offset();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Move `n` steps in `dir`. Negative `n` walks backwards.
    pub fn offset_by(self, dir: Direction, n: i32) -> Self {
        let (dx, dy) = dir.offset();
        Self::new(self.x + dx * n, self.y + dy * n)
    }
}

/// What the grid stores for one conveyor tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConveyorTile {
    pub segment: SegmentId,
    /// Index within the segment, counted from the head. A segment whose head
    /// bends or side-loads starts its own tiles at 1; index 0 is the corner
    /// tile, which belongs to the target.
    pub struct_index: i32,
}

// ---------------------------------------------------------------------------
// ConveyorGrid
// ---------------------------------------------------------------------------

/// A spatial index mapping grid positions to conveyor tiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConveyorGrid {
    tiles: BTreeMap<GridPosition, ConveyorTile>,
}

impl ConveyorGrid {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Point queries --

    pub fn get(&self, pos: GridPosition) -> Option<&ConveyorTile> {
        self.tiles.get(&pos)
    }

    pub fn get_mut(&mut self, pos: GridPosition) -> Option<&mut ConveyorTile> {
        self.tiles.get_mut(&pos)
    }

    pub fn is_occupied(&self, pos: GridPosition) -> bool {
        self.tiles.contains_key(&pos)
    }

    /// The tile one step from `pos` in `dir`, with its position.
    pub fn neighbor(&self, pos: GridPosition, dir: Direction) -> Option<(GridPosition, ConveyorTile)> {
        let n = pos.step(dir);
        self.tiles.get(&n).map(|tile| (n, *tile))
    }

    // -- Mutation --

    pub fn insert(&mut self, pos: GridPosition, tile: ConveyorTile) -> Option<ConveyorTile> {
        self.tiles.insert(pos, tile)
    }

    pub fn remove(&mut self, pos: GridPosition) -> Option<ConveyorTile> {
        self.tiles.remove(&pos)
    }

    // -- Area queries --

    /// All tiles within an axis-aligned rectangle (inclusive), ordered by x then y.
    pub fn tiles_in_rect(&self, min: GridPosition, max: GridPosition) -> Vec<(GridPosition, ConveyorTile)> {
        self.tiles
            .range(min..=max)
            .filter(|(pos, _)| pos.y >= min.y && pos.y <= max.y && pos.x >= min.x && pos.x <= max.x)
            .map(|(pos, tile)| (*pos, *tile))
            .collect()
    }

    /// Every tile belonging to `segment`.
    pub fn tiles_of(&self, segment: SegmentId) -> Vec<(GridPosition, ConveyorTile)> {
        self.tiles
            .iter()
            .filter(|(_, tile)| tile.segment == segment)
            .map(|(pos, tile)| (*pos, *tile))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GridPosition, &ConveyorTile)> {
        self.tiles.iter().map(|(pos, tile)| (*pos, tile))
    }

    // -- Stats --

    /// Total number of occupied tiles.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}
