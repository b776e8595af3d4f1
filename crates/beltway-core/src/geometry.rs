//! Belt geometry: directions, lane sides, and the fixed distances that
//! govern item spacing and how much a bend shortens each lane.

use crate::fixed::LineDist;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Item layout
// ---------------------------------------------------------------------------

/// Width of one item on a belt, in tiles.
pub const ITEM_WIDTH: LineDist = LineDist::from_thousandths(400);

/// Center-to-center distance between items on a fully compressed lane.
pub const ITEM_SPACING: LineDist = LineDist::from_thousandths(250);

// When bending, these amounts are removed from the lane length. The inside
// lane of a bend travels the short arc, the outside lane the long one.
//
//   === 0.7 ===
//   =0.3=
//       ------------------------->
//       ^         *
//       |    -------------------->
//       |    ^    *
//       |    |    *

pub const BEND_LEFT_L_REDUCTION: LineDist = LineDist::from_thousandths(700);
pub const BEND_LEFT_R_REDUCTION: LineDist = LineDist::from_thousandths(300);
pub const BEND_RIGHT_L_REDUCTION: LineDist = LineDist::from_thousandths(300);
pub const BEND_RIGHT_R_REDUCTION: LineDist = LineDist::from_thousandths(700);

/// Reduction applied to both lanes of a segment whose head side-loads
/// into another segment.
pub const TARGET_SIDE_ONLY_REDUCTION: LineDist = LineDist::from_thousandths(700);

/// Slowest belt speed accepted by the registry, in tiles per tick.
pub const MIN_BELT_SPEED: LineDist = LineDist::from_thousandths(1);

/// Belt speeds must stay strictly below this. A faster belt could move an
/// item past its compressed neighbour within a single tick.
pub const MAX_BELT_SPEED_EXCLUSIVE: LineDist = ITEM_SPACING;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Cardinal directions. Grid `y` grows southward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// All four cardinal directions.
    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Grid offset for one step in this direction.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    pub fn invert(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Rotate 90 degrees clockwise.
    pub fn rotate_cw(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// Rotate 90 degrees counter-clockwise.
    pub fn rotate_ccw(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::East => Direction::North,
            Direction::South => Direction::East,
            Direction::West => Direction::South,
        }
    }
}

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// One side of a belt, relative to its direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn from_left(is_left: bool) -> Self {
        if is_left { Side::Left } else { Side::Right }
    }

    pub fn is_left(self) -> bool {
        self == Side::Left
    }
}
