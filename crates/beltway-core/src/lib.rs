//! Beltway Core -- the item-transport model for tile-based conveyor belts.
//!
//! Belts are grouped into [`segment::Segment`]s: runs of same-direction tiles
//! that share a left and a right [`lane::Lane`]. Lanes store items as gaps,
//! so an entire compressed queue moves by updating a single number.
//!
//! # Two-Phase Tick
//!
//! Each call to [`tick::tick_update`] advances every segment by one tick:
//!
//! 1. **Movement** -- each lane's active item advances by the belt speed.
//! 2. **Transition** -- items at a head are handed to the target segment;
//!    items that caught up are compressed and the next free item takes over.
//!
//! # Key Types
//!
//! - [`fixed::LineDist`] -- three-digit decimal fixed point for exact positions.
//! - [`lane::Lane`] -- gap-encoded item queue with an active index.
//! - [`segment::Segment`] -- two lanes plus termination, target and
//!   absolute-addressing state.
//! - [`arena::SegmentArena`] -- generational storage with per-segment tile
//!   reference counts.
//! - [`registry::BeltRegistry`] -- immutable belt speed table (frozen at startup).
//! - [`sim::StateHash`] -- FNV-1a hash for desync detection.

pub mod arena;
pub mod fixed;
pub mod geometry;
pub mod id;
pub mod lane;
pub mod registry;
pub mod segment;
pub mod sim;
pub mod tick;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
