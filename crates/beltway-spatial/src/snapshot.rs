//! Binary world snapshots via `bitcode`.
//!
//! The belt registry is content, not state: it is left out of the snapshot
//! and supplied again on decode. A decoded world continues bit-identically
//! to the one that was encoded.

use crate::world::{ConveyorWorld, WorldConfig};
use crate::ConveyorGrid;
use beltway_core::arena::SegmentArena;
use beltway_core::registry::BeltRegistry;
use beltway_core::sim::SimState;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

#[derive(Serialize, Deserialize)]
struct WorldSnapshot {
    arena: SegmentArena,
    grid: ConveyorGrid,
    config: WorldConfig,
    sim: SimState,
    last_hash: u64,
}

/// Serialize every segment, tile and the tick counter.
pub fn encode(world: &ConveyorWorld) -> Result<Vec<u8>, SnapshotError> {
    let snapshot = WorldSnapshot {
        arena: world.arena.clone(),
        grid: world.grid.clone(),
        config: world.config,
        sim: world.sim.clone(),
        last_hash: world.last_hash,
    };
    bitcode::serialize(&snapshot).map_err(|e| SnapshotError::Encode(e.to_string()))
}

/// Rebuild a world from `encode` output, attaching `registry`.
pub fn decode(data: &[u8], registry: BeltRegistry) -> Result<ConveyorWorld, SnapshotError> {
    let snapshot: WorldSnapshot =
        bitcode::deserialize(data).map_err(|e| SnapshotError::Decode(e.to_string()))?;
    log::debug!(
        "restored {} segments at tick {}",
        snapshot.arena.len(),
        snapshot.sim.tick
    );
    Ok(ConveyorWorld {
        arena: snapshot.arena,
        grid: snapshot.grid,
        registry,
        config: snapshot.config,
        sim: snapshot.sim,
        last_hash: snapshot.last_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GridPosition;
    use beltway_core::geometry::{Direction, Side};
    use beltway_core::test_utils::*;

    fn busy_world() -> ConveyorWorld {
        let (registry, belts) = standard_registry();
        let mut world = ConveyorWorld::new(registry, WorldConfig::default());
        for x in 0..6 {
            world
                .place_conveyor(GridPosition::new(x, 0), Direction::East, belts.fast)
                .unwrap();
        }
        for y in 1..4 {
            world
                .place_conveyor(GridPosition::new(3, y), Direction::North, belts.basic)
                .unwrap();
        }
        for x in 0..3 {
            world.try_insert_item_at(GridPosition::new(x, 0), Side::Left, dist(0.5), iron_ore());
        }
        world.try_insert_item_at(GridPosition::new(3, 3), Side::Right, dist(0.5), gear());
        world.tick_update();
        world
    }

    #[test]
    fn round_trip_preserves_state() {
        let world = busy_world();
        let bytes = encode(&world).unwrap();
        let restored = decode(&bytes, world.registry().clone()).unwrap();

        assert_eq!(restored.tick(), world.tick());
        assert_eq!(restored.state_hash(), world.state_hash());
        assert_eq!(restored.grid(), world.grid());
        assert_eq!(restored.item_count(), world.item_count());
    }

    #[test]
    fn restored_world_continues_identically() {
        let mut world = busy_world();
        let bytes = encode(&world).unwrap();
        let mut restored = decode(&bytes, world.registry().clone()).unwrap();

        for _ in 0..120 {
            world.tick_update();
            restored.tick_update();
            assert_eq!(restored.state_hash(), world.state_hash());
        }
    }

    #[test]
    fn garbage_fails_to_decode() {
        let (registry, _) = standard_registry();
        let result = decode(&[0xde, 0xad], registry);
        assert!(matches!(result, Err(SnapshotError::Decode(_))));
    }
}
