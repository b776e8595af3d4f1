//! Item flow across placed belts: hand-off points, stalls, loops.

use beltway_core::geometry::{Direction, Side};
use beltway_core::id::ItemTypeId;
use beltway_core::segment::TerminationType;
use beltway_core::test_utils::*;
use beltway_spatial::{ConveyorWorld, GridPosition, WorldConfig, snapshot};

fn p(x: i32, y: i32) -> GridPosition {
    GridPosition::new(x, y)
}

fn slow_world() -> (ConveyorWorld, beltway_core::id::BeltTypeId) {
    let (registry, belt) = single_belt_registry(0.01);
    (ConveyorWorld::new(registry, WorldConfig::default()), belt)
}

fn seed(world: &mut ConveyorWorld, pos: GridPosition, side: Side, item: ItemTypeId) {
    let id = world.tile(pos).unwrap().segment;
    world.segment_mut(id).unwrap().append_item(side, dist(0.0), item);
}

#[test]
fn bend_lands_short_of_target_head() {
    let (mut world, belt) = slow_world();
    for x in (0..4).rev() {
        world.place_conveyor(p(x, 0), Direction::East, belt).unwrap();
    }
    for y in 1..4 {
        world.place_conveyor(p(0, y), Direction::North, belt).unwrap();
    }
    let feeder = world.segment_at(p(0, 1)).unwrap();
    assert_eq!(feeder.termination, TerminationType::BendRight);
    assert_eq!(feeder.length, 4);

    seed(&mut world, p(0, 1), Side::Left, iron_ore());
    let stats = world.tick_update();

    assert_eq!(stats.transfers, 1);
    let target = world.segment_at(p(0, 0)).unwrap();
    assert_eq!(lane_positions(&target.left), vec![dist(3.69)]);
    assert!(world.segment_at(p(0, 1)).unwrap().left.is_empty());
}

#[test]
fn side_load_lands_beside_the_fed_tile() {
    let (mut world, belt) = slow_world();
    for x in (-2..4).rev() {
        world.place_conveyor(p(x, 0), Direction::East, belt).unwrap();
    }
    world.place_conveyor(p(0, 1), Direction::North, belt).unwrap();
    assert_eq!(world.segment_at(p(0, 1)).unwrap().termination, TerminationType::RightOnly);

    seed(&mut world, p(0, 1), Side::Left, iron_ore());
    seed(&mut world, p(0, 1), Side::Right, copper_ore());
    let stats = world.tick_update();

    // Both feeder lanes empty onto the target's right lane.
    assert_eq!(stats.transfers, 2);
    let target = world.segment_at(p(0, 0)).unwrap();
    assert!(target.left.is_empty());
    let landed: Vec<_> = target.right.positions().collect();
    assert_eq!(landed, vec![(dist(3.29), copper_ore()), (dist(3.69), iron_ore())]);
}

#[test]
fn split_rear_hands_across_the_gap() {
    let (mut world, belt) = slow_world();
    for y in 0..3 {
        world.place_conveyor(p(0, y), Direction::North, belt).unwrap();
    }
    world.remove_conveyor(p(0, 1)).unwrap();
    seed(&mut world, p(0, 2), Side::Right, gear());

    world.tick_update();
    let front = world.segment_at(p(0, 0)).unwrap();
    assert_eq!(lane_positions(&front.right), vec![dist(0.99)]);
}

#[test]
fn blocked_lane_stalls_then_recovers() {
    let (mut world, belt) = slow_world();
    for y in 0..3 {
        world.place_conveyor(p(0, y), Direction::North, belt).unwrap();
    }
    world.remove_conveyor(p(0, 1)).unwrap();
    assert!(world.try_insert_item_at(p(0, 0), Side::Left, dist(0.6), iron_ore()));
    assert!(world.try_insert_item_at(p(0, 0), Side::Left, dist(0.85), iron_ore()));
    seed(&mut world, p(0, 2), Side::Left, gear());

    let first = world.tick_update();
    assert_eq!(first.blocked, 1);
    assert_eq!(first.stalled, 1);
    assert!(world.segment_at(p(0, 2)).unwrap().left.is_stalled());

    let mut reactivated = 0;
    for _ in 0..200 {
        reactivated += world.tick_update().reactivated;
    }
    assert_eq!(reactivated, 1);
    assert!(world.segment_at(p(0, 2)).unwrap().left.is_empty());
    let front = world.segment_at(p(0, 0)).unwrap();
    assert_eq!(lane_positions(&front.left), vec![dist(0.0), dist(0.25), dist(0.5)]);
    assert_eq!(front.left.items().back().map(|it| it.item), Some(gear()));
}

#[test]
fn popping_from_stalled_lane_lets_the_rest_advance() {
    let (mut world, belt) = slow_world();
    for y in 0..3 {
        world.place_conveyor(p(0, y), Direction::North, belt).unwrap();
    }
    world.remove_conveyor(p(0, 1)).unwrap();
    for at in [0.0, 0.25, 0.5, 0.75] {
        assert!(world.try_insert_item_at(p(0, 0), Side::Left, dist(at), iron_ore()));
    }
    assert!(world.try_insert_item_at(p(0, 2), Side::Left, dist(0.0), gear()));
    assert!(world.try_insert_item_at(p(0, 2), Side::Left, dist(0.25), gear()));
    for _ in 0..10 {
        world.tick_update();
    }
    assert!(world.segment_at(p(0, 2)).unwrap().left.is_stalled());

    assert_eq!(world.try_pop_item_at(p(0, 2), Side::Left, dist(0.0)), Some(gear()));
    for _ in 0..200 {
        world.tick_update();
    }
    let rear = world.segment_at(p(0, 2)).unwrap();
    assert_eq!(lane_positions(&rear.left), vec![dist(0.0)]);
    let front = world.segment_at(p(0, 0)).unwrap();
    assert_eq!(lane_positions(&front.left), vec![dist(0.0), dist(0.25), dist(0.5), dist(0.75)]);
}

fn ring(world: &mut ConveyorWorld, belt: beltway_core::id::BeltTypeId) {
    for x in 0..3 {
        world.place_conveyor(p(x, 0), Direction::East, belt).unwrap();
    }
    for y in 0..3 {
        world.place_conveyor(p(3, y), Direction::South, belt).unwrap();
    }
    for x in 1..4 {
        world.place_conveyor(p(x, 3), Direction::West, belt).unwrap();
    }
    for y in 1..4 {
        world.place_conveyor(p(0, y), Direction::North, belt).unwrap();
    }
}

#[test]
fn closed_loop_bends_every_corner() {
    let (mut world, belt) = slow_world();
    ring(&mut world, belt);
    assert_eq!(world.segment_count(), 4);
    for (_, seg) in world.arena().iter() {
        assert_eq!(seg.termination, TerminationType::BendRight);
        assert_eq!(seg.length, 4);
        assert!(seg.target.is_some());
    }
}

#[test]
fn closed_loop_conserves_items() {
    let (registry, belts) = standard_registry();
    let mut world = ConveyorWorld::new(registry, WorldConfig::default());
    ring(&mut world, belts.express);

    let mut inserted = 0;
    for (pos, _) in world.grid().iter().map(|(pos, tile)| (pos, *tile)).collect::<Vec<_>>() {
        for side in Side::BOTH {
            if world.try_insert_item_at(pos, side, dist(0.5), iron_plate()) {
                inserted += 1;
            }
        }
    }
    assert!(inserted > 12);

    let mut moved = 0;
    for _ in 0..2000 {
        moved += world.tick_update().transfers;
        assert_eq!(world.item_count(), inserted);
    }
    assert!(moved > 0);
    assert_arena_consistent(world.arena());
}

#[test]
fn snapshot_replays_a_loop_identically() {
    let (registry, belts) = standard_registry();
    let mut world = ConveyorWorld::new(registry, WorldConfig::default());
    ring(&mut world, belts.fast);
    world.try_insert_item_at(p(1, 0), Side::Left, dist(0.5), gear());
    world.try_insert_item_at(p(3, 2), Side::Right, dist(0.5), copper_ore());
    for _ in 0..37 {
        world.tick_update();
    }

    let bytes = snapshot::encode(&world).unwrap();
    let mut restored = snapshot::decode(&bytes, world.registry().clone()).unwrap();
    for _ in 0..500 {
        world.tick_update();
        restored.tick_update();
    }
    assert_eq!(restored.tick(), world.tick());
    assert_eq!(restored.state_hash(), world.state_hash());
}
