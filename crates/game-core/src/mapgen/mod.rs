//! Seeded procedural floor generation.
//!
//! The pipeline is pure with respect to the constructor seed: the same seed
//! and the same arguments produce a byte-identical floor. Stages run in a
//! fixed order (fill, rooms, corridors, stairs, mobs, items) over a single
//! per-floor RNG stream.

mod corridors;
mod loot;
mod rooms;
mod spawns;

pub use loot::random_item;

use crate::rng::Pcg32;
use crate::state::{Floor, Room, RoomKind, TileKind};
use crate::types::{Difficulty, Position};

pub const DEFAULT_FLOOR_WIDTH: i32 = 80;
pub const DEFAULT_FLOOR_HEIGHT: i32 = 40;

/// Deterministic floor generator for one dungeon.
#[derive(Clone, Copy, Debug)]
pub struct MapGenerator {
    seed: u64,
    width: i32,
    height: i32,
}

impl MapGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            width: DEFAULT_FLOOR_WIDTH,
            height: DEFAULT_FLOOR_HEIGHT,
        }
    }

    /// Generator with a non-default grid size. Mostly for tests, which keep
    /// runtimes down with small grids.
    pub fn with_dimensions(seed: u64, width: i32, height: i32) -> Self {
        Self {
            seed,
            width,
            height,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Build the complete floor for `level`: tile grid, rooms, stairs, mobs,
    /// and items, satisfying the topology and difficulty constraints.
    pub fn generate_floor(&self, level: u32, is_final: bool, difficulty: Difficulty) -> Floor {
        let mut rng = Pcg32::new(floor_seed(self.seed, level));
        let mut floor = Floor::filled_walls(level, self.width, self.height);

        rooms::plan_and_carve(&mut floor, &mut rng, level, is_final);
        corridors::connect_rooms(&mut floor, &mut rng);
        corridors::place_doors(&mut floor);
        place_stairs(&mut floor, &mut rng, level, is_final);
        spawns::place_mobs(&mut floor, &mut rng, level, difficulty);
        loot::place_items(&mut floor, &mut rng, level);

        floor
    }
}

/// Mix the level into the dungeon seed so each floor draws from its own
/// stream. SplitMix64 gamma as the mixing constant.
fn floor_seed(seed: u64, level: u32) -> u64 {
    seed ^ (level as u64).wrapping_mul(0x9e3779b97f4a7c15)
}

/// Stairs: UpStairs in the first room on every level but the first,
/// DownStairs on every level but the last. On level 1 the DownStairs sits at
/// a fixed offset inside the Entrance room and starts explored.
fn place_stairs(floor: &mut Floor, rng: &mut Pcg32, level: u32, is_final: bool) {
    if level > 1 {
        if let Some(room) = floor.rooms.first().copied() {
            if let Some(position) = random_stair_tile(floor, &room, rng) {
                stamp_stairs(floor, position, TileKind::UpStairs);
            }
        }
    }

    if !is_final {
        if level == 1 {
            let entrance = floor
                .rooms
                .iter()
                .find(|room| room.kind == RoomKind::Entrance)
                .copied();
            if let Some(room) = entrance {
                let position = Position::new(room.x + room.width - 2, room.y + room.height - 2);
                stamp_stairs(floor, position, TileKind::DownStairs);
                if let Some(tile) = floor.tile_mut(position) {
                    tile.explored = true;
                }
            }
        } else if let Some(room) = floor.rooms.last().copied() {
            if let Some(position) = random_stair_tile(floor, &room, rng) {
                stamp_stairs(floor, position, TileKind::DownStairs);
            }
        }
    }
}

fn random_stair_tile(floor: &Floor, room: &Room, rng: &mut Pcg32) -> Option<Position> {
    let candidates: Vec<Position> = room
        .tiles()
        .filter(|position| {
            floor
                .tile(*position)
                .is_some_and(|tile| tile.walkable && !tile.is_stairs())
        })
        .collect();
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.next_u32() as usize % candidates.len()])
    }
}

fn stamp_stairs(floor: &mut Floor, position: Position, kind: TileKind) {
    if let Some(tile) = floor.tile_mut(position) {
        tile.set_kind(kind);
    }
    match kind {
        TileKind::UpStairs => floor.up_stairs.push(position),
        TileKind::DownStairs => floor.down_stairs.push(position),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{MobKind, MobVariant};
    use std::collections::BTreeMap;

    fn generate(seed: u64, level: u32, is_final: bool, difficulty: Difficulty) -> Floor {
        MapGenerator::new(seed).generate_floor(level, is_final, difficulty)
    }

    #[test]
    fn same_seed_yields_byte_identical_floors() {
        for (level, is_final) in [(1, false), (2, false), (3, true)] {
            for difficulty in [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard] {
                let a = generate(42, level, is_final, difficulty);
                let b = generate(42, level, is_final, difficulty);
                let bytes_a = bincode::serialize(&a).unwrap();
                let bytes_b = bincode::serialize(&b).unwrap();
                assert_eq!(bytes_a, bytes_b);
            }
        }
    }

    #[test]
    fn different_seeds_yield_different_floors() {
        let a = generate(1, 1, false, Difficulty::Normal);
        let b = generate(2, 1, false, Difficulty::Normal);
        assert_ne!(
            bincode::serialize(&a).unwrap(),
            bincode::serialize(&b).unwrap()
        );
    }

    #[test]
    fn generated_floors_are_internally_consistent() {
        for level in 1..=5 {
            let floor = generate(12345, level, level == 5, Difficulty::Normal);
            floor.verify_consistency().unwrap();
        }
    }

    #[test]
    fn stair_topology_across_levels() {
        let first = generate(7, 1, false, Difficulty::Normal);
        assert!(first.up_stairs.is_empty());
        assert!(!first.down_stairs.is_empty());

        let middle = generate(7, 2, false, Difficulty::Normal);
        assert!(!middle.up_stairs.is_empty());
        assert!(!middle.down_stairs.is_empty());

        let last = generate(7, 3, true, Difficulty::Normal);
        assert!(!last.up_stairs.is_empty());
        assert!(last.down_stairs.is_empty());
    }

    #[test]
    fn entrance_room_only_on_level_one() {
        let first = generate(99, 1, false, Difficulty::Normal);
        let entrances = first
            .rooms
            .iter()
            .filter(|room| room.kind == RoomKind::Entrance)
            .count();
        assert_eq!(entrances, 1);
        let entrance = first
            .rooms
            .iter()
            .find(|room| room.kind == RoomKind::Entrance)
            .unwrap();
        assert!(entrance.explored);

        let deeper = generate(99, 2, false, Difficulty::Normal);
        assert!(deeper.rooms.iter().all(|room| room.kind != RoomKind::Entrance));
    }

    #[test]
    fn level_one_down_stairs_sits_in_the_entrance() {
        let floor = generate(4242, 1, false, Difficulty::Normal);
        let entrance = floor
            .rooms
            .iter()
            .find(|room| room.kind == RoomKind::Entrance)
            .unwrap();
        let stairs = floor.down_stairs[0];
        assert_eq!(
            stairs,
            Position::new(entrance.x + entrance.width - 2, entrance.y + entrance.height - 2)
        );
        assert!(floor.tile(stairs).unwrap().explored);
    }

    #[test]
    fn boss_room_only_on_final_floor() {
        let last = generate(5, 4, true, Difficulty::Normal);
        let boss_rooms: Vec<_> = last
            .rooms
            .iter()
            .filter(|room| room.kind == RoomKind::Boss)
            .collect();
        assert_eq!(boss_rooms.len(), 1);

        let bosses: Vec<_> = last
            .mobs
            .values()
            .filter(|mob| mob.variant == MobVariant::Boss)
            .collect();
        assert_eq!(bosses.len(), 1);
        // Below level 10 the boss is an Ogre.
        assert_eq!(bosses[0].kind, MobKind::Ogre);
        assert!(boss_rooms[0].contains(bosses[0].position));

        let middle = generate(5, 2, false, Difficulty::Normal);
        assert!(middle.rooms.iter().all(|room| room.kind != RoomKind::Boss));
        assert!(middle
            .mobs
            .values()
            .all(|mob| mob.variant != MobVariant::Boss));
    }

    #[test]
    fn deep_boss_is_a_dragon() {
        let floor = generate(5, 10, true, Difficulty::Normal);
        let boss = floor
            .mobs
            .values()
            .find(|mob| mob.variant == MobVariant::Boss)
            .unwrap();
        assert_eq!(boss.kind, MobKind::Dragon);
    }

    #[test]
    fn safe_rooms_and_first_room_hold_no_mobs() {
        for seed in [3, 17, 2024] {
            let floor = generate(seed, 3, false, Difficulty::Normal);
            for mob in floor.mobs.values() {
                let room = floor.room_at(mob.position);
                if let Some(room) = room {
                    assert_ne!(room.kind, RoomKind::Safe);
                    assert_ne!(room.kind, RoomKind::Entrance);
                    assert_ne!(room.id, floor.rooms[0].id);
                }
            }
        }
    }

    #[test]
    fn rooms_keep_a_wall_margin() {
        let floor = generate(8, 2, false, Difficulty::Normal);
        for (i, a) in floor.rooms.iter().enumerate() {
            for b in floor.rooms.iter().skip(i + 1) {
                assert!(!a.intersects_with_margin(b, 1));
            }
        }
    }

    #[test]
    fn mob_counts_respect_the_room_cap() {
        let floor = generate(21, 6, false, Difficulty::Hard);
        let mut per_room: BTreeMap<_, u32> = BTreeMap::new();
        for mob in floor.mobs.values() {
            if let Some(room) = floor.room_at(mob.position) {
                *per_room.entry(room.id).or_default() += 1;
            }
        }
        for (_, count) in per_room {
            assert!(count <= 8);
        }
    }

    #[test]
    fn items_rest_on_walkable_non_stair_tiles() {
        let mut total = 0;
        for seed in [31, 32, 33] {
            let floor = generate(seed, 2, false, Difficulty::Normal);
            total += floor.items.len();
            for item in floor.items.values() {
                let position = item.position.unwrap();
                let tile = floor.tile(position).unwrap();
                assert!(tile.walkable);
                assert!(!tile.is_stairs());
                assert_eq!(tile.item, Some(item.id));
            }
        }
        assert!(total > 0);
    }

    #[test]
    fn doors_sit_between_corridors_and_rooms() {
        let mut total = 0;
        for seed in [11, 12, 13] {
            let floor = generate(seed, 2, false, Difficulty::Normal);
            for y in 0..floor.height {
                for x in 0..floor.width {
                    let position = Position::new(x, y);
                    let tile = floor.tile(position).unwrap();
                    if tile.kind != crate::state::TileKind::Door {
                        continue;
                    }
                    total += 1;
                    assert!(tile.walkable);
                    assert!(tile.room.is_none());
                    let touches_room = [(0, -1), (0, 1), (-1, 0), (1, 0)].iter().any(|(dx, dy)| {
                        floor
                            .tile(Position::new(x + dx, y + dy))
                            .is_some_and(|neighbor| neighbor.room.is_some() && neighbor.walkable)
                    });
                    assert!(touches_room);
                }
            }
            floor.verify_consistency().unwrap();
        }
        assert!(total > 0);
    }

    #[test]
    fn mobs_avoid_stair_tiles() {
        for level in [2, 3, 4] {
            let floor = generate(77, level, false, Difficulty::Normal);
            for mob in floor.mobs.values() {
                assert!(!floor.tile(mob.position).unwrap().is_stairs());
            }
        }
    }
}
