//! Mob placement: pool by level, count by room size and difficulty,
//! variant by difficulty table.

use crate::rng::Pcg32;
use crate::state::{Floor, Mob, MobKind, MobVariant, Room, RoomKind};
use crate::types::{Difficulty, MobId, Position};

/// Per-room mob cap after all bonuses.
const MAX_MOBS_PER_ROOM: u32 = 8;

pub(super) fn place_mobs(floor: &mut Floor, rng: &mut Pcg32, level: u32, difficulty: Difficulty) {
    let pool = mob_pool(level);
    let rooms = floor.rooms.clone();
    let mut sequence: u64 = 0;

    for (index, room) in rooms.iter().enumerate() {
        // The arrival room and protected kinds stay clear.
        if index == 0 || matches!(room.kind, RoomKind::Safe | RoomKind::Entrance) {
            continue;
        }

        if room.kind == RoomKind::Boss {
            let kind = if level >= 10 {
                MobKind::Dragon
            } else {
                MobKind::Ogre
            };
            sequence += 1;
            let boss = Mob::spawn(
                mob_id(level, sequence),
                kind,
                MobVariant::Boss,
                level,
                room.center(),
            );
            floor.place_mob(boss);
            continue;
        }

        let mut count = 1 + rng.range(0, 2);
        let area = room.area();
        if area > 80 {
            count += 2;
        } else if area > 50 {
            count += 1;
        }
        count += level / 3;
        count = match difficulty {
            Difficulty::Easy => count.saturating_sub(1).max(1),
            Difficulty::Normal => count,
            Difficulty::Hard => count + 1,
        };
        let count = count.min(MAX_MOBS_PER_ROOM);

        for _ in 0..count {
            let kind = *rng.pick(&pool);
            let variant = roll_variant(rng, difficulty);
            let Some(position) = random_mob_tile(floor, room, rng) else {
                break;
            };
            sequence += 1;
            floor.place_mob(Mob::spawn(
                mob_id(level, sequence),
                kind,
                variant,
                level,
                position,
            ));
        }
    }
}

/// Ids unique within the dungeon: level in the high bits, per-floor sequence
/// in the low bits.
fn mob_id(level: u32, sequence: u64) -> MobId {
    MobId(((level as u64) << 32) | sequence)
}

/// The type pool widens as floors get deeper.
fn mob_pool(level: u32) -> Vec<MobKind> {
    let mut pool = vec![MobKind::Skeleton, MobKind::Goblin, MobKind::Ratman];
    if level >= 3 {
        pool.extend([MobKind::Orc, MobKind::Ooze]);
    }
    if level >= 5 {
        pool.extend([MobKind::Troll, MobKind::Wraith]);
    }
    if level >= 8 {
        pool.extend([MobKind::Ogre, MobKind::Drake]);
    }
    if level >= 10 {
        pool.extend([MobKind::Lich, MobKind::Elemental]);
    }
    pool
}

fn roll_variant(rng: &mut Pcg32, difficulty: Difficulty) -> MobVariant {
    let roll = rng.roll_d100();
    match difficulty {
        Difficulty::Easy => {
            if roll <= 80 {
                MobVariant::Easy
            } else {
                MobVariant::Normal
            }
        }
        Difficulty::Normal => {
            if roll <= 60 {
                MobVariant::Easy
            } else if roll <= 90 {
                MobVariant::Normal
            } else {
                MobVariant::Hard
            }
        }
        Difficulty::Hard => {
            if roll <= 30 {
                MobVariant::Easy
            } else if roll <= 70 {
                MobVariant::Normal
            } else {
                MobVariant::Hard
            }
        }
    }
}

/// Uniformly random walkable tile in the room that is not a stair tile and
/// holds no mob yet.
fn random_mob_tile(floor: &Floor, room: &Room, rng: &mut Pcg32) -> Option<Position> {
    let candidates: Vec<Position> = room
        .tiles()
        .filter(|position| {
            floor
                .tile(*position)
                .is_some_and(|tile| tile.walkable && !tile.is_stairs() && tile.mob.is_none())
        })
        .collect();
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.next_u32() as usize % candidates.len()])
    }
}
