//! Room planning and carving.

use crate::rng::Pcg32;
use crate::state::{Floor, Room, RoomKind, Tile};
use crate::types::RoomId;

/// Plan the floor's rooms and carve them out of the wall fill.
///
/// Level 1 always opens with the 8x8 Entrance room near the grid center. On
/// the final floor the first room placed after the arrival room is the Boss
/// room. Remaining placements roll 10% Treasure, 5% Safe, 5% Shop (level > 2
/// only), else Standard.
pub(super) fn plan_and_carve(floor: &mut Floor, rng: &mut Pcg32, level: u32, is_final: bool) {
    let target = (5 + rng.range(0, (level + 5).min(15))) as usize;

    if level == 1 {
        place_entrance(floor, rng);
    }

    let mut boss_pending = is_final;
    let max_attempts = target * 3;
    let mut attempts = 0;

    while floor.rooms.len() < target && attempts < max_attempts {
        attempts += 1;

        let width = rng.range(5, 10) as i32;
        let height = rng.range(5, 10) as i32;
        if width + 2 > floor.width || height + 2 > floor.height {
            continue;
        }
        let x = rng.range_i32(1, floor.width - width - 1);
        let y = rng.range_i32(1, floor.height - height - 1);

        let id = RoomId(floor.rooms.len() as u32);
        let mut room = Room::new(id, RoomKind::Standard, x, y, width, height);

        // Two tiles of clearance from every existing room.
        if floor
            .rooms
            .iter()
            .any(|existing| existing.intersects_with_margin(&room, 2))
        {
            continue;
        }

        room.kind = if boss_pending && !floor.rooms.is_empty() {
            boss_pending = false;
            RoomKind::Boss
        } else {
            roll_kind(rng, level)
        };

        carve(floor, &room);
        floor.rooms.push(room);
    }
}

fn roll_kind(rng: &mut Pcg32, level: u32) -> RoomKind {
    let roll = rng.roll_d100();
    if roll <= 10 {
        RoomKind::Treasure
    } else if roll <= 15 {
        RoomKind::Safe
    } else if roll <= 20 && level > 2 {
        RoomKind::Shop
    } else {
        RoomKind::Standard
    }
}

/// The Entrance room: 8x8, near the grid center with a small random offset,
/// clamped to the one-tile border. It starts explored.
fn place_entrance(floor: &mut Floor, rng: &mut Pcg32) {
    const SIDE: i32 = 8;

    let offset_x = rng.range_i32(-3, 3);
    let offset_y = rng.range_i32(-3, 3);
    let x = (floor.width / 2 - SIDE / 2 + offset_x).clamp(1, floor.width - SIDE - 1);
    let y = (floor.height / 2 - SIDE / 2 + offset_y).clamp(1, floor.height - SIDE - 1);

    let mut room = Room::new(RoomId(0), RoomKind::Entrance, x, y, SIDE, SIDE);
    room.explored = true;
    carve(floor, &room);
    floor.rooms.push(room);
}

fn carve(floor: &mut Floor, room: &Room) {
    for position in room.tiles() {
        if let Some(tile) = floor.tile_mut(position) {
            let mut carved = Tile::floor(room.id);
            carved.explored = room.explored;
            *tile = carved;
        }
    }
}
