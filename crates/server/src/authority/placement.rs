//! Arrival-tile selection for characters entering a floor.

use game_core::{Floor, Position, RoomKind};

/// Cardinal neighbors first, then diagonals.
const ADJACENT_OFFSETS: [(i32, i32); 8] = [
    (0, -1),
    (0, 1),
    (-1, 0),
    (1, 0),
    (-1, -1),
    (1, -1),
    (-1, 1),
    (1, 1),
];

fn is_free(floor: &Floor, position: Position) -> bool {
    floor
        .tile(position)
        .is_some_and(|tile| tile.walkable && tile.character.is_none() && tile.mob.is_none())
}

/// First free tile adjacent to `around`, cardinal directions before
/// diagonals.
fn adjacent_free(floor: &Floor, around: Position) -> Option<Position> {
    ADJACENT_OFFSETS
        .iter()
        .map(|(dx, dy)| Position::new(around.x + dx, around.y + dy))
        .find(|candidate| is_free(floor, *candidate))
}

/// Choose where a character lands when entering this floor.
///
/// Floor 1 places next to the Entrance room's DownStairs; descending into a
/// Safe room places next to its UpStairs. Both fall back to the room center
/// and finally to the first free walkable tile in row-major order. Every
/// other arrival lands on the first matching stair tile.
pub fn arrival_position(floor: &Floor, arriving_from_above: bool) -> Position {
    if floor.level == 1 {
        if let Some(entrance) = floor
            .rooms
            .iter()
            .find(|room| room.kind == RoomKind::Entrance)
        {
            let stairs = floor
                .down_stairs
                .iter()
                .copied()
                .find(|position| entrance.contains(*position));
            if let Some(stairs) = stairs {
                if let Some(position) = adjacent_free(floor, stairs) {
                    return position;
                }
            }
            if is_free(floor, entrance.center()) {
                return entrance.center();
            }
        }
        return fallback(floor);
    }

    if arriving_from_above {
        if let Some(stairs) = floor.up_stairs.first().copied() {
            if let Some(room) = floor.room_at(stairs) {
                if room.kind == RoomKind::Safe {
                    let center = room.center();
                    if let Some(position) = adjacent_free(floor, stairs) {
                        return position;
                    }
                    if is_free(floor, center) {
                        return center;
                    }
                    return fallback(floor);
                }
            }
        }
    }

    let stairs = if arriving_from_above {
        floor.up_stairs.first().copied()
    } else {
        floor.down_stairs.first().copied()
    };
    match stairs {
        Some(position) if is_free(floor, position) => position,
        Some(position) => adjacent_free(floor, position).unwrap_or_else(|| fallback(floor)),
        None => fallback(floor),
    }
}

fn fallback(floor: &Floor) -> Position {
    floor.first_walkable_empty().unwrap_or(Position::ORIGIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::{
        CharacterId, Floor, MobId, MobKind, MobVariant, Mob, Room, RoomId, RoomKind, Tile,
        TileKind,
    };

    fn floor_with_entrance() -> Floor {
        let mut floor = Floor::filled_walls(1, 20, 20);
        let mut room = Room::new(RoomId(0), RoomKind::Entrance, 2, 2, 8, 8);
        room.explored = true;
        for position in room.tiles().collect::<Vec<_>>() {
            *floor.tile_mut(position).unwrap() = Tile::floor(RoomId(0));
        }
        floor.rooms.push(room);

        let stairs = Position::new(room.x + room.width - 2, room.y + room.height - 2);
        floor.tile_mut(stairs).unwrap().set_kind(TileKind::DownStairs);
        floor.down_stairs.push(stairs);
        floor
    }

    #[test]
    fn floor_one_arrivals_land_next_to_the_entrance_stairs() {
        let floor = floor_with_entrance();
        let stairs = floor.down_stairs[0];
        let position = arrival_position(&floor, false);

        let dx = (position.x - stairs.x).abs();
        let dy = (position.y - stairs.y).abs();
        assert!(dx <= 1 && dy <= 1 && (dx, dy) != (0, 0));
        assert!(floor.tile(position).unwrap().walkable);
    }

    #[test]
    fn cardinal_neighbors_win_over_diagonals() {
        let floor = floor_with_entrance();
        let stairs = floor.down_stairs[0];
        let position = arrival_position(&floor, false);
        // First offset in the search order is (0, -1).
        assert_eq!(position, Position::new(stairs.x, stairs.y - 1));
    }

    #[test]
    fn occupied_neighbors_are_skipped() {
        let mut floor = floor_with_entrance();
        let stairs = floor.down_stairs[0];
        let above = Position::new(stairs.x, stairs.y - 1);
        floor.set_character(above, Some(CharacterId(9)));

        let position = arrival_position(&floor, false);
        assert_ne!(position, above);
        assert!(is_free(&floor, position));
    }

    #[test]
    fn mob_tiles_are_not_free() {
        let mut floor = floor_with_entrance();
        let stairs = floor.down_stairs[0];
        let above = Position::new(stairs.x, stairs.y - 1);
        floor.place_mob(Mob::spawn(
            MobId(1),
            MobKind::Goblin,
            MobVariant::Normal,
            1,
            above,
        ));

        let position = arrival_position(&floor, false);
        assert_ne!(position, above);
    }

    #[test]
    fn descending_lands_on_the_up_stairs() {
        let mut floor = Floor::filled_walls(2, 12, 12);
        let room = Room::new(RoomId(0), RoomKind::Standard, 1, 1, 6, 6);
        for position in room.tiles().collect::<Vec<_>>() {
            *floor.tile_mut(position).unwrap() = Tile::floor(RoomId(0));
        }
        floor.rooms.push(room);
        let stairs = Position::new(3, 3);
        floor.tile_mut(stairs).unwrap().set_kind(TileKind::UpStairs);
        floor.up_stairs.push(stairs);

        assert_eq!(arrival_position(&floor, true), stairs);
    }

    #[test]
    fn descending_into_a_safe_room_avoids_the_stairs_tile() {
        let mut floor = Floor::filled_walls(3, 12, 12);
        let room = Room::new(RoomId(0), RoomKind::Safe, 1, 1, 6, 6);
        for position in room.tiles().collect::<Vec<_>>() {
            *floor.tile_mut(position).unwrap() = Tile::floor(RoomId(0));
        }
        floor.rooms.push(room);
        let stairs = Position::new(4, 4);
        floor.tile_mut(stairs).unwrap().set_kind(TileKind::UpStairs);
        floor.up_stairs.push(stairs);

        let position = arrival_position(&floor, true);
        assert_ne!(position, stairs);
        assert!(room.contains(position));
        assert!(!floor.tile(position).unwrap().is_stairs());
    }
}
