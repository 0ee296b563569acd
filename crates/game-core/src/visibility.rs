//! Field-of-view recomputation and exploration marking.
//!
//! `visible` is transient and recomputed from the observer's position;
//! `explored` is sticky for the floor's lifetime. A room counts as explored
//! the moment any of its tiles is seen.

use std::collections::BTreeSet;

use crate::state::{Floor, TileKind};
use crate::types::{Position, RoomId};

/// How far a character can see, in tiles.
pub const VIEW_RADIUS: i32 = 8;

/// Recompute visibility around one observer, marking newly seen tiles and
/// rooms explored.
pub fn recompute(floor: &mut Floor, origin: Position, radius: i32) {
    for tile in &mut floor.tiles {
        tile.visible = false;
    }

    let mut seen_rooms: BTreeSet<RoomId> = BTreeSet::new();

    for y in origin.y - radius..=origin.y + radius {
        for x in origin.x - radius..=origin.x + radius {
            let target = Position::new(x, y);
            if !floor.contains(target) {
                continue;
            }
            let dx = x - origin.x;
            let dy = y - origin.y;
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            if !line_of_sight(floor, origin, target) {
                continue;
            }
            if let Some(tile) = floor.tile_mut(target) {
                tile.visible = true;
                tile.explored = true;
                if let Some(room) = tile.room {
                    seen_rooms.insert(room);
                }
            }
        }
    }

    for room in &mut floor.rooms {
        if seen_rooms.contains(&room.id) {
            room.explored = true;
        }
    }
}

/// Bresenham line walk from `from` to `to`. Walls block sight past
/// themselves but are visible as the blocking tile.
fn line_of_sight(floor: &Floor, from: Position, to: Position) -> bool {
    let mut x = from.x;
    let mut y = from.y;
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x == to.x && y == to.y {
            return true;
        }
        // Intermediate walls occlude everything behind them.
        if (x != from.x || y != from.y)
            && floor
                .tile(Position::new(x, y))
                .is_none_or(|tile| tile.kind == TileKind::Wall)
        {
            return false;
        }

        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            x += sx;
        }
        if doubled <= dx {
            err += dx;
            y += sy;
        }
    }
}
