//! L-shaped corridors between adjacent rooms in planning order.

use crate::rng::Pcg32;
use crate::state::{Floor, Tile, TileKind};
use crate::types::Position;

/// Connect each adjacent pair of rooms by an L-shaped corridor between
/// their centers, flipping a coin for horizontal-first vs vertical-first.
/// Connecting pairs in planning order links every room into one component.
pub(super) fn connect_rooms(floor: &mut Floor, rng: &mut Pcg32) {
    let centers: Vec<Position> = floor.rooms.iter().map(|room| room.center()).collect();

    for pair in centers.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        if rng.coin_flip() {
            carve_horizontal(floor, from.x, to.x, from.y);
            carve_vertical(floor, from.y, to.y, to.x);
        } else {
            carve_vertical(floor, from.y, to.y, from.x);
            carve_horizontal(floor, from.x, to.x, to.y);
        }
    }
}

fn carve_horizontal(floor: &mut Floor, x0: i32, x1: i32, y: i32) {
    for x in x0.min(x1)..=x0.max(x1) {
        carve_tile(floor, Position::new(x, y));
    }
}

fn carve_vertical(floor: &mut Floor, y0: i32, y1: i32, x: i32) {
    for y in y0.min(y1)..=y0.max(y1) {
        carve_tile(floor, Position::new(x, y));
    }
}

fn carve_tile(floor: &mut Floor, position: Position) {
    if let Some(tile) = floor.tile_mut(position) {
        if tile.kind == TileKind::Wall {
            *tile = Tile::corridor();
        }
    }
}

/// Stamp Door tiles where corridors meet room interiors: a corridor tile
/// touching at least one room tile and flanked by at least two walls is a
/// doorway. Doors stay walkable, so connectivity is unaffected.
pub(super) fn place_doors(floor: &mut Floor) {
    let mut doorways = Vec::new();

    for y in 0..floor.height {
        for x in 0..floor.width {
            let position = Position::new(x, y);
            let Some(tile) = floor.tile(position) else {
                continue;
            };
            if tile.kind != TileKind::Floor || tile.room.is_some() {
                continue;
            }

            let mut room_neighbors = 0;
            let mut wall_neighbors = 0;
            for (dx, dy) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
                match floor.tile(Position::new(x + dx, y + dy)) {
                    Some(neighbor) if neighbor.kind == TileKind::Wall => wall_neighbors += 1,
                    Some(neighbor) if neighbor.room.is_some() && neighbor.walkable => {
                        room_neighbors += 1
                    }
                    _ => {}
                }
            }
            if room_neighbors >= 1 && wall_neighbors >= 2 {
                doorways.push(position);
            }
        }
    }

    for position in doorways {
        if let Some(tile) = floor.tile_mut(position) {
            tile.set_kind(TileKind::Door);
        }
    }
}
