//! Room model: rectangular interior carved from the wall fill.

use crate::types::{Position, RoomId};

/// Function of a room inside a floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RoomKind {
    /// Unique to floor 1; where joining characters arrive.
    Entrance,
    Standard,
    Treasure,
    /// Unique to the final floor.
    Boss,
    /// Never contains mobs.
    Safe,
    Shop,
}

/// Rectangular carved interior. `x`/`y` is the top-left interior tile and
/// `width`/`height` span the interior only; the one-tile wall margin around
/// rooms is enforced at placement time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Room {
    pub id: RoomId,
    pub kind: RoomKind,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub explored: bool,
}

impl Room {
    pub fn new(id: RoomId, kind: RoomKind, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            id,
            kind,
            x,
            y,
            width,
            height,
            explored: false,
        }
    }

    pub fn center(&self) -> Position {
        Position::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= self.x
            && position.x < self.x + self.width
            && position.y >= self.y
            && position.y < self.y + self.height
    }

    pub fn area(&self) -> i32 {
        self.width * self.height
    }

    /// True if the other room's interior comes within `margin` tiles of this
    /// room's interior.
    pub fn intersects_with_margin(&self, other: &Room, margin: i32) -> bool {
        self.x - margin < other.x + other.width
            && other.x - margin < self.x + self.width
            && self.y - margin < other.y + other.height
            && other.y - margin < self.y + self.height
    }

    /// Interior positions in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = Position> + '_ {
        let (x, width) = (self.x, self.width);
        (self.y..self.y + self.height)
            .flat_map(move |y| (x..x + width).map(move |x| Position::new(x, y)))
    }
}
