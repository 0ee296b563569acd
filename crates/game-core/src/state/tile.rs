//! Tile model: one cell of a floor grid.

use crate::types::{CharacterId, ItemId, MobId, RoomId};

/// Terrain class of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TileKind {
    Wall,
    Floor,
    UpStairs,
    DownStairs,
    Door,
}

impl TileKind {
    pub fn is_walkable(self) -> bool {
        !matches!(self, TileKind::Wall)
    }

    pub fn is_stairs(self) -> bool {
        matches!(self, TileKind::UpStairs | TileKind::DownStairs)
    }
}

/// One cell of a floor grid.
///
/// The `character`, `mob`, and `item` fields are denormalized back-pointers
/// into the floor's authoritative indexes. They are rebuilt by every mutation
/// that could desynchronize them and carry no ownership. A walkable tile
/// holds at most one character and at most one mob; Wall tiles hold nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tile {
    pub kind: TileKind,
    /// Derived from `kind` but stored for fast lookup.
    pub walkable: bool,
    /// Persists for the lifetime of the floor.
    pub explored: bool,
    /// Transient; recomputed by visibility passes.
    pub visible: bool,
    pub room: Option<RoomId>,
    pub character: Option<CharacterId>,
    pub mob: Option<MobId>,
    pub item: Option<ItemId>,
}

impl Tile {
    pub fn new(kind: TileKind) -> Self {
        Self {
            kind,
            walkable: kind.is_walkable(),
            explored: false,
            visible: false,
            room: None,
            character: None,
            mob: None,
            item: None,
        }
    }

    pub fn wall() -> Self {
        Self::new(TileKind::Wall)
    }

    pub fn floor(room: RoomId) -> Self {
        let mut tile = Self::new(TileKind::Floor);
        tile.room = Some(room);
        tile
    }

    /// Corridor tile: walkable floor outside any room.
    pub fn corridor() -> Self {
        Self::new(TileKind::Floor)
    }

    /// Change the terrain kind in place, keeping exploration state and
    /// occupants. Used when stamping stairs onto carved floor tiles.
    pub fn set_kind(&mut self, kind: TileKind) {
        self.kind = kind;
        self.walkable = kind.is_walkable();
    }

    pub fn is_stairs(&self) -> bool {
        self.kind.is_stairs()
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self::wall()
    }
}
