//! Floor model: one grid level of a dungeon.
//!
//! The `mobs` and `items` maps are the authoritative indexes; tile
//! back-pointers are a denormalized lookup kept in sync by the mutation
//! helpers here. Everything that moves an entity on or off a tile goes
//! through these helpers so the two views cannot drift apart.

use std::collections::{BTreeMap, VecDeque};

use crate::state::{Item, Mob, Room, Tile, TileKind};
use crate::types::{CharacterId, ItemId, MobId, Position, RoomId};

/// Desynchronization between an authoritative index and its tile
/// back-pointers, reported by [`Floor::verify_consistency`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    #[error("mob {id} at {position} has no matching tile back-pointer")]
    MobPointerMissing { id: MobId, position: Position },

    #[error("tile {position} points at mob {id} absent from the index")]
    StaleMobPointer { id: MobId, position: Position },

    #[error("item {id} at {position} has no matching tile back-pointer")]
    ItemPointerMissing { id: ItemId, position: Position },

    #[error("tile {position} points at item {id} absent from the index")]
    StaleItemPointer { id: ItemId, position: Position },

    #[error("wall tile {position} carries an occupant or item")]
    OccupiedWall { position: Position },

    #[error("walkable tiles are not fully connected")]
    Disconnected,

    #[error("stair list entry {position} does not reference a stair tile")]
    StairMismatch { position: Position },
}

/// One grid level of a dungeon.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Floor {
    /// 1-indexed level within the dungeon.
    pub level: u32,
    pub width: i32,
    pub height: i32,
    /// Row-major grid, `height * width` tiles.
    pub tiles: Vec<Tile>,
    pub rooms: Vec<Room>,
    pub up_stairs: Vec<Position>,
    pub down_stairs: Vec<Position>,
    pub mobs: BTreeMap<MobId, Mob>,
    pub items: BTreeMap<ItemId, Item>,
}

impl Floor {
    /// A floor of solid wall, the starting point of generation.
    pub fn filled_walls(level: u32, width: i32, height: i32) -> Self {
        Self {
            level,
            width,
            height,
            tiles: vec![Tile::wall(); (width * height) as usize],
            rooms: Vec::new(),
            up_stairs: Vec::new(),
            down_stairs: Vec::new(),
            mobs: BTreeMap::new(),
            items: BTreeMap::new(),
        }
    }

    pub fn contains(&self, position: Position) -> bool {
        position.x >= 0 && position.y >= 0 && position.x < self.width && position.y < self.height
    }

    fn index(&self, position: Position) -> usize {
        (position.y * self.width + position.x) as usize
    }

    pub fn tile(&self, position: Position) -> Option<&Tile> {
        self.contains(position).then(|| &self.tiles[self.index(position)])
    }

    pub fn tile_mut(&mut self, position: Position) -> Option<&mut Tile> {
        if self.contains(position) {
            let index = self.index(position);
            Some(&mut self.tiles[index])
        } else {
            None
        }
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|room| room.id == id)
    }

    pub fn room_at(&self, position: Position) -> Option<&Room> {
        self.tile(position)
            .and_then(|tile| tile.room)
            .and_then(|id| self.room(id))
    }

    // ------------------------------------------------------------------
    // Mob index maintenance
    // ------------------------------------------------------------------

    /// Insert a mob and stamp its tile back-pointer.
    pub fn place_mob(&mut self, mob: Mob) {
        let position = mob.position;
        let id = mob.id;
        self.mobs.insert(id, mob);
        if let Some(tile) = self.tile_mut(position) {
            tile.mob = Some(id);
        }
    }

    /// Remove a mob and clear its tile back-pointer.
    pub fn remove_mob(&mut self, id: MobId) -> Option<Mob> {
        let mob = self.mobs.remove(&id)?;
        if let Some(tile) = self.tile_mut(mob.position) {
            if tile.mob == Some(id) {
                tile.mob = None;
            }
        }
        Some(mob)
    }

    // ------------------------------------------------------------------
    // Item index maintenance
    // ------------------------------------------------------------------

    /// Insert a floor item (its position must be set) and stamp the tile.
    pub fn place_item(&mut self, item: Item) {
        let id = item.id;
        let position = item.position;
        self.items.insert(id, item);
        if let Some(position) = position {
            if let Some(tile) = self.tile_mut(position) {
                tile.item = Some(id);
            }
        }
    }

    /// Remove an item from the floor index and clear its tile back-pointer.
    pub fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        let item = self.items.remove(&id)?;
        if let Some(position) = item.position {
            if let Some(tile) = self.tile_mut(position) {
                if tile.item == Some(id) {
                    tile.item = None;
                }
            }
        }
        Some(item)
    }

    // ------------------------------------------------------------------
    // Character occupancy
    // ------------------------------------------------------------------

    /// Stamp a character onto a tile. The caller has already validated the
    /// destination; this only maintains the back-pointer.
    pub fn set_character(&mut self, position: Position, character: Option<CharacterId>) {
        if let Some(tile) = self.tile_mut(position) {
            tile.character = character;
        }
    }

    /// Clear every tile pointing at this character. Normally at most one
    /// tile does; sweeping the grid keeps invariant repair cheap to express.
    pub fn clear_character(&mut self, character: CharacterId) {
        for tile in &mut self.tiles {
            if tile.character == Some(character) {
                tile.character = None;
            }
        }
    }

    /// First walkable tile holding neither character nor mob, scanned
    /// row-major. Final fallback of stair destination selection.
    pub fn first_walkable_empty(&self) -> Option<Position> {
        for y in 0..self.height {
            for x in 0..self.width {
                let position = Position::new(x, y);
                let tile = &self.tiles[self.index(position)];
                if tile.walkable && tile.character.is_none() && tile.mob.is_none() {
                    return Some(position);
                }
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Verification
    // ------------------------------------------------------------------

    /// Check every floor-local invariant: index/back-pointer agreement in
    /// both directions, empty walls, stair list accuracy, and walkable
    /// connectivity.
    pub fn verify_consistency(&self) -> Result<(), ConsistencyError> {
        for (id, mob) in &self.mobs {
            let tile = self
                .tile(mob.position)
                .filter(|tile| tile.mob == Some(*id));
            if tile.is_none() {
                return Err(ConsistencyError::MobPointerMissing {
                    id: *id,
                    position: mob.position,
                });
            }
        }

        for (id, item) in &self.items {
            let Some(position) = item.position else {
                continue;
            };
            let tile = self.tile(position).filter(|tile| tile.item == Some(*id));
            if tile.is_none() {
                return Err(ConsistencyError::ItemPointerMissing {
                    id: *id,
                    position,
                });
            }
        }

        for y in 0..self.height {
            for x in 0..self.width {
                let position = Position::new(x, y);
                let tile = &self.tiles[self.index(position)];
                if tile.kind == TileKind::Wall
                    && (tile.character.is_some() || tile.mob.is_some() || tile.item.is_some())
                {
                    return Err(ConsistencyError::OccupiedWall { position });
                }
                if let Some(id) = tile.mob {
                    if self.mobs.get(&id).map(|mob| mob.position) != Some(position) {
                        return Err(ConsistencyError::StaleMobPointer { id, position });
                    }
                }
                if let Some(id) = tile.item {
                    if self.items.get(&id).and_then(|item| item.position) != Some(position) {
                        return Err(ConsistencyError::StaleItemPointer { id, position });
                    }
                }
            }
        }

        for position in self.up_stairs.iter().chain(&self.down_stairs) {
            let matches = self.tile(*position).is_some_and(|tile| tile.is_stairs());
            if !matches {
                return Err(ConsistencyError::StairMismatch {
                    position: *position,
                });
            }
        }

        if !self.walkable_connected() {
            return Err(ConsistencyError::Disconnected);
        }

        Ok(())
    }

    /// True if every walkable tile is reachable from every other walkable
    /// tile (4-neighborhood flood fill).
    pub fn walkable_connected(&self) -> bool {
        let total = self.tiles.iter().filter(|tile| tile.walkable).count();
        if total == 0 {
            return true;
        }

        let start = match (0..self.tiles.len()).find(|i| self.tiles[*i].walkable) {
            Some(index) => index,
            None => return true,
        };

        let mut seen = vec![false; self.tiles.len()];
        let mut queue = VecDeque::from([start]);
        seen[start] = true;
        let mut reached = 0usize;

        while let Some(index) = queue.pop_front() {
            reached += 1;
            let x = index as i32 % self.width;
            let y = index as i32 / self.width;
            for (dx, dy) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
                let next = Position::new(x + dx, y + dy);
                if !self.contains(next) {
                    continue;
                }
                let next_index = self.index(next);
                if !seen[next_index] && self.tiles[next_index].walkable {
                    seen[next_index] = true;
                    queue.push_back(next_index);
                }
            }
        }

        reached == total
    }
}
