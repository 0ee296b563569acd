//! Dungeon model: a named stack of lazily generated floors plus the set of
//! characters currently inside it.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::error::GameError;
use crate::mapgen::MapGenerator;
use crate::state::{Character, Floor};
use crate::types::{CharacterId, Difficulty, DungeonId};

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dungeon {
    pub id: DungeonId,
    pub name: String,
    pub difficulty: Difficulty,
    pub floor_count: u32,
    pub seed: u64,
    /// Floors keyed by level, generated on first entry.
    pub floors: BTreeMap<u32, Floor>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Characters currently joined.
    pub characters: BTreeSet<CharacterId>,
    /// Current floor per joined character.
    pub character_floors: BTreeMap<CharacterId, u32>,
}

impl Dungeon {
    pub fn new(
        id: DungeonId,
        name: impl Into<String>,
        floor_count: u32,
        difficulty: Difficulty,
        seed: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            difficulty,
            floor_count,
            seed,
            floors: BTreeMap::new(),
            created_at: now,
            last_activity: now,
            characters: BTreeSet::new(),
            character_floors: BTreeMap::new(),
        }
    }

    pub fn is_final_level(&self, level: u32) -> bool {
        level == self.floor_count
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    pub fn floor(&self, level: u32) -> Option<&Floor> {
        self.floors.get(&level)
    }

    pub fn floor_mut(&mut self, level: u32) -> Option<&mut Floor> {
        self.floors.get_mut(&level)
    }

    /// Fetch a floor, generating it from the dungeon seed on first access.
    pub fn floor_or_generate(&mut self, level: u32) -> Result<&mut Floor, GameError> {
        if level < 1 || level > self.floor_count {
            return Err(GameError::UnknownFloor);
        }
        if !self.floors.contains_key(&level) {
            let generator = MapGenerator::new(self.seed);
            let floor = generator.generate_floor(level, self.is_final_level(level), self.difficulty);
            self.floors.insert(level, floor);
        }
        Ok(self.floors.get_mut(&level).expect("floor just inserted"))
    }

    pub fn add_character(&mut self, character: CharacterId, level: u32) {
        self.characters.insert(character);
        self.character_floors.insert(character, level);
        self.touch();
    }

    pub fn remove_character(&mut self, character: CharacterId) {
        self.characters.remove(&character);
        if let Some(level) = self.character_floors.remove(&character) {
            if let Some(floor) = self.floors.get_mut(&level) {
                floor.clear_character(character);
            }
        }
        self.touch();
    }

    pub fn character_floor(&self, character: CharacterId) -> Option<u32> {
        self.character_floors.get(&character).copied()
    }

    pub fn set_character_floor(&mut self, character: CharacterId, level: u32) {
        self.character_floors.insert(character, level);
        self.touch();
    }

    /// Stair topology invariant over every generated floor: level 1 has no
    /// up stairs, the final level has no down stairs, every other level has
    /// at least one of each.
    pub fn verify_stair_topology(&self) -> bool {
        self.floors.values().all(|floor| {
            let up_ok = if floor.level == 1 {
                floor.up_stairs.is_empty()
            } else {
                !floor.up_stairs.is_empty()
            };
            let down_ok = if self.is_final_level(floor.level) {
                floor.down_stairs.is_empty()
            } else {
                !floor.down_stairs.is_empty()
            };
            up_ok && down_ok
        })
    }

    /// Tile-occupancy invariant for one character: exactly one tile on the
    /// character's floor points back at them, and it is the tile at their
    /// recorded position.
    pub fn verify_character_tile(&self, character: &Character) -> bool {
        let Some(level) = self.character_floor(character.id) else {
            return false;
        };
        let Some(floor) = self.floor(level) else {
            return false;
        };
        let references = floor
            .tiles
            .iter()
            .filter(|tile| tile.character == Some(character.id))
            .count();
        references == 1
            && floor
                .tile(character.position)
                .is_some_and(|tile| tile.character == Some(character.id))
    }
}
