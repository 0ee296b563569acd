//! In-memory repository implementations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, info};

use game_core::{Character, CharacterId, Difficulty, Dungeon, DungeonId, Floor};

use super::{
    CharacterRepository, DungeonHandle, DungeonRepository, DungeonSummary, RepositoryError, Result,
};

/// Mutex-guarded character map.
pub struct InMemoryCharacterRepository {
    characters: RwLock<HashMap<CharacterId, Character>>,
}

impl InMemoryCharacterRepository {
    pub fn new() -> Self {
        Self {
            characters: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryCharacterRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterRepository for InMemoryCharacterRepository {
    fn save(&self, character: &Character) -> Result<()> {
        let mut characters = self
            .characters
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        characters.insert(character.id, character.clone());
        Ok(())
    }

    fn get(&self, id: CharacterId) -> Result<Option<Character>> {
        let characters = self
            .characters
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(characters.get(&id).cloned())
    }

    fn delete(&self, id: CharacterId) -> Result<()> {
        let mut characters = self
            .characters
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        characters.remove(&id);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Character>> {
        let characters = self
            .characters
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(characters.values().cloned().collect())
    }
}

/// Mutex-guarded dungeon map handing out shared authority handles.
pub struct InMemoryDungeonRepository {
    dungeons: RwLock<HashMap<DungeonId, Arc<DungeonHandle>>>,
    next_id: RwLock<u64>,
}

impl InMemoryDungeonRepository {
    pub fn new() -> Self {
        Self {
            dungeons: RwLock::new(HashMap::new()),
            next_id: RwLock::new(1),
        }
    }

    fn allocate_id(&self) -> Result<DungeonId> {
        let mut next = self
            .next_id
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let id = DungeonId(*next);
        *next += 1;
        Ok(id)
    }

    fn handle(&self, id: DungeonId) -> Result<Arc<DungeonHandle>> {
        self.get(id)?.ok_or(RepositoryError::DungeonNotFound(id))
    }
}

impl Default for InMemoryDungeonRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl DungeonRepository for InMemoryDungeonRepository {
    fn create(
        &self,
        name: &str,
        floor_count: u32,
        difficulty: Difficulty,
        seed: Option<u64>,
    ) -> Result<Arc<DungeonHandle>> {
        let id = self.allocate_id()?;
        let seed = seed.unwrap_or_else(rand::random);
        let dungeon = Dungeon::new(id, name, floor_count, difficulty, seed);
        let handle = Arc::new(DungeonHandle::new(dungeon));

        let mut dungeons = self
            .dungeons
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        dungeons.insert(id, Arc::clone(&handle));
        info!(dungeon = %id, name, floor_count, %difficulty, "dungeon created");
        Ok(handle)
    }

    fn get(&self, id: DungeonId) -> Result<Option<Arc<DungeonHandle>>> {
        let dungeons = self
            .dungeons
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(dungeons.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<DungeonSummary>> {
        let dungeons = self
            .dungeons
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let mut summaries: Vec<DungeonSummary> = dungeons
            .values()
            .map(|handle| DungeonSummary::from(&*handle.lock_state()))
            .collect();
        summaries.sort_by_key(|summary| summary.id);
        Ok(summaries)
    }

    fn save(&self, dungeon: &Dungeon) -> Result<()> {
        let mut dungeons = self
            .dungeons
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        match dungeons.get(&dungeon.id) {
            Some(handle) => {
                *handle.lock_state() = dungeon.clone();
            }
            None => {
                dungeons.insert(dungeon.id, Arc::new(DungeonHandle::new(dungeon.clone())));
            }
        }
        Ok(())
    }

    fn add_character(&self, dungeon: DungeonId, character: CharacterId, level: u32) -> Result<()> {
        let handle = self.handle(dungeon)?;
        handle.lock_state().add_character(character, level);
        Ok(())
    }

    fn remove_character(&self, dungeon: DungeonId, character: CharacterId) -> Result<()> {
        let handle = self.handle(dungeon)?;
        handle.lock_state().remove_character(character);
        Ok(())
    }

    fn set_character_floor(
        &self,
        dungeon: DungeonId,
        character: CharacterId,
        level: u32,
    ) -> Result<()> {
        let handle = self.handle(dungeon)?;
        handle.lock_state().set_character_floor(character, level);
        Ok(())
    }

    fn get_floor(&self, dungeon: DungeonId, level: u32) -> Result<Floor> {
        let handle = self.handle(dungeon)?;
        let mut state = handle.lock_state();
        state
            .floor_or_generate(level)
            .map(|floor| floor.clone())
            .map_err(|_| RepositoryError::FloorOutOfRange { level })
    }

    fn cleanup_inactive(&self, window: Duration) -> Result<usize> {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::hours(24));
        let mut dungeons = self
            .dungeons
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;

        let before = dungeons.len();
        dungeons.retain(|id, handle| {
            let state = handle.lock_state();
            let keep = !state.characters.is_empty() || state.last_activity >= cutoff;
            if !keep {
                debug!(dungeon = %id, "removing inactive dungeon");
            }
            keep
        });
        Ok(before - dungeons.len())
    }
}
