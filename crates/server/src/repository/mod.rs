//! Repository contracts for characters and dungeons.
//!
//! Both stores are in-memory behind read-write locks; the traits are the
//! seam a persistent backend would implement instead.

mod memory;

pub use memory::{InMemoryCharacterRepository, InMemoryDungeonRepository};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use game_core::{Character, CharacterId, Difficulty, Dungeon, DungeonId, Floor, Pcg32};

/// Result type for repository operations
pub type Result<T> = std::result::Result<T, RepositoryError>;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository lock poisoned")]
    LockPoisoned,

    #[error("dungeon {0} not found")]
    DungeonNotFound(DungeonId),

    #[error("floor {level} is out of range")]
    FloorOutOfRange { level: u32 },
}

/// Store of persisted characters. Save is an upsert.
pub trait CharacterRepository: Send + Sync {
    fn save(&self, character: &Character) -> Result<()>;

    fn get(&self, id: CharacterId) -> Result<Option<Character>>;

    fn delete(&self, id: CharacterId) -> Result<()>;

    fn list(&self) -> Result<Vec<Character>>;
}

/// Shared handle to one dungeon's mutable state.
///
/// The state mutex is the per-dungeon authority lock: every command for the
/// dungeon runs to completion under it, and nothing awaited happens while it
/// is held. The RNG feeds combat rolls and sits beside the state so fights
/// replay deterministically from the dungeon seed.
pub struct DungeonHandle {
    pub id: DungeonId,
    state: Mutex<Dungeon>,
    rng: Mutex<Pcg32>,
}

impl DungeonHandle {
    pub fn new(dungeon: Dungeon) -> Self {
        let rng = Pcg32::new(dungeon.seed.wrapping_add(1));
        Self {
            id: dungeon.id,
            state: Mutex::new(dungeon),
            rng: Mutex::new(rng),
        }
    }

    /// Lock the dungeon state. A poisoned lock still guards consistent data
    /// (mutations roll back on error paths), so the guard is recovered.
    pub fn lock_state(&self) -> MutexGuard<'_, Dungeon> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn lock_rng(&self) -> MutexGuard<'_, Pcg32> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// List entry describing a dungeon without its floors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DungeonSummary {
    pub id: DungeonId,
    pub name: String,
    pub difficulty: Difficulty,
    pub floor_count: u32,
    pub player_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl From<&Dungeon> for DungeonSummary {
    fn from(dungeon: &Dungeon) -> Self {
        Self {
            id: dungeon.id,
            name: dungeon.name.clone(),
            difficulty: dungeon.difficulty,
            floor_count: dungeon.floor_count,
            player_count: dungeon.characters.len(),
            created_at: dungeon.created_at,
            last_activity: dungeon.last_activity,
        }
    }
}

/// Store of dungeon instances.
pub trait DungeonRepository: Send + Sync {
    /// Create a dungeon; a `None` seed draws a random one.
    fn create(
        &self,
        name: &str,
        floor_count: u32,
        difficulty: Difficulty,
        seed: Option<u64>,
    ) -> Result<Arc<DungeonHandle>>;

    fn get(&self, id: DungeonId) -> Result<Option<Arc<DungeonHandle>>>;

    fn list(&self) -> Result<Vec<DungeonSummary>>;

    /// Overwrite the stored state with a snapshot. Upsert.
    fn save(&self, dungeon: &Dungeon) -> Result<()>;

    fn add_character(&self, dungeon: DungeonId, character: CharacterId, level: u32) -> Result<()>;

    fn remove_character(&self, dungeon: DungeonId, character: CharacterId) -> Result<()>;

    fn set_character_floor(
        &self,
        dungeon: DungeonId,
        character: CharacterId,
        level: u32,
    ) -> Result<()>;

    /// Snapshot of one floor, generating it on demand if absent.
    fn get_floor(&self, dungeon: DungeonId, level: u32) -> Result<Floor>;

    /// Remove dungeons with no joined characters whose last activity is
    /// older than `window`. Returns the number removed.
    fn cleanup_inactive(&self, window: Duration) -> Result<usize>;
}
