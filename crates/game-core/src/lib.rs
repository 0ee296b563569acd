//! Deterministic game rules and data types for the dungeon server.
//!
//! `game-core` defines the canonical world model (dungeons, floors, tiles,
//! characters, mobs, items), the seeded floor generator, and combat
//! resolution. Everything here is pure with respect to its RNG seeds; the
//! server crate layers locking, sessions, and persistence on top of the
//! types re-exported here.
pub mod combat;
pub mod error;
pub mod mapgen;
pub mod rng;
pub mod state;
pub mod types;
pub mod visibility;

pub use combat::{CombatManager, CombatResult, FleeResult};
pub use error::GameError;
pub use mapgen::{DEFAULT_FLOOR_HEIGHT, DEFAULT_FLOOR_WIDTH, MapGenerator, random_item};
pub use rng::Pcg32;
pub use state::{
    Attributes, Character, CharacterClass, ConsistencyError, Dungeon, EquipSlot, Equipment, Floor,
    Item, ItemKind, Mob, MobKind, MobVariant, Room, RoomKind, Tile, TileKind,
};
pub use types::{
    CharacterId, Difficulty, Direction, DungeonId, ItemId, MobId, Position, RoomId,
};
