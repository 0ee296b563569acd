//! Authoritative multiplayer server for the dungeon crawler.
//!
//! The server owns the ground truth for world state. Clients connect over a
//! framed transport, bind to a persisted character, and send intents; every
//! mutation is validated and applied by the per-dungeon authority, persisted
//! through the repositories, and fanned out as deltas to exactly the clients
//! that can observe it.
pub mod authority;
pub mod config;
pub mod hub;
pub mod maintenance;
pub mod net;
pub mod protocol;
pub mod repository;
pub mod router;

pub use authority::{CharacterAction, DungeonAuthority, arrival_position};
pub use config::ServerConfig;
pub use hub::{ClientId, DeltaSink, SessionHub, spawn_client};
pub use protocol::{Command, Hello, ServerMessage};
pub use repository::{
    CharacterRepository, DungeonHandle, DungeonRepository, DungeonSummary,
    InMemoryCharacterRepository, InMemoryDungeonRepository, RepositoryError,
};
pub use router::CommandRouter;
