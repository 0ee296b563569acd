//! Normalized command model and outbound deltas.
//!
//! Wire frames are length-prefixed JSON; the framing itself lives in
//! [`crate::net`]. Everything here is the payload shape: inbound frames
//! decode to [`Command`], outbound deltas encode from [`ServerMessage`].

use serde::{Deserialize, Serialize};

use game_core::{
    Character, CharacterId, CombatResult, Difficulty, Direction, DungeonId, Floor, GameError, Item,
    ItemId, Mob, MobId, Position,
};

use crate::repository::DungeonSummary;

/// First frame a client sends after connecting: the transport authenticates
/// it to a character before the session joins the hub.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hello {
    pub character_id: Option<CharacterId>,
}

/// Inbound command, already validated as a frame. Field validation happens
/// in the router and the dungeon authority.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Move {
        direction: Direction,
    },
    Pickup {
        item_id: ItemId,
    },
    Attack {
        mob_id: MobId,
    },
    Flee {
        mob_id: MobId,
    },
    Ascend,
    Descend,
    UseItem {
        item_id: ItemId,
    },
    DropItem {
        item_id: ItemId,
    },
    EquipItem {
        item_id: ItemId,
    },
    UnequipItem {
        item_id: ItemId,
    },
    CreateDungeon {
        name: String,
        floor_count: u32,
        difficulty: Difficulty,
        /// Fixed seed for reproducible dungeons; random when omitted.
        #[serde(default)]
        seed: Option<u64>,
    },
    JoinDungeon {
        dungeon_id: DungeonId,
        character_id: CharacterId,
    },
    LeaveDungeon {
        dungeon_id: DungeonId,
        character_id: CharacterId,
    },
    ListDungeons,
}

/// Outbound delta fanned out to observer queues.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Character plus current floor, sent when a character enters a dungeon
    /// or a reconnecting client needs priming.
    InitialState { character: Character, floor: Floor },
    /// Whole floor snapshot after the character changes floors.
    FloorChange { floor: Floor },
    /// Floor snapshot broadcast to every observer of a (dungeon, floor).
    FloorUpdate { floor: Floor },
    /// Character snapshot to its own client.
    UpdatePlayer { character: Character },
    PlayerMoved {
        character_id: CharacterId,
        from: Position,
        to: Position,
    },
    MobUpdated { mob: Mob },
    MobRemoved { mob_id: MobId },
    ItemAdded { item: Item },
    ItemRemoved { item_id: ItemId },
    CombatReport { result: CombatResult },
    Notification { text: String },
    Error { kind: String, text: String },
    DungeonCreated { dungeon: DungeonSummary },
    DungeonList { dungeons: Vec<DungeonSummary> },
    Heartbeat,
}

impl ServerMessage {
    pub fn notification(text: impl Into<String>) -> Self {
        ServerMessage::Notification { text: text.into() }
    }

    pub fn error(error: &GameError) -> Self {
        ServerMessage::Error {
            kind: error.kind().to_string(),
            text: error.to_string(),
        }
    }
}

pub fn encode_message(message: &ServerMessage) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(message)
}

pub fn decode_command(payload: &[u8]) -> Result<Command, GameError> {
    serde_json::from_slice(payload).map_err(|_| GameError::UnknownCommand)
}
