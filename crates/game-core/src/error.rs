//! Error taxonomy surfaced to clients as `Error` deltas.
//!
//! Every command failure is a value of [`GameError`]; none of them are fatal
//! to the connection, and none of them leave partial state behind.

use crate::types::Position;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum GameError {
    #[error("character is not in a dungeon")]
    NotInDungeon,

    #[error("destination {destination} is out of bounds")]
    OutOfBounds { destination: Position },

    #[error("destination {destination} is not walkable")]
    NotWalkable { destination: Position },

    #[error("destination {destination} is occupied")]
    Occupied { destination: Position },

    #[error("character is not standing on the matching stairs")]
    NotOnStairs,

    #[error("already at the terminal floor")]
    AtTerminalFloor,

    #[error("item is not at the character's position")]
    ItemNotHere,

    #[error("picking the item up would exceed the weight limit")]
    WeightExceeded,

    #[error("item restrictions are not met")]
    Restricted,

    #[error("target does not exist")]
    UnknownTarget,

    #[error("command does not match the bound character")]
    InvalidCharacter,

    #[error("unrecognized command")]
    UnknownCommand,

    #[error("dungeon does not exist")]
    UnknownDungeon,

    #[error("floor does not exist")]
    UnknownFloor,

    #[error("persistence failed; operation rolled back")]
    PersistenceFailed,
}

impl GameError {
    /// Stable machine-readable name, used alongside the display text in
    /// outbound error deltas.
    pub fn kind(&self) -> &'static str {
        match self {
            GameError::NotInDungeon => "not_in_dungeon",
            GameError::OutOfBounds { .. } => "out_of_bounds",
            GameError::NotWalkable { .. } => "not_walkable",
            GameError::Occupied { .. } => "occupied",
            GameError::NotOnStairs => "not_on_stairs",
            GameError::AtTerminalFloor => "at_terminal_floor",
            GameError::ItemNotHere => "item_not_here",
            GameError::WeightExceeded => "weight_exceeded",
            GameError::Restricted => "restricted",
            GameError::UnknownTarget => "unknown_target",
            GameError::InvalidCharacter => "invalid_character",
            GameError::UnknownCommand => "unknown_command",
            GameError::UnknownDungeon => "unknown_dungeon",
            GameError::UnknownFloor => "unknown_floor",
            GameError::PersistenceFailed => "persistence_failed",
        }
    }
}
