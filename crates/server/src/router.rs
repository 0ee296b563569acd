//! Command router: binding validation and dispatch into the owning
//! dungeon's authority.

use std::sync::Arc;

use tracing::debug;

use game_core::{CharacterId, DungeonId, GameError};

use crate::authority::{CharacterAction, DungeonAuthority};
use crate::hub::{ClientId, DeltaSink, SessionHub};
use crate::protocol::{Command, ServerMessage};
use crate::repository::{CharacterRepository, DungeonRepository, DungeonSummary};

pub struct CommandRouter {
    hub: Arc<SessionHub>,
    characters: Arc<dyn CharacterRepository>,
    dungeons: Arc<dyn DungeonRepository>,
}

impl CommandRouter {
    pub fn new(
        hub: Arc<SessionHub>,
        characters: Arc<dyn CharacterRepository>,
        dungeons: Arc<dyn DungeonRepository>,
    ) -> Self {
        Self {
            hub,
            characters,
            dungeons,
        }
    }

    /// Route one inbound command. Failures become a single Error delta to
    /// the originating client; they are never fatal to the connection.
    pub fn dispatch(&self, client: ClientId, command: Command) {
        if let Err(error) = self.handle(client, command) {
            debug!(client = %client, error = %error, "command rejected");
            self.hub
                .send_to_client(client, ServerMessage::error(&error));
        }
    }

    fn handle(&self, client: ClientId, command: Command) -> Result<(), GameError> {
        match command {
            Command::CreateDungeon {
                name,
                floor_count,
                difficulty,
                seed,
            } => {
                if floor_count < 1 {
                    return Err(GameError::UnknownCommand);
                }
                let handle = self
                    .dungeons
                    .create(&name, floor_count, difficulty, seed)
                    .map_err(|_| GameError::PersistenceFailed)?;
                let summary = DungeonSummary::from(&*handle.lock_state());
                self.hub
                    .send_to_client(client, ServerMessage::DungeonCreated { dungeon: summary });
                Ok(())
            }

            Command::ListDungeons => {
                let dungeons = self
                    .dungeons
                    .list()
                    .map_err(|_| GameError::PersistenceFailed)?;
                self.hub
                    .send_to_client(client, ServerMessage::DungeonList { dungeons });
                Ok(())
            }

            Command::JoinDungeon {
                dungeon_id,
                character_id,
            } => {
                self.ensure_binding(client, character_id)?;
                self.authority_for(dungeon_id)?.join(character_id)
            }

            Command::LeaveDungeon {
                dungeon_id,
                character_id,
            } => {
                self.ensure_binding(client, character_id)?;
                self.authority_for(dungeon_id)?.leave(character_id)
            }

            in_dungeon => {
                let action = match in_dungeon {
                    Command::Move { direction } => CharacterAction::Move(direction),
                    Command::Pickup { item_id } => CharacterAction::Pickup(item_id),
                    Command::Attack { mob_id } => CharacterAction::Attack(mob_id),
                    Command::Flee { mob_id } => CharacterAction::Flee(mob_id),
                    Command::Ascend => CharacterAction::Ascend,
                    Command::Descend => CharacterAction::Descend,
                    Command::UseItem { item_id } => CharacterAction::UseItem(item_id),
                    Command::DropItem { item_id } => CharacterAction::DropItem(item_id),
                    Command::EquipItem { item_id } => CharacterAction::Equip(item_id),
                    Command::UnequipItem { item_id } => CharacterAction::Unequip(item_id),
                    _ => return Err(GameError::UnknownCommand),
                };

                let character_id = self
                    .hub
                    .character_of(client)
                    .ok_or(GameError::InvalidCharacter)?;
                let character = self
                    .characters
                    .get(character_id)
                    .map_err(|_| GameError::PersistenceFailed)?
                    .ok_or(GameError::InvalidCharacter)?;
                let dungeon_id = character.dungeon.ok_or(GameError::NotInDungeon)?;
                self.authority_for(dungeon_id)?
                    .execute(character_id, action)
            }
        }
    }

    /// Commands naming a character are rejected unless that character is
    /// the one bound to the originating client.
    fn ensure_binding(&self, client: ClientId, character: CharacterId) -> Result<(), GameError> {
        if self.hub.character_of(client) == Some(character) {
            Ok(())
        } else {
            Err(GameError::InvalidCharacter)
        }
    }

    fn authority_for(&self, dungeon: DungeonId) -> Result<DungeonAuthority, GameError> {
        let handle = self
            .dungeons
            .get(dungeon)
            .map_err(|_| GameError::PersistenceFailed)?
            .ok_or(GameError::UnknownDungeon)?;
        let sink: Arc<dyn DeltaSink> = Arc::clone(&self.hub) as Arc<dyn DeltaSink>;
        Ok(DungeonAuthority::new(
            handle,
            Arc::clone(&self.characters),
            sink,
        ))
    }
}
