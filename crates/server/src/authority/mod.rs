//! Per-dungeon command processor.
//!
//! One authority wraps one dungeon's state handle. Every command runs to
//! completion under the handle's lock: validate, mutate, persist the
//! character, then emit deltas through the sink (enqueueing never blocks,
//! so holding the lock across emission is safe and keeps delta order
//! aligned with command order). A command that cannot complete rolls its
//! mutation back and returns a single error.

mod placement;

pub use placement::arrival_position;

use std::sync::Arc;

use tracing::debug;

use game_core::{
    Character, CharacterId, CombatManager, Direction, Dungeon, EquipSlot, GameError, ItemId,
    ItemKind, MobId, TileKind, visibility,
};

use crate::hub::DeltaSink;
use crate::protocol::ServerMessage;
use crate::repository::{CharacterRepository, DungeonHandle};

/// Command already bound to a character, routed into this dungeon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharacterAction {
    Move(Direction),
    Pickup(ItemId),
    Attack(MobId),
    Ascend,
    Descend,
    UseItem(ItemId),
    DropItem(ItemId),
    Equip(ItemId),
    Unequip(ItemId),
    Flee(MobId),
}

pub struct DungeonAuthority {
    handle: Arc<DungeonHandle>,
    characters: Arc<dyn CharacterRepository>,
    sink: Arc<dyn DeltaSink>,
}

impl DungeonAuthority {
    pub fn new(
        handle: Arc<DungeonHandle>,
        characters: Arc<dyn CharacterRepository>,
        sink: Arc<dyn DeltaSink>,
    ) -> Self {
        Self {
            handle,
            characters,
            sink,
        }
    }

    /// Apply one in-dungeon command for the given character.
    pub fn execute(
        &self,
        character: CharacterId,
        action: CharacterAction,
    ) -> Result<(), GameError> {
        let result = match action {
            CharacterAction::Move(direction) => self.move_character(character, direction),
            CharacterAction::Pickup(item) => self.pickup(character, item),
            CharacterAction::Attack(mob) => self.attack(character, mob),
            CharacterAction::Ascend => self.change_floor(character, true),
            CharacterAction::Descend => self.change_floor(character, false),
            CharacterAction::UseItem(item) => self.use_item(character, item),
            CharacterAction::DropItem(item) => self.drop_item(character, item),
            CharacterAction::Equip(item) => self.equip(character, item),
            CharacterAction::Unequip(item) => self.unequip(character, item),
            CharacterAction::Flee(mob) => self.flee(character, mob),
        };
        if result.is_ok() {
            self.verify_after(character);
        }
        result
    }

    // ------------------------------------------------------------------
    // Join / leave
    // ------------------------------------------------------------------

    /// Place a character on floor 1, near the entrance stairs.
    pub fn join(&self, character_id: CharacterId) -> Result<(), GameError> {
        let mut dungeon = self.handle.lock_state();
        let dungeon_id = dungeon.id;
        let mut character = self.load(character_id)?;

        match character.dungeon {
            Some(current) if current != dungeon_id => return Err(GameError::InvalidCharacter),
            Some(_) => {
                // Rejoining: clear the stale tile before re-placing.
                if let Some(level) = dungeon.character_floor(character_id) {
                    if let Some(floor) = dungeon.floor_mut(level) {
                        floor.clear_character(character_id);
                    }
                }
            }
            None => {}
        }

        let destination = {
            let floor = dungeon.floor_or_generate(1)?;
            let destination = arrival_position(floor, false);
            floor.set_character(destination, Some(character_id));
            visibility::recompute(floor, destination, visibility::VIEW_RADIUS);
            destination
        };

        character.dungeon = Some(dungeon_id);
        character.floor = 1;
        character.position = destination;
        dungeon.add_character(character_id, 1);

        if let Err(err) = self.persist(&character) {
            dungeon.remove_character(character_id);
            if let Some(floor) = dungeon.floor_mut(1) {
                floor.set_character(destination, None);
            }
            return Err(err);
        }

        debug!(character = %character_id, dungeon = %dungeon_id, "character joined");

        let snapshot = dungeon.floor(1).cloned();
        self.sink.set_location(character_id, Some((dungeon_id, 1)));
        if let Some(floor) = snapshot {
            self.sink.send_to_character(
                character_id,
                ServerMessage::InitialState {
                    character: character.clone(),
                    floor,
                },
            );
        }
        self.sink.broadcast_floor_except(
            dungeon_id,
            1,
            character_id,
            ServerMessage::notification(format!("{} has entered the dungeon.", character.name)),
        );
        Ok(())
    }

    /// Remove a character from the dungeon, retaining its state.
    pub fn leave(&self, character_id: CharacterId) -> Result<(), GameError> {
        let mut dungeon = self.handle.lock_state();
        let dungeon_id = dungeon.id;
        let mut character = self.load(character_id)?;
        if character.dungeon != Some(dungeon_id) {
            return Err(GameError::NotInDungeon);
        }

        let level = dungeon
            .character_floor(character_id)
            .unwrap_or(character.floor);
        let rollback = character.clone();

        if let Some(floor) = dungeon.floor_mut(level) {
            floor.set_character(character.position, None);
        }
        dungeon.remove_character(character_id);
        character.dungeon = None;
        character.floor = 0;

        if let Err(err) = self.persist(&character) {
            dungeon.add_character(character_id, level);
            if let Some(floor) = dungeon.floor_mut(level) {
                floor.set_character(rollback.position, Some(character_id));
            }
            return Err(err);
        }

        debug!(character = %character_id, dungeon = %dungeon_id, "character left");

        self.sink.set_location(character_id, None);
        self.sink
            .send_to_character(character_id, ServerMessage::notification("You leave the dungeon."));
        self.sink.broadcast_floor(
            dungeon_id,
            level,
            ServerMessage::notification(format!("{} has left the dungeon.", rollback.name)),
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Movement
    // ------------------------------------------------------------------

    fn move_character(&self, id: CharacterId, direction: Direction) -> Result<(), GameError> {
        let mut dungeon = self.handle.lock_state();
        let dungeon_id = dungeon.id;
        let (mut character, level) = self.context(&dungeon, id)?;
        let origin = character.position;
        let destination = origin.step(direction);

        let floor = dungeon.floor_mut(level).ok_or(GameError::UnknownFloor)?;
        let tile = floor
            .tile(destination)
            .ok_or(GameError::OutOfBounds { destination })?;
        if !tile.walkable {
            return Err(GameError::NotWalkable { destination });
        }
        if tile.mob.is_some() || tile.character.is_some() {
            return Err(GameError::Occupied { destination });
        }

        floor.set_character(origin, None);
        floor.set_character(destination, Some(id));
        character.position = destination;
        // Exploration is monotonic; no rollback needed if the save fails.
        visibility::recompute(floor, destination, visibility::VIEW_RADIUS);

        if let Err(err) = self.persist(&character) {
            if let Some(floor) = dungeon.floor_mut(level) {
                floor.set_character(destination, None);
                floor.set_character(origin, Some(id));
            }
            return Err(err);
        }

        let note = dungeon
            .floor(level)
            .and_then(|floor| describe_arrival(floor, destination));
        dungeon.touch();

        self.sink.send_to_character(
            id,
            ServerMessage::UpdatePlayer {
                character: character.clone(),
            },
        );
        self.sink.broadcast_floor_except(
            dungeon_id,
            level,
            id,
            ServerMessage::PlayerMoved {
                character_id: id,
                from: origin,
                to: destination,
            },
        );
        if let Some(text) = note {
            self.sink
                .send_to_character(id, ServerMessage::notification(text));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    fn pickup(&self, id: CharacterId, item_id: ItemId) -> Result<(), GameError> {
        let mut dungeon = self.handle.lock_state();
        let dungeon_id = dungeon.id;
        let (mut character, level) = self.context(&dungeon, id)?;

        let floor = dungeon.floor_mut(level).ok_or(GameError::UnknownFloor)?;
        let item = floor.items.get(&item_id).ok_or(GameError::ItemNotHere)?;
        if item.position != Some(character.position) {
            return Err(GameError::ItemNotHere);
        }
        character.meets_restrictions(item)?;
        if !character.can_carry(item) {
            return Err(GameError::WeightExceeded);
        }

        let original = floor.remove_item(item_id).ok_or(GameError::ItemNotHere)?;
        let name = original.name.clone();
        if original.kind == ItemKind::Gold {
            // Gold is credited, never carried.
            character.gold += original.value;
        } else {
            let mut carried = original.clone();
            carried.position = None;
            character.inventory.push(carried);
        }

        if let Err(err) = self.persist(&character) {
            if let Some(floor) = dungeon.floor_mut(level) {
                floor.place_item(original);
            }
            return Err(err);
        }

        let snapshot = dungeon.floor(level).cloned();
        dungeon.touch();

        self.sink
            .send_to_character(id, ServerMessage::notification(format!("You picked up {name}.")));
        self.sink.send_to_character(
            id,
            ServerMessage::UpdatePlayer {
                character: character.clone(),
            },
        );
        if let Some(floor) = snapshot {
            self.sink
                .broadcast_floor(dungeon_id, level, ServerMessage::FloorUpdate { floor });
        }
        Ok(())
    }

    fn drop_item(&self, id: CharacterId, item_id: ItemId) -> Result<(), GameError> {
        let mut dungeon = self.handle.lock_state();
        let dungeon_id = dungeon.id;
        let (mut character, level) = self.context(&dungeon, id)?;

        let item = character
            .item(item_id)
            .cloned()
            .ok_or(GameError::UnknownTarget)?;
        let position = character.position;

        let floor = dungeon.floor_mut(level).ok_or(GameError::UnknownFloor)?;
        let tile = floor
            .tile(position)
            .ok_or(GameError::OutOfBounds { destination: position })?;
        if tile.item.is_some() {
            return Err(GameError::Occupied {
                destination: position,
            });
        }

        character.take_item(item_id);
        let dropped = item.clone().at(position);
        floor.place_item(dropped.clone());

        if let Err(err) = self.persist(&character) {
            if let Some(floor) = dungeon.floor_mut(level) {
                floor.remove_item(item_id);
            }
            return Err(err);
        }
        dungeon.touch();

        self.sink.send_to_character(
            id,
            ServerMessage::UpdatePlayer {
                character: character.clone(),
            },
        );
        self.sink
            .send_to_character(id, ServerMessage::notification(format!("You drop {}.", item.name)));
        self.sink
            .broadcast_floor(dungeon_id, level, ServerMessage::ItemAdded { item: dropped });
        Ok(())
    }

    fn use_item(&self, id: CharacterId, item_id: ItemId) -> Result<(), GameError> {
        let mut dungeon = self.handle.lock_state();
        let (mut character, _) = self.context(&dungeon, id)?;

        let item = character
            .item(item_id)
            .cloned()
            .ok_or(GameError::UnknownTarget)?;
        let healed = CombatManager::use_item(&mut character, &item)?;
        character.take_item(item_id);

        self.persist(&character)?;
        dungeon.touch();

        self.sink.send_to_character(
            id,
            ServerMessage::UpdatePlayer {
                character: character.clone(),
            },
        );
        self.sink.send_to_character(
            id,
            ServerMessage::notification(format!(
                "You drink the {}, restoring {healed} HP.",
                item.name
            )),
        );
        Ok(())
    }

    fn equip(&self, id: CharacterId, item_id: ItemId) -> Result<(), GameError> {
        let mut dungeon = self.handle.lock_state();
        let (mut character, _) = self.context(&dungeon, id)?;

        let item = character
            .item(item_id)
            .cloned()
            .ok_or(GameError::UnknownTarget)?;
        let slot = EquipSlot::for_kind(item.kind).ok_or(GameError::Restricted)?;
        character.meets_restrictions(&item)?;
        character.equipment.set(slot, Some(item_id));

        self.persist(&character)?;
        dungeon.touch();

        self.sink.send_to_character(
            id,
            ServerMessage::UpdatePlayer {
                character: character.clone(),
            },
        );
        self.sink
            .send_to_character(id, ServerMessage::notification(format!("You equip the {}.", item.name)));
        Ok(())
    }

    fn unequip(&self, id: CharacterId, item_id: ItemId) -> Result<(), GameError> {
        let mut dungeon = self.handle.lock_state();
        let (mut character, _) = self.context(&dungeon, id)?;

        let slot = character
            .equipment
            .slot_of(item_id)
            .ok_or(GameError::UnknownTarget)?;
        let name = character
            .item(item_id)
            .map(|item| item.name.clone())
            .unwrap_or_else(|| "item".to_string());
        character.equipment.set(slot, None);

        self.persist(&character)?;
        dungeon.touch();

        self.sink.send_to_character(
            id,
            ServerMessage::UpdatePlayer {
                character: character.clone(),
            },
        );
        self.sink
            .send_to_character(id, ServerMessage::notification(format!("You unequip the {name}.")));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Combat
    // ------------------------------------------------------------------

    fn attack(&self, id: CharacterId, mob_id: MobId) -> Result<(), GameError> {
        let mut dungeon = self.handle.lock_state();
        let dungeon_id = dungeon.id;
        let (mut character, level) = self.context(&dungeon, id)?;

        let floor = dungeon.floor_mut(level).ok_or(GameError::UnknownFloor)?;
        let mob = floor.mobs.get_mut(&mob_id).ok_or(GameError::UnknownTarget)?;
        let rollback_mob = mob.clone();
        let mob_name = mob.kind.to_string();

        let result = {
            let mut rng = self.handle.lock_rng();
            CombatManager::attack_mob(&mut character, mob, &mut rng)
        };
        let mob_snapshot = mob.clone();
        if result.mob_killed {
            floor.remove_mob(mob_id);
        }

        if let Err(err) = self.persist(&character) {
            if let Some(floor) = dungeon.floor_mut(level) {
                if result.mob_killed {
                    floor.place_mob(rollback_mob);
                } else if let Some(mob) = floor.mobs.get_mut(&mob_id) {
                    *mob = rollback_mob;
                }
            }
            return Err(err);
        }
        dungeon.touch();

        self.sink.send_to_character(
            id,
            ServerMessage::CombatReport {
                result: result.clone(),
            },
        );
        self.sink.send_to_character(
            id,
            ServerMessage::UpdatePlayer {
                character: character.clone(),
            },
        );

        if result.mob_killed {
            self.sink
                .broadcast_floor(dungeon_id, level, ServerMessage::MobRemoved { mob_id });
            self.sink.send_to_character(
                id,
                ServerMessage::notification(format!(
                    "You killed the {mob_name} (+{} XP, +{} gold).",
                    result.xp_awarded, result.gold_awarded
                )),
            );
            if result.leveled_up {
                self.sink.send_to_character(
                    id,
                    ServerMessage::notification(format!(
                        "You are now level {}!",
                        character.level
                    )),
                );
            }
        } else if result.hit {
            self.sink.broadcast_floor(
                dungeon_id,
                level,
                ServerMessage::MobUpdated { mob: mob_snapshot },
            );
        }
        Ok(())
    }

    /// Try to break away from a mob. A failed attempt grants the mob one
    /// free attack; the character does not move either way.
    fn flee(&self, id: CharacterId, mob_id: MobId) -> Result<(), GameError> {
        let mut dungeon = self.handle.lock_state();
        let (mut character, level) = self.context(&dungeon, id)?;

        let mob = dungeon
            .floor(level)
            .ok_or(GameError::UnknownFloor)?
            .mobs
            .get(&mob_id)
            .cloned()
            .ok_or(GameError::UnknownTarget)?;

        let result = {
            let mut rng = self.handle.lock_rng();
            CombatManager::flee(&mut character, &mob, &mut rng)
        };

        self.persist(&character)?;
        dungeon.touch();

        self.sink.send_to_character(
            id,
            ServerMessage::UpdatePlayer {
                character: character.clone(),
            },
        );
        let text = if result.escaped {
            format!("You slip away from the {}.", mob.kind)
        } else {
            match result.counter_damage {
                Some(damage) => format!(
                    "You fail to escape! The {} hits you for {damage} damage.",
                    mob.kind
                ),
                None => format!("You fail to escape, but the {} misses.", mob.kind),
            }
        };
        self.sink
            .send_to_character(id, ServerMessage::notification(text));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stairs
    // ------------------------------------------------------------------

    fn change_floor(&self, id: CharacterId, ascending: bool) -> Result<(), GameError> {
        let mut dungeon = self.handle.lock_state();
        let dungeon_id = dungeon.id;
        let (mut character, level) = self.context(&dungeon, id)?;
        let origin = character.position;

        {
            let floor = dungeon.floor(level).ok_or(GameError::UnknownFloor)?;
            let expected = if ascending {
                TileKind::UpStairs
            } else {
                TileKind::DownStairs
            };
            let standing = floor
                .tile(origin)
                .is_some_and(|tile| tile.kind == expected);
            if !standing {
                return Err(GameError::NotOnStairs);
            }
        }
        if ascending && level <= 1 {
            return Err(GameError::AtTerminalFloor);
        }
        if !ascending && level >= dungeon.floor_count {
            return Err(GameError::AtTerminalFloor);
        }

        let target_level = if ascending { level - 1 } else { level + 1 };

        if let Some(floor) = dungeon.floor_mut(level) {
            floor.set_character(origin, None);
        }

        let destination = match dungeon.floor_or_generate(target_level) {
            Ok(target) => {
                let destination = arrival_position(target, !ascending);
                target.set_character(destination, Some(id));
                visibility::recompute(target, destination, visibility::VIEW_RADIUS);
                destination
            }
            Err(err) => {
                if let Some(floor) = dungeon.floor_mut(level) {
                    floor.set_character(origin, Some(id));
                }
                return Err(err);
            }
        };

        character.floor = target_level;
        character.position = destination;
        dungeon.set_character_floor(id, target_level);

        if let Err(err) = self.persist(&character) {
            if let Some(target) = dungeon.floor_mut(target_level) {
                target.set_character(destination, None);
            }
            if let Some(floor) = dungeon.floor_mut(level) {
                floor.set_character(origin, Some(id));
            }
            dungeon.set_character_floor(id, level);
            return Err(err);
        }

        let snapshot = dungeon.floor(target_level).cloned();

        self.sink
            .set_location(id, Some((dungeon_id, target_level)));
        if let Some(floor) = snapshot {
            self.sink
                .send_to_character(id, ServerMessage::FloorChange { floor });
        }
        self.sink.send_to_character(
            id,
            ServerMessage::UpdatePlayer {
                character: character.clone(),
            },
        );
        let verb = if ascending { "ascend" } else { "descend" };
        self.sink.send_to_character(
            id,
            ServerMessage::notification(format!("You {verb} to floor {target_level}.")),
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn load(&self, id: CharacterId) -> Result<Character, GameError> {
        self.characters
            .get(id)
            .map_err(|_| GameError::PersistenceFailed)?
            .ok_or(GameError::InvalidCharacter)
    }

    fn persist(&self, character: &Character) -> Result<(), GameError> {
        self.characters
            .save(character)
            .map_err(|_| GameError::PersistenceFailed)
    }

    /// Load the character and its current level, validating that it is in
    /// this dungeon.
    fn context(&self, dungeon: &Dungeon, id: CharacterId) -> Result<(Character, u32), GameError> {
        let character = self.load(id)?;
        if character.dungeon != Some(dungeon.id) {
            return Err(GameError::NotInDungeon);
        }
        let level = dungeon
            .character_floor(id)
            .ok_or(GameError::NotInDungeon)?;
        Ok((character, level))
    }

    /// Re-check the per-command invariants after a successful mutation.
    /// Debug builds only; release builds trust the rollback discipline.
    #[cfg(debug_assertions)]
    fn verify_after(&self, id: CharacterId) {
        let dungeon = self.handle.lock_state();
        let Ok(Some(character)) = self.characters.get(id) else {
            return;
        };
        debug_assert!(character.carried_weight() <= character.weight_limit());
        if character.dungeon == Some(dungeon.id) {
            debug_assert!(dungeon.verify_character_tile(&character));
            if let Some(floor) = dungeon
                .character_floor(id)
                .and_then(|level| dungeon.floor(level))
            {
                debug_assert!(floor.verify_consistency().is_ok());
            }
        }
    }

    #[cfg(not(debug_assertions))]
    fn verify_after(&self, _id: CharacterId) {}
}

/// Flavor text for stepping onto stairs or an item.
fn describe_arrival(floor: &game_core::Floor, position: game_core::Position) -> Option<String> {
    let tile = floor.tile(position)?;
    match tile.kind {
        TileKind::UpStairs => return Some("There are stairs leading up here.".to_string()),
        TileKind::DownStairs => return Some("There are stairs leading down here.".to_string()),
        _ => {}
    }
    let item_id = tile.item?;
    let item = floor.items.get(&item_id)?;
    Some(format!("You see {} here.", item.name))
}
