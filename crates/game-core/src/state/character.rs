//! Character model: attributes, derived combat stats, inventory, equipment.

use crate::error::GameError;
use crate::state::{Item, ItemKind};
use crate::types::{CharacterId, DungeonId, ItemId, Position};

/// Experience required to advance from `level` to `level + 1`.
fn xp_to_next(level: u32) -> u64 {
    level as u64 * 1000
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CharacterClass {
    Warrior,
    Rogue,
    Mage,
    Cleric,
}

impl CharacterClass {
    /// Hit points gained at level 1 and (halved, plus con modifier) per
    /// later level.
    pub fn hit_die(self) -> u32 {
        match self {
            CharacterClass::Warrior => 10,
            CharacterClass::Rogue | CharacterClass::Cleric => 8,
            CharacterClass::Mage => 6,
        }
    }

    pub fn mana_die(self) -> u32 {
        match self {
            CharacterClass::Warrior => 2,
            CharacterClass::Rogue => 4,
            CharacterClass::Cleric => 8,
            CharacterClass::Mage => 10,
        }
    }
}

/// The six rolled attributes, each in [8, 15] at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attributes {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl Attributes {
    /// `floor((score - 10) / 2)`, the standard ability modifier.
    pub fn modifier(score: u8) -> i32 {
        (score as i32 - 10).div_euclid(2)
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EquipSlot {
    Weapon,
    Armor,
}

impl EquipSlot {
    /// The slot an item kind occupies, if any.
    pub fn for_kind(kind: ItemKind) -> Option<Self> {
        match kind {
            ItemKind::Weapon => Some(EquipSlot::Weapon),
            ItemKind::Armor => Some(EquipSlot::Armor),
            _ => None,
        }
    }
}

/// Slot -> item mapping. Equipped items stay in the inventory list; the
/// slots only reference them, so carried weight keeps counting them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Equipment {
    pub weapon: Option<ItemId>,
    pub armor: Option<ItemId>,
}

impl Equipment {
    pub fn get(&self, slot: EquipSlot) -> Option<ItemId> {
        match slot {
            EquipSlot::Weapon => self.weapon,
            EquipSlot::Armor => self.armor,
        }
    }

    pub fn set(&mut self, slot: EquipSlot, item: Option<ItemId>) {
        match slot {
            EquipSlot::Weapon => self.weapon = item,
            EquipSlot::Armor => self.armor = item,
        }
    }

    /// The slot currently referencing this item, if any.
    pub fn slot_of(&self, item: ItemId) -> Option<EquipSlot> {
        if self.weapon == Some(item) {
            Some(EquipSlot::Weapon)
        } else if self.armor == Some(item) {
            Some(EquipSlot::Armor)
        } else {
            None
        }
    }
}

/// A persisted player character.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub class: CharacterClass,
    pub level: u32,
    pub experience: u64,
    pub attributes: Attributes,
    pub hp: u32,
    pub max_hp: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub gold: u32,
    pub dungeon: Option<DungeonId>,
    pub floor: u32,
    pub position: Position,
    pub inventory: Vec<Item>,
    pub equipment: Equipment,
}

impl Character {
    pub fn new(
        id: CharacterId,
        name: impl Into<String>,
        class: CharacterClass,
        attributes: Attributes,
    ) -> Self {
        let con_mod = Attributes::modifier(attributes.constitution);
        let int_mod = Attributes::modifier(attributes.intelligence);
        let max_hp = (10 + class.hit_die() as i32 + con_mod).max(1) as u32;
        let max_mana = (2 * class.mana_die() as i32 + int_mod).max(0) as u32;

        Self {
            id,
            name: name.into(),
            class,
            level: 1,
            experience: 0,
            attributes,
            hp: max_hp,
            max_hp,
            mana: max_mana,
            max_mana,
            gold: 0,
            dungeon: None,
            floor: 0,
            position: Position::ORIGIN,
            inventory: Vec::new(),
            equipment: Equipment::default(),
        }
    }

    // ------------------------------------------------------------------
    // Attribute modifiers
    // ------------------------------------------------------------------

    pub fn strength_modifier(&self) -> i32 {
        Attributes::modifier(self.attributes.strength)
    }

    pub fn dexterity_modifier(&self) -> i32 {
        Attributes::modifier(self.attributes.dexterity)
    }

    pub fn constitution_modifier(&self) -> i32 {
        Attributes::modifier(self.attributes.constitution)
    }

    // ------------------------------------------------------------------
    // Inventory & weight
    // ------------------------------------------------------------------

    /// Carry limit in weight units: 5x strength.
    pub fn weight_limit(&self) -> u32 {
        5 * self.attributes.strength as u32
    }

    pub fn carried_weight(&self) -> u32 {
        self.inventory.iter().map(|item| item.weight).sum()
    }

    pub fn can_carry(&self, item: &Item) -> bool {
        self.carried_weight() + item.weight <= self.weight_limit()
    }

    /// Level and class gates an item declares. Enforced on every pickup and
    /// equip path.
    pub fn meets_restrictions(&self, item: &Item) -> Result<(), GameError> {
        if let Some(min_level) = item.min_level {
            if self.level < min_level {
                return Err(GameError::Restricted);
            }
        }
        if let Some(classes) = &item.classes {
            if !classes.contains(&self.class) {
                return Err(GameError::Restricted);
            }
        }
        Ok(())
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.inventory.iter().find(|item| item.id == id)
    }

    /// Remove an item from the inventory, unequipping it first if needed.
    pub fn take_item(&mut self, id: ItemId) -> Option<Item> {
        if let Some(slot) = self.equipment.slot_of(id) {
            self.equipment.set(slot, None);
        }
        let index = self.inventory.iter().position(|item| item.id == id)?;
        Some(self.inventory.remove(index))
    }

    // ------------------------------------------------------------------
    // Derived combat stats
    // ------------------------------------------------------------------

    fn equipped(&self, slot: EquipSlot) -> Option<&Item> {
        self.equipment.get(slot).and_then(|id| self.item(id))
    }

    pub fn equipped_weapon(&self) -> Option<&Item> {
        self.equipped(EquipSlot::Weapon)
    }

    pub fn equipped_armor(&self) -> Option<&Item> {
        self.equipped(EquipSlot::Armor)
    }

    pub fn armor_class(&self) -> i32 {
        let armor = self.equipped_armor().map_or(0, |item| item.power as i32);
        10 + self.dexterity_modifier() + armor
    }

    pub fn attack_power(&self) -> u32 {
        let weapon = self.equipped_weapon().map_or(0, |item| item.power as i32);
        (self.strength_modifier() + weapon + 1).max(1) as u32
    }

    /// Flat damage reduction applied to incoming hits.
    pub fn defense(&self) -> u32 {
        let armor = self.equipped_armor().map_or(0, |item| item.power);
        self.constitution_modifier().max(0) as u32 + armor / 2
    }

    fn attack_bonus(&self) -> i32 {
        self.strength_modifier() + (self.level / 2) as i32
    }

    /// Chance in [0, 1] to hit a target with the given armor class.
    pub fn hit_chance(&self, target_ac: i32) -> f64 {
        let chance = (21 + self.attack_bonus() - target_ac) as f64 / 20.0;
        chance.clamp(0.0, 1.0)
    }

    // ------------------------------------------------------------------
    // HP / XP
    // ------------------------------------------------------------------

    pub fn take_damage(&mut self, damage: u32) {
        self.hp = self.hp.saturating_sub(damage);
    }

    /// Restore hit points, clamped to the maximum. Returns the amount
    /// actually healed.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let healed = amount.min(self.max_hp - self.hp);
        self.hp += healed;
        healed
    }

    /// Award experience, applying any level-ups it unlocks. Returns the
    /// number of levels gained.
    pub fn award_xp(&mut self, amount: u64) -> u32 {
        self.experience += amount;
        let mut gained = 0;
        while self.experience >= xp_to_next(self.level) {
            self.experience -= xp_to_next(self.level);
            self.level += 1;
            gained += 1;

            let con_mod = self.constitution_modifier();
            let hp_gain = ((self.class.hit_die() / 2) as i32 + con_mod).max(1) as u32;
            let mana_gain = self.class.mana_die() / 2;
            self.max_hp += hp_gain;
            self.max_mana += mana_gain;
            // Leveling restores the character to full.
            self.hp = self.max_hp;
            self.mana = self.max_mana;
        }
        gained
    }
}
