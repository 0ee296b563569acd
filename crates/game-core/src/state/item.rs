//! Item model: weapons, armor, consumables, and valuables.

use std::collections::BTreeSet;

use crate::state::CharacterClass;
use crate::types::{ItemId, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ItemKind {
    Weapon,
    Armor,
    Potion,
    Gold,
    Key,
    Treasure,
}

/// A single item instance.
///
/// `position` is `Some` while the item lies on a floor and `None` once it is
/// carried or equipped. `power` is damage for weapons, healing for potions,
/// and armor class for armor.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item {
    pub id: ItemId,
    pub kind: ItemKind,
    pub name: String,
    pub weight: u32,
    pub value: u32,
    pub power: u32,
    /// Minimum character level to pick up or equip.
    pub min_level: Option<u32>,
    /// Classes allowed to pick up or equip; `None` means unrestricted.
    pub classes: Option<BTreeSet<CharacterClass>>,
    pub position: Option<Position>,
}

impl Item {
    pub fn new(id: ItemId, kind: ItemKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            weight: 0,
            value: 0,
            power: 0,
            min_level: None,
            classes: None,
            position: None,
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_value(mut self, value: u32) -> Self {
        self.value = value;
        self
    }

    pub fn with_power(mut self, power: u32) -> Self {
        self.power = power;
        self
    }

    pub fn with_min_level(mut self, level: u32) -> Self {
        self.min_level = Some(level);
        self
    }

    pub fn with_classes(mut self, classes: impl IntoIterator<Item = CharacterClass>) -> Self {
        self.classes = Some(classes.into_iter().collect());
        self
    }

    /// Place the item at a floor position.
    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Healing potion scaled to a floor level. Convenience for tests and
    /// loot generation.
    pub fn potion(id: ItemId, level: u32) -> Self {
        let heal = 10 + 5 * level;
        Self::new(id, ItemKind::Potion, "Healing Potion")
            .with_weight(1)
            .with_power(heal)
            .with_value(heal / 2)
    }

    /// True for kinds that occupy an equipment slot.
    pub fn is_equippable(&self) -> bool {
        matches!(self.kind, ItemKind::Weapon | ItemKind::Armor)
    }
}
