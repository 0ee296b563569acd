//! Mob model and the static stat tables behind it.

use crate::types::{MobId, Position};

/// Closed set of mob types. The pool available to the generator widens with
/// floor level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MobKind {
    Skeleton,
    Goblin,
    Ratman,
    Orc,
    Ooze,
    Troll,
    Wraith,
    Ogre,
    Drake,
    Lich,
    Elemental,
    Dragon,
}

/// Difficulty tier of an individual mob, modulating stats and rewards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MobVariant {
    Easy,
    Normal,
    Hard,
    Boss,
}

impl MobVariant {
    /// Integer stat scaling as (numerator, denominator); integer math keeps
    /// generation byte-reproducible.
    fn stat_scale(self) -> (u32, u32) {
        match self {
            MobVariant::Easy => (4, 5),
            MobVariant::Normal => (1, 1),
            MobVariant::Hard => (13, 10),
            MobVariant::Boss => (2, 1),
        }
    }

    /// XP reward scaling: Easy x0.7, Normal x1.0, Hard x1.5, Boss x3.0.
    fn xp_scale(self) -> (u64, u64) {
        match self {
            MobVariant::Easy => (7, 10),
            MobVariant::Normal => (1, 1),
            MobVariant::Hard => (3, 2),
            MobVariant::Boss => (3, 1),
        }
    }

    pub fn scale_stat(self, value: u32) -> u32 {
        let (num, den) = self.stat_scale();
        (value * num / den).max(1)
    }
}

/// Level-1 baseline stats per mob type.
struct MobBase {
    hp: u32,
    damage: u32,
    defense: u32,
    armor_class: i32,
    xp: u64,
    gold: u32,
}

impl MobKind {
    fn base(self) -> MobBase {
        match self {
            MobKind::Skeleton => MobBase { hp: 12, damage: 3, defense: 1, armor_class: 11, xp: 50, gold: 5 },
            MobKind::Goblin => MobBase { hp: 10, damage: 3, defense: 0, armor_class: 12, xp: 50, gold: 8 },
            MobKind::Ratman => MobBase { hp: 9, damage: 2, defense: 0, armor_class: 13, xp: 40, gold: 4 },
            MobKind::Orc => MobBase { hp: 16, damage: 5, defense: 2, armor_class: 13, xp: 100, gold: 12 },
            MobKind::Ooze => MobBase { hp: 22, damage: 4, defense: 3, armor_class: 9, xp: 110, gold: 6 },
            MobKind::Troll => MobBase { hp: 30, damage: 7, defense: 3, armor_class: 14, xp: 200, gold: 20 },
            MobKind::Wraith => MobBase { hp: 24, damage: 8, defense: 2, armor_class: 15, xp: 220, gold: 16 },
            MobKind::Ogre => MobBase { hp: 40, damage: 10, defense: 4, armor_class: 14, xp: 350, gold: 30 },
            MobKind::Drake => MobBase { hp: 36, damage: 11, defense: 5, armor_class: 16, xp: 400, gold: 40 },
            MobKind::Lich => MobBase { hp: 45, damage: 13, defense: 5, armor_class: 17, xp: 600, gold: 60 },
            MobKind::Elemental => MobBase { hp: 50, damage: 12, defense: 7, armor_class: 15, xp: 650, gold: 45 },
            MobKind::Dragon => MobBase { hp: 80, damage: 18, defense: 8, armor_class: 18, xp: 1200, gold: 150 },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mob {
    pub id: MobId,
    pub kind: MobKind,
    pub variant: MobVariant,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub damage: u32,
    pub defense: u32,
    pub armor_class: i32,
    pub position: Position,
    pub gold_value: u32,
}

impl Mob {
    /// Materialize a mob of the given kind scaled to level and variant.
    pub fn spawn(id: MobId, kind: MobKind, variant: MobVariant, level: u32, position: Position) -> Self {
        let base = kind.base();
        let level_ups = level.saturating_sub(1);
        let hp = variant.scale_stat(base.hp + 4 * level_ups);
        let damage = variant.scale_stat(base.damage + level_ups);
        let defense = variant.scale_stat(base.defense + level_ups / 3);
        let armor_class = base.armor_class + (level_ups / 2) as i32;
        let gold_value = variant.scale_stat(base.gold + 2 * level_ups);

        Self {
            id,
            kind,
            variant,
            level,
            hp,
            max_hp: hp,
            damage,
            defense,
            armor_class,
            position,
            gold_value,
        }
    }

    /// XP reward for killing this mob, before the attacker level adjustment
    /// applied by combat.
    pub fn xp_value(&self) -> u64 {
        let base = self.kind.base().xp + 25 * self.level.saturating_sub(1) as u64;
        let (num, den) = self.variant.xp_scale();
        base * num / den
    }

    /// Chance in [0, 1] for this mob to hit a target with the given armor
    /// class.
    pub fn hit_chance(&self, target_ac: i32) -> f64 {
        let attack_bonus = (self.level / 2 + 1) as i32;
        let chance = (21 + attack_bonus - target_ac) as f64 / 20.0;
        chance.clamp(0.0, 1.0)
    }

    pub fn take_damage(&mut self, damage: u32) {
        self.hp = self.hp.saturating_sub(damage);
    }

    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }
}
