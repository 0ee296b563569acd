//! Combat resolution: attack, potion use, flee.
//!
//! The manager is stateless; every roll comes from the RNG handed in, so a
//! fight replays exactly under the same seed.

use crate::error::GameError;
use crate::rng::Pcg32;
use crate::state::{Character, Item, ItemKind, Mob};
use crate::types::{CharacterId, MobId};

/// Critical hits land on a d100 roll of 5 or less and double damage.
const CRIT_CHANCE: u32 = 5;

/// Outcome of one attack exchange, shaped for delta emission.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatResult {
    pub attacker: CharacterId,
    pub target: MobId,
    pub hit: bool,
    pub critical: bool,
    /// Damage dealt to the mob after its defense; zero on a miss.
    pub damage: u32,
    pub mob_killed: bool,
    pub xp_awarded: u64,
    pub gold_awarded: u32,
    pub leveled_up: bool,
    /// Damage the counterattack dealt; `None` when no counter landed.
    pub counter_damage: Option<u32>,
    pub character_hp: u32,
    pub mob_hp: u32,
}

/// Outcome of a flee attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FleeResult {
    pub escaped: bool,
    /// The free attack a failed flee grants the mob.
    pub counter_damage: Option<u32>,
    pub character_hp: u32,
}

pub struct CombatManager;

impl CombatManager {
    /// Resolve one attack: hit roll, crit roll, damage minus defense, then
    /// either death rewards or the mob's counterattack.
    pub fn attack_mob(character: &mut Character, mob: &mut Mob, rng: &mut Pcg32) -> CombatResult {
        let mut result = CombatResult {
            attacker: character.id,
            target: mob.id,
            hit: false,
            critical: false,
            damage: 0,
            mob_killed: false,
            xp_awarded: 0,
            gold_awarded: 0,
            leveled_up: false,
            counter_damage: None,
            character_hp: character.hp,
            mob_hp: mob.hp,
        };

        let hit_percent = to_percent(character.hit_chance(mob.armor_class));
        if rng.roll_d100() > hit_percent {
            return result;
        }
        result.hit = true;

        let mut damage = character.attack_power();
        if rng.roll_d100() <= CRIT_CHANCE {
            result.critical = true;
            damage *= 2;
        }
        let damage = damage.saturating_sub(mob.defense).max(1);
        mob.take_damage(damage);
        result.damage = damage;
        result.mob_hp = mob.hp;

        if mob.is_dead() {
            result.mob_killed = true;
            result.xp_awarded = adjusted_xp(mob, character.level);
            result.gold_awarded = mob.gold_value;
            result.leveled_up = character.award_xp(result.xp_awarded) > 0;
            character.gold += result.gold_awarded;
        } else {
            result.counter_damage = counterattack(character, mob, rng);
        }

        result.character_hp = character.hp;
        result
    }

    /// Drink a potion: heals up to the character's maximum, fails when
    /// already full. Other item kinds have no combat use.
    pub fn use_item(character: &mut Character, item: &Item) -> Result<u32, GameError> {
        match item.kind {
            ItemKind::Potion => {
                if character.hp >= character.max_hp {
                    return Err(GameError::Restricted);
                }
                Ok(character.heal(item.power))
            }
            _ => Err(GameError::Restricted),
        }
    }

    /// Attempt to flee: `50 + 5 x dex modifier - mob level`, clamped to
    /// [10, 90]. A failed attempt gives the mob one free attack.
    pub fn flee(character: &mut Character, mob: &Mob, rng: &mut Pcg32) -> FleeResult {
        let chance = (50 + 5 * character.dexterity_modifier() - mob.level as i32).clamp(10, 90);
        let escaped = rng.roll_d100() <= chance as u32;
        let counter_damage = if escaped {
            None
        } else {
            counterattack(character, mob, rng)
        };
        FleeResult {
            escaped,
            counter_damage,
            character_hp: character.hp,
        }
    }
}

/// The mob's return swing. `None` when it misses.
fn counterattack(character: &mut Character, mob: &Mob, rng: &mut Pcg32) -> Option<u32> {
    let hit_percent = to_percent(mob.hit_chance(character.armor_class()));
    if rng.roll_d100() > hit_percent {
        return None;
    }
    let damage = mob.damage.saturating_sub(character.defense()).max(1);
    character.take_damage(damage);
    Some(damage)
}

/// Chance in [0, 1] to an integer percent clamped to [5, 95].
fn to_percent(chance: f64) -> u32 {
    ((chance * 100.0) as i32).clamp(5, 95) as u32
}

/// XP reward adjusted for the level gap: x1.5 when the mob out-levels the
/// attacker by more than 5, x0.5 when it trails by more than 5.
fn adjusted_xp(mob: &Mob, character_level: u32) -> u64 {
    let base = mob.xp_value();
    let gap = mob.level as i64 - character_level as i64;
    if gap > 5 {
        base * 3 / 2
    } else if gap < -5 {
        base / 2
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Attributes, CharacterClass, MobKind, MobVariant};
    use crate::types::{ItemId, Position};

    fn character() -> Character {
        Character::new(
            CharacterId(1),
            "Vex",
            CharacterClass::Warrior,
            Attributes {
                strength: 14,
                dexterity: 12,
                constitution: 13,
                intelligence: 9,
                wisdom: 10,
                charisma: 8,
            },
        )
    }

    fn goblin() -> Mob {
        Mob::spawn(MobId(7), MobKind::Goblin, MobVariant::Normal, 1, Position::ORIGIN)
    }

    #[test]
    fn percent_clamps_to_five_and_ninety_five() {
        assert_eq!(to_percent(0.0), 5);
        assert_eq!(to_percent(1.0), 95);
        assert_eq!(to_percent(0.5), 50);
    }

    #[test]
    fn hits_always_deal_at_least_one_damage() {
        let mut rng = Pcg32::new(1);
        for _ in 0..200 {
            let mut ch = character();
            let mut mob = Mob::spawn(
                MobId(1),
                MobKind::Elemental,
                MobVariant::Boss,
                12,
                Position::ORIGIN,
            );
            let result = CombatManager::attack_mob(&mut ch, &mut mob, &mut rng);
            if result.hit {
                assert!(result.damage >= 1);
                assert_eq!(result.mob_hp, mob.max_hp - result.damage.min(mob.max_hp));
                return;
            }
        }
        panic!("no hit in 200 attempts despite a 5% floor");
    }

    #[test]
    fn killing_awards_xp_and_gold() {
        let mut rng = Pcg32::new(3);
        let mut ch = character();
        let mut mob = goblin();
        let gold_value = mob.gold_value;
        let gold_before = ch.gold;

        loop {
            let result = CombatManager::attack_mob(&mut ch, &mut mob, &mut rng);
            if result.mob_killed {
                assert!(result.xp_awarded > 0);
                assert_eq!(result.gold_awarded, gold_value);
                assert_eq!(ch.gold, gold_before + gold_value);
                break;
            }
        }
    }

    #[test]
    fn misses_leave_both_parties_untouched() {
        let mut rng = Pcg32::new(9);
        for _ in 0..500 {
            let mut ch = character();
            let mut mob = goblin();
            let hp_before = ch.hp;
            let mob_hp_before = mob.hp;
            let result = CombatManager::attack_mob(&mut ch, &mut mob, &mut rng);
            if !result.hit {
                assert_eq!(result.damage, 0);
                assert_eq!(ch.hp, hp_before);
                assert_eq!(mob.hp, mob_hp_before);
                assert!(result.counter_damage.is_none());
                return;
            }
        }
        panic!("no miss in 500 attempts despite a 95% ceiling");
    }

    #[test]
    fn level_gap_scales_xp() {
        let low = Mob::spawn(MobId(1), MobKind::Goblin, MobVariant::Normal, 1, Position::ORIGIN);
        let high = Mob::spawn(MobId(2), MobKind::Goblin, MobVariant::Normal, 9, Position::ORIGIN);
        // Character level 10 dwarfs a level-1 goblin.
        assert_eq!(adjusted_xp(&low, 10), low.xp_value() / 2);
        // A mob more than five levels up pays out half again.
        assert_eq!(adjusted_xp(&high, 2), high.xp_value() * 3 / 2);
        assert_eq!(adjusted_xp(&high, 9), high.xp_value());
    }

    #[test]
    fn potion_heals_and_clamps() {
        let mut ch = character();
        ch.take_damage(6);
        let potion = Item::potion(ItemId(1), 1);

        let healed = CombatManager::use_item(&mut ch, &potion).unwrap();
        assert_eq!(healed, 6);
        assert_eq!(ch.hp, ch.max_hp);

        // At full health the potion is refused.
        assert_eq!(
            CombatManager::use_item(&mut ch, &potion),
            Err(GameError::Restricted)
        );
    }

    #[test]
    fn non_potions_cannot_be_used() {
        let mut ch = character();
        ch.take_damage(3);
        let sword = Item::new(ItemId(2), ItemKind::Weapon, "Sword").with_power(4);
        assert_eq!(
            CombatManager::use_item(&mut ch, &sword),
            Err(GameError::Restricted)
        );
    }

    #[test]
    fn flee_outcomes_stay_in_bounds() {
        let mut rng = Pcg32::new(5);
        let mob = goblin();
        let mut escapes = 0;
        let mut failures = 0;
        for _ in 0..300 {
            let mut ch = character();
            let result = CombatManager::flee(&mut ch, &mob, &mut rng);
            if result.escaped {
                escapes += 1;
                assert!(result.counter_damage.is_none());
                assert_eq!(ch.hp, ch.max_hp);
            } else {
                failures += 1;
                if let Some(damage) = result.counter_damage {
                    assert!(damage >= 1);
                    assert_eq!(ch.hp, ch.max_hp - damage.min(ch.max_hp));
                }
            }
        }
        // Chance is clamped to [10, 90]; both outcomes must appear.
        assert!(escapes > 0);
        assert!(failures > 0);
    }
}
