//! Item placement and level-scaled loot generation.

use crate::rng::Pcg32;
use crate::state::{CharacterClass, Floor, Item, ItemKind, Room, RoomKind};
use crate::types::{ItemId, Position};

const WEAPON_NAMES: [&str; 5] = [
    "Rusty Dagger",
    "Short Sword",
    "Iron Mace",
    "Steel Longsword",
    "Runed Greatsword",
];

const ARMOR_NAMES: [&str; 5] = [
    "Padded Vest",
    "Leather Armor",
    "Chain Shirt",
    "Scale Mail",
    "Dragonhide Plate",
];

const TREASURE_NAMES: [&str; 6] = [
    "Silver Chalice",
    "Jeweled Idol",
    "Ancient Coin",
    "Golden Torc",
    "Opal Ring",
    "Ivory Figurine",
];

pub(super) fn place_items(floor: &mut Floor, rng: &mut Pcg32, level: u32) {
    let rooms = floor.rooms.clone();
    let mut sequence: u64 = 0;

    for room in &rooms {
        let count = match room.kind {
            RoomKind::Treasure => 3 + rng.range(0, 2),
            RoomKind::Boss => 2 + rng.range(0, 2),
            RoomKind::Standard => u32::from(rng.chance(30)),
            RoomKind::Entrance => u32::from(rng.chance(50)),
            RoomKind::Safe | RoomKind::Shop => 0,
        };

        for _ in 0..count {
            let Some(position) = random_item_tile(floor, room, rng) else {
                break;
            };
            sequence += 1;
            let item = random_item(item_id(level, sequence), level, rng).at(position);
            floor.place_item(item);
        }
    }
}

fn item_id(level: u32, sequence: u64) -> ItemId {
    ItemId(((level as u64) << 32) | sequence)
}

/// Generate a random item scaled to the floor level.
pub fn random_item(id: ItemId, level: u32, rng: &mut Pcg32) -> Item {
    let roll = rng.roll_d100();
    if roll <= 20 {
        random_weapon(id, level, rng)
    } else if roll <= 40 {
        random_armor(id, level, rng)
    } else if roll <= 70 {
        Item::potion(id, level)
    } else if roll <= 90 {
        Item::new(id, ItemKind::Gold, "Gold Coins").with_value(5 + 5 * level + rng.range(0, 15))
    } else if roll <= 98 {
        Item::new(id, ItemKind::Treasure, *rng.pick(&TREASURE_NAMES))
            .with_weight(2)
            .with_value(25 * level + rng.range(0, 50))
    } else {
        Item::new(id, ItemKind::Key, "Tarnished Key").with_value(5)
    }
}

fn random_weapon(id: ItemId, level: u32, rng: &mut Pcg32) -> Item {
    let power = 2 + level + rng.range(0, 2);
    let tier = (power as usize / 4).min(WEAPON_NAMES.len() - 1);
    let mut item = Item::new(id, ItemKind::Weapon, WEAPON_NAMES[tier])
        .with_weight(3 + rng.range(0, 3))
        .with_power(power)
        .with_value(power * 10);
    if power >= 10 {
        item = item.with_min_level(level / 2 + 1);
    }
    // The heaviest martial weapons are beyond casters.
    if tier >= 3 && rng.chance(25) {
        item = item.with_classes([
            CharacterClass::Warrior,
            CharacterClass::Rogue,
            CharacterClass::Cleric,
        ]);
    }
    item
}

fn random_armor(id: ItemId, level: u32, rng: &mut Pcg32) -> Item {
    let power = 1 + level / 2 + rng.range(0, 2);
    let tier = (power as usize / 2).min(ARMOR_NAMES.len() - 1);
    let mut item = Item::new(id, ItemKind::Armor, ARMOR_NAMES[tier])
        .with_weight(6 + rng.range(0, 4))
        .with_power(power)
        .with_value(power * 12);
    if power >= 5 {
        item = item.with_min_level(level / 2 + 1);
    }
    if tier >= 3 && rng.chance(25) {
        item = item.with_classes([CharacterClass::Warrior, CharacterClass::Cleric]);
    }
    item
}

/// Uniformly random walkable tile in the room with no existing item, no
/// mob, and not a stair tile.
fn random_item_tile(floor: &Floor, room: &Room, rng: &mut Pcg32) -> Option<Position> {
    let candidates: Vec<Position> = room
        .tiles()
        .filter(|position| {
            floor.tile(*position).is_some_and(|tile| {
                tile.walkable && !tile.is_stairs() && tile.item.is_none() && tile.mob.is_none()
            })
        })
        .collect();
    if candidates.is_empty() {
        None
    } else {
        Some(candidates[rng.next_u32() as usize % candidates.len()])
    }
}
