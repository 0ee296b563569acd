//! World state types: tiles, rooms, floors, dungeons, characters, mobs,
//! items.

mod character;
mod dungeon;
mod floor;
mod item;
mod mob;
mod room;
mod tile;

pub use character::{Attributes, Character, CharacterClass, EquipSlot, Equipment};
pub use dungeon::Dungeon;
pub use floor::{ConsistencyError, Floor};
pub use item::{Item, ItemKind};
pub use mob::{Mob, MobKind, MobVariant};
pub use room::{Room, RoomKind};
pub use tile::{Tile, TileKind};
