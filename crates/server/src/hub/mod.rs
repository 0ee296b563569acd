//! Session hub: client registry, broadcast scoping, slow-consumer eviction.

pub mod client;

pub use client::{ClientId, spawn_client};

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use game_core::{CharacterId, DungeonId};

use crate::protocol::ServerMessage;
use crate::repository::{CharacterRepository, DungeonRepository};

/// Where a bound character currently is; the unit of broadcast scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    pub dungeon: DungeonId,
    pub floor: u32,
}

struct ClientEntry {
    character: Option<CharacterId>,
    sender: mpsc::Sender<ServerMessage>,
}

#[derive(Default)]
struct Tables {
    clients: HashMap<ClientId, ClientEntry>,
    bindings: HashMap<CharacterId, ClientId>,
    locations: HashMap<CharacterId, Location>,
}

/// Fanout seam between the dungeon authority and connected clients.
///
/// Every method is non-blocking: enqueueing never suspends, so the authority
/// may call into the sink while holding its dungeon lock.
pub trait DeltaSink: Send + Sync {
    fn send_to_character(&self, character: CharacterId, message: ServerMessage);

    /// Enqueue on every client observing (dungeon, floor).
    fn broadcast_floor(&self, dungeon: DungeonId, level: u32, message: ServerMessage);

    /// Same scope, minus one character (usually the originator).
    fn broadcast_floor_except(
        &self,
        dungeon: DungeonId,
        level: u32,
        except: CharacterId,
        message: ServerMessage,
    );

    /// Record where a character now is, or `None` when it leaves its
    /// dungeon. Keeps broadcast scoping accurate.
    fn set_location(&self, character: CharacterId, location: Option<(DungeonId, u32)>);
}

/// Client registry and broadcast fanout.
///
/// All tables sit behind one read-write lock: register/unregister take it
/// for writing, broadcasts for reading. A client whose bounded queue is full
/// at enqueue time is evicted rather than awaited, so slow consumers never
/// stall world mutation.
pub struct SessionHub {
    queue_capacity: usize,
    characters: Arc<dyn CharacterRepository>,
    dungeons: Arc<dyn DungeonRepository>,
    tables: RwLock<Tables>,
}

impl SessionHub {
    pub fn new(
        queue_capacity: usize,
        characters: Arc<dyn CharacterRepository>,
        dungeons: Arc<dyn DungeonRepository>,
    ) -> Self {
        Self {
            queue_capacity,
            characters,
            dungeons,
            tables: RwLock::new(Tables::default()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a client and hand back the receiving end of its outbound
    /// queue. A client bound to a character already inside a dungeon is
    /// primed immediately with the floor snapshot and its own state.
    pub fn register(
        &self,
        client: ClientId,
        character: Option<CharacterId>,
    ) -> mpsc::Receiver<ServerMessage> {
        let (sender, receiver) = mpsc::channel(self.queue_capacity);

        // Resolve the prime payload before touching the tables so no lock is
        // held across repository access.
        let primed = character.and_then(|id| self.resume_state(id));

        {
            let mut tables = self.write();
            tables.clients.insert(client, ClientEntry { character, sender });
            if let Some(id) = character {
                tables.bindings.insert(id, client);
            }
            if let Some((location, _, _)) = primed.as_ref() {
                if let Some(id) = character {
                    tables.locations.insert(id, *location);
                }
            }
        }

        info!(client = %client, character = ?character, "client registered");

        if let Some((_, floor_update, player_update)) = primed {
            self.send_to_client(client, floor_update);
            self.send_to_client(client, player_update);
        }

        receiver
    }

    /// Floor snapshot plus character snapshot for a character resuming play
    /// mid-dungeon.
    fn resume_state(
        &self,
        character: CharacterId,
    ) -> Option<(Location, ServerMessage, ServerMessage)> {
        let state = self.characters.get(character).ok()??;
        let dungeon = state.dungeon?;
        let handle = self.dungeons.get(dungeon).ok()??;
        let floor = handle.lock_state().floor(state.floor).cloned()?;
        let location = Location {
            dungeon,
            floor: state.floor,
        };
        Some((
            location,
            ServerMessage::FloorUpdate { floor },
            ServerMessage::UpdatePlayer { character: state },
        ))
    }

    /// Remove a client, dropping its queue so the writer task drains and
    /// exits. Idempotent: reader and writer both call it on teardown.
    pub fn unregister(&self, client: ClientId) {
        let removed = {
            let mut tables = self.write();
            let entry = tables.clients.remove(&client);
            if let Some(entry) = &entry {
                if let Some(character) = entry.character {
                    tables.bindings.remove(&character);
                    tables.locations.remove(&character);
                }
            }
            entry
        };

        if let Some(entry) = removed {
            // Character state is already persisted command-by-command; the
            // final save covers any store that buffers writes.
            if let Some(character) = entry.character {
                if let Ok(Some(state)) = self.characters.get(character) {
                    let _ = self.characters.save(&state);
                }
            }
            info!(client = %client, "client unregistered");
        }
    }

    /// The character bound to a client, if any.
    pub fn character_of(&self, client: ClientId) -> Option<CharacterId> {
        self.read().clients.get(&client).and_then(|entry| entry.character)
    }

    pub fn client_count(&self) -> usize {
        self.read().clients.len()
    }

    pub fn is_registered(&self, client: ClientId) -> bool {
        self.read().clients.contains_key(&client)
    }

    /// Enqueue on one client; evicts it if the queue is full or closed.
    pub fn send_to_client(&self, client: ClientId, message: ServerMessage) {
        let failed = {
            let tables = self.read();
            match tables.clients.get(&client) {
                Some(entry) => entry.sender.try_send(message).is_err(),
                None => false,
            }
        };
        if failed {
            self.evict(client);
        }
    }

    /// Enqueue on every client, evicting any with a full queue.
    pub fn broadcast(&self, message: ServerMessage) {
        let stalled: Vec<ClientId> = {
            let tables = self.read();
            tables
                .clients
                .iter()
                .filter(|(_, entry)| entry.sender.try_send(message.clone()).is_err())
                .map(|(id, _)| *id)
                .collect()
        };
        for client in stalled {
            self.evict(client);
        }
    }

    fn broadcast_scoped(
        &self,
        dungeon: DungeonId,
        level: u32,
        except: Option<CharacterId>,
        message: ServerMessage,
    ) {
        let stalled: Vec<ClientId> = {
            let tables = self.read();
            tables
                .clients
                .iter()
                .filter(|(_, entry)| {
                    let Some(character) = entry.character else {
                        return false;
                    };
                    if except == Some(character) {
                        return false;
                    }
                    tables.locations.get(&character)
                        == Some(&Location {
                            dungeon,
                            floor: level,
                        })
                })
                .filter(|(_, entry)| entry.sender.try_send(message.clone()).is_err())
                .map(|(id, _)| *id)
                .collect()
        };
        for client in stalled {
            self.evict(client);
        }
    }

    fn evict(&self, client: ClientId) {
        warn!(client = %client, "outbound queue full or closed; evicting slow consumer");
        self.unregister(client);
    }
}

impl DeltaSink for SessionHub {
    fn send_to_character(&self, character: CharacterId, message: ServerMessage) {
        let client = self.read().bindings.get(&character).copied();
        if let Some(client) = client {
            self.send_to_client(client, message);
        }
    }

    fn broadcast_floor(&self, dungeon: DungeonId, level: u32, message: ServerMessage) {
        self.broadcast_scoped(dungeon, level, None, message);
    }

    fn broadcast_floor_except(
        &self,
        dungeon: DungeonId,
        level: u32,
        except: CharacterId,
        message: ServerMessage,
    ) {
        self.broadcast_scoped(dungeon, level, Some(except), message);
    }

    fn set_location(&self, character: CharacterId, location: Option<(DungeonId, u32)>) {
        let mut tables = self.write();
        match location {
            Some((dungeon, floor)) => {
                tables
                    .locations
                    .insert(character, Location { dungeon, floor });
            }
            None => {
                tables.locations.remove(&character);
            }
        }
        debug!(%character, ?location, "observer location updated");
    }
}
