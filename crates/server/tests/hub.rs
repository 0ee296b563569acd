//! Session hub tests: registration, broadcast scoping, and slow-consumer
//! eviction.

use std::sync::Arc;

use game_core::{Attributes, Character, CharacterClass, CharacterId, Difficulty};
use game_server::hub::{ClientId, DeltaSink, SessionHub};
use game_server::protocol::ServerMessage;
use game_server::repository::{
    CharacterRepository, DungeonRepository, InMemoryCharacterRepository,
    InMemoryDungeonRepository,
};

fn fixtures() -> (
    Arc<InMemoryCharacterRepository>,
    Arc<InMemoryDungeonRepository>,
) {
    (
        Arc::new(InMemoryCharacterRepository::new()),
        Arc::new(InMemoryDungeonRepository::new()),
    )
}

fn hub_with_capacity(
    capacity: usize,
    characters: &Arc<InMemoryCharacterRepository>,
    dungeons: &Arc<InMemoryDungeonRepository>,
) -> Arc<SessionHub> {
    Arc::new(SessionHub::new(
        capacity,
        Arc::clone(characters) as Arc<dyn CharacterRepository>,
        Arc::clone(dungeons) as Arc<dyn DungeonRepository>,
    ))
}

fn save_character(repo: &Arc<InMemoryCharacterRepository>, id: u64) -> Character {
    let character = Character::new(
        CharacterId(id),
        format!("c{id}"),
        CharacterClass::Rogue,
        Attributes::default(),
    );
    repo.save(&character).unwrap();
    character
}

#[test]
fn register_and_unregister_maintain_the_tables() {
    let (characters, dungeons) = fixtures();
    let hub = hub_with_capacity(8, &characters, &dungeons);
    save_character(&characters, 1);

    let client = ClientId(10);
    let _receiver = hub.register(client, Some(CharacterId(1)));
    assert!(hub.is_registered(client));
    assert_eq!(hub.character_of(client), Some(CharacterId(1)));
    assert_eq!(hub.client_count(), 1);

    hub.unregister(client);
    assert!(!hub.is_registered(client));
    assert_eq!(hub.client_count(), 0);

    // Idempotent: a second unregister is a no-op.
    hub.unregister(client);
}

#[test]
fn registering_a_character_inside_a_dungeon_primes_the_client() {
    let (characters, dungeons) = fixtures();
    let hub = hub_with_capacity(8, &characters, &dungeons);

    let handle = dungeons
        .create("t", 2, Difficulty::Normal, Some(42))
        .unwrap();
    {
        let mut state = handle.lock_state();
        state.floor_or_generate(1).unwrap();
        state.add_character(CharacterId(1), 1);
    }
    let mut character = save_character(&characters, 1);
    character.dungeon = Some(handle.id);
    character.floor = 1;
    characters.save(&character).unwrap();

    let mut receiver = hub.register(ClientId(1), Some(CharacterId(1)));

    let first = receiver.try_recv().unwrap();
    assert!(matches!(first, ServerMessage::FloorUpdate { floor } if floor.level == 1));
    let second = receiver.try_recv().unwrap();
    assert!(matches!(second, ServerMessage::UpdatePlayer { character } if character.id == CharacterId(1)));
}

#[test]
fn floor_broadcasts_reach_only_observers_of_that_floor() {
    let (characters, dungeons) = fixtures();
    let hub = hub_with_capacity(8, &characters, &dungeons);
    save_character(&characters, 1);
    save_character(&characters, 2);
    save_character(&characters, 3);

    let mut on_floor = hub.register(ClientId(1), Some(CharacterId(1)));
    let mut below = hub.register(ClientId(2), Some(CharacterId(2)));
    let mut outside = hub.register(ClientId(3), Some(CharacterId(3)));

    let dungeon = game_core::DungeonId(7);
    hub.set_location(CharacterId(1), Some((dungeon, 1)));
    hub.set_location(CharacterId(2), Some((dungeon, 2)));

    hub.broadcast_floor(dungeon, 1, ServerMessage::notification("rumble"));

    assert!(on_floor.try_recv().is_ok());
    assert!(below.try_recv().is_err());
    assert!(outside.try_recv().is_err());
}

#[test]
fn broadcast_floor_except_skips_the_originator() {
    let (characters, dungeons) = fixtures();
    let hub = hub_with_capacity(8, &characters, &dungeons);
    save_character(&characters, 1);
    save_character(&characters, 2);

    let mut mover = hub.register(ClientId(1), Some(CharacterId(1)));
    let mut watcher = hub.register(ClientId(2), Some(CharacterId(2)));

    let dungeon = game_core::DungeonId(7);
    hub.set_location(CharacterId(1), Some((dungeon, 1)));
    hub.set_location(CharacterId(2), Some((dungeon, 1)));

    hub.broadcast_floor_except(dungeon, 1, CharacterId(1), ServerMessage::notification("step"));

    assert!(mover.try_recv().is_err());
    assert!(watcher.try_recv().is_ok());
}

/// Scenario: two observers on one floor; one stops draining its queue.
/// The stalled client is evicted, the healthy one keeps receiving.
#[test]
fn slow_consumers_are_evicted_on_overflow() {
    let (characters, dungeons) = fixtures();
    let hub = hub_with_capacity(2, &characters, &dungeons);
    save_character(&characters, 1);
    save_character(&characters, 2);

    let mut healthy = hub.register(ClientId(1), Some(CharacterId(1)));
    let _stalled = hub.register(ClientId(2), Some(CharacterId(2)));

    let dungeon = game_core::DungeonId(7);
    hub.set_location(CharacterId(1), Some((dungeon, 1)));
    hub.set_location(CharacterId(2), Some((dungeon, 1)));

    // Fill the stalled client's queue to capacity.
    hub.send_to_character(CharacterId(2), ServerMessage::notification("one"));
    hub.send_to_character(CharacterId(2), ServerMessage::notification("two"));
    assert!(hub.is_registered(ClientId(2)));

    // The next scoped broadcast overflows it.
    hub.broadcast_floor(dungeon, 1, ServerMessage::notification("three"));

    assert!(!hub.is_registered(ClientId(2)));
    assert!(hub.is_registered(ClientId(1)));

    // The healthy client saw the update.
    let mut healthy_messages = Vec::new();
    while let Ok(message) = healthy.try_recv() {
        healthy_messages.push(message);
    }
    assert!(healthy_messages
        .iter()
        .any(|message| matches!(message, ServerMessage::Notification { text } if text == "three")));

    // Subsequent broadcasts no longer target the evicted client.
    hub.broadcast_floor(dungeon, 1, ServerMessage::notification("four"));
    assert!(!hub.is_registered(ClientId(2)));
}

#[test]
fn plain_broadcast_reaches_every_client() {
    let (characters, dungeons) = fixtures();
    let hub = hub_with_capacity(4, &characters, &dungeons);

    let mut a = hub.register(ClientId(1), None);
    let mut b = hub.register(ClientId(2), None);

    hub.broadcast(ServerMessage::notification("hello"));

    assert!(a.try_recv().is_ok());
    assert!(b.try_recv().is_ok());
}
