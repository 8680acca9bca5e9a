use guild_game::save::{read_slot, write_slot};
use guild_game::{
    CURRENT_SAVE_VERSION, GameConfig, GameContext, GameEngine, BuiltinLoader, GuildSession,
    MasterData, MemoryStorage, MigrationError, SaveData, SaveError, SaveStorage,
};
use serde_json::{Value, json};

fn context() -> GameContext {
    GameContext::new(MasterData::builtin().unwrap(), GameConfig::default())
}

fn advanced_session(seed: u64) -> GuildSession {
    let mut session = GuildSession::new(context(), seed);
    for _ in 0..6 {
        session.next_phase().unwrap();
    }
    session
}

/// Strip a current save back down to what a 1.0.0 save held.
fn downgrade_to_1_0_0(json: &str) -> String {
    let mut value: Value = serde_json::from_str(json).unwrap();
    let root = value.as_object_mut().unwrap();
    root.insert("version".into(), json!("1.0.0"));
    root.remove("rng");
    let game = root.get_mut("game").unwrap().as_object_mut().unwrap();
    game.remove("apOverflow");
    game.remove("deliveriesThisPhase");
    root.get_mut("quest")
        .unwrap()
        .as_object_mut()
        .unwrap()
        .remove("questBoard");
    value.to_string()
}

#[test]
fn legacy_save_loads_with_defaults() {
    let session = advanced_session(17);
    let current = SaveData::capture(session.state(), 1).to_json().unwrap();
    let legacy = downgrade_to_1_0_0(&current);

    let migrated = SaveData::from_json(&legacy).unwrap();
    assert_eq!(migrated.version, CURRENT_SAVE_VERSION);
    assert_eq!(migrated.game.ap_overflow, 0);
    assert_eq!(migrated.game.deliveries_this_phase, 0);
    assert!(migrated.quest.quest_board.is_empty());
    assert_eq!(migrated.rng.deck, 0);
    assert_eq!(migrated.game.day, session.state().game.day);
    assert_eq!(migrated.player, session.state().player);
}

#[test]
fn engine_loads_legacy_slots_and_keeps_playing() {
    let storage = MemoryStorage::new();
    let session = advanced_session(23);
    let current = SaveData::capture(session.state(), 1).to_json().unwrap();
    storage
        .save("legacy", &downgrade_to_1_0_0(&current))
        .unwrap();

    let engine = GameEngine::new(BuiltinLoader, storage.clone());
    let mut resumed = engine.load_game("legacy").unwrap().expect("slot exists");
    for _ in 0..8 {
        resumed.next_phase().unwrap();
    }
    assert_eq!(resumed.state().game.day, session.state().game.day + 2);
}

#[test]
fn reloaded_run_continues_identically() {
    let storage = MemoryStorage::new();
    let mut original = advanced_session(31);
    write_slot(&storage, "mid", original.state()).unwrap();
    let state = read_slot(&storage, "mid").unwrap().unwrap();
    let mut reloaded = GuildSession::from_state(context(), state);

    for _ in 0..12 {
        original.next_phase().unwrap();
        reloaded.next_phase().unwrap();
    }
    assert_eq!(original.state(), reloaded.state());
}

#[test]
fn unsupported_versions_are_refused() {
    let session = advanced_session(5);
    let mut value: Value =
        serde_json::from_str(&SaveData::capture(session.state(), 1).to_json().unwrap()).unwrap();
    value["version"] = json!("3.0.0");
    let err = SaveData::from_json(&value.to_string()).unwrap_err();
    assert!(matches!(
        err,
        SaveError::Migration(MigrationError::UnsupportedVersion(ref v)) if v == "3.0.0"
    ));

    let storage = MemoryStorage::new();
    storage.save("future", &value.to_string()).unwrap();
    let engine = GameEngine::new(BuiltinLoader, storage);
    let err = engine.load_game("future").unwrap_err();
    assert!(format!("{err:#}").contains("unsupported save version"));
}

#[test]
fn malformed_json_is_a_json_error() {
    assert!(matches!(
        SaveData::from_json("{not json"),
        Err(SaveError::Json(_))
    ));
}
