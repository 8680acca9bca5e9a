//! Save games: the persisted document, its migrations and storage.
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::inventory::InventoryState;
use crate::quest::QuestState;
use crate::rng::RngCursors;
use crate::state::{DeckState, GameProgress, GuildState, PlayerState};

pub mod migration;
pub mod storage;

pub use migration::{CURRENT_SAVE_VERSION, MigrationError, migrate};
pub use storage::{MemoryStorage, SaveStorage, StorageError};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The persisted form of a [`GuildState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveData {
    pub version: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub seed: u64,
    pub game: GameProgress,
    pub player: PlayerState,
    pub deck: DeckState,
    pub inventory: InventoryState,
    pub quest: QuestState,
    #[serde(default)]
    pub artifacts: Vec<String>,
    pub rng: RngCursors,
}

impl SaveData {
    #[must_use]
    pub fn capture(state: &GuildState, timestamp: u64) -> Self {
        Self {
            version: CURRENT_SAVE_VERSION.to_string(),
            timestamp,
            seed: state.seed,
            game: state.game.clone(),
            player: state.player.clone(),
            deck: state.deck.clone(),
            inventory: state.inventory.clone(),
            quest: state.quest.clone(),
            artifacts: state.player.artifacts.clone(),
            rng: state.rng,
        }
    }

    #[must_use]
    pub fn into_state(self) -> GuildState {
        let mut player = self.player;
        player.artifacts = self.artifacts;
        GuildState {
            seed: self.seed,
            game: self.game,
            player,
            deck: self.deck,
            inventory: self.inventory,
            quest: self.quest,
            rng: self.rng,
        }
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a save of any supported version, migrating it first.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON and unsupported versions.
    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        let mut raw: serde_json::Value = serde_json::from_str(json)?;
        migrate(&mut raw)?;
        Ok(serde_json::from_value(raw)?)
    }
}

/// Wall-clock time for save timestamps.
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Serialize `state` into `key`.
///
/// # Errors
///
/// Fails if serialization or the storage write fails.
pub fn write_slot(storage: &dyn SaveStorage, key: &str, state: &GuildState) -> Result<(), SaveError> {
    let json = SaveData::capture(state, now_millis()).to_json()?;
    storage.save(key, &json)?;
    Ok(())
}

/// Load and migrate `key`; `Ok(None)` when the slot is empty.
///
/// # Errors
///
/// Fails on storage errors, malformed saves and unsupported versions.
pub fn read_slot(storage: &dyn SaveStorage, key: &str) -> Result<Option<GuildState>, SaveError> {
    let Some(json) = storage.load(key)? else {
        return Ok(None);
    };
    Ok(Some(SaveData::from_json(&json)?.into_state()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::fresh;

    #[test]
    fn save_roundtrip_keeps_artifacts_at_top_level() {
        let (_, mut state, _) = fresh(71);
        state.player.artifacts.push("a_lens".into());
        let data = SaveData::capture(&state, 1_700_000_000_000);
        let json: serde_json::Value = serde_json::from_str(&data.to_json().unwrap()).unwrap();
        assert_eq!(json["artifacts"], serde_json::json!(["a_lens"]));
        assert!(json["player"].get("artifacts").is_none());
        assert_eq!(json["version"], CURRENT_SAVE_VERSION);
        assert!(json["game"].get("rankDaysRemaining").is_some());

        let restored = SaveData::from_json(&data.to_json().unwrap())
            .unwrap()
            .into_state();
        assert_eq!(restored, state);
    }

    #[test]
    fn slots_roundtrip_through_storage() {
        let (_, state, _) = fresh(72);
        let storage = MemoryStorage::new();
        write_slot(&storage, "slot-a", &state).unwrap();
        assert_eq!(read_slot(&storage, "slot-a").unwrap(), Some(state));
        assert_eq!(read_slot(&storage, "missing").unwrap(), None);
    }

    #[test]
    fn future_version_is_rejected() {
        let (_, state, _) = fresh(73);
        let mut data = SaveData::capture(&state, 0);
        data.version = "9.0.0".to_string();
        let err = SaveData::from_json(&data.to_json().unwrap()).unwrap_err();
        assert!(matches!(
            err,
            SaveError::Migration(MigrationError::UnsupportedVersion(_))
        ));
    }
}
