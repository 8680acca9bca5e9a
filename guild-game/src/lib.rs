//! Guild Rank Game Engine
//!
//! Platform-agnostic core of the Guild Rank card and crafting game: quests,
//! gathering drafts, alchemy, deliveries and promotion tests, played out over
//! a day/phase loop. This crate holds no UI or platform dependencies.

pub mod card;
pub mod config;
pub mod constants;
pub mod data;
pub mod deck;
pub mod error;
pub mod events;
pub mod inventory;
pub mod item;
pub mod material;
pub mod numbers;
pub mod quality;
pub mod quest;
pub mod rank;
pub mod result;
pub mod reward;
pub mod rng;
pub mod save;
pub mod session;
pub mod state;
pub mod usecases;

use anyhow::Context;

// Re-export commonly used types
pub use card::{CardDef, CardKind, EnhancementEffect};
pub use config::{AutoSaveConfig, AutoSaveTrigger, ComboConfig, ConfigError, GameConfig};
pub use data::{DataError, MasterData, RecipeDef, ShopEntry, ShopGoods};
pub use error::GameError;
pub use events::{EventBus, EventFilter, EventLog, GameEvent, GameEventType, SubscriptionId};
pub use inventory::{InstanceId, InventoryState};
pub use item::{ItemInstance, ItemRequirement};
pub use material::MaterialInstance;
pub use quality::{Quality, QualityTableId};
pub use quest::{ActiveQuest, Quest, QuestKind, QuestState};
pub use rank::GuildRank;
pub use result::{RunOutcome, RunSummary};
pub use reward::{Reward, calculate_reward};
pub use save::{
    CURRENT_SAVE_VERSION, MemoryStorage, MigrationError, SaveData, SaveError, SaveStorage,
    StorageError,
};
pub use session::{AutoSaver, GuildSession};
pub use state::{DeckState, DraftSession, GameOverReason, GameProgress, GuildState, Phase, PlayerState};
pub use usecases::{DraftChoice, GameContext, MaterialSelection};

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the master data a run is played against.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be loaded or fails validation.
    fn load_master_data(&self) -> Result<MasterData, Self::Error>;

    /// Load the rule configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or is invalid.
    fn load_config(&self) -> Result<GameConfig, Self::Error>;
}

/// Loader for the content bundled with this crate and default rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinLoader;

impl DataLoader for BuiltinLoader {
    type Error = DataError;

    fn load_master_data(&self) -> Result<MasterData, Self::Error> {
        MasterData::builtin()
    }

    fn load_config(&self) -> Result<GameConfig, Self::Error> {
        Ok(GameConfig::default())
    }
}

/// Main game engine for managing game instances
pub struct GameEngine<L, S>
where
    L: DataLoader,
    S: SaveStorage + Clone + 'static,
{
    data_loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: DataLoader,
    S: SaveStorage + Clone + 'static,
{
    /// Create a new game engine with the provided data loader and storage
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    fn context(&self) -> Result<GameContext, L::Error> {
        Ok(GameContext::new(
            self.data_loader.load_master_data()?,
            self.data_loader.load_config()?,
        ))
    }

    /// Start a new run with autosave into this engine's storage.
    ///
    /// # Errors
    ///
    /// Returns an error if master data or configuration cannot be loaded.
    pub fn create_session(&self, seed: u64) -> Result<GuildSession, L::Error> {
        let ctx = self.context()?;
        Ok(GuildSession::new(ctx, seed).with_autosave(Box::new(self.storage.clone())))
    }

    /// Save a game state under `slot`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized or stored.
    pub fn save_game(&self, slot: &str, state: &GuildState) -> Result<(), SaveError> {
        save::write_slot(&self.storage, slot, state)
    }

    /// Load `slot`, migrating older saves, and resume it as a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the save or the data it is played against cannot
    /// be loaded.
    pub fn load_game(&self, slot: &str) -> anyhow::Result<Option<GuildSession>>
    where
        L::Error: Into<anyhow::Error>,
    {
        let Some(state) = save::read_slot(&self.storage, slot)
            .with_context(|| format!("failed to read save slot `{slot}`"))?
        else {
            return Ok(None);
        };
        let ctx = self.context().map_err(Into::into)?;
        Ok(Some(
            GuildSession::from_state(ctx, state).with_autosave(Box::new(self.storage.clone())),
        ))
    }

    /// Delete a saved game
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    pub fn delete_save(&self, slot: &str) -> Result<(), StorageError> {
        self.storage.delete(slot)
    }

    /// # Errors
    ///
    /// Returns an error if the storage cannot be queried.
    pub fn has_save(&self, slot: &str) -> Result<bool, StorageError> {
        self.storage.exists(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl DataLoader for FixtureLoader {
        type Error = Infallible;

        fn load_master_data(&self) -> Result<MasterData, Self::Error> {
            Ok(MasterData::builtin().unwrap())
        }

        fn load_config(&self) -> Result<GameConfig, Self::Error> {
            Ok(GameConfig {
                initial_gold: 777,
                ..GameConfig::default()
            })
        }
    }

    #[test]
    fn engine_creates_and_roundtrips_state() {
        let engine = GameEngine::new(FixtureLoader, MemoryStorage::new());
        let mut session = engine.create_session(0xABCD).unwrap();
        assert_eq!(session.state().player.gold, 777);
        session.with_state_mut(|state| {
            state.player.gold = 250;
            state.game.day = 3;
        });
        engine.save_game("slot-one", session.state()).unwrap();

        let loaded = engine.load_game("slot-one").unwrap().expect("save exists");
        assert_eq!(loaded.state().player.gold, 250);
        assert_eq!(loaded.state().game.day, 3);
        assert!(engine.load_game("missing-slot").unwrap().is_none());

        engine.delete_save("slot-one").unwrap();
        assert!(!engine.has_save("slot-one").unwrap());
    }

    #[test]
    fn builtin_loader_provides_default_rules() {
        let engine = GameEngine::new(BuiltinLoader, MemoryStorage::new());
        let session = engine.create_session(7).unwrap();
        assert_eq!(session.context().config, GameConfig::default());
        assert_eq!(session.state().player.rank, GuildRank::G);
    }
}
