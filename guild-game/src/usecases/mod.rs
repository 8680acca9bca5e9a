//! Player-facing actions.
//!
//! Every use case is a plain function over
//! `(&GameContext, &mut GuildState, &mut EventLog, ..)`. It checks all of its
//! preconditions first and only then mutates, so an `Err` leaves the state
//! exactly as it was.
use crate::card::CardDef;
use crate::config::GameConfig;
use crate::constants::MAX_HAND_SIZE;
use crate::data::MasterData;
use crate::error::GameError;
use crate::state::GuildState;

pub mod alchemy;
pub mod cards;
pub mod endgame;
pub mod gathering;
pub mod phase;
pub mod promotion;
pub mod quest;
pub mod setup;
pub mod shop;

pub use alchemy::{CraftOutcome, MaterialSelection, auto_select, craft};
pub use cards::{DrawOutcome, PlayOutcome, draw_hand, play_enhancement};
pub use endgame::{GameClearCheck, GameOverCheck, check_game_clear, check_game_over};
pub use gathering::{
    DraftChoice, GatheringOutcome, PickOutcome, finish_gathering, pick_draft, start_gathering,
};
pub use phase::{AdvanceDayOutcome, PhaseOutcome, advance_day, transition_phase};
pub use promotion::{JudgeOutcome, start_promotion_test, judge_promotion_test};
pub use quest::{DeliveryOutcome, accept_quest, deliver_item, refresh_quest_board};
pub use setup::new_game;
pub use shop::{PurchaseOutcome, effective_price, purchase_item};

/// Read-only inputs shared by every use case.
#[derive(Debug, Clone)]
pub struct GameContext {
    pub master: MasterData,
    pub config: GameConfig,
}

impl GameContext {
    #[must_use]
    pub const fn new(master: MasterData, config: GameConfig) -> Self {
        Self { master, config }
    }

    /// Hand size after artifact bonuses.
    #[must_use]
    pub fn hand_size(&self, state: &GuildState) -> usize {
        let bonus = usize::try_from(state.player.bonuses(&self.master).hand_size).unwrap_or(0);
        (self.config.hand_size + bonus).min(MAX_HAND_SIZE)
    }

    pub(crate) fn card_def(&self, card_id: &str) -> Result<&CardDef, GameError> {
        self.master.card(card_id).ok_or_else(|| GameError::UnknownContent {
            kind: "card",
            id: card_id.to_string(),
        })
    }
}
