//! Mutable run state: day/phase progress, the player, the deck and the
//! aggregate [`GuildState`] every use case operates on.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::data::{ArtifactEffect, MasterData};
use crate::error::GameError;
use crate::inventory::InventoryState;
use crate::quality::Quality;
use crate::quest::QuestState;
use crate::rank::GuildRank;
use crate::rng::RngCursors;

/// Daily phases, in play order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    QuestAccept,
    Gathering,
    Alchemy,
    Delivery,
}

impl Phase {
    pub const ALL: [Self; 4] = [
        Self::QuestAccept,
        Self::Gathering,
        Self::Alchemy,
        Self::Delivery,
    ];

    /// Phase that follows this one. Delivery wraps to the next day's
    /// quest acceptance.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::QuestAccept => Self::Gathering,
            Self::Gathering => Self::Alchemy,
            Self::Alchemy => Self::Delivery,
            Self::Delivery => Self::QuestAccept,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QuestAccept => "quest_accept",
            Self::Gathering => "gathering",
            Self::Alchemy => "alchemy",
            Self::Delivery => "delivery",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    /// The rank's day budget ran out before a promotion test was passed.
    RankDaysExpired,
    /// A promotion test's countdown ran out.
    PromotionFailed,
}

impl GameOverReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RankDaysExpired => "rank_days_expired",
            Self::PromotionFailed => "promotion_failed",
        }
    }
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One option offered in a draft round, or a pick already taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOption {
    pub material_id: String,
    pub quality: Quality,
}

/// An open gathering draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSession {
    pub card_id: String,
    pub location_id: String,
    pub rounds_total: u32,
    /// Zero-based index of the round currently on offer.
    pub round: u32,
    pub options: Vec<DraftOption>,
    #[serde(default)]
    pub picks: Vec<DraftOption>,
}

impl DraftSession {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.round >= self.rounds_total
    }

    #[must_use]
    pub const fn rounds_left(&self) -> u32 {
        self.rounds_total.saturating_sub(self.round)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameProgress {
    pub day: u32,
    pub phase: Phase,
    pub rank_days_remaining: i32,
    pub is_in_promotion_test: bool,
    pub promotion_test_remaining_days: i32,
    #[serde(default)]
    pub game_over: Option<GameOverReason>,
    #[serde(default)]
    pub game_clear: bool,
    /// AP spent beyond zero, charged against the next phase.
    pub ap_overflow: u32,
    /// Deliveries made in the current phase; drives the combo multiplier.
    pub deliveries_this_phase: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<DraftSession>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub draft_bonus: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub quality_boost: u32,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl GameProgress {
    #[must_use]
    pub fn new(rank_days: i32) -> Self {
        Self {
            day: 1,
            phase: Phase::QuestAccept,
            rank_days_remaining: rank_days,
            is_in_promotion_test: false,
            promotion_test_remaining_days: 0,
            game_over: None,
            game_clear: false,
            ap_overflow: 0,
            deliveries_this_phase: 0,
            draft: None,
            draft_bonus: 0,
            quality_boost: 0,
        }
    }

    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.game_over.is_some() || self.game_clear
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub gold: i64,
    pub rank: GuildRank,
    /// Contribution accumulated toward the next promotion test.
    pub promotion_gauge: i64,
    pub action_points: u32,
    pub max_action_points: u32,
    /// Persisted at the top level of a save, not inside the player block.
    #[serde(skip)]
    pub artifacts: Vec<String>,
    /// Units bought per shop entry, for stock limits.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub purchases: BTreeMap<String, u32>,
}

impl PlayerState {
    #[must_use]
    pub fn new(gold: i64, max_action_points: u32) -> Self {
        Self {
            gold,
            rank: GuildRank::G,
            promotion_gauge: 0,
            action_points: max_action_points,
            max_action_points,
            artifacts: Vec::new(),
            purchases: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn owns_artifact(&self, artifact_id: &str) -> bool {
        self.artifacts.iter().any(|a| a == artifact_id)
    }

    /// Sum of owned artifact effects. Unknown ids contribute nothing.
    #[must_use]
    pub fn bonuses(&self, master: &MasterData) -> ArtifactBonuses {
        let mut bonuses = ArtifactBonuses::default();
        for effect in self
            .artifacts
            .iter()
            .filter_map(|id| master.artifact(id))
            .map(|a| a.effect)
        {
            match effect {
                ArtifactEffect::MaxApBonus(n) => bonuses.max_ap += n,
                ArtifactEffect::ShopDiscount(pct) => bonuses.shop_discount_pct += pct,
                ArtifactEffect::HandSizeBonus(n) => bonuses.hand_size += n,
                ArtifactEffect::DraftBonus(n) => bonuses.draft_options += n,
            }
        }
        bonuses.shop_discount_pct = bonuses.shop_discount_pct.min(100);
        bonuses
    }
}

/// Combined passive effects of owned artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArtifactBonuses {
    pub max_ap: u32,
    pub shop_discount_pct: u32,
    pub hand_size: u32,
    pub draft_options: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeckState {
    #[serde(default)]
    pub draw_pile: Vec<String>,
    #[serde(default)]
    pub hand: Vec<String>,
    #[serde(default)]
    pub discard_pile: Vec<String>,
}

impl DeckState {
    #[must_use]
    pub fn in_hand(&self, card_id: &str) -> bool {
        self.hand.iter().any(|c| c == card_id)
    }

    /// Move one copy of `card_id` from the hand to the discard pile.
    pub fn discard_from_hand(&mut self, card_id: &str) -> bool {
        let Some(pos) = self.hand.iter().position(|c| c == card_id) else {
            return false;
        };
        let card = self.hand.remove(pos);
        self.discard_pile.push(card);
        true
    }

    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.draw_pile.len() + self.hand.len() + self.discard_pile.len()
    }
}

/// Everything a run mutates.
#[derive(Debug, Clone, PartialEq)]
pub struct GuildState {
    pub seed: u64,
    pub game: GameProgress,
    pub player: PlayerState,
    pub deck: DeckState,
    pub inventory: InventoryState,
    pub quest: QuestState,
    pub rng: RngCursors,
}

impl GuildState {
    /// Fail with `GameEnded` once the run reached a terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::GameEnded`] after game over or game clear.
    pub const fn ensure_active(&self) -> Result<(), GameError> {
        if self.game.is_ended() {
            Err(GameError::GameEnded)
        } else {
            Ok(())
        }
    }

    /// Fail unless the run is active and currently in `phase`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::GameEnded`] or [`GameError::InvalidPhase`].
    pub fn ensure_phase(&self, action: &'static str, phases: &[Phase]) -> Result<(), GameError> {
        self.ensure_active()?;
        if phases.contains(&self.game.phase) {
            Ok(())
        } else {
            Err(GameError::InvalidPhase {
                action,
                phase: self.game.phase,
            })
        }
    }

    /// AP granted at the start of a phase, after artifacts and overflow debt.
    #[must_use]
    pub fn phase_action_points(&self, master: &MasterData) -> u32 {
        let bonus = self.player.bonuses(master).max_ap;
        (self.player.max_action_points + bonus).saturating_sub(self.game.ap_overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_cycle_in_order() {
        let mut phase = Phase::QuestAccept;
        let visited: Vec<Phase> = (0..4)
            .map(|_| {
                phase = phase.next();
                phase
            })
            .collect();
        assert_eq!(
            visited,
            vec![
                Phase::Gathering,
                Phase::Alchemy,
                Phase::Delivery,
                Phase::QuestAccept
            ]
        );
    }

    #[test]
    fn progress_serializes_camel_case_without_idle_modifiers() {
        let progress = GameProgress::new(20);
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["rankDaysRemaining"], 20);
        assert_eq!(json["phase"], "quest_accept");
        assert!(json.get("draft").is_none());
        assert!(json.get("qualityBoost").is_none());
    }

    #[test]
    fn artifacts_never_serialize_inside_player() {
        let mut player = PlayerState::new(100, 3);
        player.artifacts.push("lucky_charm".to_string());
        let json = serde_json::to_value(&player).unwrap();
        assert!(json.get("artifacts").is_none());
        let back: PlayerState = serde_json::from_value(json).unwrap();
        assert!(back.artifacts.is_empty());
    }

    #[test]
    fn bonuses_sum_owned_artifacts() {
        let master = MasterData::builtin().unwrap();
        let mut player = PlayerState::new(0, 3);
        for artifact in &master.artifacts {
            player.artifacts.push(artifact.id.clone());
        }
        let bonuses = player.bonuses(&master);
        assert!(bonuses.max_ap >= 1);
        assert!(bonuses.shop_discount_pct > 0);
        player.artifacts.clear();
        assert_eq!(player.bonuses(&master), ArtifactBonuses::default());
    }

    #[test]
    fn discard_from_hand_moves_one_copy() {
        let mut deck = DeckState {
            hand: vec!["a".into(), "a".into(), "b".into()],
            ..DeckState::default()
        };
        assert!(deck.discard_from_hand("a"));
        assert_eq!(deck.hand, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(deck.discard_pile, vec!["a".to_string()]);
        assert!(!deck.discard_from_hand("c"));
        assert_eq!(deck.total_cards(), 3);
    }
}
