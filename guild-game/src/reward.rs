//! Reward and contribution calculation for quest deliveries.
//!
//! `result = floor(base * quality * quest type * client [* combo])`, computed
//! independently for gold and contribution. The calculator never fails;
//! whether an item may be delivered at all is decided by
//! [`crate::quest::Quest::matches`].
use serde::{Deserialize, Serialize};

use crate::config::ComboConfig;
use crate::data::ClientDef;
use crate::numbers::{floor_f64_to_i64, i64_to_f64};
use crate::quality::{Quality, QualityTableId};
use crate::quest::QuestKind;

/// Gold and contribution a quest pays before any multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BaseReward {
    pub gold: i64,
    pub contribution: i64,
}

/// Final, floored reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Reward {
    pub gold: i64,
    pub contribution: i64,
}

/// Per-client multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClientModifier {
    pub gold: f64,
    pub contribution: f64,
}

impl ClientModifier {
    pub const NEUTRAL: Self = Self {
        gold: 1.0,
        contribution: 1.0,
    };
}

impl Default for ClientModifier {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl From<&ClientDef> for ClientModifier {
    fn from(client: &ClientDef) -> Self {
        Self {
            gold: client.gold_multiplier,
            contribution: client.contribution_multiplier,
        }
    }
}

/// Everything the calculator multiplies together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardInput {
    pub base: BaseReward,
    pub quality: Quality,
    pub table: QualityTableId,
    pub kind: QuestKind,
    pub client: ClientModifier,
    pub combo: Option<f64>,
}

#[must_use]
pub fn calculate_reward(input: &RewardInput) -> Reward {
    let shared = input.table.multiplier(input.quality)
        * input.kind.type_multiplier()
        * input.combo.unwrap_or(1.0);
    Reward {
        gold: floor_f64_to_i64(i64_to_f64(input.base.gold) * shared * input.client.gold),
        contribution: floor_f64_to_i64(
            i64_to_f64(input.base.contribution) * shared * input.client.contribution,
        ),
    }
}

/// Combo multiplier for the `nth` delivery (1-based) of the current phase.
///
/// Returns `None` when combos are disabled so the calculator skips the term.
#[must_use]
pub fn combo_multiplier(nth: u32, cfg: &ComboConfig) -> Option<f64> {
    if !cfg.enabled {
        return None;
    }
    let extra = f64::from(nth.saturating_sub(1)) * cfg.step;
    Some((1.0 + extra).min(cfg.cap))
}
