//! Quests, their acceptance predicate and the quest ledger.
use serde::{Deserialize, Serialize};

use crate::constants::{
    QUEST_KIND_PRESTIGE_MULTIPLIER, QUEST_KIND_STANDARD_MULTIPLIER, QUEST_KIND_URGENT_MULTIPLIER,
};
use crate::data::{MasterData, QuestTemplate};
use crate::item::ItemInstance;
use crate::numbers::{floor_f64_to_i64, i64_to_f64};
use crate::quality::{Quality, QualityTableId};
use crate::reward::BaseReward;

/// Quest type; drives the quest-type reward multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestKind {
    #[default]
    Standard,
    Urgent,
    Prestige,
}

impl QuestKind {
    #[must_use]
    pub const fn type_multiplier(self) -> f64 {
        match self {
            Self::Standard => QUEST_KIND_STANDARD_MULTIPLIER,
            Self::Urgent => QUEST_KIND_URGENT_MULTIPLIER,
            Self::Prestige => QUEST_KIND_PRESTIGE_MULTIPLIER,
        }
    }
}

/// What a delivered item has to be.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestTarget {
    Item(String),
    Category(String),
    AnyItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestCondition {
    pub target: QuestTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_quality: Option<Quality>,
}

impl QuestCondition {
    /// Whether `item` satisfies this condition. Unknown items never match.
    #[must_use]
    pub fn is_met_by(&self, item: &ItemInstance, master: &MasterData) -> bool {
        if self.min_quality.is_some_and(|min| item.quality < min) {
            return false;
        }
        match &self.target {
            QuestTarget::Item(id) => &item.item_id == id,
            QuestTarget::Category(category) => master
                .item(&item.item_id)
                .is_some_and(|def| &def.category == category),
            QuestTarget::AnyItem => master.item(&item.item_id).is_some(),
        }
    }
}

/// A quest offered on the board or held as active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: String,
    pub template_id: String,
    pub client_id: String,
    pub kind: QuestKind,
    pub condition: QuestCondition,
    pub gold: i64,
    pub contribution: i64,
    pub deadline_days: i32,
}

impl Quest {
    /// Instantiate a template; the serial keeps ids unique within a run.
    #[must_use]
    pub fn from_template(template: &QuestTemplate, serial: u32) -> Self {
        Self {
            id: format!("{}#{serial}", template.id),
            template_id: template.id.clone(),
            client_id: template.client_id.clone(),
            kind: template.kind,
            condition: template.condition.clone(),
            gold: template.gold,
            contribution: template.contribution,
            deadline_days: template.deadline_days,
        }
    }

    #[must_use]
    pub fn matches(&self, item: &ItemInstance, master: &MasterData) -> bool {
        self.condition.is_met_by(item, master)
    }

    #[must_use]
    pub const fn base_reward(&self) -> BaseReward {
        BaseReward {
            gold: self.gold,
            contribution: self.contribution,
        }
    }

    /// Contribution shown on the quest board for an item of `quality`.
    ///
    /// Uses the price table, not the delivery table the reward calculator
    /// defaults to, so the preview can overstate the final reward.
    #[must_use]
    pub fn preview_contribution(&self, quality: Quality) -> i64 {
        floor_f64_to_i64(
            i64_to_f64(self.contribution)
                * QualityTableId::Price.multiplier(quality)
                * self.kind.type_multiplier(),
        )
    }
}

/// A quest the player accepted, with its countdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveQuest {
    pub quest: Quest,
    pub accepted_day: u32,
    pub remaining_days: i32,
}

impl ActiveQuest {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining_days <= 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuestState {
    #[serde(default)]
    pub active: Vec<ActiveQuest>,
    #[serde(default)]
    pub quest_board: Vec<Quest>,
    #[serde(default)]
    pub completed_count: u32,
    #[serde(default)]
    pub next_serial: u32,
}

impl QuestState {
    #[must_use]
    pub fn active_quest(&self, quest_id: &str) -> Option<&ActiveQuest> {
        self.active.iter().find(|q| q.quest.id == quest_id)
    }

    #[must_use]
    pub fn board_quest(&self, quest_id: &str) -> Option<&Quest> {
        self.quest_board.iter().find(|q| q.id == quest_id)
    }
}
