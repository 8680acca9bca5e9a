//! Rule configuration for a run.
//!
//! Every field carries a serde default so partial JSON (including `{}`)
//! deserializes into a playable configuration.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_AUTOSAVE_SLOT, DEFAULT_COMBO_CAP, DEFAULT_COMBO_STEP, DEFAULT_DRAFT_SIZE,
    DEFAULT_EXPIRY_PENALTY, DEFAULT_HAND_SIZE, DEFAULT_INITIAL_GOLD, DEFAULT_ITEM_CAPACITY,
    DEFAULT_MATERIAL_CAPACITY, DEFAULT_MAX_ACTION_POINTS, DEFAULT_MAX_ACTIVE_QUESTS,
    DEFAULT_QUEST_BOARD_SIZE, MAX_DRAFT_SIZE, MAX_HAND_SIZE,
};
use crate::quality::QualityTableId;

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: i64,
        value: i64,
    },
    #[error("{field} must be between {min} and {max} (got {value})")]
    RangeViolation {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },
    #[error("combo step {step:.2} and cap {cap:.2} must be finite, step >= 0 and cap >= 1")]
    Combo { step: f64, cap: f64 },
    #[error("autosave slot name must not be empty")]
    EmptyAutosaveSlot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "GameConfig::default_initial_gold")]
    pub initial_gold: i64,
    #[serde(default = "GameConfig::default_max_action_points")]
    pub max_action_points: u32,
    #[serde(default = "GameConfig::default_hand_size")]
    pub hand_size: usize,
    #[serde(default = "GameConfig::default_draft_size")]
    pub draft_size: usize,
    #[serde(default = "GameConfig::default_quest_board_size")]
    pub quest_board_size: usize,
    #[serde(default = "GameConfig::default_max_active_quests")]
    pub max_active_quests: usize,
    /// Contribution lost per expired quest.
    #[serde(default = "GameConfig::default_expiry_penalty")]
    pub expiry_penalty: i64,
    /// Total material units the inventory can hold.
    #[serde(default = "GameConfig::default_material_capacity")]
    pub material_capacity: u32,
    #[serde(default = "GameConfig::default_item_capacity")]
    pub item_capacity: usize,
    #[serde(default)]
    pub combo: ComboConfig,
    #[serde(default)]
    pub reward_quality_table: QualityTableId,
    /// Let gathering spend AP the player does not have, charging the deficit
    /// against the next phase.
    #[serde(default = "GameConfig::default_allow_ap_overflow")]
    pub allow_ap_overflow: bool,
    #[serde(default)]
    pub autosave: AutoSaveConfig,
}

impl GameConfig {
    const fn default_initial_gold() -> i64 {
        DEFAULT_INITIAL_GOLD
    }

    const fn default_max_action_points() -> u32 {
        DEFAULT_MAX_ACTION_POINTS
    }

    const fn default_hand_size() -> usize {
        DEFAULT_HAND_SIZE
    }

    const fn default_draft_size() -> usize {
        DEFAULT_DRAFT_SIZE
    }

    const fn default_quest_board_size() -> usize {
        DEFAULT_QUEST_BOARD_SIZE
    }

    const fn default_max_active_quests() -> usize {
        DEFAULT_MAX_ACTIVE_QUESTS
    }

    const fn default_expiry_penalty() -> i64 {
        DEFAULT_EXPIRY_PENALTY
    }

    const fn default_material_capacity() -> u32 {
        DEFAULT_MATERIAL_CAPACITY
    }

    const fn default_item_capacity() -> usize {
        DEFAULT_ITEM_CAPACITY
    }

    const fn default_allow_ap_overflow() -> bool {
        true
    }

    /// Parse a configuration from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or violates an invariant.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_gold < 0 {
            return Err(ConfigError::MinViolation {
                field: "initial_gold",
                min: 0,
                value: self.initial_gold,
            });
        }
        if self.max_action_points == 0 {
            return Err(ConfigError::MinViolation {
                field: "max_action_points",
                min: 1,
                value: 0,
            });
        }
        check_range("hand_size", self.hand_size, 1, MAX_HAND_SIZE)?;
        check_range("draft_size", self.draft_size, 1, MAX_DRAFT_SIZE)?;
        check_range("quest_board_size", self.quest_board_size, 1, 16)?;
        check_range("max_active_quests", self.max_active_quests, 1, 16)?;
        if self.expiry_penalty < 0 {
            return Err(ConfigError::MinViolation {
                field: "expiry_penalty",
                min: 0,
                value: self.expiry_penalty,
            });
        }
        if self.item_capacity == 0 {
            return Err(ConfigError::MinViolation {
                field: "item_capacity",
                min: 1,
                value: 0,
            });
        }
        self.combo.validate()?;
        if self.autosave.slot.trim().is_empty() {
            return Err(ConfigError::EmptyAutosaveSlot);
        }
        Ok(())
    }
}

fn check_range(field: &'static str, value: usize, min: usize, max: usize) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        return Ok(());
    }
    let as_i64 = |v: usize| i64::try_from(v).unwrap_or(i64::MAX);
    Err(ConfigError::RangeViolation {
        field,
        min: as_i64(min),
        max: as_i64(max),
        value: as_i64(value),
    })
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_gold: Self::default_initial_gold(),
            max_action_points: Self::default_max_action_points(),
            hand_size: Self::default_hand_size(),
            draft_size: Self::default_draft_size(),
            quest_board_size: Self::default_quest_board_size(),
            max_active_quests: Self::default_max_active_quests(),
            expiry_penalty: Self::default_expiry_penalty(),
            material_capacity: Self::default_material_capacity(),
            item_capacity: Self::default_item_capacity(),
            combo: ComboConfig::default(),
            reward_quality_table: QualityTableId::default(),
            allow_ap_overflow: Self::default_allow_ap_overflow(),
            autosave: AutoSaveConfig::default(),
        }
    }
}

/// Consecutive-delivery bonus within one delivery phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboConfig {
    #[serde(default = "ComboConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "ComboConfig::default_step")]
    pub step: f64,
    #[serde(default = "ComboConfig::default_cap")]
    pub cap: f64,
}

impl ComboConfig {
    const fn default_enabled() -> bool {
        true
    }

    const fn default_step() -> f64 {
        DEFAULT_COMBO_STEP
    }

    const fn default_cap() -> f64 {
        DEFAULT_COMBO_CAP
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.step.is_finite() || !self.cap.is_finite() || self.step < 0.0 || self.cap < 1.0 {
            return Err(ConfigError::Combo {
                step: self.step,
                cap: self.cap,
            });
        }
        Ok(())
    }
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            step: Self::default_step(),
            cap: Self::default_cap(),
        }
    }
}

/// Moments at which the session writes the autosave slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoSaveTrigger {
    PhaseChange,
    DayEnd,
    QuestComplete,
    RankUp,
    Manual,
}

impl AutoSaveTrigger {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PhaseChange => "phase_change",
            Self::DayEnd => "day_end",
            Self::QuestComplete => "quest_complete",
            Self::RankUp => "rank_up",
            Self::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSaveConfig {
    #[serde(default = "AutoSaveConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "AutoSaveConfig::default_slot")]
    pub slot: String,
    #[serde(default = "AutoSaveConfig::default_triggers")]
    pub triggers: Vec<AutoSaveTrigger>,
}

impl AutoSaveConfig {
    const fn default_enabled() -> bool {
        true
    }

    fn default_slot() -> String {
        DEFAULT_AUTOSAVE_SLOT.to_string()
    }

    fn default_triggers() -> Vec<AutoSaveTrigger> {
        vec![AutoSaveTrigger::DayEnd, AutoSaveTrigger::RankUp]
    }

    /// Whether `trigger` should write the autosave slot. Manual saves always do.
    #[must_use]
    pub fn fires_on(&self, trigger: AutoSaveTrigger) -> bool {
        matches!(trigger, AutoSaveTrigger::Manual)
            || (self.enabled && self.triggers.contains(&trigger))
    }
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            slot: Self::default_slot(),
            triggers: Self::default_triggers(),
        }
    }
}
