//! Centralized balance and tuning constants for Guild Rank game logic.
//!
//! These values seed the defaults in [`crate::config::GameConfig`]. Content
//! (quests, recipes, ranks) lives in the master data instead.

// Player economy -----------------------------------------------------------
pub(crate) const DEFAULT_INITIAL_GOLD: i64 = 300;
pub(crate) const DEFAULT_MAX_ACTION_POINTS: u32 = 3;
pub(crate) const DEFAULT_EXPIRY_PENALTY: i64 = 10;

// Deck and drafting --------------------------------------------------------
pub(crate) const DEFAULT_HAND_SIZE: usize = 5;
pub(crate) const DEFAULT_DRAFT_SIZE: usize = 3;
pub(crate) const MAX_HAND_SIZE: usize = 12;
pub(crate) const MAX_DRAFT_SIZE: usize = 8;

// Quest board --------------------------------------------------------------
pub(crate) const DEFAULT_QUEST_BOARD_SIZE: usize = 4;
pub(crate) const DEFAULT_MAX_ACTIVE_QUESTS: usize = 3;

// Inventory ----------------------------------------------------------------
pub(crate) const DEFAULT_MATERIAL_CAPACITY: u32 = 40;
pub(crate) const DEFAULT_ITEM_CAPACITY: usize = 12;

// Rewards ------------------------------------------------------------------
pub(crate) const DEFAULT_COMBO_STEP: f64 = 0.1;
pub(crate) const DEFAULT_COMBO_CAP: f64 = 1.5;
pub(crate) const QUEST_KIND_STANDARD_MULTIPLIER: f64 = 1.0;
pub(crate) const QUEST_KIND_URGENT_MULTIPLIER: f64 = 1.5;
pub(crate) const QUEST_KIND_PRESTIGE_MULTIPLIER: f64 = 2.0;

// Scoring ------------------------------------------------------------------
pub(crate) const SCORE_PER_RANK: i64 = 1_000;
pub(crate) const SCORE_PER_QUEST: i64 = 50;

// Persistence --------------------------------------------------------------
pub(crate) const DEFAULT_AUTOSAVE_SLOT: &str = "autosave";
