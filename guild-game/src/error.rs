//! Use-case failure type.
use thiserror::Error;

use crate::inventory::InstanceId;
use crate::rank::GuildRank;
use crate::state::Phase;

/// Why a use case refused to run. The state is left untouched on error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("the game has already ended")]
    GameEnded,
    #[error("{action} is not allowed during the {phase} phase")]
    InvalidPhase { action: &'static str, phase: Phase },
    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: Phase, to: Phase },
    #[error("a gathering draft is still open")]
    GatheringInProgress,
    #[error("no gathering draft is open")]
    NoGatheringSession,
    #[error("not enough action points: need {required}, have {available}")]
    InsufficientAp { required: u32, available: u32 },
    #[error("not enough gold: need {required}, have {available}")]
    InsufficientGold { required: i64, available: i64 },
    #[error("quest `{0}` not found")]
    QuestNotFound(String),
    #[error("already holding the maximum of {limit} active quests")]
    QuestLimitReached { limit: usize },
    #[error("item {item} does not satisfy quest `{quest_id}`")]
    ConditionNotMet { quest_id: String, item: InstanceId },
    #[error("item {0} not found")]
    ItemNotFound(InstanceId),
    #[error("material stack {0} not found")]
    MaterialNotFound(InstanceId),
    #[error("card `{0}` is not in hand")]
    CardNotInHand(String),
    #[error("card `{card_id}` is not a {expected} card")]
    WrongCardKind {
        card_id: String,
        expected: &'static str,
    },
    #[error("material selection rejected: {0}")]
    InvalidMaterials(String),
    #[error("inventory is full")]
    InventoryFull,
    #[error("draft option {index} does not exist ({available} offered)")]
    InvalidDraftPick { index: usize, available: usize },
    #[error("shop entry `{0}` not found")]
    ShopEntryNotFound(String),
    #[error("requires rank {required}, current rank is {current}")]
    RankTooLow {
        required: GuildRank,
        current: GuildRank,
    },
    #[error("shop entry `{0}` is sold out")]
    OutOfStock(String),
    #[error("artifact `{0}` is already owned")]
    ArtifactOwned(String),
    #[error("a promotion test is already running")]
    AlreadyInPromotionTest,
    #[error("no promotion test is running")]
    NotInPromotionTest,
    #[error("promotion gauge {current} is below the required {required}")]
    GaugeInsufficient { required: i64, current: i64 },
    #[error("already at the top rank")]
    MaxRankReached,
    #[error("promotion requirements not met: {}", missing.join(", "))]
    RequirementsNotMet { missing: Vec<String> },
    #[error("unknown {kind} `{id}` in master data")]
    UnknownContent { kind: &'static str, id: String },
    #[error("save failed: {0}")]
    SaveFailed(String),
}

impl GameError {
    /// Stable machine-readable code for presentation layers.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::GameEnded => "GAME_ENDED",
            Self::InvalidPhase { .. } => "INVALID_PHASE",
            Self::InvalidTransition { .. } => "INVALID_PHASE",
            Self::GatheringInProgress => "GATHERING_IN_PROGRESS",
            Self::NoGatheringSession => "NO_GATHERING_SESSION",
            Self::InsufficientAp { .. } => "INSUFFICIENT_AP",
            Self::InsufficientGold { .. } => "INSUFFICIENT_GOLD",
            Self::QuestNotFound(_) => "QUEST_NOT_FOUND",
            Self::QuestLimitReached { .. } => "QUEST_LIMIT_REACHED",
            Self::ConditionNotMet { .. } => "CONDITION_NOT_MET",
            Self::ItemNotFound(_) => "ITEM_NOT_FOUND",
            Self::MaterialNotFound(_) => "MATERIAL_NOT_FOUND",
            Self::CardNotInHand(_) => "CARD_NOT_IN_HAND",
            Self::WrongCardKind { .. } => "WRONG_CARD_KIND",
            Self::InvalidMaterials(_) => "INVALID_MATERIALS",
            Self::InventoryFull => "INVENTORY_FULL",
            Self::InvalidDraftPick { .. } => "INVALID_DRAFT_PICK",
            Self::ShopEntryNotFound(_) => "SHOP_ENTRY_NOT_FOUND",
            Self::RankTooLow { .. } => "RANK_TOO_LOW",
            Self::OutOfStock(_) => "OUT_OF_STOCK",
            Self::ArtifactOwned(_) => "ARTIFACT_OWNED",
            Self::AlreadyInPromotionTest => "ALREADY_IN_PROMOTION_TEST",
            Self::NotInPromotionTest => "NOT_IN_PROMOTION_TEST",
            Self::GaugeInsufficient { .. } => "GAUGE_INSUFFICIENT",
            Self::MaxRankReached => "MAX_RANK_REACHED",
            Self::RequirementsNotMet { .. } => "REQUIREMENTS_NOT_MET",
            Self::UnknownContent { .. } => "UNKNOWN_CONTENT",
            Self::SaveFailed(_) => "SAVE_FAILED",
        }
    }
}
