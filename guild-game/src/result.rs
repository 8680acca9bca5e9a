//! End-of-run summary and scoring.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{SCORE_PER_QUEST, SCORE_PER_RANK};
use crate::rank::GuildRank;
use crate::state::{GameOverReason, GuildState};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Reached rank S.
    Cleared,
    GameOver(GameOverReason),
    /// Still running (e.g. a simulation stopped at its day cap).
    InProgress,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cleared => f.write_str("cleared"),
            Self::GameOver(reason) => write!(f, "game over ({reason})"),
            Self::InProgress => f.write_str("in progress"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub days: u32,
    pub rank: GuildRank,
    pub gold: i64,
    pub quests_completed: u32,
    pub score: i64,
}

impl RunSummary {
    #[must_use]
    pub fn from_state(state: &GuildState) -> Self {
        let outcome = if state.game.game_clear {
            RunOutcome::Cleared
        } else if let Some(reason) = state.game.game_over {
            RunOutcome::GameOver(reason)
        } else {
            RunOutcome::InProgress
        };
        let rank = state.player.rank;
        let quests_completed = state.quest.completed_count;
        Self {
            outcome,
            days: state.game.day,
            rank,
            gold: state.player.gold,
            quests_completed,
            score: score(rank, state.player.gold, quests_completed),
        }
    }
}

/// `rank ordinal * 1000 + gold + 50 * quests completed`.
#[must_use]
pub fn score(rank: GuildRank, gold: i64, quests_completed: u32) -> i64 {
    i64::from(rank.ordinal()) * SCORE_PER_RANK + gold + SCORE_PER_QUEST * i64::from(quests_completed)
}
