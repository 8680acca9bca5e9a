//! Terminal-state checks. Both are idempotent: once a flag is set they
//! report the existing state and emit nothing.
use log::info;

use crate::events::{EventLog, GameEvent};
use crate::state::{GameOverReason, GuildState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverCheck {
    /// The run continues.
    Continue,
    /// The run ended during this check.
    GameOver(GameOverReason),
    /// The run had already ended before this check.
    AlreadyGameOver(GameOverReason),
}

impl GameOverCheck {
    #[must_use]
    pub const fn is_game_over(self) -> bool {
        !matches!(self, Self::Continue)
    }

    #[must_use]
    pub const fn reason(self) -> Option<GameOverReason> {
        match self {
            Self::Continue => None,
            Self::GameOver(reason) | Self::AlreadyGameOver(reason) => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameClearCheck {
    NotCleared,
    Cleared,
    AlreadyCleared,
}

pub fn check_game_over(state: &mut GuildState, log: &mut EventLog) -> GameOverCheck {
    if let Some(reason) = state.game.game_over {
        return GameOverCheck::AlreadyGameOver(reason);
    }
    let game = &state.game;
    let reason = if game.is_in_promotion_test {
        (game.promotion_test_remaining_days <= 0).then_some(GameOverReason::PromotionFailed)
    } else {
        (game.rank_days_remaining <= 0).then_some(GameOverReason::RankDaysExpired)
    };
    let Some(reason) = reason else {
        return GameOverCheck::Continue;
    };
    state.game.game_over = Some(reason);
    info!(
        "game over on day {} at rank {}: {reason}",
        state.game.day, state.player.rank
    );
    log.push(GameEvent::GameOver {
        reason,
        day: state.game.day,
    });
    GameOverCheck::GameOver(reason)
}

pub fn check_game_clear(state: &mut GuildState, log: &mut EventLog) -> GameClearCheck {
    if state.game.game_clear {
        return GameClearCheck::AlreadyCleared;
    }
    if !state.player.rank.is_top() {
        return GameClearCheck::NotCleared;
    }
    state.game.game_clear = true;
    info!("guild cleared on day {}", state.game.day);
    log.push(GameEvent::GameClear {
        day: state.game.day,
    });
    GameClearCheck::Cleared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::GuildRank;
    use crate::usecases::test_support::fresh;

    #[test]
    fn expired_rank_days_end_the_game_once() {
        let (_, mut state, mut log) = fresh(1);
        state.game.rank_days_remaining = 0;
        assert_eq!(
            check_game_over(&mut state, &mut log),
            GameOverCheck::GameOver(GameOverReason::RankDaysExpired)
        );
        assert_eq!(log.len(), 1);
        assert_eq!(
            check_game_over(&mut state, &mut log),
            GameOverCheck::AlreadyGameOver(GameOverReason::RankDaysExpired)
        );
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn rank_days_do_not_count_during_a_test() {
        let (_, mut state, mut log) = fresh(1);
        state.game.rank_days_remaining = 0;
        state.game.is_in_promotion_test = true;
        state.game.promotion_test_remaining_days = 2;
        assert_eq!(check_game_over(&mut state, &mut log), GameOverCheck::Continue);
        state.game.promotion_test_remaining_days = 0;
        assert_eq!(
            check_game_over(&mut state, &mut log).reason(),
            Some(GameOverReason::PromotionFailed)
        );
    }

    #[test]
    fn clear_fires_only_at_top_rank() {
        let (_, mut state, mut log) = fresh(1);
        assert_eq!(check_game_clear(&mut state, &mut log), GameClearCheck::NotCleared);
        state.player.rank = GuildRank::S;
        assert_eq!(check_game_clear(&mut state, &mut log), GameClearCheck::Cleared);
        assert_eq!(check_game_clear(&mut state, &mut log), GameClearCheck::AlreadyCleared);
        assert_eq!(log.len(), 1);
        assert_eq!(state.ensure_active().unwrap_err().code(), "GAME_ENDED");
    }
}
