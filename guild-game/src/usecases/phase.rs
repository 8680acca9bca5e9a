//! Phase transitions and the end-of-day tick.
use log::debug;

use crate::deck;
use crate::error::GameError;
use crate::events::{EventLog, GameEvent};
use crate::state::{GameOverReason, GuildState, Phase};

use super::GameContext;
use super::endgame::check_game_over;
use super::quest::refresh_quest_board;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceDayOutcome {
    pub day: u32,
    /// Ids of quests removed for running out of time.
    pub expired: Vec<String>,
    /// Total contribution lost to expiries.
    pub penalty: i64,
    pub is_game_over: bool,
    pub game_over_reason: Option<GameOverReason>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    pub from: Phase,
    pub to: Phase,
    pub action_points: u32,
    /// Present when the transition wrapped into a new day.
    pub day: Option<AdvanceDayOutcome>,
}

/// Move to `target`, which must be the phase that follows the current one.
/// Leaving delivery starts the next day.
///
/// # Errors
///
/// Fails after game end, while a gathering draft is open, and for any
/// target other than the next phase.
pub fn transition_phase(
    ctx: &GameContext,
    state: &mut GuildState,
    log: &mut EventLog,
    target: Phase,
) -> Result<PhaseOutcome, GameError> {
    state.ensure_active()?;
    if state.game.draft.is_some() {
        return Err(GameError::GatheringInProgress);
    }
    let from = state.game.phase;
    if from.next() != target {
        return Err(GameError::InvalidTransition { from, to: target });
    }

    change_phase(ctx, state, log, target);
    let day = if from == Phase::Delivery {
        Some(tick_day(ctx, state, log))
    } else {
        None
    };
    Ok(PhaseOutcome {
        from,
        to: target,
        action_points: state.player.action_points,
        day,
    })
}

fn change_phase(ctx: &GameContext, state: &mut GuildState, log: &mut EventLog, phase: Phase) {
    let from = state.game.phase;
    state.game.phase = phase;
    state.player.action_points = state.phase_action_points(&ctx.master);
    state.game.ap_overflow = 0;
    state.game.deliveries_this_phase = 0;
    state.game.draft_bonus = 0;
    state.game.quality_boost = 0;
    log.push(GameEvent::PhaseChanged {
        from,
        to: phase,
        day: state.game.day,
    });
    debug!("phase {from} -> {phase} on day {}", state.game.day);
}

/// Close out the delivery phase and start the next day in quest
/// acceptance: tick quest and rank countdowns, expire overdue quests,
/// refresh the board, redraw the hand, then check for game over.
///
/// # Errors
///
/// Fails with `GAME_ENDED` if the run already ended, with
/// `GATHERING_IN_PROGRESS` while a draft is open and with `INVALID_PHASE`
/// outside the delivery phase.
pub fn advance_day(
    ctx: &GameContext,
    state: &mut GuildState,
    log: &mut EventLog,
) -> Result<AdvanceDayOutcome, GameError> {
    state.ensure_active()?;
    if state.game.draft.is_some() {
        return Err(GameError::GatheringInProgress);
    }
    state.ensure_phase("advance_day", &[Phase::Delivery])?;
    change_phase(ctx, state, log, Phase::QuestAccept);
    Ok(tick_day(ctx, state, log))
}

fn tick_day(ctx: &GameContext, state: &mut GuildState, log: &mut EventLog) -> AdvanceDayOutcome {
    state.game.day += 1;
    log.push(GameEvent::DayAdvanced {
        day: state.game.day,
    });

    let mut expired = Vec::new();
    for quest in &mut state.quest.active {
        quest.remaining_days -= 1;
    }
    let penalty_each = ctx.config.expiry_penalty;
    let mut penalty = 0;
    state.quest.active.retain(|quest| {
        if quest.is_expired() {
            expired.push(quest.quest.id.clone());
            false
        } else {
            true
        }
    });
    for quest_id in &expired {
        let lost = penalty_each.min(state.player.promotion_gauge);
        state.player.promotion_gauge -= lost;
        penalty += lost;
        log.push(GameEvent::QuestExpired {
            quest_id: quest_id.clone(),
            penalty: lost,
        });
    }

    if state.game.is_in_promotion_test {
        state.game.promotion_test_remaining_days -= 1;
    } else {
        state.game.rank_days_remaining -= 1;
    }

    refresh_quest_board(ctx, state, log);
    let hand_size = ctx.hand_size(state);
    let cards = deck::draw_hand(&mut state.deck, hand_size, state.seed, &mut state.rng);
    log.push(GameEvent::HandDrawn { cards });

    let check = check_game_over(state, log);
    debug!(
        "day {} begins: {} expired, rank days {}",
        state.game.day,
        expired.len(),
        state.game.rank_days_remaining
    );
    AdvanceDayOutcome {
        day: state.game.day,
        expired,
        penalty,
        is_game_over: check.is_game_over(),
        game_over_reason: check.reason(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GameEventType;
    use crate::quest::ActiveQuest;
    use crate::state::DraftSession;
    use crate::usecases::test_support::fresh;

    fn walk_to(ctx: &GameContext, state: &mut GuildState, phase: Phase) {
        let mut log = EventLog::new();
        while state.game.phase != phase {
            let next = state.game.phase.next();
            transition_phase(ctx, state, &mut log, next).unwrap();
        }
    }

    #[test]
    fn phases_advance_in_order_and_wrap_into_next_day() {
        let (ctx, mut state, mut log) = fresh(10);
        for expected in [Phase::Gathering, Phase::Alchemy, Phase::Delivery] {
            let outcome = transition_phase(&ctx, &mut state, &mut log, expected).unwrap();
            assert_eq!(outcome.to, expected);
            assert!(outcome.day.is_none());
        }
        let outcome = transition_phase(&ctx, &mut state, &mut log, Phase::QuestAccept).unwrap();
        assert_eq!(outcome.day.map(|d| d.day), Some(2));
        assert_eq!(state.game.day, 2);
    }

    #[test]
    fn skipping_a_phase_is_rejected() {
        let (ctx, mut state, mut log) = fresh(10);
        let err = transition_phase(&ctx, &mut state, &mut log, Phase::Alchemy).unwrap_err();
        assert_eq!(
            err,
            GameError::InvalidTransition {
                from: Phase::QuestAccept,
                to: Phase::Alchemy
            }
        );
        assert!(log.is_empty());
    }

    #[test]
    fn open_draft_blocks_transition() {
        let (ctx, mut state, mut log) = fresh(10);
        walk_to(&ctx, &mut state, Phase::Gathering);
        state.game.draft = Some(DraftSession {
            card_id: "gather_meadow".into(),
            location_id: "meadow".into(),
            rounds_total: 1,
            round: 0,
            options: Vec::new(),
            picks: Vec::new(),
        });
        let err = transition_phase(&ctx, &mut state, &mut log, Phase::Alchemy).unwrap_err();
        assert_eq!(err.code(), "GATHERING_IN_PROGRESS");
    }

    #[test]
    fn phase_change_resets_ap_and_charges_overflow() {
        let (ctx, mut state, mut log) = fresh(10);
        state.player.action_points = 0;
        state.game.ap_overflow = 2;
        state.game.deliveries_this_phase = 3;
        state.game.quality_boost = 1;
        let outcome = transition_phase(&ctx, &mut state, &mut log, Phase::Gathering).unwrap();
        assert_eq!(outcome.action_points, ctx.config.max_action_points - 2);
        assert_eq!(state.game.ap_overflow, 0);
        assert_eq!(state.game.deliveries_this_phase, 0);
        assert_eq!(state.game.quality_boost, 0);
    }

    #[test]
    fn overflow_larger_than_max_floors_at_zero() {
        let (ctx, mut state, mut log) = fresh(10);
        state.game.ap_overflow = 99;
        let outcome = transition_phase(&ctx, &mut state, &mut log, Phase::Gathering).unwrap();
        assert_eq!(outcome.action_points, 0);
    }

    #[test]
    fn advance_day_ticks_every_quest_and_penalizes_expiries() {
        let (ctx, mut state, mut log) = fresh(12);
        state.game.phase = Phase::Delivery;
        state.player.promotion_gauge = 15;
        let mut board = state.quest.quest_board.clone().into_iter();
        for remaining in [1, 1, 3] {
            let quest = board.next().unwrap();
            state.quest.active.push(ActiveQuest {
                quest,
                accepted_day: 1,
                remaining_days: remaining,
            });
        }
        let outcome = advance_day(&ctx, &mut state, &mut log).unwrap();
        assert_eq!(outcome.expired.len(), 2);
        assert_eq!(state.quest.active.len(), 1);
        assert_eq!(state.quest.active[0].remaining_days, 2);
        // 10 + 5: the second penalty is capped by what is left of the gauge.
        assert_eq!(outcome.penalty, 15);
        assert_eq!(state.player.promotion_gauge, 0);
        assert_eq!(
            log.iter()
                .filter(|e| e.event_type() == GameEventType::QuestExpired)
                .count(),
            2
        );
    }

    #[test]
    fn last_rank_day_ends_the_run() {
        let (ctx, mut state, mut log) = fresh(12);
        state.game.phase = Phase::Delivery;
        state.game.rank_days_remaining = 1;
        let outcome = advance_day(&ctx, &mut state, &mut log).unwrap();
        assert!(outcome.is_game_over);
        assert_eq!(outcome.game_over_reason, Some(GameOverReason::RankDaysExpired));
        assert_eq!(
            transition_phase(&ctx, &mut state, &mut log, Phase::Gathering)
                .unwrap_err()
                .code(),
            "GAME_ENDED"
        );
    }

    #[test]
    fn promotion_test_pauses_rank_days() {
        let (ctx, mut state, mut log) = fresh(12);
        state.game.phase = Phase::Delivery;
        state.game.is_in_promotion_test = true;
        state.game.promotion_test_remaining_days = 2;
        let rank_days = state.game.rank_days_remaining;
        advance_day(&ctx, &mut state, &mut log).unwrap();
        assert_eq!(state.game.rank_days_remaining, rank_days);
        assert_eq!(state.game.promotion_test_remaining_days, 1);
    }

    #[test]
    fn advance_day_only_closes_the_delivery_phase() {
        let (ctx, mut state, mut log) = fresh(14);
        for phase in [Phase::QuestAccept, Phase::Gathering, Phase::Alchemy] {
            state.game.phase = phase;
            let snapshot = state.clone();
            let err = advance_day(&ctx, &mut state, &mut log).unwrap_err();
            assert_eq!(err.code(), "INVALID_PHASE");
            assert_eq!(state, snapshot);
        }
        assert!(log.is_empty());

        state.game.phase = Phase::Delivery;
        state.player.action_points = 0;
        let outcome = advance_day(&ctx, &mut state, &mut log).unwrap();
        assert_eq!(outcome.day, 2);
        assert_eq!(state.game.phase, Phase::QuestAccept);
        assert_eq!(state.player.action_points, ctx.config.max_action_points);
        let order: Vec<_> = log.iter().map(GameEvent::event_type).take(2).collect();
        assert_eq!(order, [GameEventType::PhaseChanged, GameEventType::DayAdvanced]);
    }

    #[test]
    fn open_draft_blocks_advance_day() {
        let (ctx, mut state, mut log) = fresh(14);
        state.game.phase = Phase::Delivery;
        state.game.draft = Some(DraftSession {
            card_id: "gather_meadow".into(),
            location_id: "meadow".into(),
            rounds_total: 1,
            round: 0,
            options: Vec::new(),
            picks: Vec::new(),
        });
        let err = advance_day(&ctx, &mut state, &mut log).unwrap_err();
        assert_eq!(err.code(), "GATHERING_IN_PROGRESS");
        assert_eq!(state.game.day, 1);
    }
}
