//! Promotion tests: the gate between ranks.
use log::info;

use crate::error::GameError;
use crate::events::{EventLog, GameEvent};
use crate::inventory::InstanceId;
use crate::rank::GuildRank;
use crate::state::GuildState;

use super::GameContext;
use super::endgame::{GameClearCheck, check_game_clear};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeOutcome {
    pub from: GuildRank,
    pub to: GuildRank,
    pub gold_reward: i64,
    pub consumed: Vec<InstanceId>,
    pub cleared: bool,
}

/// Begin the current rank's promotion test.
///
/// # Errors
///
/// Fails at the top rank, while a test is running and when the promotion
/// gauge is below the rank's requirement.
pub fn start_promotion_test(
    ctx: &GameContext,
    state: &mut GuildState,
    log: &mut EventLog,
) -> Result<i32, GameError> {
    state.ensure_active()?;
    let rank = state.player.rank;
    if rank.is_top() {
        return Err(GameError::MaxRankReached);
    }
    if state.game.is_in_promotion_test {
        return Err(GameError::AlreadyInPromotionTest);
    }
    let rule = ctx
        .master
        .rank_rule(rank)
        .ok_or_else(|| GameError::UnknownContent {
            kind: "rank rule",
            id: rank.to_string(),
        })?;
    if state.player.promotion_gauge < rule.gauge_required {
        return Err(GameError::GaugeInsufficient {
            required: rule.gauge_required,
            current: state.player.promotion_gauge,
        });
    }

    state.game.is_in_promotion_test = true;
    state.game.promotion_test_remaining_days = rule.test.days;
    info!("promotion test for rank {rank} started: {} days", rule.test.days);
    log.push(GameEvent::PromotionTestStarted {
        rank,
        days: rule.test.days,
    });
    Ok(rule.test.days)
}

/// Hand in the test's required items. Success promotes the player by one
/// rank; failure leaves the test running.
///
/// # Errors
///
/// Fails when no test is running and with `REQUIREMENTS_NOT_MET` when the
/// inventory cannot cover every requirement.
pub fn judge_promotion_test(
    ctx: &GameContext,
    state: &mut GuildState,
    log: &mut EventLog,
) -> Result<JudgeOutcome, GameError> {
    state.ensure_active()?;
    if !state.game.is_in_promotion_test {
        return Err(GameError::NotInPromotionTest);
    }
    let from = state.player.rank;
    let to = from.next().ok_or(GameError::MaxRankReached)?;
    let rule = ctx
        .master
        .rank_rule(from)
        .ok_or_else(|| GameError::UnknownContent {
            kind: "rank rule",
            id: from.to_string(),
        })?;

    let mut pool = state.inventory.clone();
    let mut consumed = Vec::new();
    let mut missing = Vec::new();
    for req in &rule.test.requirements {
        match pool.select_for_requirement(req) {
            Some(ids) => {
                pool.items.retain(|i| !ids.contains(&i.id));
                consumed.extend(ids);
            }
            None => missing.push(format!(
                "{} ({}+) x{}",
                req.item_id, req.min_quality, req.quantity
            )),
        }
    }
    if !missing.is_empty() {
        return Err(GameError::RequirementsNotMet { missing });
    }

    for id in &consumed {
        state.inventory.take_item(*id);
    }
    state.player.rank = to;
    state.player.promotion_gauge = 0;
    state.player.gold += rule.test.gold_reward;
    state.game.is_in_promotion_test = false;
    state.game.promotion_test_remaining_days = 0;
    if let Some(next_rule) = ctx.master.rank_rule(to) {
        state.game.rank_days_remaining = next_rule.day_limit;
    }
    info!("promoted {from} -> {to} on day {}", state.game.day);
    log.push(GameEvent::RankUp { from, to });
    let cleared = check_game_clear(state, log) == GameClearCheck::Cleared;
    Ok(JudgeOutcome {
        from,
        to,
        gold_reward: rule.test.gold_reward,
        consumed,
        cleared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GameEventType;
    use crate::quality::Quality;
    use crate::usecases::test_support::fresh;

    #[test]
    fn start_requires_the_gauge() {
        let (ctx, mut state, mut log) = fresh(61);
        let err = start_promotion_test(&ctx, &mut state, &mut log).unwrap_err();
        assert_eq!(err.code(), "GAUGE_INSUFFICIENT");
        state.player.promotion_gauge = 60;
        assert_eq!(start_promotion_test(&ctx, &mut state, &mut log), Ok(3));
        assert!(state.game.is_in_promotion_test);
        let err = start_promotion_test(&ctx, &mut state, &mut log).unwrap_err();
        assert_eq!(err.code(), "ALREADY_IN_PROMOTION_TEST");
    }

    #[test]
    fn judging_without_items_keeps_the_test_open() {
        let (ctx, mut state, mut log) = fresh(62);
        state.player.promotion_gauge = 60;
        start_promotion_test(&ctx, &mut state, &mut log).unwrap();
        let err = judge_promotion_test(&ctx, &mut state, &mut log).unwrap_err();
        assert_eq!(err.code(), "REQUIREMENTS_NOT_MET");
        assert!(state.game.is_in_promotion_test);
    }

    #[test]
    fn passing_promotes_and_resets() {
        let (ctx, mut state, mut log) = fresh(63);
        state.player.promotion_gauge = 75;
        start_promotion_test(&ctx, &mut state, &mut log).unwrap();
        let potion = state.inventory.add_item("healing_potion", Quality::C);
        let gold = state.player.gold;
        let outcome = judge_promotion_test(&ctx, &mut state, &mut log).unwrap();
        assert_eq!(outcome.to, GuildRank::F);
        assert_eq!(outcome.consumed, vec![potion]);
        assert_eq!(state.player.rank, GuildRank::F);
        assert_eq!(state.player.promotion_gauge, 0);
        assert_eq!(state.player.gold, gold + 50);
        assert_eq!(
            state.game.rank_days_remaining,
            ctx.master.rank_rule(GuildRank::F).unwrap().day_limit
        );
        assert!(!state.game.is_in_promotion_test);
        assert!(log.contains(GameEventType::RankUp));
        assert!(!outcome.cleared);
    }

    #[test]
    fn multi_item_requirements_do_not_share_instances() {
        let (ctx, mut state, mut log) = fresh(64);
        state.player.rank = GuildRank::B;
        state.player.promotion_gauge = 400;
        start_promotion_test(&ctx, &mut state, &mut log).unwrap();
        state.inventory.add_item("elixir", Quality::A);
        state.inventory.add_item("healing_potion", Quality::B);
        let err = judge_promotion_test(&ctx, &mut state, &mut log).unwrap_err();
        assert!(matches!(err, GameError::RequirementsNotMet { ref missing } if missing.len() == 1));
        state.inventory.add_item("healing_potion", Quality::S);
        assert!(judge_promotion_test(&ctx, &mut state, &mut log).is_ok());
        assert!(state.inventory.items.is_empty());
    }

    #[test]
    fn promotion_to_s_clears_the_game() {
        let (ctx, mut state, mut log) = fresh(65);
        state.player.rank = GuildRank::A;
        state.player.promotion_gauge = 400;
        start_promotion_test(&ctx, &mut state, &mut log).unwrap();
        state.inventory.add_item("dragon_salve", Quality::A);
        let outcome = judge_promotion_test(&ctx, &mut state, &mut log).unwrap();
        assert!(outcome.cleared);
        assert!(state.game.game_clear);
        assert!(log.contains(GameEventType::GameClear));
        let err = start_promotion_test(&ctx, &mut state, &mut log).unwrap_err();
        assert_eq!(err.code(), "GAME_ENDED");
    }
}
