//! Starting a new run.
use log::debug;

use crate::deck::{build_deck, draw_hand};
use crate::events::{EventLog, GameEvent};
use crate::inventory::InventoryState;
use crate::quest::QuestState;
use crate::rank::GuildRank;
use crate::rng::RngCursors;
use crate::state::{GameProgress, GuildState, PlayerState};

use super::GameContext;
use super::quest::refresh_quest_board;

/// Build the day-1 state for `seed`: shuffled starting deck, first hand and
/// a freshly drawn quest board.
#[must_use]
pub fn new_game(ctx: &GameContext, seed: u64) -> (GuildState, EventLog) {
    let mut rng = RngCursors::default();
    let rank_days = ctx
        .master
        .rank_rule(GuildRank::G)
        .map_or(0, |rule| rule.day_limit);
    let deck = build_deck(&ctx.master.starting_deck, seed, &mut rng);
    let mut state = GuildState {
        seed,
        game: GameProgress::new(rank_days),
        player: PlayerState::new(ctx.config.initial_gold, ctx.config.max_action_points),
        deck,
        inventory: InventoryState::default(),
        quest: QuestState::default(),
        rng,
    };

    let mut log = EventLog::new();
    refresh_quest_board(ctx, &mut state, &mut log);
    let hand_size = ctx.hand_size(&state);
    let cards = draw_hand(&mut state.deck, hand_size, seed, &mut state.rng);
    log.push(GameEvent::HandDrawn { cards });
    debug!("new game seed={seed} rank_days={rank_days}");
    (state, log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Phase;
    use crate::usecases::test_support::context;

    #[test]
    fn new_game_starts_on_day_one_at_rank_g() {
        let ctx = context();
        let (state, log) = new_game(&ctx, 1234);
        assert_eq!(state.game.day, 1);
        assert_eq!(state.game.phase, Phase::QuestAccept);
        assert_eq!(state.player.rank, GuildRank::G);
        assert_eq!(state.player.gold, ctx.config.initial_gold);
        assert_eq!(state.player.action_points, ctx.config.max_action_points);
        assert_eq!(state.deck.hand.len(), ctx.config.hand_size);
        assert_eq!(state.deck.total_cards(), ctx.master.starting_deck.len());
        assert_eq!(state.quest.quest_board.len(), ctx.config.quest_board_size);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn seed_determines_the_opening() {
        let ctx = context();
        let (a, _) = new_game(&ctx, 99);
        let (b, _) = new_game(&ctx, 99);
        let (c, _) = new_game(&ctx, 100);
        assert_eq!(a, b);
        assert!(a.deck != c.deck || a.quest != c.quest);
    }
}
