//! Card plays that are not tied to a phase.
use log::debug;

use crate::card::{CardKind, EnhancementEffect};
use crate::deck;
use crate::error::GameError;
use crate::events::{EventLog, GameEvent};
use crate::state::GuildState;

use super::GameContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayOutcome {
    pub effect: EnhancementEffect,
    pub action_points: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawOutcome {
    pub hand: Vec<String>,
}

/// Play an enhancement card from hand. Costs no AP; the card goes to the
/// discard pile.
///
/// # Errors
///
/// Fails after game end and when the card is not an enhancement in hand.
pub fn play_enhancement(
    ctx: &GameContext,
    state: &mut GuildState,
    log: &mut EventLog,
    card_id: &str,
) -> Result<PlayOutcome, GameError> {
    state.ensure_active()?;
    if !state.deck.in_hand(card_id) {
        return Err(GameError::CardNotInHand(card_id.to_string()));
    }
    let CardKind::Enhancement { effect } = ctx.card_def(card_id)?.kind else {
        return Err(GameError::WrongCardKind {
            card_id: card_id.to_string(),
            expected: "enhancement",
        });
    };

    match effect {
        EnhancementEffect::RestoreAp(n) => {
            let ceiling = state.player.max_action_points + state.player.bonuses(&ctx.master).max_ap;
            state.player.action_points = (state.player.action_points + n).min(ceiling);
        }
        EnhancementEffect::QualityBoost(n) => state.game.quality_boost += n,
        EnhancementEffect::DraftBonus(n) => state.game.draft_bonus += n,
    }
    state.deck.discard_from_hand(card_id);
    debug!("played {card_id}: {effect:?}");
    log.push(GameEvent::CardPlayed {
        card_id: card_id.to_string(),
    });
    Ok(PlayOutcome {
        effect,
        action_points: state.player.action_points,
    })
}

/// Discard the hand and draw a fresh one.
///
/// # Errors
///
/// Fails after game end.
pub fn draw_hand(
    ctx: &GameContext,
    state: &mut GuildState,
    log: &mut EventLog,
) -> Result<DrawOutcome, GameError> {
    state.ensure_active()?;
    let count = ctx.hand_size(state);
    let hand = deck::draw_hand(&mut state.deck, count, state.seed, &mut state.rng);
    log.push(GameEvent::HandDrawn {
        cards: hand.clone(),
    });
    Ok(DrawOutcome { hand })
}
