//! Deck cycling: shuffles and hand draws on the `deck` random stream.
use rand::seq::SliceRandom;

use crate::rng::{RngCursors, RngDomain};
use crate::state::DeckState;

/// Fresh deck from `cards`, shuffled into the draw pile.
#[must_use]
pub fn build_deck(cards: &[String], seed: u64, cursors: &mut RngCursors) -> DeckState {
    let mut draw_pile = cards.to_vec();
    draw_pile.shuffle(&mut cursors.next_rng(seed, RngDomain::Deck));
    DeckState {
        draw_pile,
        hand: Vec::new(),
        discard_pile: Vec::new(),
    }
}

/// Discard the current hand and draw `count` cards.
///
/// When the draw pile runs dry the discard pile is shuffled back in. The
/// hand comes up short only when the whole deck is smaller than `count`.
pub fn draw_hand(
    deck: &mut DeckState,
    count: usize,
    seed: u64,
    cursors: &mut RngCursors,
) -> Vec<String> {
    deck.discard_pile.append(&mut deck.hand);
    while deck.hand.len() < count {
        if deck.draw_pile.is_empty() {
            if deck.discard_pile.is_empty() {
                break;
            }
            deck.draw_pile.append(&mut deck.discard_pile);
            deck.draw_pile
                .shuffle(&mut cursors.next_rng(seed, RngDomain::Deck));
        }
        if let Some(card) = deck.draw_pile.pop() {
            deck.hand.push(card);
        }
    }
    deck.hand.clone()
}
