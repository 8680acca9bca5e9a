//! Gathering as a draft: each round offers a few weighted drops from the
//! location and the player keeps at most one of them.
use log::debug;
use rand::Rng;

use crate::card::CardKind;
use crate::constants::MAX_DRAFT_SIZE;
use crate::data::LocationDef;
use crate::error::GameError;
use crate::events::{EventLog, GameEvent};
use crate::quality::Quality;
use crate::rng::{RngDomain, choose_weighted};
use crate::state::{DraftOption, DraftSession, GuildState, Phase};

use super::GameContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftChoice {
    Take(usize),
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatheringOutcome {
    pub location_id: String,
    /// `(material, quality, units)` actually stored.
    pub gathered: Vec<(String, Quality, u32)>,
    /// Units lost to the material capacity.
    pub discarded: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickOutcome {
    pub picked: Option<DraftOption>,
    pub rounds_left: u32,
    /// Set when this pick closed the final round.
    pub finished: Option<GatheringOutcome>,
}

/// Play a gathering card from hand and open its draft.
///
/// # Errors
///
/// Fails outside the gathering phase, while another draft is open, when the
/// card is not a gathering card in hand, and with `INSUFFICIENT_AP` when AP
/// is short and overflow is disabled.
pub fn start_gathering(
    ctx: &GameContext,
    state: &mut GuildState,
    log: &mut EventLog,
    card_id: &str,
) -> Result<DraftSession, GameError> {
    state.ensure_phase("start_gathering", &[Phase::Gathering])?;
    if state.game.draft.is_some() {
        return Err(GameError::GatheringInProgress);
    }
    if !state.deck.in_hand(card_id) {
        return Err(GameError::CardNotInHand(card_id.to_string()));
    }
    let CardKind::Gathering {
        location,
        ap_cost,
        rounds,
    } = &ctx.card_def(card_id)?.kind
    else {
        return Err(GameError::WrongCardKind {
            card_id: card_id.to_string(),
            expected: "gathering",
        });
    };
    let location = ctx
        .master
        .location(location)
        .ok_or_else(|| GameError::UnknownContent {
            kind: "location",
            id: location.clone(),
        })?;
    let available = state.player.action_points;
    if available < *ap_cost && !ctx.config.allow_ap_overflow {
        return Err(GameError::InsufficientAp {
            required: *ap_cost,
            available,
        });
    }

    state.deck.discard_from_hand(card_id);
    let shortfall = ap_cost.saturating_sub(available);
    state.player.action_points = available.saturating_sub(*ap_cost);
    state.game.ap_overflow += shortfall;

    let options = roll_options(ctx, state, location);
    let session = DraftSession {
        card_id: card_id.to_string(),
        location_id: location.id.clone(),
        rounds_total: *rounds,
        round: 0,
        options,
        picks: Vec::new(),
    };
    state.game.draft = Some(session.clone());
    debug!(
        "gathering at {} for {rounds} rounds (overflow {})",
        location.id, state.game.ap_overflow
    );
    log.push(GameEvent::GatheringStarted {
        location_id: location.id.clone(),
        rounds: *rounds,
    });
    Ok(session)
}

fn option_count(ctx: &GameContext, state: &GuildState) -> usize {
    let bonus = state.game.draft_bonus + state.player.bonuses(&ctx.master).draft_options;
    (ctx.config.draft_size + usize::try_from(bonus).unwrap_or(0)).min(MAX_DRAFT_SIZE)
}

fn roll_options(ctx: &GameContext, state: &mut GuildState, location: &LocationDef) -> Vec<DraftOption> {
    let count = option_count(ctx, state);
    let weights: Vec<u32> = location.drops.iter().map(|d| d.weight).collect();
    let mut rng = state.rng.next_rng(state.seed, RngDomain::Draft);
    let mut options = Vec::with_capacity(count);
    for _ in 0..count {
        let Some(idx) = choose_weighted(&weights, &mut rng) else {
            break;
        };
        let drop = &location.drops[idx];
        let ordinal = rng.gen_range(drop.min_quality.ordinal()..=drop.max_quality.ordinal());
        options.push(DraftOption {
            material_id: drop.material_id.clone(),
            quality: Quality::from_ordinal(i32::from(ordinal)),
        });
    }
    options
}

/// Take one of the offered options (or none) and move to the next round.
/// The final round closes the draft through [`finish_gathering`].
///
/// # Errors
///
/// Fails when no draft is open or the index is out of range.
pub fn pick_draft(
    ctx: &GameContext,
    state: &mut GuildState,
    log: &mut EventLog,
    choice: DraftChoice,
) -> Result<PickOutcome, GameError> {
    state.ensure_active()?;
    let draft = state.game.draft.as_ref().ok_or(GameError::NoGatheringSession)?;
    let picked = match choice {
        DraftChoice::Take(index) => Some(draft.options.get(index).cloned().ok_or(
            GameError::InvalidDraftPick {
                index,
                available: draft.options.len(),
            },
        )?),
        DraftChoice::Skip => None,
    };
    let location_id = draft.location_id.clone();

    let location = ctx
        .master
        .location(&location_id)
        .ok_or_else(|| GameError::UnknownContent {
            kind: "location",
            id: location_id.clone(),
        })?;
    let next_options = {
        let draft = state.game.draft.as_ref().ok_or(GameError::NoGatheringSession)?;
        if draft.round + 1 < draft.rounds_total {
            Some(roll_options(ctx, state, location))
        } else {
            None
        }
    };

    let draft = state.game.draft.as_mut().ok_or(GameError::NoGatheringSession)?;
    if let Some(pick) = &picked {
        draft.picks.push(pick.clone());
    }
    draft.round += 1;
    draft.options = next_options.unwrap_or_default();
    let rounds_left = draft.rounds_left();
    let finished = if draft.is_complete() {
        Some(finish_gathering(ctx, state, log)?)
    } else {
        None
    };
    Ok(PickOutcome {
        picked,
        rounds_left,
        finished,
    })
}

/// Close the open draft and store its picks, dropping units beyond the
/// material capacity. Rounds not yet played are forfeited.
///
/// # Errors
///
/// Fails when no draft is open.
pub fn finish_gathering(
    ctx: &GameContext,
    state: &mut GuildState,
    log: &mut EventLog,
) -> Result<GatheringOutcome, GameError> {
    state.ensure_active()?;
    let draft = state.game.draft.take().ok_or(GameError::NoGatheringSession)?;

    let mut gathered: Vec<(String, Quality, u32)> = Vec::new();
    let mut discarded = 0;
    for pick in draft.picks {
        let accepted = state.inventory.add_material(
            &pick.material_id,
            pick.quality,
            1,
            ctx.config.material_capacity,
        );
        if accepted == 0 {
            discarded += 1;
            continue;
        }
        if let Some(entry) = gathered
            .iter_mut()
            .find(|(id, q, _)| *id == pick.material_id && *q == pick.quality)
        {
            entry.2 += accepted;
        } else {
            gathered.push((pick.material_id, pick.quality, accepted));
        }
    }
    debug!(
        "gathering at {} stored {} units, discarded {discarded}",
        draft.location_id,
        gathered.iter().map(|g| g.2).sum::<u32>()
    );
    log.push(GameEvent::MaterialsGathered {
        location_id: draft.location_id.clone(),
        gathered: gathered.clone(),
        discarded,
    });
    Ok(GatheringOutcome {
        location_id: draft.location_id,
        gathered,
        discarded,
    })
}
