//! Quest board, acceptance and delivery.
use log::debug;

use crate::error::GameError;
use crate::events::{EventLog, GameEvent};
use crate::inventory::InstanceId;
use crate::quest::{ActiveQuest, Quest};
use crate::reward::{ClientModifier, Reward, RewardInput, calculate_reward, combo_multiplier};
use crate::rng::{RngDomain, choose_weighted};
use crate::state::{GuildState, Phase};

use super::GameContext;

#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    pub quest_id: String,
    pub reward: Reward,
    /// Combo multiplier applied, if combos are enabled.
    pub combo: Option<f64>,
}

/// Replace the unaccepted board with `quest_board_size` fresh quests drawn
/// from the templates unlocked at the current rank.
pub fn refresh_quest_board(ctx: &GameContext, state: &mut GuildState, log: &mut EventLog) {
    let rank = state.player.rank;
    let pool: Vec<_> = ctx
        .master
        .quest_templates
        .iter()
        .filter(|t| t.min_rank <= rank)
        .collect();
    let weights: Vec<u32> = pool.iter().map(|t| t.weight).collect();
    let mut rng = state.rng.next_rng(state.seed, RngDomain::Board);

    state.quest.quest_board.clear();
    for _ in 0..ctx.config.quest_board_size {
        let Some(idx) = choose_weighted(&weights, &mut rng) else {
            break;
        };
        state.quest.next_serial += 1;
        state
            .quest
            .quest_board
            .push(Quest::from_template(pool[idx], state.quest.next_serial));
    }
    log.push(GameEvent::QuestBoardRefreshed {
        quest_ids: state.quest.quest_board.iter().map(|q| q.id.clone()).collect(),
    });
}

/// Take a quest from the board.
///
/// # Errors
///
/// Fails outside the quest-accept phase, for unknown quests and when the
/// active-quest limit is reached.
pub fn accept_quest(
    ctx: &GameContext,
    state: &mut GuildState,
    log: &mut EventLog,
    quest_id: &str,
) -> Result<(), GameError> {
    state.ensure_phase("accept_quest", &[Phase::QuestAccept])?;
    let pos = state
        .quest
        .quest_board
        .iter()
        .position(|q| q.id == quest_id)
        .ok_or_else(|| GameError::QuestNotFound(quest_id.to_string()))?;
    if state.quest.active.len() >= ctx.config.max_active_quests {
        return Err(GameError::QuestLimitReached {
            limit: ctx.config.max_active_quests,
        });
    }

    let quest = state.quest.quest_board.remove(pos);
    let remaining_days = quest.deadline_days;
    state.quest.active.push(ActiveQuest {
        quest,
        accepted_day: state.game.day,
        remaining_days,
    });
    debug!("accepted {quest_id} on day {}", state.game.day);
    log.push(GameEvent::QuestAccepted {
        quest_id: quest_id.to_string(),
    });
    Ok(())
}

/// Hand an item to an active quest's client.
///
/// # Errors
///
/// Fails outside the delivery phase, for unknown quests or items, and with
/// `CONDITION_NOT_MET` when the item does not satisfy the quest.
pub fn deliver_item(
    ctx: &GameContext,
    state: &mut GuildState,
    log: &mut EventLog,
    quest_id: &str,
    item: InstanceId,
) -> Result<DeliveryOutcome, GameError> {
    state.ensure_phase("deliver_item", &[Phase::Delivery])?;
    let active = state
        .quest
        .active_quest(quest_id)
        .ok_or_else(|| GameError::QuestNotFound(quest_id.to_string()))?;
    let instance = state
        .inventory
        .item(item)
        .ok_or(GameError::ItemNotFound(item))?;
    if !active.quest.matches(instance, &ctx.master) {
        return Err(GameError::ConditionNotMet {
            quest_id: quest_id.to_string(),
            item,
        });
    }

    let quest = &active.quest;
    let client = ctx
        .master
        .client(&quest.client_id)
        .map_or(ClientModifier::NEUTRAL, ClientModifier::from);
    let combo = combo_multiplier(state.game.deliveries_this_phase + 1, &ctx.config.combo);
    let reward = calculate_reward(&RewardInput {
        base: quest.base_reward(),
        quality: instance.quality,
        table: ctx.config.reward_quality_table,
        kind: quest.kind,
        client,
        combo,
    });

    state.inventory.take_item(item);
    state.quest.active.retain(|q| q.quest.id != quest_id);
    state.quest.completed_count += 1;
    state.game.deliveries_this_phase += 1;
    state.player.gold += reward.gold;
    state.player.promotion_gauge += reward.contribution;
    debug!(
        "delivered {item} to {quest_id}: +{} gold, +{} contribution",
        reward.gold, reward.contribution
    );
    log.push(GameEvent::QuestCompleted {
        quest_id: quest_id.to_string(),
        item,
        reward,
    });
    Ok(DeliveryOutcome {
        quest_id: quest_id.to_string(),
        reward,
        combo,
    })
}
