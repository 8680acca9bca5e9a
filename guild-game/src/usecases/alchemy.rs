//! Crafting items from recipe cards.
use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::{Ingredient, MasterData, RecipeDef};
use crate::error::GameError;
use crate::events::{EventLog, GameEvent};
use crate::inventory::{InstanceId, InventoryState};
use crate::quality::Quality;
use crate::state::{GuildState, Phase};

use super::GameContext;

/// `quantity` units taken from one material stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialSelection {
    pub instance: InstanceId,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CraftOutcome {
    pub item_id: String,
    pub instance: InstanceId,
    pub quality: Quality,
}

/// Ingredients with specific materials first; category slots take whatever
/// the specific slots left over.
fn ordered_ingredients(recipe: &RecipeDef) -> Vec<&Ingredient> {
    let mut ordered: Vec<&Ingredient> = recipe.ingredients.iter().collect();
    ordered.sort_by_key(|i| !i.selector.is_specific());
    ordered
}

struct PoolEntry<'a> {
    instance: InstanceId,
    material_id: &'a str,
    quality: Quality,
    remaining: u32,
}

/// Assign the selected units to the recipe's ingredients. Returns the
/// quality of every consumed unit.
fn assign(
    master: &MasterData,
    recipe: &RecipeDef,
    inventory: &InventoryState,
    selections: &[MaterialSelection],
) -> Result<Vec<Quality>, GameError> {
    let mut pool: Vec<PoolEntry<'_>> = Vec::new();
    for selection in selections.iter().filter(|s| s.quantity > 0) {
        let stack = inventory
            .material(selection.instance)
            .ok_or(GameError::MaterialNotFound(selection.instance))?;
        if let Some(entry) = pool.iter_mut().find(|e| e.instance == selection.instance) {
            entry.remaining = entry
                .remaining
                .checked_add(selection.quantity)
                .ok_or_else(|| {
                    GameError::InvalidMaterials(format!(
                        "{} selected more units than exist",
                        selection.instance
                    ))
                })?;
        } else {
            pool.push(PoolEntry {
                instance: stack.id,
                material_id: &stack.material_id,
                quality: stack.quality,
                remaining: selection.quantity,
            });
        }
    }
    for entry in &pool {
        let held = inventory.material(entry.instance).map_or(0, |m| m.quantity);
        if entry.remaining > held {
            return Err(GameError::InvalidMaterials(format!(
                "{} has only {held} units",
                entry.instance
            )));
        }
    }

    let mut consumed = Vec::new();
    for ingredient in ordered_ingredients(recipe) {
        let mut needed = ingredient.quantity;
        for entry in pool.iter_mut().filter(|e| {
            master
                .material(e.material_id)
                .is_some_and(|def| ingredient.selector.accepts(def))
        }) {
            let take = needed.min(entry.remaining);
            entry.remaining -= take;
            needed -= take;
            consumed.extend(std::iter::repeat_n(entry.quality, take as usize));
            if needed == 0 {
                break;
            }
        }
        if needed > 0 {
            return Err(GameError::InvalidMaterials(format!(
                "{} needs {needed} more unit(s) for {:?}",
                recipe.id, ingredient.selector
            )));
        }
    }
    if pool.iter().any(|e| e.remaining > 0) {
        return Err(GameError::InvalidMaterials(format!(
            "selection has units {} does not use",
            recipe.id
        )));
    }
    Ok(consumed)
}

/// `floor(mean ordinal) + boost`, clamped to the grade range.
#[must_use]
pub fn crafted_quality(consumed: &[Quality], boost: u32) -> Quality {
    if consumed.is_empty() {
        return Quality::D;
    }
    let total: usize = consumed.iter().map(|q| usize::from(q.ordinal())).sum();
    let mean = i32::try_from(total / consumed.len()).unwrap_or(i32::MAX);
    Quality::from_ordinal(mean.saturating_add(i32::try_from(boost).unwrap_or(i32::MAX)))
}

/// Craft the recipe on `card_id` from the selected material units.
///
/// # Errors
///
/// Fails outside the alchemy phase, when the card is not a recipe card in
/// hand, when AP or item capacity is short, and with `INVALID_MATERIALS`
/// when the selection does not exactly cover the ingredients.
pub fn craft(
    ctx: &GameContext,
    state: &mut GuildState,
    log: &mut EventLog,
    card_id: &str,
    selections: &[MaterialSelection],
) -> Result<CraftOutcome, GameError> {
    state.ensure_phase("craft", &[Phase::Alchemy])?;
    if !state.deck.in_hand(card_id) {
        return Err(GameError::CardNotInHand(card_id.to_string()));
    }
    let recipe_id = ctx
        .card_def(card_id)?
        .recipe_id()
        .ok_or_else(|| GameError::WrongCardKind {
            card_id: card_id.to_string(),
            expected: "recipe",
        })?;
    let recipe = ctx
        .master
        .recipe(recipe_id)
        .ok_or_else(|| GameError::UnknownContent {
            kind: "recipe",
            id: recipe_id.to_string(),
        })?;
    if state.player.action_points < recipe.ap_cost {
        return Err(GameError::InsufficientAp {
            required: recipe.ap_cost,
            available: state.player.action_points,
        });
    }
    if state.inventory.items.len() >= ctx.config.item_capacity {
        return Err(GameError::InventoryFull);
    }
    let consumed = assign(&ctx.master, recipe, &state.inventory, selections)?;
    let quality = crafted_quality(&consumed, state.game.quality_boost);

    for selection in selections {
        state
            .inventory
            .remove_material(selection.instance, selection.quantity);
    }
    state.deck.discard_from_hand(card_id);
    state.player.action_points -= recipe.ap_cost;
    state.game.quality_boost = 0;
    let instance = state.inventory.add_item(&recipe.item_id, quality);
    debug!("crafted {} ({quality}) from {} units", recipe.item_id, consumed.len());
    log.push(GameEvent::ItemCrafted {
        item_id: recipe.item_id.clone(),
        instance,
        quality,
    });
    Ok(CraftOutcome {
        item_id: recipe.item_id.clone(),
        instance,
        quality,
    })
}

/// Pick stacks for `recipe`, best quality first. `None` if the inventory
/// cannot cover it.
#[must_use]
pub fn auto_select(
    master: &MasterData,
    recipe: &RecipeDef,
    inventory: &InventoryState,
) -> Option<Vec<MaterialSelection>> {
    let mut stacks: Vec<(InstanceId, &str, Quality, u32)> = inventory
        .materials
        .iter()
        .map(|m| (m.id, m.material_id.as_str(), m.quality, m.quantity))
        .collect();
    stacks.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

    let mut picks: Vec<MaterialSelection> = Vec::new();
    for ingredient in ordered_ingredients(recipe) {
        let mut needed = ingredient.quantity;
        for stack in stacks.iter_mut().filter(|s| {
            master
                .material(s.1)
                .is_some_and(|def| ingredient.selector.accepts(def))
        }) {
            let take = needed.min(stack.3);
            if take == 0 {
                continue;
            }
            stack.3 -= take;
            needed -= take;
            match picks.iter_mut().find(|p| p.instance == stack.0) {
                Some(pick) => pick.quantity += take,
                None => picks.push(MaterialSelection {
                    instance: stack.0,
                    quantity: take,
                }),
            }
            if needed == 0 {
                break;
            }
        }
        if needed > 0 {
            return None;
        }
    }
    Some(picks)
}
