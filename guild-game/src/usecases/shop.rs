//! Guild shop: cards, artifacts and single material units for gold.
use log::debug;

use crate::data::{ShopEntry, ShopGoods};
use crate::error::GameError;
use crate::events::{EventLog, GameEvent};
use crate::numbers::{ceil_f64_to_i64, i64_to_f64};
use crate::state::{GuildState, Phase};

use super::GameContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOutcome {
    pub entry_id: String,
    pub goods: ShopGoods,
    pub price: i64,
    pub gold_left: i64,
}

/// Price after a percentage discount, rounded up.
#[must_use]
pub fn effective_price(price: i64, discount_pct: u32) -> i64 {
    if discount_pct == 0 {
        return price;
    }
    let multiplier = 1.0 - f64::from(discount_pct.min(100)) / 100.0;
    ceil_f64_to_i64(i64_to_f64(price) * multiplier)
}

/// Units of `entry` still for sale, `None` for unlimited stock.
#[must_use]
pub fn remaining_stock(state: &GuildState, entry: &ShopEntry) -> Option<u32> {
    let bought = state.player.purchases.get(&entry.id).copied().unwrap_or(0);
    entry.stock.map(|stock| stock.saturating_sub(bought))
}

/// Entries the player could buy right now, ignoring gold.
#[must_use]
pub fn available_entries<'a>(ctx: &'a GameContext, state: &GuildState) -> Vec<&'a ShopEntry> {
    ctx.master
        .shop
        .iter()
        .filter(|entry| entry.min_rank <= state.player.rank)
        .filter(|entry| remaining_stock(state, entry) != Some(0))
        .filter(|entry| match &entry.goods {
            ShopGoods::Artifact(id) => !state.player.owns_artifact(id),
            _ => true,
        })
        .collect()
}

/// Buy one unit of a shop entry.
///
/// # Errors
///
/// Fails outside the quest-accept and delivery phases, for unknown entries,
/// when the rank is too low, the entry is sold out, an artifact is already
/// owned, the inventory has no room or gold is short.
pub fn purchase_item(
    ctx: &GameContext,
    state: &mut GuildState,
    log: &mut EventLog,
    entry_id: &str,
) -> Result<PurchaseOutcome, GameError> {
    state.ensure_phase("purchase_item", &[Phase::QuestAccept, Phase::Delivery])?;
    let entry = ctx
        .master
        .shop_entry(entry_id)
        .ok_or_else(|| GameError::ShopEntryNotFound(entry_id.to_string()))?;
    if state.player.rank < entry.min_rank {
        return Err(GameError::RankTooLow {
            required: entry.min_rank,
            current: state.player.rank,
        });
    }
    if remaining_stock(state, entry) == Some(0) {
        return Err(GameError::OutOfStock(entry_id.to_string()));
    }
    match &entry.goods {
        ShopGoods::Artifact(id) if state.player.owns_artifact(id) => {
            return Err(GameError::ArtifactOwned(id.clone()));
        }
        ShopGoods::Material { .. }
            if state.inventory.material_units() >= ctx.config.material_capacity =>
        {
            return Err(GameError::InventoryFull);
        }
        _ => {}
    }
    let discount = state.player.bonuses(&ctx.master).shop_discount_pct;
    let price = effective_price(entry.price, discount);
    if state.player.gold < price {
        return Err(GameError::InsufficientGold {
            required: price,
            available: state.player.gold,
        });
    }

    state.player.gold -= price;
    *state.player.purchases.entry(entry.id.clone()).or_insert(0) += 1;
    match &entry.goods {
        ShopGoods::Card(card) => state.deck.discard_pile.push(card.clone()),
        ShopGoods::Artifact(artifact) => state.player.artifacts.push(artifact.clone()),
        ShopGoods::Material {
            material_id,
            quality,
        } => {
            state
                .inventory
                .add_material(material_id, *quality, 1, ctx.config.material_capacity);
        }
    }
    debug!("bought {entry_id} for {price} gold");
    log.push(GameEvent::ItemPurchased {
        entry_id: entry_id.to_string(),
        price,
    });
    Ok(PurchaseOutcome {
        entry_id: entry_id.to_string(),
        goods: entry.goods.clone(),
        price,
        gold_left: state.player.gold,
    })
}
