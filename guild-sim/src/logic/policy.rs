use std::fmt;

use clap::ValueEnum;
use guild_game::item::ItemRequirement;
use guild_game::quest::QuestTarget;
use guild_game::usecases::effective_price;
use guild_game::usecases::shop::available_entries;
use guild_game::{
    DraftChoice, DraftSession, GameContext, GuildState, InstanceId, Quest, RecipeDef, ShopGoods,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

/// Policy interface for automated play strategies.
///
/// Policies only decide. The simulation loop executes each decision against
/// the session and shrugs off rejected actions.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Board quests to accept this quest-accept phase, in order.
    fn choose_quests(&mut self, ctx: &GameContext, state: &GuildState) -> Vec<String>;

    /// Shop entries to buy, in order. Called in quest-accept and delivery.
    fn choose_purchases(&mut self, ctx: &GameContext, state: &GuildState) -> Vec<String>;

    /// Pick from the current draft round.
    fn pick_draft(
        &mut self,
        ctx: &GameContext,
        state: &GuildState,
        draft: &DraftSession,
    ) -> DraftChoice;

    /// Whether to spend materials on `recipe` now.
    fn wants_craft(&mut self, _ctx: &GameContext, _state: &GuildState, _recipe: &RecipeDef) -> bool {
        true
    }

    /// Whether to open the promotion test. Only asked when the gauge allows it.
    fn should_start_promotion(&mut self, ctx: &GameContext, state: &GuildState) -> bool;

    /// Item to hand in for `quest`, if any. Defaults to the best match that
    /// the promotion test does not need.
    fn choose_delivery(
        &mut self,
        ctx: &GameContext,
        state: &GuildState,
        quest: &Quest,
    ) -> Option<InstanceId> {
        let reserved = reserved_for_promotion(ctx, state);
        state
            .inventory
            .items
            .iter()
            .filter(|item| quest.matches(item, &ctx.master))
            .filter(|item| !reserved.contains(&item.id))
            .max_by_key(|item| (item.quality, std::cmp::Reverse(item.id)))
            .map(|item| item.id)
    }
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameplayStrategy {
    /// Take every quest, buy whatever is affordable, chase quality
    Greedy,
    /// Keep a gold reserve, accept few quests, craft only what is needed
    Cautious,
    /// Seeded random choices
    Random,
}

impl GameplayStrategy {
    pub const ALL: [Self; 3] = [Self::Greedy, Self::Cautious, Self::Random];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Greedy => "Greedy",
            Self::Cautious => "Cautious",
            Self::Random => "Random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy> {
        match self {
            Self::Greedy => Box::new(GreedyPolicy),
            Self::Cautious => Box::new(CautiousPolicy::default()),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct GreedyPolicy;

struct CautiousPolicy {
    gold_reserve: i64,
}

impl Default for CautiousPolicy {
    fn default() -> Self {
        Self { gold_reserve: 300 }
    }
}

struct RandomPolicy {
    rng: ChaCha20Rng,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl PlayerPolicy for GreedyPolicy {
    fn name(&self) -> &'static str {
        "Greedy"
    }

    fn choose_quests(&mut self, _ctx: &GameContext, state: &GuildState) -> Vec<String> {
        let mut board: Vec<&Quest> = state.quest.quest_board.iter().collect();
        board.sort_by_key(|q| std::cmp::Reverse(quest_value(q)));
        board.into_iter().map(|q| q.id.clone()).collect()
    }

    fn choose_purchases(&mut self, ctx: &GameContext, state: &GuildState) -> Vec<String> {
        let mut gold = state.player.gold;
        let mut picks = Vec::new();
        let mut entries = priced_entries(ctx, state);
        entries.sort_by_key(|(_, price)| std::cmp::Reverse(*price));
        for (id, price) in entries {
            if price <= gold {
                gold -= price;
                picks.push(id);
            }
        }
        picks
    }

    fn pick_draft(
        &mut self,
        _ctx: &GameContext,
        _state: &GuildState,
        draft: &DraftSession,
    ) -> DraftChoice {
        best_quality_option(draft).map_or(DraftChoice::Skip, DraftChoice::Take)
    }

    fn should_start_promotion(&mut self, _ctx: &GameContext, _state: &GuildState) -> bool {
        true
    }
}

impl PlayerPolicy for CautiousPolicy {
    fn name(&self) -> &'static str {
        "Cautious"
    }

    fn choose_quests(&mut self, ctx: &GameContext, state: &GuildState) -> Vec<String> {
        let room = (ctx.config.max_active_quests / 2)
            .max(1)
            .saturating_sub(state.quest.active.len());
        let mut board: Vec<&Quest> = state.quest.quest_board.iter().collect();
        board.sort_by_key(|q| (std::cmp::Reverse(q.deadline_days), q.id.clone()));
        board.into_iter().take(room).map(|q| q.id.clone()).collect()
    }

    fn choose_purchases(&mut self, ctx: &GameContext, state: &GuildState) -> Vec<String> {
        let mut gold = state.player.gold;
        let mut picks = Vec::new();
        let mut entries = priced_entries(ctx, state);
        entries.sort_by_key(|(_, price)| *price);
        for (id, price) in entries {
            let is_durable = ctx
                .master
                .shop_entry(&id)
                .is_some_and(|e| matches!(e.goods, ShopGoods::Card(_) | ShopGoods::Artifact(_)));
            if is_durable && gold - price >= self.gold_reserve {
                gold -= price;
                picks.push(id);
            }
        }
        picks
    }

    fn pick_draft(
        &mut self,
        ctx: &GameContext,
        state: &GuildState,
        draft: &DraftSession,
    ) -> DraftChoice {
        let wanted = wanted_materials(ctx, state);
        draft
            .options
            .iter()
            .enumerate()
            .filter(|(_, opt)| wanted.iter().any(|m| m == &opt.material_id))
            .max_by_key(|(idx, opt)| (opt.quality, std::cmp::Reverse(*idx)))
            .map(|(idx, _)| idx)
            .or_else(|| best_quality_option(draft))
            .map_or(DraftChoice::Skip, DraftChoice::Take)
    }

    fn wants_craft(&mut self, ctx: &GameContext, state: &GuildState, recipe: &RecipeDef) -> bool {
        wanted_items(ctx, state).contains(&recipe.item_id)
    }

    fn should_start_promotion(&mut self, ctx: &GameContext, state: &GuildState) -> bool {
        promotion_requirements(ctx, state)
            .iter()
            .all(|req| state.inventory.select_for_requirement(req).is_some())
    }
}

impl PlayerPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn choose_quests(&mut self, _ctx: &GameContext, state: &GuildState) -> Vec<String> {
        let mut ids: Vec<String> = state
            .quest
            .quest_board
            .iter()
            .map(|q| q.id.clone())
            .collect();
        ids.shuffle(&mut self.rng);
        let keep = self.rng.gen_range(0..=ids.len());
        ids.truncate(keep);
        ids
    }

    fn choose_purchases(&mut self, ctx: &GameContext, state: &GuildState) -> Vec<String> {
        priced_entries(ctx, state)
            .into_iter()
            .filter(|(_, price)| *price <= state.player.gold)
            .filter(|_| self.rng.gen_bool(0.25))
            .map(|(id, _)| id)
            .collect()
    }

    fn pick_draft(
        &mut self,
        _ctx: &GameContext,
        _state: &GuildState,
        draft: &DraftSession,
    ) -> DraftChoice {
        if draft.options.is_empty() || self.rng.gen_bool(0.1) {
            return DraftChoice::Skip;
        }
        DraftChoice::Take(self.rng.gen_range(0..draft.options.len()))
    }

    fn wants_craft(&mut self, _ctx: &GameContext, _state: &GuildState, _recipe: &RecipeDef) -> bool {
        self.rng.gen_bool(0.8)
    }

    fn should_start_promotion(&mut self, _ctx: &GameContext, _state: &GuildState) -> bool {
        self.rng.gen_bool(0.5)
    }
}

/// Expected gold from a quest at base quality.
fn quest_value(quest: &Quest) -> i64 {
    quest.gold + quest.contribution
}

fn best_quality_option(draft: &DraftSession) -> Option<usize> {
    draft
        .options
        .iter()
        .enumerate()
        .max_by_key(|(idx, opt)| (opt.quality, std::cmp::Reverse(*idx)))
        .map(|(idx, _)| idx)
}

/// Buyable entries with their discounted price.
fn priced_entries(ctx: &GameContext, state: &GuildState) -> Vec<(String, i64)> {
    let discount = state.player.bonuses(&ctx.master).shop_discount_pct;
    available_entries(ctx, state)
        .into_iter()
        .map(|entry| (entry.id.clone(), effective_price(entry.price, discount)))
        .collect()
}

fn promotion_requirements<'a>(ctx: &'a GameContext, state: &GuildState) -> &'a [ItemRequirement] {
    ctx.master
        .rank_rule(state.player.rank)
        .map_or(&[], |rule| rule.test.requirements.as_slice())
}

/// Items that the promotion test will consume, once one is running.
pub(crate) fn reserved_for_promotion(ctx: &GameContext, state: &GuildState) -> Vec<InstanceId> {
    if !state.game.is_in_promotion_test {
        return Vec::new();
    }
    let mut pool = state.inventory.clone();
    let mut reserved = Vec::new();
    for req in promotion_requirements(ctx, state) {
        if let Some(ids) = pool.select_for_requirement(req) {
            pool.items.retain(|i| !ids.contains(&i.id));
            reserved.extend(ids);
        }
    }
    reserved
}

/// Item ids that active quests or the promotion test ask for by name.
pub(crate) fn wanted_items(ctx: &GameContext, state: &GuildState) -> Vec<String> {
    let mut wanted: Vec<String> = state
        .quest
        .active
        .iter()
        .filter_map(|active| match &active.quest.condition.target {
            QuestTarget::Item(id) => Some(id.clone()),
            _ => None,
        })
        .collect();
    wanted.extend(
        promotion_requirements(ctx, state)
            .iter()
            .map(|req| req.item_id.clone()),
    );
    wanted.sort();
    wanted.dedup();
    wanted
}

/// Material ids accepted by the recipes of wanted items.
fn wanted_materials(ctx: &GameContext, state: &GuildState) -> Vec<String> {
    let recipes: Vec<&RecipeDef> = wanted_items(ctx, state)
        .iter()
        .filter_map(|item| ctx.master.recipe_for_item(item))
        .collect();
    ctx.master
        .materials
        .iter()
        .filter(|material| {
            recipes.iter().any(|recipe| {
                recipe
                    .ingredients
                    .iter()
                    .any(|ing| ing.selector.accepts(material))
            })
        })
        .map(|material| material.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_game::{GameConfig, GuildSession, MasterData};

    fn session(seed: u64) -> GuildSession {
        let ctx = GameContext::new(MasterData::builtin().unwrap(), GameConfig::default());
        GuildSession::new(ctx, seed)
    }

    #[test]
    fn greedy_orders_quests_by_value() {
        let session = session(3);
        let mut policy = GameplayStrategy::Greedy.create_policy(3);
        let picks = policy.choose_quests(session.context(), session.state());
        let values: Vec<i64> = picks
            .iter()
            .map(|id| quest_value(session.state().quest.board_quest(id).unwrap()))
            .collect();
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(picks.len(), session.state().quest.quest_board.len());
    }

    #[test]
    fn cautious_keeps_half_the_quest_slots_free() {
        let session = session(3);
        let mut policy = GameplayStrategy::Cautious.create_policy(3);
        let picks = policy.choose_quests(session.context(), session.state());
        let room = (session.context().config.max_active_quests / 2).max(1);
        assert!(picks.len() <= room);
    }

    #[test]
    fn greedy_never_plans_past_its_gold() {
        let session = session(8);
        let mut policy = GameplayStrategy::Greedy.create_policy(8);
        let picks = policy.choose_purchases(session.context(), session.state());
        let prices = priced_entries(session.context(), session.state());
        let spent: i64 = picks
            .iter()
            .map(|id| prices.iter().find(|(e, _)| e == id).unwrap().1)
            .sum();
        assert!(spent <= session.state().player.gold);
    }

    #[test]
    fn random_policy_is_seeded() {
        let session = session(21);
        let mut a = GameplayStrategy::Random.create_policy(77);
        let mut b = GameplayStrategy::Random.create_policy(77);
        for _ in 0..5 {
            assert_eq!(
                a.choose_quests(session.context(), session.state()),
                b.choose_quests(session.context(), session.state())
            );
        }
    }

    #[test]
    fn draft_picks_prefer_higher_quality() {
        use guild_game::Quality;
        use guild_game::state::DraftOption;
        let draft = DraftSession {
            card_id: "gather_meadow".to_string(),
            location_id: "meadow".to_string(),
            rounds_total: 1,
            round: 0,
            options: vec![
                DraftOption {
                    material_id: "herb".to_string(),
                    quality: Quality::C,
                },
                DraftOption {
                    material_id: "herb".to_string(),
                    quality: Quality::A,
                },
            ],
            picks: Vec::new(),
        };
        assert_eq!(best_quality_option(&draft), Some(1));
    }

    #[test]
    fn strategy_labels_round_trip_through_display() {
        for strategy in GameplayStrategy::ALL {
            assert_eq!(strategy.to_string(), strategy.label());
        }
    }
}
