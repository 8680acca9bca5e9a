//! Deterministic playthrough harness: a [`PlayerPolicy`] decides, a
//! [`GuildSession`] executes.
use std::panic::{self, AssertUnwindSafe};

use anyhow::{Context, Result};
use guild_game::card::{CardKind, EnhancementEffect};
use guild_game::usecases::auto_select;
use guild_game::{
    DataError, DataLoader, GameConfig, GameContext, GameEngine, GameError, GuildSession,
    GuildState, MasterData, Phase, RunSummary,
};
use log::{debug, info, warn};
use serde::Serialize;

use crate::logic::policy::{GameplayStrategy, PlayerPolicy};
use crate::logic::storage::FileStorage;

pub const DEFAULT_MAX_DAYS: u32 = 200;

/// Configuration for a simulation run.
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub max_days: u32,
    /// Write the autosave slot once more when the run stops.
    pub save_on_exit: bool,
}

impl SimulationConfig {
    #[must_use]
    pub const fn new(strategy: GameplayStrategy, seed: u64) -> Self {
        Self {
            seed,
            strategy,
            max_days: DEFAULT_MAX_DAYS,
            save_on_exit: false,
        }
    }

    #[must_use]
    pub const fn with_max_days(mut self, max_days: u32) -> Self {
        self.max_days = max_days;
        self
    }

    #[must_use]
    pub const fn with_save_on_exit(mut self, save_on_exit: bool) -> Self {
        self.save_on_exit = save_on_exit;
        self
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Actions the session accepted.
    pub actions: u32,
    /// Actions the session refused. Expected; policies guess.
    pub rejected: u32,
}

/// One (seed, strategy) playthrough.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resumed_from: Option<String>,
    pub summary: Option<RunSummary>,
    pub stats: RunStats,
    pub error: Option<String>,
}

impl RunRecord {
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Loader serving the bundled master data with a caller-supplied config.
#[derive(Debug, Clone)]
pub struct SimLoader {
    config: GameConfig,
}

impl SimLoader {
    /// `slot` becomes the autosave slot for sessions built from this loader.
    #[must_use]
    pub fn new(config: &GameConfig, slot: &str) -> Self {
        let mut config = config.clone();
        config.autosave.slot = slot.to_string();
        Self { config }
    }

    /// # Errors
    ///
    /// Returns an error if the bundled master data fails to load.
    pub fn context(&self) -> Result<GameContext, DataError> {
        Ok(GameContext::new(
            self.load_master_data()?,
            self.load_config()?,
        ))
    }
}

impl DataLoader for SimLoader {
    type Error = DataError;

    fn load_master_data(&self) -> Result<MasterData, Self::Error> {
        MasterData::builtin()
    }

    fn load_config(&self) -> Result<GameConfig, Self::Error> {
        Ok(self.config.clone())
    }
}

/// Save slot used by a fresh run.
#[must_use]
pub fn run_slot(strategy: GameplayStrategy, seed: u64) -> String {
    format!("{}-{seed}", strategy.label().to_lowercase())
}

/// Start a run, autosaving into `storage` when one is given.
///
/// # Errors
///
/// Returns an error if master data cannot be loaded.
pub fn new_session(
    config: &GameConfig,
    storage: Option<&FileStorage>,
    slot: &str,
    seed: u64,
) -> Result<GuildSession> {
    let loader = SimLoader::new(config, slot);
    let session = match storage {
        Some(storage) => GameEngine::new(loader, storage.clone()).create_session(seed)?,
        None => GuildSession::new(loader.context()?, seed),
    };
    Ok(session)
}

/// Read a stored slot, migrating it if it was written by an older build.
///
/// # Errors
///
/// Returns an error if the slot is missing, unreadable or unsupported.
pub fn load_slot(config: &GameConfig, storage: &FileStorage, slot: &str) -> Result<GuildState> {
    let engine = GameEngine::new(SimLoader::new(config, slot), storage.clone());
    let session = engine
        .load_game(slot)?
        .with_context(|| format!("no save in slot `{slot}`"))?;
    Ok(session.into_state())
}

/// Continue `state`, autosaving under `slot`.
///
/// # Errors
///
/// Returns an error if master data cannot be loaded.
pub fn resume_session(
    config: &GameConfig,
    storage: Option<&FileStorage>,
    slot: &str,
    state: GuildState,
) -> Result<GuildSession> {
    let ctx = SimLoader::new(config, slot).context()?;
    let session = GuildSession::from_state(ctx, state);
    Ok(match storage {
        Some(storage) => session.with_autosave(Box::new(storage.clone())),
        None => session,
    })
}

/// Play `session` to the end (or the day cap) and record the result. Panics
/// inside the run are caught and reported as errors.
#[must_use]
pub fn simulate(session: GuildSession, config: &SimulationConfig) -> RunRecord {
    let seed = session.state().seed;
    let mut policy = config.strategy.create_policy(config.seed);
    let max_days = config.max_days;
    let save_on_exit = config.save_on_exit;

    let outcome = panic::catch_unwind(AssertUnwindSafe(move || {
        let mut session = session;
        let mut stats = RunStats::default();
        let result = run_session(&mut session, policy.as_mut(), max_days, &mut stats);
        if save_on_exit && let Err(err) = session.save_now() {
            warn!("final save for seed {seed} failed: {err}");
        }
        (session.summary(), stats, result)
    }));

    match outcome {
        Ok((summary, stats, result)) => {
            info!(
                "{} seed {seed}: {} on day {} (rank {}, score {})",
                config.strategy, summary.outcome, summary.days, summary.rank, summary.score
            );
            RunRecord {
                seed,
                strategy: config.strategy,
                resumed_from: None,
                summary: Some(summary),
                stats,
                error: result.err().map(|e| format!("{e:#}")),
            }
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("{} seed {seed} panicked: {message}", config.strategy);
            RunRecord {
                seed,
                strategy: config.strategy,
                resumed_from: None,
                summary: None,
                stats: RunStats::default(),
                error: Some(format!("panicked: {message}")),
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Drive the phase loop until the run ends or `max_days` is passed.
///
/// # Errors
///
/// Returns an error if the session refuses to change phase or a draft
/// cannot be closed. Ordinary action rejections are only counted.
pub fn run_session(
    session: &mut GuildSession,
    policy: &mut dyn PlayerPolicy,
    max_days: u32,
    stats: &mut RunStats,
) -> Result<()> {
    debug!("running {} from day {}", policy.name(), session.state().game.day);
    while !session.is_ended() && session.state().game.day <= max_days {
        play_phase(session, policy, stats)?;
        if session.is_ended() {
            break;
        }
        let (phase, day) = (session.state().game.phase, session.state().game.day);
        session
            .next_phase()
            .with_context(|| format!("failed to leave {phase} on day {day}"))?;
    }
    Ok(())
}

fn attempt<T>(stats: &mut RunStats, action: &str, result: Result<T, GameError>) -> Option<T> {
    match result {
        Ok(value) => {
            stats.actions += 1;
            Some(value)
        }
        Err(err) => {
            stats.rejected += 1;
            debug!("{action} rejected [{}]: {err}", err.code());
            None
        }
    }
}

fn play_phase(
    session: &mut GuildSession,
    policy: &mut dyn PlayerPolicy,
    stats: &mut RunStats,
) -> Result<()> {
    match session.state().game.phase {
        Phase::QuestAccept => {
            for quest in policy.choose_quests(session.context(), session.state()) {
                attempt(stats, "accept_quest", session.accept_quest(&quest));
            }
            shop(session, policy, stats);
        }
        Phase::Gathering => gather(session, policy, stats)?,
        Phase::Alchemy => brew(session, policy, stats),
        Phase::Delivery => {
            deliver(session, policy, stats);
            promote(session, policy, stats);
            shop(session, policy, stats);
        }
    }
    Ok(())
}

fn shop(session: &mut GuildSession, policy: &mut dyn PlayerPolicy, stats: &mut RunStats) {
    for entry in policy.choose_purchases(session.context(), session.state()) {
        attempt(stats, "purchase_item", session.purchase_item(&entry));
    }
}

/// Enhancement cards in hand with the given effect shape.
fn enhancements_in_hand(
    session: &GuildSession,
    wanted: impl Fn(EnhancementEffect) -> bool,
) -> Vec<String> {
    session
        .state()
        .deck
        .hand
        .iter()
        .filter(|id| {
            session.context().master.card(id).is_some_and(|card| {
                matches!(card.kind, CardKind::Enhancement { effect } if wanted(effect))
            })
        })
        .cloned()
        .collect()
}

fn gather(
    session: &mut GuildSession,
    policy: &mut dyn PlayerPolicy,
    stats: &mut RunStats,
) -> Result<()> {
    for card in enhancements_in_hand(session, |e| matches!(e, EnhancementEffect::DraftBonus(_))) {
        attempt(stats, "play_enhancement", session.play_enhancement(&card));
    }

    let trips: Vec<String> = session
        .state()
        .deck
        .hand
        .iter()
        .filter(|id| {
            session
                .context()
                .master
                .card(id)
                .is_some_and(|card| card.is_gathering())
        })
        .cloned()
        .collect();

    for card in trips {
        if session.is_ended() {
            break;
        }
        if session.state().player.action_points == 0
            && let Some(tonic) = enhancements_in_hand(session, |e| {
                matches!(e, EnhancementEffect::RestoreAp(_))
            })
            .first()
        {
            attempt(stats, "play_enhancement", session.play_enhancement(tonic));
        }
        if attempt(stats, "start_gathering", session.start_gathering(&card)).is_none() {
            continue;
        }
        while let Some(draft) = session.state().game.draft.clone() {
            let choice = policy.pick_draft(session.context(), session.state(), &draft);
            if attempt(stats, "pick_draft", session.pick_draft(choice)).is_none() {
                session
                    .finish_gathering()
                    .with_context(|| format!("could not close the draft for {card}"))?;
            }
        }
    }
    Ok(())
}

fn brew(session: &mut GuildSession, policy: &mut dyn PlayerPolicy, stats: &mut RunStats) {
    let recipes: Vec<String> = session
        .state()
        .deck
        .hand
        .iter()
        .filter(|id| {
            session
                .context()
                .master
                .card(id)
                .is_some_and(|card| card.is_recipe())
        })
        .cloned()
        .collect();

    for card in recipes {
        let selection = {
            let ctx = session.context();
            let state = session.state();
            let Some(recipe) = ctx
                .master
                .card(&card)
                .and_then(|c| c.recipe_id())
                .and_then(|id| ctx.master.recipe(id))
            else {
                continue;
            };
            if !policy.wants_craft(ctx, state, recipe) {
                continue;
            }
            auto_select(&ctx.master, recipe, &state.inventory)
        };
        let Some(selection) = selection else {
            continue;
        };
        if session.state().game.quality_boost == 0
            && let Some(boost) = enhancements_in_hand(session, |e| {
                matches!(e, EnhancementEffect::QualityBoost(_))
            })
            .first()
        {
            attempt(stats, "play_enhancement", session.play_enhancement(boost));
        }
        attempt(stats, "craft", session.craft(&card, &selection));
    }
}

fn deliver(session: &mut GuildSession, policy: &mut dyn PlayerPolicy, stats: &mut RunStats) {
    let active: Vec<String> = session
        .state()
        .quest
        .active
        .iter()
        .map(|q| q.quest.id.clone())
        .collect();
    for quest_id in active {
        let item = {
            let state = session.state();
            state
                .quest
                .active_quest(&quest_id)
                .and_then(|q| policy.choose_delivery(session.context(), state, &q.quest))
        };
        if let Some(item) = item {
            attempt(stats, "deliver_item", session.deliver_item(&quest_id, item));
        }
    }
}

fn promote(session: &mut GuildSession, policy: &mut dyn PlayerPolicy, stats: &mut RunStats) {
    if session.is_ended() || session.state().player.rank.is_top() {
        return;
    }
    if !session.state().game.is_in_promotion_test {
        let ready = session
            .context()
            .master
            .rank_rule(session.state().player.rank)
            .is_some_and(|rule| session.state().player.promotion_gauge >= rule.gauge_required);
        if !ready || !policy.should_start_promotion(session.context(), session.state()) {
            return;
        }
        if attempt(stats, "start_promotion_test", session.start_promotion_test()).is_none() {
            return;
        }
    }
    attempt(stats, "judge_promotion_test", session.judge_promotion_test());
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_game::RunOutcome;

    fn play(strategy: GameplayStrategy, seed: u64, max_days: u32) -> RunRecord {
        let session = new_session(&GameConfig::default(), None, "unused", seed).unwrap();
        simulate(
            session,
            &SimulationConfig::new(strategy, seed).with_max_days(max_days),
        )
    }

    #[test]
    fn every_strategy_completes_without_errors() {
        for strategy in GameplayStrategy::ALL {
            let record = play(strategy, 1337, 60);
            assert!(record.passed(), "{strategy}: {:?}", record.error);
            let summary = record.summary.unwrap();
            assert!(summary.days >= 1);
            assert!(record.stats.actions > 0);
        }
    }

    #[test]
    fn runs_are_deterministic_per_seed_and_strategy() {
        for strategy in GameplayStrategy::ALL {
            let a = play(strategy, 42, 40);
            let b = play(strategy, 42, 40);
            assert_eq!(a.summary, b.summary);
            assert_eq!(a.stats, b.stats);
        }
    }

    #[test]
    fn day_cap_stops_unfinished_runs() {
        let record = play(GameplayStrategy::Cautious, 9, 2);
        let summary = record.summary.unwrap();
        if summary.outcome == RunOutcome::InProgress {
            assert!(summary.days <= 3);
        }
    }

    #[test]
    fn long_runs_reach_a_terminal_state() {
        let record = play(GameplayStrategy::Greedy, 7, 2_000);
        assert!(record.passed());
        assert_ne!(record.summary.unwrap().outcome, RunOutcome::InProgress);
    }

    #[test]
    fn panic_messages_are_extracted() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn slots_are_named_after_strategy_and_seed() {
        assert_eq!(run_slot(GameplayStrategy::Greedy, 12), "greedy-12");
    }
}
