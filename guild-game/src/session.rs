//! The explicit game store: one owner for the state, the rules it is played
//! under, the event bus and autosave.
use log::warn;

use crate::config::{AutoSaveConfig, AutoSaveTrigger};
use crate::error::GameError;
use crate::events::{EventBus, EventFilter, EventLog, GameEvent, SubscriptionId};
use crate::inventory::InstanceId;
use crate::result::RunSummary;
use crate::save::{SaveStorage, write_slot};
use crate::state::{DraftSession, GuildState, Phase};
use crate::usecases::{
    self, AdvanceDayOutcome, CraftOutcome, DeliveryOutcome, DraftChoice, DrawOutcome,
    GameContext, GatheringOutcome, JudgeOutcome, MaterialSelection, PhaseOutcome, PickOutcome,
    PlayOutcome, PurchaseOutcome,
};

/// Writes the autosave slot when a configured trigger fires.
pub struct AutoSaver {
    storage: Box<dyn SaveStorage>,
    config: AutoSaveConfig,
}

impl std::fmt::Debug for AutoSaver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoSaver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AutoSaver {
    #[must_use]
    pub fn new(storage: Box<dyn SaveStorage>, config: AutoSaveConfig) -> Self {
        Self { storage, config }
    }

    /// Save if `trigger` is enabled. Returns whether a save was written.
    ///
    /// # Errors
    ///
    /// Storage failures become [`GameError::SaveFailed`], with a
    /// `SaveFailed` event pushed to `log`.
    pub fn autosave(
        &self,
        state: &GuildState,
        log: &mut EventLog,
        trigger: AutoSaveTrigger,
    ) -> Result<bool, GameError> {
        if !self.config.fires_on(trigger) {
            return Ok(false);
        }
        match write_slot(self.storage.as_ref(), &self.config.slot, state) {
            Ok(()) => {
                log.push(GameEvent::AutoSaved {
                    trigger,
                    slot: self.config.slot.clone(),
                });
                Ok(true)
            }
            Err(err) => {
                let message = err.to_string();
                warn!("autosave ({}) failed: {message}", trigger.as_str());
                log.push(GameEvent::SaveFailed {
                    trigger,
                    message: message.clone(),
                });
                Err(GameError::SaveFailed(message))
            }
        }
    }
}

/// Owns a run and exposes one method per player action.
///
/// Events from an action are published only after it succeeds. Autosaves
/// triggered by an action never turn that action into a failure; they
/// publish `SaveFailed` instead.
#[derive(Debug)]
pub struct GuildSession {
    ctx: GameContext,
    state: GuildState,
    bus: EventBus,
    autosaver: Option<AutoSaver>,
}

impl GuildSession {
    /// Start a fresh run.
    #[must_use]
    pub fn new(ctx: GameContext, seed: u64) -> Self {
        let (state, _) = usecases::new_game(&ctx, seed);
        Self::from_state(ctx, state)
    }

    /// Resume a run from an existing state (usually a loaded save).
    #[must_use]
    pub fn from_state(ctx: GameContext, state: GuildState) -> Self {
        Self {
            ctx,
            state,
            bus: EventBus::new(),
            autosaver: None,
        }
    }

    /// Enable autosave into `storage` using the context's autosave config.
    #[must_use]
    pub fn with_autosave(mut self, storage: Box<dyn SaveStorage>) -> Self {
        self.autosaver = Some(AutoSaver::new(storage, self.ctx.config.autosave.clone()));
        self
    }

    #[must_use]
    pub const fn state(&self) -> &GuildState {
        &self.state
    }

    pub const fn state_mut(&mut self) -> &mut GuildState {
        &mut self.state
    }

    pub fn with_state_mut<R>(&mut self, f: impl FnOnce(&mut GuildState) -> R) -> R {
        f(&mut self.state)
    }

    #[must_use]
    pub const fn context(&self) -> &GameContext {
        &self.ctx
    }

    #[must_use]
    pub fn into_state(self) -> GuildState {
        self.state
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_state(&self.state)
    }

    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.state.game.is_ended()
    }

    pub fn subscribe(
        &mut self,
        filter: impl Into<EventFilter>,
        handler: impl FnMut(&GameEvent) + 'static,
    ) -> SubscriptionId {
        self.bus.subscribe(filter, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    fn run<T>(
        &mut self,
        action: impl FnOnce(&GameContext, &mut GuildState, &mut EventLog) -> Result<T, GameError>,
    ) -> Result<(T, EventLog), GameError> {
        let mut log = EventLog::new();
        let out = action(&self.ctx, &mut self.state, &mut log)?;
        Ok((out, log))
    }

    fn finish(&mut self, mut log: EventLog, triggers: &[AutoSaveTrigger]) {
        if let Some(saver) = &self.autosaver {
            for trigger in triggers {
                // Failure is already in the log as a SaveFailed event.
                let _ = saver.autosave(&self.state, &mut log, *trigger);
            }
        }
        self.bus.publish_all(&mut log);
    }

    fn call<T>(
        &mut self,
        action: impl FnOnce(&GameContext, &mut GuildState, &mut EventLog) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let (out, log) = self.run(action)?;
        self.finish(log, &[]);
        Ok(out)
    }

    /// # Errors
    ///
    /// See [`usecases::accept_quest`].
    pub fn accept_quest(&mut self, quest_id: &str) -> Result<(), GameError> {
        self.call(|ctx, state, log| usecases::accept_quest(ctx, state, log, quest_id))
    }

    /// # Errors
    ///
    /// See [`usecases::deliver_item`].
    pub fn deliver_item(
        &mut self,
        quest_id: &str,
        item: InstanceId,
    ) -> Result<DeliveryOutcome, GameError> {
        let (out, log) =
            self.run(|ctx, state, log| usecases::deliver_item(ctx, state, log, quest_id, item))?;
        self.finish(log, &[AutoSaveTrigger::QuestComplete]);
        Ok(out)
    }

    /// # Errors
    ///
    /// See [`usecases::transition_phase`].
    pub fn transition_phase(&mut self, target: Phase) -> Result<PhaseOutcome, GameError> {
        let (out, log) =
            self.run(|ctx, state, log| usecases::transition_phase(ctx, state, log, target))?;
        let triggers: &[AutoSaveTrigger] = if out.day.is_some() {
            &[AutoSaveTrigger::PhaseChange, AutoSaveTrigger::DayEnd]
        } else {
            &[AutoSaveTrigger::PhaseChange]
        };
        self.finish(log, triggers);
        Ok(out)
    }

    /// Move to whatever phase comes next.
    ///
    /// # Errors
    ///
    /// See [`usecases::transition_phase`].
    pub fn next_phase(&mut self) -> Result<PhaseOutcome, GameError> {
        let target = self.state.game.phase.next();
        self.transition_phase(target)
    }

    /// Close the delivery phase and start the next day.
    ///
    /// # Errors
    ///
    /// See [`usecases::advance_day`].
    pub fn advance_day(&mut self) -> Result<AdvanceDayOutcome, GameError> {
        let (out, log) = self.run(usecases::advance_day)?;
        self.finish(log, &[AutoSaveTrigger::PhaseChange, AutoSaveTrigger::DayEnd]);
        Ok(out)
    }

    /// # Errors
    ///
    /// See [`usecases::start_gathering`].
    pub fn start_gathering(&mut self, card_id: &str) -> Result<DraftSession, GameError> {
        self.call(|ctx, state, log| usecases::start_gathering(ctx, state, log, card_id))
    }

    /// # Errors
    ///
    /// See [`usecases::pick_draft`].
    pub fn pick_draft(&mut self, choice: DraftChoice) -> Result<PickOutcome, GameError> {
        self.call(|ctx, state, log| usecases::pick_draft(ctx, state, log, choice))
    }

    /// # Errors
    ///
    /// See [`usecases::finish_gathering`].
    pub fn finish_gathering(&mut self) -> Result<GatheringOutcome, GameError> {
        self.call(usecases::finish_gathering)
    }

    /// # Errors
    ///
    /// See [`usecases::craft`].
    pub fn craft(
        &mut self,
        card_id: &str,
        selections: &[MaterialSelection],
    ) -> Result<CraftOutcome, GameError> {
        self.call(|ctx, state, log| usecases::craft(ctx, state, log, card_id, selections))
    }

    /// # Errors
    ///
    /// See [`usecases::purchase_item`].
    pub fn purchase_item(&mut self, entry_id: &str) -> Result<PurchaseOutcome, GameError> {
        self.call(|ctx, state, log| usecases::purchase_item(ctx, state, log, entry_id))
    }

    /// # Errors
    ///
    /// See [`usecases::play_enhancement`].
    pub fn play_enhancement(&mut self, card_id: &str) -> Result<PlayOutcome, GameError> {
        self.call(|ctx, state, log| usecases::play_enhancement(ctx, state, log, card_id))
    }

    /// # Errors
    ///
    /// See [`usecases::draw_hand`].
    pub fn draw_hand(&mut self) -> Result<DrawOutcome, GameError> {
        self.call(usecases::draw_hand)
    }

    /// # Errors
    ///
    /// See [`usecases::start_promotion_test`].
    pub fn start_promotion_test(&mut self) -> Result<i32, GameError> {
        self.call(usecases::start_promotion_test)
    }

    /// # Errors
    ///
    /// See [`usecases::judge_promotion_test`].
    pub fn judge_promotion_test(&mut self) -> Result<JudgeOutcome, GameError> {
        let (out, log) = self.run(usecases::judge_promotion_test)?;
        self.finish(log, &[AutoSaveTrigger::RankUp]);
        Ok(out)
    }

    /// Write the autosave slot now, regardless of trigger settings. Works
    /// after the game has ended.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SaveFailed`] when no storage is attached or the
    /// write fails.
    pub fn save_now(&mut self) -> Result<(), GameError> {
        let Some(saver) = &self.autosaver else {
            return Err(GameError::SaveFailed("no save storage attached".to_string()));
        };
        let mut log = EventLog::new();
        let result = saver.autosave(&self.state, &mut log, AutoSaveTrigger::Manual);
        self.bus.publish_all(&mut log);
        result.map(|_| ())
    }
}
