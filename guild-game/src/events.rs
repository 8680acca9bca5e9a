//! Domain events and the synchronous bus that fans them out.
//!
//! Use cases never talk to the bus directly. They push into an [`EventLog`]
//! and the session publishes the log once the use case has succeeded, so a
//! failed action never leaks events.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::AutoSaveTrigger;
use crate::inventory::InstanceId;
use crate::quality::Quality;
use crate::rank::GuildRank;
use crate::reward::Reward;
use crate::state::{GameOverReason, Phase};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    PhaseChanged {
        from: Phase,
        to: Phase,
        day: u32,
    },
    DayAdvanced {
        day: u32,
    },
    QuestBoardRefreshed {
        quest_ids: Vec<String>,
    },
    QuestAccepted {
        quest_id: String,
    },
    QuestCompleted {
        quest_id: String,
        item: InstanceId,
        reward: Reward,
    },
    QuestExpired {
        quest_id: String,
        penalty: i64,
    },
    HandDrawn {
        cards: Vec<String>,
    },
    CardPlayed {
        card_id: String,
    },
    GatheringStarted {
        location_id: String,
        rounds: u32,
    },
    MaterialsGathered {
        location_id: String,
        gathered: Vec<(String, Quality, u32)>,
        discarded: u32,
    },
    ItemCrafted {
        item_id: String,
        instance: InstanceId,
        quality: Quality,
    },
    ItemPurchased {
        entry_id: String,
        price: i64,
    },
    PromotionTestStarted {
        rank: GuildRank,
        days: i32,
    },
    RankUp {
        from: GuildRank,
        to: GuildRank,
    },
    GameOver {
        reason: GameOverReason,
        day: u32,
    },
    GameClear {
        day: u32,
    },
    AutoSaved {
        trigger: AutoSaveTrigger,
        slot: String,
    },
    SaveFailed {
        trigger: AutoSaveTrigger,
        message: String,
    },
}

/// Payload-free discriminant of [`GameEvent`], used for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEventType {
    PhaseChanged,
    DayAdvanced,
    QuestBoardRefreshed,
    QuestAccepted,
    QuestCompleted,
    QuestExpired,
    HandDrawn,
    CardPlayed,
    GatheringStarted,
    MaterialsGathered,
    ItemCrafted,
    ItemPurchased,
    PromotionTestStarted,
    RankUp,
    GameOver,
    GameClear,
    AutoSaved,
    SaveFailed,
}

impl GameEvent {
    #[must_use]
    pub const fn event_type(&self) -> GameEventType {
        match self {
            Self::PhaseChanged { .. } => GameEventType::PhaseChanged,
            Self::DayAdvanced { .. } => GameEventType::DayAdvanced,
            Self::QuestBoardRefreshed { .. } => GameEventType::QuestBoardRefreshed,
            Self::QuestAccepted { .. } => GameEventType::QuestAccepted,
            Self::QuestCompleted { .. } => GameEventType::QuestCompleted,
            Self::QuestExpired { .. } => GameEventType::QuestExpired,
            Self::HandDrawn { .. } => GameEventType::HandDrawn,
            Self::CardPlayed { .. } => GameEventType::CardPlayed,
            Self::GatheringStarted { .. } => GameEventType::GatheringStarted,
            Self::MaterialsGathered { .. } => GameEventType::MaterialsGathered,
            Self::ItemCrafted { .. } => GameEventType::ItemCrafted,
            Self::ItemPurchased { .. } => GameEventType::ItemPurchased,
            Self::PromotionTestStarted { .. } => GameEventType::PromotionTestStarted,
            Self::RankUp { .. } => GameEventType::RankUp,
            Self::GameOver { .. } => GameEventType::GameOver,
            Self::GameClear { .. } => GameEventType::GameClear,
            Self::AutoSaved { .. } => GameEventType::AutoSaved,
            Self::SaveFailed { .. } => GameEventType::SaveFailed,
        }
    }
}

/// Events produced by one use case, in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    events: Vec<GameEvent>,
}

impl EventLog {
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.events.iter()
    }

    #[must_use]
    pub fn contains(&self, kind: GameEventType) -> bool {
        self.events.iter().any(|e| e.event_type() == kind)
    }

    pub fn drain(&mut self) -> impl Iterator<Item = GameEvent> + '_ {
        self.events.drain(..)
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Which events a subscriber wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    All,
    Only(GameEventType),
}

impl EventFilter {
    fn accepts(self, kind: GameEventType) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == kind,
        }
    }
}

impl From<GameEventType> for EventFilter {
    fn from(kind: GameEventType) -> Self {
        Self::Only(kind)
    }
}

type Handler = Box<dyn FnMut(&GameEvent)>;

struct Subscriber {
    id: SubscriptionId,
    filter: EventFilter,
    handler: Handler,
}

/// Synchronous publish/subscribe. Handlers run in subscription order.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        filter: impl Into<EventFilter>,
        handler: impl FnMut(&GameEvent) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            filter: filter.into(),
            handler: Box::new(handler),
        });
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Deliver `event` to every matching handler; returns how many ran.
    pub fn publish(&mut self, event: &GameEvent) -> usize {
        let kind = event.event_type();
        let mut delivered = 0;
        for subscriber in &mut self.subscribers {
            if subscriber.filter.accepts(kind) {
                (subscriber.handler)(event);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn publish_all(&mut self, log: &mut EventLog) {
        for event in log.drain() {
            self.publish(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn day(n: u32) -> GameEvent {
        GameEvent::DayAdvanced { day: n }
    }

    #[test]
    fn handlers_run_in_subscription_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for label in ["first", "second"] {
            let seen = Rc::clone(&seen);
            bus.subscribe(EventFilter::All, move |_| seen.borrow_mut().push(label));
        }
        assert_eq!(bus.publish(&day(2)), 2);
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn typed_subscription_filters_events() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();
        let c = Rc::clone(&count);
        bus.subscribe(GameEventType::GameClear, move |_| *c.borrow_mut() += 1);
        bus.publish(&day(2));
        bus.publish(&GameEvent::GameClear { day: 9 });
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let id = bus.subscribe(EventFilter::All, |_| {});
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.publish(&day(3)), 0);
    }

    #[test]
    fn publish_all_drains_the_log() {
        let mut log = EventLog::new();
        log.push(day(2));
        log.push(GameEvent::CardPlayed {
            card_id: "enh_tonic".into(),
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        let s = Rc::clone(&seen);
        bus.subscribe(EventFilter::All, move |e| s.borrow_mut().push(e.event_type()));
        bus.publish_all(&mut log);
        assert!(log.is_empty());
        assert_eq!(
            *seen.borrow(),
            vec![GameEventType::DayAdvanced, GameEventType::CardPlayed]
        );
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(GameEvent::QuestAccepted {
            quest_id: "q_herbs#1".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "quest_accepted");
        assert_eq!(json["quest_id"], "q_herbs#1");
    }
}
