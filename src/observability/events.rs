//! Breaker observability events.
//!
//! # Design Decisions
//! - Publishing never blocks: no subscriber or a lagging subscriber just loses events
//! - State events are published for every applied outcome, not only transitions

use std::time::SystemTime;
use tokio::sync::broadcast;

use crate::breaker::GenState;
use crate::registry::Key;

/// Default capacity of the event stream.
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Published by a control loop after it applies an outcome or a reset.
#[derive(Debug, Clone)]
pub struct StateEvent {
    pub key: Key,
    pub old: GenState,
    pub new: GenState,
    pub published: SystemTime,
    pub last_failure: Option<SystemTime>,
    pub reset_at: Option<SystemTime>,
    pub failures: u32,
    pub successes: u32,
}

impl StateEvent {
    /// True if this event represents a state transition.
    pub fn is_transition(&self) -> bool {
        self.old != self.new
    }
}

/// Published when a call is shed.
#[derive(Debug, Clone)]
pub struct ShedEvent {
    pub key: Key,
    pub published: SystemTime,
    pub state: GenState,
}

#[derive(Debug, Clone)]
pub enum Event {
    State(StateEvent),
    Shed(ShedEvent),
}

impl Event {
    pub fn key(&self) -> &Key {
        match self {
            Event::State(ev) => &ev.key,
            Event::Shed(ev) => &ev.key,
        }
    }
}

/// Best-effort fan-out of breaker events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Publish without waiting. Dropped if nobody listens.
    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
