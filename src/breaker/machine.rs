//! The breaker state machine.
//!
//! # State Transitions
//! ```text
//! Closed   → Open:     failures >= fail_threshold (arms reset timer)
//! Open     → HalfOpen: reset timer fires
//! HalfOpen → Open:     failures >= fail_threshold (re-arms reset timer)
//! HalfOpen → Closed:   successes >= reset_threshold (failures reset)
//! any      → disabled: shutdown
//! ```
//!
//! # Design Decisions
//! - The control loop is the only writer of the counters, the timer and the GenState
//! - Callers only read the GenState and send generation-tagged outcomes
//! - Outcomes from a generation the loop has moved past are dropped
//! - Losing an outcome only delays a transition, so delivery is best-effort

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::time::Instant;
use tower::BoxError;

use crate::breaker::error::BreakerError;
use crate::breaker::settings::Settings;
use crate::breaker::state::{GenState, GenStateCell, Outcome, State};
use crate::lifecycle::{LoopTracker, ShutdownSignal};
use crate::observability::events::{Event, EventBus, ShedEvent, StateEvent};
use crate::observability::metrics;
use crate::registry::Key;

/// Collaborators shared by every breaker of a set.
#[derive(Debug, Clone)]
pub(crate) struct Deps {
    pub(crate) shutdown: ShutdownSignal,
    pub(crate) events: EventBus,
    pub(crate) loops: LoopTracker,
}

/// One state machine governing shedding for one [`Key`].
#[derive(Debug)]
pub struct Breaker {
    key: Key,
    settings: Settings,
    gen_state: GenStateCell,
    outcomes: mpsc::Sender<Outcome>,
    deps: Deps,
}

/// The not-yet-started control loop of a [`Breaker`].
///
/// Dropping it without calling [`ControlLoop::spawn`] discards the loop; the
/// breaker then never leaves `Closed`.
#[derive(Debug)]
pub(crate) struct ControlLoop {
    breaker: Arc<Breaker>,
    inbox: mpsc::Receiver<Outcome>,
}

impl Breaker {
    /// Build a breaker and its control loop. Nothing runs until the loop is spawned.
    pub(crate) fn new(key: Key, settings: Settings, deps: Deps) -> (Arc<Self>, ControlLoop) {
        let (outcomes, inbox) = mpsc::channel(1);
        let breaker = Arc::new(Self {
            key,
            settings,
            gen_state: GenStateCell::new(GenState::INITIAL),
            outcomes,
            deps,
        });
        let control = ControlLoop {
            breaker: Arc::clone(&breaker),
            inbox,
        };
        (breaker, control)
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn gen_state(&self) -> GenState {
        self.gen_state.load()
    }

    pub fn state(&self) -> State {
        self.gen_state.load().state()
    }

    /// Run `invocation` under this breaker.
    ///
    /// Returns the invocation's own result, or [`BreakerError::Open`] without
    /// running it while the breaker is open. A disabled breaker always runs it.
    /// Dropping the returned future abandons any pending outcome report.
    pub async fn call<F, Fut, T, E>(&self, invocation: F) -> Result<T, BoxError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        let observed = self.gen_state.load();
        if observed.is_disabled() {
            return invocation().await.map_err(Into::into);
        }

        let state = observed.state();
        if state == State::Open {
            self.deps.events.publish(Event::Shed(ShedEvent {
                key: self.key.clone(),
                published: SystemTime::now(),
                state: observed,
            }));
            metrics::record_shed(&self.key);
            tracing::trace!(key = %self.key, state = %observed, "Call shed");
            return Err(BreakerError::Open.into());
        }

        let result = invocation().await.map_err(Into::into);
        let outcome = match &result {
            Err(e) if self.settings.predicate.matches(&**e) => Some(observed.as_fail()),
            _ if state == State::HalfOpen => Some(observed.as_pass()),
            _ => None,
        };
        if let Some(outcome) = outcome {
            self.report(outcome).await;
        }
        result
    }

    async fn report(&self, outcome: Outcome) {
        let mut shutdown = self.deps.shutdown.clone();
        tokio::select! {
            res = self.outcomes.send(outcome) => {
                if res.is_err() {
                    tracing::trace!(key = %self.key, "Outcome dropped, control loop gone");
                }
            }
            _ = shutdown.recv() => {}
        }
    }
}

impl ControlLoop {
    /// Start the control loop on the current Tokio runtime.
    ///
    /// Fails with [`BreakerError::Stopped`] if shutdown already fired; the
    /// breaker is then disabled and passes every call through.
    pub(crate) fn spawn(self) -> Result<(), BreakerError> {
        if self.breaker.deps.shutdown.is_fired() {
            self.breaker.gen_state.store(GenState::DISABLED);
            return Err(BreakerError::Stopped);
        }

        let guard = self.breaker.deps.loops.track();
        tokio::spawn(async move {
            let _guard = guard;
            self.run().await;
        });
        Ok(())
    }

    async fn run(self) {
        let ControlLoop { breaker, mut inbox } = self;
        let mut shutdown = breaker.deps.shutdown.clone();
        let settings = &breaker.settings;

        let mut failures: u32 = 0;
        let mut successes: u32 = 0;
        let mut last_failure: Option<SystemTime> = None;
        let mut reset_at: Option<SystemTime> = None;

        let timer = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(timer);
        let mut armed = false;

        tracing::trace!(key = %breaker.key, "Control loop started");

        loop {
            let current = breaker.gen_state.load();
            let mut state = current.state();

            tokio::select! {
                biased;

                _ = shutdown.recv() => {
                    breaker.gen_state.store(GenState::DISABLED);
                    tracing::debug!(key = %breaker.key, "Control loop stopped");
                    return;
                }

                // the breaker owns the sender, so the inbox never closes while we run
                Some(outcome) = inbox.recv() => {
                    if outcome.generation != current.generation() {
                        tracing::trace!(
                            key = %breaker.key,
                            observed = outcome.generation,
                            current = current.generation(),
                            "Stale outcome dropped"
                        );
                        metrics::record_stale_outcome(&breaker.key);
                        continue;
                    }

                    if outcome.pass {
                        successes = successes.saturating_add(1);
                        if successes >= settings.reset_threshold {
                            // half open -> closed
                            failures = 0;
                            state = State::Closed;
                        }
                    } else {
                        failures = failures.saturating_add(1);
                        let now = SystemTime::now();
                        last_failure = Some(now);

                        if failures >= settings.fail_threshold {
                            // closed -> open, half open -> open
                            state = State::Open;

                            let deadline = settings
                                .reset_timeout
                                .and_then(|t| Some((Instant::now().checked_add(t)?, now.checked_add(t)?)));
                            if let Some((deadline, wall)) = deadline {
                                timer.as_mut().reset(deadline);
                                armed = true;
                                reset_at = Some(wall);
                            }
                        }
                    }
                }

                _ = &mut timer, if armed => {
                    armed = false;
                    if state != State::Open {
                        continue;
                    }
                    // open -> half open
                    reset_at = None;
                    successes = 0;
                    state = State::HalfOpen;
                }
            }

            let next = if state != current.state() {
                let next = current.next(state);
                breaker.gen_state.store(next);
                metrics::record_transition(&breaker.key, state);
                tracing::debug!(
                    key = %breaker.key,
                    from = %current,
                    to = %next,
                    failures,
                    successes,
                    "Breaker state changed"
                );
                next
            } else {
                current
            };

            breaker.deps.events.publish(Event::State(StateEvent {
                key: breaker.key.clone(),
                old: current,
                new: next,
                published: SystemTime::now(),
                last_failure,
                reset_at,
                failures,
                successes,
            }));
        }
    }
}
