//! Shared utilities for integration tests.

use std::time::Duration;

use rpc_breaker::observability::StateEvent;
use rpc_breaker::{Breaker, Event, Key, State};
use tokio::sync::broadcast::{self, error::RecvError};

/// Upper bound on waiting for a control loop to react.
pub const WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
#[error("unavailable")]
pub struct Unavailable;

pub async fn fail() -> Result<(), Unavailable> {
    Err(Unavailable)
}

pub async fn succeed() -> Result<(), Unavailable> {
    Ok(())
}

/// Wait for the next state change, skipping shed events and counter updates.
pub async fn next_transition(events: &mut broadcast::Receiver<Event>) -> StateEvent {
    tokio::time::timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(Event::State(ev)) if ev.is_transition() => return ev,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event stream closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for a transition")
}

/// Assert the next transitions are exactly `expected`, all on `key`.
#[allow(dead_code)]
pub async fn assert_sequence(
    events: &mut broadcast::Receiver<Event>,
    key: &Key,
    expected: &[(State, State)],
) {
    for (i, (from, to)) in expected.iter().enumerate() {
        let ev = next_transition(events).await;
        assert_eq!(&ev.key, key, "transition {i}");
        assert_eq!(
            (ev.old.state(), ev.new.state()),
            (*from, *to),
            "transition {i}"
        );
    }
}

/// Spin until `breaker` reports `state`.
#[allow(dead_code)]
pub async fn wait_for_state(breaker: &Breaker, state: State) {
    tokio::time::timeout(WAIT, async {
        while breaker.state() != state {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("{} never reached {state}", breaker.key()));
}
