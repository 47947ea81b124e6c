//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Turn the breaker event stream into log lines
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - The event logger never slows breakers down; if it lags it skips events

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::lifecycle::ShutdownSignal;
use crate::observability::events::Event;

/// Install a global subscriber filtered at `level`.
pub fn init(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("rpc_breaker={level},breaker_sim={level}").into());

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("tracing subscriber already installed: {e}");
    }
}

/// Log transitions and sheds from `events` until `shutdown` fires.
pub fn spawn_event_logger(
    mut events: broadcast::Receiver<Event>,
    mut shutdown: ShutdownSignal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                ev = events.recv() => match ev {
                    Ok(Event::State(ev)) if ev.is_transition() => {
                        tracing::info!(
                            key = %ev.key,
                            from = %ev.old.state(),
                            to = %ev.new.state(),
                            failures = ev.failures,
                            successes = ev.successes,
                            "Breaker transitioned"
                        );
                    }
                    Ok(Event::State(_)) => {}
                    Ok(Event::Shed(ev)) => {
                        tracing::debug!(key = %ev.key, state = %ev.state, "Breaker shed a call");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Event logger lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = shutdown.recv() => break,
            }
        }
        tracing::debug!("Event logger stopped");
    })
}
