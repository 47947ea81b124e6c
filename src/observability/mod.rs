//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breakers produce:
//!     → events.rs (state and shed events on a broadcast stream)
//!     → metrics.rs (counters, gauges)
//!     → tracing macros (structured log lines)
//!
//! Consumers:
//!     → logging.rs event logger (stdout via tracing-subscriber)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Any caller holding a `broadcast::Receiver<Event>`
//! ```
//!
//! # Design Decisions
//! - Consumers can never exert backpressure on breakers
//! - Metrics are cheap (atomic increments behind the facade)

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{Event, EventBus, ShedEvent, StateEvent};
