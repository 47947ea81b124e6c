//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() / owner dropped → every ShutdownSignal fires
//!     → control loops force their breaker to DISABLED and exit
//!
//! Tracking (tracker.rs):
//!     control loop start → LoopGuard held → dropped on exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → caller triggers shutdown
//! ```
//!
//! # Design Decisions
//! - The signal latches: breakers created after shutdown see it immediately
//! - After shutdown every breaker is a pass-through

pub mod shutdown;
pub mod signals;
pub mod tracker;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use tracker::LoopTracker;
