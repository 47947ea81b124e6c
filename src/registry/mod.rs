//! Breaker registry subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     options.rs layers (global, services, methods)
//!     → cache.rs builds the breaker tree, starts one loop per breaker
//!
//! Per call:
//!     set.rs BreakerSet::resolve(method, call site)
//!     → cache.rs method / service / global lookup, lazy call-site breakers
//!     → Breaker::call
//! ```
//!
//! # Design Decisions
//! - Explicitly owned set, no process-wide singleton
//! - Unconfigured methods share their service's (or the global) breaker
//! - Call-site breakers are always created lazily, never at startup

pub(crate) mod cache;
pub mod key;
pub mod options;
pub mod set;

pub use key::{Key, Scope, SEPARATOR};
pub use options::{CallSite, OptionSet};
pub use set::{BreakerSet, BreakerSetBuilder};
