//! Per-endpoint circuit breaking for RPC clients.
//!
//! A [`BreakerSet`] holds one breaker per configured layer (global, service,
//! method) plus lazily created per-call-site breakers. Calls resolve to the
//! most specific breaker whose name prefixes the called method; an open
//! breaker sheds calls without running them.

// Core
pub mod breaker;
pub mod registry;

// Integration
pub mod config;
pub mod interceptor;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use breaker::{Breaker, BreakerError, GenState, Overrides, Predicate, Settings, State};
pub use config::BreakerConfig;
pub use interceptor::{BreakerLayer, BreakerService, CallTarget, RpcRequest};
pub use lifecycle::{Shutdown, ShutdownSignal};
pub use observability::Event;
pub use registry::{BreakerSet, BreakerSetBuilder, CallSite, Key, OptionSet, Scope};
