//! Call interception.
//!
//! [`BreakerLayer`] plugs a [`BreakerSet`](crate::BreakerSet) into any tower
//! stack whose requests implement [`CallTarget`]. Each request is resolved to
//! its breaker by method name, then shed or forwarded.

pub mod layer;
pub mod request;

pub use layer::{BreakerLayer, BreakerService};
pub use request::{CallTarget, RpcRequest};
