//! Breaker subsystem.
//!
//! # Data Flow
//! ```text
//! Caller:
//!     → machine.rs Breaker::call (lock-free GenState read)
//!     → Open? shed with BreakerError::Open
//!     → otherwise run the invocation, report a generation-tagged outcome
//!
//! Control loop (one task per breaker):
//!     outcome / reset timer / shutdown
//!     → settings.rs thresholds decide the next state
//!     → state.rs GenState bumped on every transition
//!     → observability events published best-effort
//! ```

pub mod error;
pub mod machine;
pub mod settings;
pub mod state;

pub use error::BreakerError;
pub use machine::Breaker;
pub use settings::{ErrorRef, Overrides, Predicate, Settings};
pub use state::{GenState, State};
