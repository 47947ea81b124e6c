//! Breaker-originated errors.

use thiserror::Error;
use tower::BoxError;

/// Errors produced by the breaker itself rather than the wrapped call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BreakerError {
    /// The call was shed without being executed.
    #[error("breaker open")]
    Open,

    /// The breaker has been disabled and cannot start.
    #[error("breaker stopped")]
    Stopped,
}

impl BreakerError {
    /// Return true if `err` is the breaker shedding a call.
    pub fn is_open(err: &BoxError) -> bool {
        err.downcast_ref::<BreakerError>() == Some(&BreakerError::Open)
    }

    /// Return true if `err` is a stopped breaker.
    pub fn is_stopped(err: &BoxError) -> bool {
        err.downcast_ref::<BreakerError>() == Some(&BreakerError::Stopped)
    }
}
