//! Generation-tagged breaker state.
//!
//! # Layout
//! ```text
//!  63                                   2 1   0
//! ┌──────────────────────────────────────┬─────┐
//! │              generation              │state│
//! └──────────────────────────────────────┴─────┘
//! ```
//!
//! # Design Decisions
//! - One word so readers get generation and state from a single atomic load
//! - Every state change bumps the generation; within a generation the state is fixed
//! - The all-zero word (generation 0, `Unknown`) means "breaker disabled"

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const STATE_BITS: u32 = 2;
const STATE_MASK: u64 = (1 << STATE_BITS) - 1;

/// Breaker state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// No owning control loop; calls bypass the breaker.
    Unknown = 0,
    /// Calls pass through, relevant failures are counted.
    Closed = 1,
    /// Probing: calls pass through, failures and successes are counted.
    HalfOpen = 2,
    /// Calls are shed without being executed.
    Open = 3,
}

impl State {
    /// Stable lowercase name, used as a metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Unknown => "unknown",
            State::Closed => "closed",
            State::HalfOpen => "half_open",
            State::Open => "open",
        }
    }
}

impl From<u64> for State {
    fn from(val: u64) -> Self {
        match val & STATE_MASK {
            1 => State::Closed,
            2 => State::HalfOpen,
            3 => State::Open,
            _ => State::Unknown,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A packed (generation, state) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenState(u64);

impl GenState {
    /// Sentinel for a breaker whose control loop is gone.
    pub const DISABLED: GenState = GenState(0);

    /// Initial value of every freshly built breaker.
    pub const INITIAL: GenState = GenState(State::Closed as u64);

    /// Pack a generation and a state.
    pub fn new(generation: u64, state: State) -> Self {
        Self(generation << STATE_BITS | state as u64)
    }

    pub fn generation(&self) -> u64 {
        self.0 >> STATE_BITS
    }

    pub fn state(&self) -> State {
        State::from(self.0)
    }

    pub fn is_disabled(&self) -> bool {
        *self == Self::DISABLED
    }

    /// The successor of this value carrying `state`.
    ///
    /// The generation wraps after 2^62 transitions.
    pub fn next(&self, state: State) -> Self {
        Self::new(self.generation().wrapping_add(1), state)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub(crate) fn as_fail(&self) -> Outcome {
        Outcome {
            generation: self.generation(),
            pass: false,
        }
    }

    pub(crate) fn as_pass(&self) -> Outcome {
        Outcome {
            generation: self.generation(),
            pass: true,
        }
    }
}

impl fmt::Display for GenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.generation(), self.state())
    }
}

/// A call outcome tagged with the generation it was observed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Outcome {
    pub(crate) generation: u64,
    pub(crate) pass: bool,
}

/// Lock-free cell holding a breaker's current [`GenState`].
///
/// Written only by the owning control loop; read by any caller.
#[derive(Debug)]
pub(crate) struct GenStateCell(AtomicU64);

impl GenStateCell {
    pub(crate) fn new(initial: GenState) -> Self {
        Self(AtomicU64::new(initial.0))
    }

    pub(crate) fn load(&self) -> GenState {
        GenState(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, value: GenState) {
        self.0.store(value.0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_generation_and_state() {
        let gs = GenState::new(41, State::HalfOpen);
        assert_eq!(gs.generation(), 41);
        assert_eq!(gs.state(), State::HalfOpen);
        assert_eq!(gs.to_string(), "41|half_open");
    }

    #[test]
    fn next_bumps_generation() {
        let gs = GenState::INITIAL;
        assert_eq!(gs.generation(), 0);
        assert_eq!(gs.state(), State::Closed);
        assert!(!gs.is_disabled());

        let open = gs.next(State::Open);
        assert_eq!(open.generation(), 1);
        assert_eq!(open.state(), State::Open);
        assert_eq!(open.next(State::HalfOpen).generation(), 2);
    }

    #[test]
    fn disabled_is_zero() {
        assert!(GenState::DISABLED.is_disabled());
        assert_eq!(GenState::DISABLED.state(), State::Unknown);
        assert!(!GenState::new(0, State::Open).is_disabled());
    }

    #[test]
    fn outcomes_carry_generation() {
        let gs = GenState::new(7, State::Closed);
        assert_eq!(gs.as_fail(), Outcome { generation: 7, pass: false });
        assert_eq!(gs.as_pass(), Outcome { generation: 7, pass: true });
    }

    #[test]
    fn cell_round_trips() {
        let cell = GenStateCell::new(GenState::INITIAL);
        let next = GenState::INITIAL.next(State::Open);
        cell.store(next);
        assert_eq!(cell.load(), next);
    }
}
