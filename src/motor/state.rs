//! Motion state tracking.
//!
//! The state is shared between the thread executing a move and any thread
//! querying the motor, so it lives in an atomic cell rather than a
//! type-state parameter.

use core::sync::atomic::{AtomicU8, Ordering};

/// What the drive is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    /// No motion in progress; initial and terminal between requests.
    Idle,
    /// A pulse train is executing.
    Moving,
    /// The homing routine is executing.
    Homing,
}

impl MotionState {
    /// State name for display/debugging.
    pub fn name(self) -> &'static str {
        match self {
            MotionState::Idle => "Idle",
            MotionState::Moving => "Moving",
            MotionState::Homing => "Homing",
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            MotionState::Idle => 0,
            MotionState::Moving => 1,
            MotionState::Homing => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => MotionState::Moving,
            2 => MotionState::Homing,
            _ => MotionState::Idle,
        }
    }
}

/// Lock-free cell holding the current [`MotionState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(MotionState::Idle.as_u8()))
    }

    pub(crate) fn set(&self, state: MotionState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn get(&self) -> MotionState {
        MotionState::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Guard that restores the state to `Idle` on every exit path, including
/// early returns on pin failures.
pub(crate) struct StateGuard<'a>(&'a StateCell);

impl<'a> StateGuard<'a> {
    pub(crate) fn enter(cell: &'a StateCell, state: MotionState) -> Self {
        cell.set(state);
        Self(cell)
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        self.0.set(MotionState::Idle);
    }
}
