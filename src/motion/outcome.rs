//! Move outcome reporting.
//!
//! A pulse train can end short of its target when a limit sensor trips or
//! a stop is requested. Instead of leaving callers to diff the position
//! counter, every move reports what actually happened.

/// Direction of motor travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Toward the lower limit sensor (negative step count).
    Backward,
    /// Toward the upper limit sensor (positive step count).
    Forward,
}

impl Direction {
    /// Get the sign applied to the position counter per pulse.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }

    /// Get direction from a signed step count.
    #[inline]
    pub fn from_steps(steps: i64) -> Self {
        if steps >= 0 {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }
}

/// Why a pulse train stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// All requested pulses were issued.
    Completed,
    /// The limit sensor on the direction of travel tripped.
    LimitTriggered,
    /// A stop or emergency stop aborted the move.
    Cancelled,
}

/// Result of a completed or interrupted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Pulses requested.
    pub requested: u32,
    /// Pulses actually issued.
    pub actual: u32,
    /// Why the pulse train ended.
    pub reason: StopReason,
}

impl MoveOutcome {
    /// Whether every requested pulse was issued.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.reason == StopReason::Completed
    }

    /// Pulses that were requested but never issued.
    #[inline]
    pub fn shortfall(&self) -> u32 {
        self.requested.saturating_sub(self.actual)
    }
}
