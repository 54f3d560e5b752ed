//! Position tracking for the stepper drive.
//!
//! The counter is written only while the gate is held, but it is read
//! lock-free by callers on other threads, so it is backed by an atomic.

use core::sync::atomic::{AtomicI64, Ordering};

use crate::config::units::{Degrees, Steps};

/// Absolute step counter relative to the last homed (or arbitrary
/// startup) zero.
///
/// The counter is best effort between homings: an emergency stop zeroes
/// it regardless of physical position.
#[derive(Debug)]
pub struct PositionCounter {
    /// Current position in steps (from origin).
    steps: AtomicI64,
    /// Steps per degree for conversions.
    steps_per_degree: f32,
}

impl PositionCounter {
    /// Create a new position counter at zero.
    pub fn new(steps_per_degree: f32) -> Self {
        Self {
            steps: AtomicI64::new(0),
            steps_per_degree,
        }
    }

    /// Get current position in steps.
    #[inline]
    pub fn steps(&self) -> Steps {
        Steps(self.steps.load(Ordering::Acquire))
    }

    /// Get current position in degrees.
    #[inline]
    pub fn degrees(&self) -> Degrees {
        self.steps().to_degrees(self.steps_per_degree)
    }

    /// Advance by a signed number of steps.
    #[inline]
    pub fn advance(&self, delta: i64) {
        self.steps.fetch_add(delta, Ordering::AcqRel);
    }

    /// Reset position to origin (0 steps).
    #[inline]
    pub fn reset(&self) {
        self.steps.store(0, Ordering::Release);
    }

    /// Get steps per degree conversion factor.
    #[inline]
    pub fn steps_per_degree(&self) -> f32 {
        self.steps_per_degree
    }
}
