//! Motion module for stepper-drive.
//!
//! Provides pulse-timing math and move outcome reporting.

mod outcome;
pub mod timing;

pub use outcome::{Direction, MoveOutcome, StopReason};
pub use timing::{angle_to_steps, duration_to_rpm, half_delay_us, step_delay_us};
