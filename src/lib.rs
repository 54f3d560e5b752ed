//! # stepper-drive
//!
//! GPIO stepper motor drive with limit-sensor homing and thread-safe
//! motion dispatch, built on embedded-hal 1.0 pin traits.
//!
//! ## Features
//!
//! - **Configuration-driven**: Define motors in TOML files
//! - **embedded-hal 1.0**: `OutputPin` for STEP/DIR/ENABLE, `InputPin`
//!   for the two end-of-travel sensors, `DelayNs` for timing
//! - **Serialized motion**: one mutex gates all five GPIO lines, so
//!   moves from any thread never interleave pulses
//! - **Non-blocking dispatch**: spawn a move on a detached thread with a
//!   completion callback
//! - **Limit-aware pulse engine**: the sensor on the direction of travel
//!   is checked before every pulse; early stops are reported in an
//!   explicit [`MoveOutcome`] instead of silently
//! - **Homing and calibration**: seek the lower sensor to define zero,
//!   bounded by a configurable step budget
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stepper_drive::{Direction, StepperMotor};
//!
//! // Load configuration from TOML
//! let config = stepper_drive::load_config("drive.toml")?;
//!
//! // Create the drive with embedded-hal pins
//! let motor = StepperMotor::builder()
//!     .from_config(&config, "valve")?
//!     .step_pin(step)
//!     .dir_pin(dir)
//!     .enable_pin(enable)
//!     .lower_limit(lower)
//!     .upper_limit(upper)
//!     .delay(delay)
//!     .build()?;
//!
//! motor.home()?;
//! let outcome = motor.move_steps(400, Direction::Forward)?;
//! assert!(outcome.is_complete());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary with heapless strings in variants
#![allow(clippy::result_large_err)]

// Core modules
pub mod config;
pub mod error;
pub mod motion;
pub mod motor;

// Re-exports for ergonomic API
pub use config::{load_config, parse_config, validate_config};
pub use config::{DriveGeometry, LimitPolarity, MotorConfig, SystemConfig};
pub use error::{Error, Result};
pub use motion::{Direction, MoveOutcome, StopReason};
pub use motor::{MotionState, StepperMotor, StepperMotorBuilder};

// Unit types
pub use config::units::{Degrees, Microsteps, Rpm, RpmPerSec, Steps};
