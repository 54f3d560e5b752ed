//! Configuration module for stepper-drive.
//!
//! Provides types for loading and validating motor configurations from
//! TOML files or pre-parsed data.

mod geometry;
mod loader;
mod motor;
mod system;
pub mod units;
mod validation;

pub use geometry::DriveGeometry;
pub use loader::{load_config, parse_config};
pub use motor::{LimitPolarity, MotorConfig};
pub use system::SystemConfig;
pub use validation::{validate_config, validate_motor};

// Re-export unit types at config level
pub use units::{Degrees, Microsteps, Rpm, RpmPerSec, Steps};
