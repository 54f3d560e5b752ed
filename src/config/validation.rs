//! Configuration validation.

use crate::error::{ConfigError, Error, Result};

use super::{MotorConfig, SystemConfig};

/// Validate a system configuration.
///
/// Checks every parameter that later ends up in a divisor of the timing
/// formula, so motion code never has to re-check:
/// - steps per revolution and microsteps are positive
/// - speed and acceleration are finite and positive
/// - homing budget and travel range are non-zero
pub fn validate_config(config: &SystemConfig) -> Result<()> {
    for (name, motor) in config.motors.iter() {
        validate_motor(name.as_str(), motor)?;
    }

    Ok(())
}

/// Validate a single motor configuration.
pub fn validate_motor(_name: &str, config: &MotorConfig) -> Result<()> {
    if config.steps_per_revolution == 0 {
        return Err(Error::Config(ConfigError::InvalidStepsPerRevolution(
            config.steps_per_revolution,
        )));
    }

    // Microsteps is validated at deserialization; the product still has
    // to fit the guard because a caller can construct MotorConfig directly.
    if config.total_steps_per_revolution() == 0 {
        return Err(Error::Config(ConfigError::InvalidStepsPerRevolution(
            config.steps_per_revolution,
        )));
    }

    if !config.speed.is_valid() {
        return Err(Error::Config(ConfigError::InvalidSpeed(config.speed.0)));
    }

    if !config.acceleration.is_valid() {
        return Err(Error::Config(ConfigError::InvalidAcceleration(
            config.acceleration.0,
        )));
    }

    if config.max_homing_steps == 0 {
        return Err(Error::Config(ConfigError::InvalidHomingBudget(
            config.max_homing_steps,
        )));
    }

    if config.full_travel_steps == 0 {
        return Err(Error::Config(ConfigError::InvalidTravelRange(
            config.full_travel_steps,
        )));
    }

    Ok(())
}
