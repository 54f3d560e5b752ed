//! Configuration loading from files.

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Error, Result};

use super::SystemConfig;

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
///
/// ```rust,ignore
/// use stepper_drive::load_config;
///
/// let config = load_config("drive.toml")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SystemConfig> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| {
        let msg = heapless::String::try_from(e.to_string().as_str()).unwrap_or_default();
        Error::Config(ConfigError::IoError(msg))
    })?;

    parse_config(&content)
}

/// Parse configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or fails validation.
pub fn parse_config(content: &str) -> Result<SystemConfig> {
    let config: SystemConfig = toml::from_str(content).map_err(|e| {
        let msg = heapless::String::try_from(e.message()).unwrap_or_default();
        Error::Config(ConfigError::ParseError(msg))
    })?;

    // Validate the configuration
    super::validation::validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
[motors.valve]
name = "Valve Drive"
"#;

        let config = parse_config(toml).unwrap();
        let motor = config.motor("valve").unwrap();
        assert_eq!(motor.steps_per_revolution, 200);
        assert_eq!(motor.microsteps.value(), 8);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[motors.valve]
name = "Valve Drive"
steps_per_revolution = 400
microsteps = 16
speed_rpm = 30.0
acceleration_rpm_per_sec = 120.0
invert_direction = true
limit_polarity = "active_high"
max_homing_steps = 5000
full_travel_steps = 3400
"#;

        let config = parse_config(toml).unwrap();
        let motor = config.motor("valve").unwrap();
        assert_eq!(motor.total_steps_per_revolution(), 6400);
        assert!(motor.invert_direction);
        assert_eq!(motor.max_homing_steps, 5000);
    }

    #[test]
    fn test_parse_rejects_bad_speed() {
        let toml = r#"
[motors.valve]
name = "Valve Drive"
speed_rpm = -1.0
"#;

        assert!(parse_config(toml).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_microsteps() {
        let toml = r#"
[motors.valve]
name = "Valve Drive"
microsteps = 3
"#;

        assert!(parse_config(toml).is_err());
    }
}
