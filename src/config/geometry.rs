//! Drive geometry derived from motor configuration.

use super::motor::{LimitPolarity, MotorConfig};
use super::units::{Rpm, RpmPerSec};

/// Derived drive parameters computed once from a validated [`MotorConfig`].
///
/// Validation guarantees `steps_per_revolution > 0`, so this value is safe
/// to use as a divisor in the timing formula.
#[derive(Debug, Clone)]
pub struct DriveGeometry {
    /// Total steps per revolution (base steps × microsteps).
    pub steps_per_revolution: u32,

    /// Steps per degree of rotation.
    pub steps_per_degree: f32,

    /// Configured default speed.
    pub default_speed: Rpm,

    /// Configured default acceleration (advisory).
    pub default_acceleration: RpmPerSec,

    /// Direction pin inversion.
    pub invert_direction: bool,

    /// Enable pin inversion.
    pub invert_enable: bool,

    /// Limit sensor wiring polarity.
    pub limit_polarity: LimitPolarity,

    /// Homing step budget.
    pub max_homing_steps: u32,

    /// Calibration sweep length in steps.
    pub full_travel_steps: u32,
}

impl DriveGeometry {
    /// Compute drive geometry from motor configuration.
    pub fn from_config(config: &MotorConfig) -> Self {
        let steps_per_revolution = config.total_steps_per_revolution();
        let steps_per_degree = steps_per_revolution as f32 / 360.0;

        Self {
            steps_per_revolution,
            steps_per_degree,
            default_speed: config.speed,
            default_acceleration: config.acceleration,
            invert_direction: config.invert_direction,
            invert_enable: config.invert_enable,
            limit_polarity: config.limit_polarity,
            max_homing_steps: config.max_homing_steps,
            full_travel_steps: config.full_travel_steps,
        }
    }

    /// Convert degrees to steps (truncating; use
    /// [`angle_to_steps`](crate::motion::angle_to_steps) for move requests).
    #[inline]
    pub fn degrees_to_steps(&self, degrees: f32) -> i64 {
        (degrees * self.steps_per_degree) as i64
    }

    /// Convert steps to degrees.
    #[inline]
    pub fn steps_to_degrees(&self, steps: i64) -> f32 {
        steps as f32 / self.steps_per_degree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::units::Microsteps;

    fn make_test_config() -> MotorConfig {
        MotorConfig {
            name: heapless::String::try_from("test").unwrap(),
            steps_per_revolution: 200,
            microsteps: Microsteps::EIGHTH,
            speed: Rpm(20.0),
            acceleration: RpmPerSec(80.0),
            invert_direction: false,
            invert_enable: false,
            limit_polarity: LimitPolarity::ActiveLow,
            max_homing_steps: 20_000,
            full_travel_steps: 1_700,
        }
    }

    #[test]
    fn test_steps_per_revolution() {
        let geometry = DriveGeometry::from_config(&make_test_config());

        // 200 * 8 = 1600
        assert_eq!(geometry.steps_per_revolution, 1600);
    }

    #[test]
    fn test_degree_conversions() {
        let geometry = DriveGeometry::from_config(&make_test_config());

        assert_eq!(geometry.degrees_to_steps(90.0), 400);
        assert!((geometry.steps_to_degrees(400) - 90.0).abs() < 0.01);
    }
}
