//! Motor configuration from TOML.

use heapless::String;
use serde::Deserialize;

use super::units::{Microsteps, Rpm, RpmPerSec};

/// Wiring polarity of the limit sensors.
///
/// The surveyed wiring reads 1 while clear to move and drops to 0 when
/// the carriage reaches the sensor, which is `active_low` here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitPolarity {
    /// Sensor line low means triggered.
    #[default]
    ActiveLow,
    /// Sensor line high means triggered.
    ActiveHigh,
}

/// Complete motor configuration from TOML.
///
/// Pin handles are not part of the configuration; they are typed hardware
/// objects injected through the builder.
#[derive(Debug, Clone, Deserialize)]
pub struct MotorConfig {
    /// Human-readable name (max 32 chars).
    pub name: String<32>,

    /// Base steps per revolution (typically 200 for 1.8° motors).
    #[serde(default = "default_steps_per_revolution")]
    pub steps_per_revolution: u16,

    /// Microstep setting (1, 2, 4, 8, 16, 32, etc.).
    #[serde(default)]
    pub microsteps: Microsteps,

    /// Default speed in revolutions per minute.
    #[serde(default = "default_speed", rename = "speed_rpm")]
    pub speed: Rpm,

    /// Default acceleration in RPM per second (stored, not applied to timing).
    #[serde(default = "default_acceleration", rename = "acceleration_rpm_per_sec")]
    pub acceleration: RpmPerSec,

    /// Invert direction pin logic.
    #[serde(default)]
    pub invert_direction: bool,

    /// Invert enable pin logic (default: high = enabled).
    #[serde(default)]
    pub invert_enable: bool,

    /// Limit sensor wiring polarity.
    #[serde(default)]
    pub limit_polarity: LimitPolarity,

    /// Maximum pulses homing may issue before reporting a timeout.
    #[serde(default = "default_max_homing_steps")]
    pub max_homing_steps: u32,

    /// Forward sweep length used by calibration, in steps.
    #[serde(default = "default_full_travel_steps")]
    pub full_travel_steps: u32,
}

fn default_steps_per_revolution() -> u16 {
    200
}

fn default_speed() -> Rpm {
    Rpm(20.0)
}

fn default_acceleration() -> RpmPerSec {
    RpmPerSec(80.0)
}

fn default_max_homing_steps() -> u32 {
    20_000
}

fn default_full_travel_steps() -> u32 {
    1_700
}

impl MotorConfig {
    /// Calculate total steps per revolution including microstepping.
    pub fn total_steps_per_revolution(&self) -> u32 {
        self.steps_per_revolution as u32 * self.microsteps.value() as u32
    }

    /// Calculate steps per degree of rotation.
    pub fn steps_per_degree(&self) -> f32 {
        self.total_steps_per_revolution() as f32 / 360.0
    }
}
