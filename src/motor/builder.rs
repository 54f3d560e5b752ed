//! Builder pattern for StepperMotor.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::config::units::{Microsteps, Rpm, RpmPerSec};
use crate::config::{LimitPolarity, MotorConfig, SystemConfig};
use crate::error::{ConfigError, Error, Result};

use super::driver::StepperMotor;

/// Builder for creating StepperMotor instances.
///
/// Pin handles are required; configuration scalars fall back to the same
/// defaults as TOML deserialization.
pub struct StepperMotorBuilder<STEP, DIR, EN, LIM, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    LIM: InputPin,
    DELAY: DelayNs,
{
    step_pin: Option<STEP>,
    dir_pin: Option<DIR>,
    enable_pin: Option<EN>,
    lower_limit: Option<LIM>,
    upper_limit: Option<LIM>,
    delay: Option<DELAY>,
    name: Option<heapless::String<32>>,
    steps_per_revolution: u16,
    microsteps: Microsteps,
    speed: Rpm,
    acceleration: RpmPerSec,
    invert_direction: bool,
    invert_enable: bool,
    limit_polarity: LimitPolarity,
    max_homing_steps: u32,
    full_travel_steps: u32,
}

impl<STEP, DIR, EN, LIM, DELAY> Default for StepperMotorBuilder<STEP, DIR, EN, LIM, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    LIM: InputPin,
    DELAY: DelayNs,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<STEP, DIR, EN, LIM, DELAY> StepperMotorBuilder<STEP, DIR, EN, LIM, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    LIM: InputPin,
    DELAY: DelayNs,
{
    /// Create a new builder with default configuration scalars.
    pub fn new() -> Self {
        Self {
            step_pin: None,
            dir_pin: None,
            enable_pin: None,
            lower_limit: None,
            upper_limit: None,
            delay: None,
            name: None,
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

    /// Set the STEP pin.
    pub fn step_pin(mut self, pin: STEP) -> Self {
        self.step_pin = Some(pin);
        self
    }

    /// Set the DIR pin.
    pub fn dir_pin(mut self, pin: DIR) -> Self {
        self.dir_pin = Some(pin);
        self
    }

    /// Set the ENABLE pin.
    pub fn enable_pin(mut self, pin: EN) -> Self {
        self.enable_pin = Some(pin);
        self
    }

    /// Set the lower end-of-travel sensor input.
    pub fn lower_limit(mut self, pin: LIM) -> Self {
        self.lower_limit = Some(pin);
        self
    }

    /// Set the upper end-of-travel sensor input.
    pub fn upper_limit(mut self, pin: LIM) -> Self {
        self.upper_limit = Some(pin);
        self
    }

    /// Set the delay provider.
    pub fn delay(mut self, delay: DELAY) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set the motor name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = heapless::String::try_from(name).ok();
        self
    }

    /// Set base steps per revolution (before microstepping).
    pub fn steps_per_revolution(mut self, steps: u16) -> Self {
        self.steps_per_revolution = steps;
        self
    }

    /// Set the microstep configuration.
    pub fn microsteps(mut self, microsteps: Microsteps) -> Self {
        self.microsteps = microsteps;
        self
    }

    /// Set the default speed in RPM.
    pub fn speed(mut self, speed: Rpm) -> Self {
        self.speed = speed;
        self
    }

    /// Set the default acceleration in RPM/s.
    pub fn acceleration(mut self, acceleration: RpmPerSec) -> Self {
        self.acceleration = acceleration;
        self
    }

    /// Set direction pin inversion.
    pub fn invert_direction(mut self, invert: bool) -> Self {
        self.invert_direction = invert;
        self
    }

    /// Set enable pin inversion.
    pub fn invert_enable(mut self, invert: bool) -> Self {
        self.invert_enable = invert;
        self
    }

    /// Set the limit sensor wiring polarity.
    pub fn limit_polarity(mut self, polarity: LimitPolarity) -> Self {
        self.limit_polarity = polarity;
        self
    }

    /// Set the homing step budget.
    pub fn max_homing_steps(mut self, steps: u32) -> Self {
        self.max_homing_steps = steps;
        self
    }

    /// Set the calibration sweep length in steps.
    pub fn full_travel_steps(mut self, steps: u32) -> Self {
        self.full_travel_steps = steps;
        self
    }

    /// Configure scalars from a MotorConfig.
    pub fn from_motor_config(mut self, config: &MotorConfig) -> Self {
        self.name = Some(config.name.clone());
        self.steps_per_revolution = config.steps_per_revolution;
        self.microsteps = config.microsteps;
        self.speed = config.speed;
        self.acceleration = config.acceleration;
        self.invert_direction = config.invert_direction;
        self.invert_enable = config.invert_enable;
        self.limit_polarity = config.limit_polarity;
        self.max_homing_steps = config.max_homing_steps;
        self.full_travel_steps = config.full_travel_steps;
        self
    }

    /// Configure from SystemConfig by motor name.
    pub fn from_config(self, config: &SystemConfig, motor_name: &str) -> Result<Self> {
        let motor_config = config.motor(motor_name).ok_or_else(|| {
            Error::Config(ConfigError::MotorNotFound(
                heapless::String::try_from(motor_name).unwrap_or_default(),
            ))
        })?;

        Ok(self.from_motor_config(motor_config))
    }

    /// Build the StepperMotor.
    ///
    /// Validates the assembled configuration and wires the pins; any
    /// failure yields an error with no partially constructed drive.
    ///
    /// # Errors
    ///
    /// Returns an error if a pin handle or the delay provider is missing,
    /// if a configuration scalar is invalid, or if parking the output
    /// lines fails.
    pub fn build(self) -> Result<StepperMotor<STEP, DIR, EN, LIM, DELAY>> {
        let step_pin = self
            .step_pin
            .ok_or(Error::Config(ConfigError::MissingField("step_pin")))?;
        let dir_pin = self
            .dir_pin
            .ok_or(Error::Config(ConfigError::MissingField("dir_pin")))?;
        let enable_pin = self
            .enable_pin
            .ok_or(Error::Config(ConfigError::MissingField("enable_pin")))?;
        let lower_limit = self
            .lower_limit
            .ok_or(Error::Config(ConfigError::MissingField("lower_limit")))?;
        let upper_limit = self
            .upper_limit
            .ok_or(Error::Config(ConfigError::MissingField("upper_limit")))?;
        let delay = self
            .delay
            .ok_or(Error::Config(ConfigError::MissingField("delay")))?;

        let name = self
            .name
            .unwrap_or_else(|| heapless::String::try_from("motor").unwrap_or_default());

        let config = MotorConfig {
            name,
            steps_per_revolution: self.steps_per_revolution,
            microsteps: self.microsteps,
            speed: self.speed,
            acceleration: self.acceleration,
            invert_direction: self.invert_direction,
            invert_enable: self.invert_enable,
            limit_polarity: self.limit_polarity,
            max_homing_steps: self.max_homing_steps,
            full_travel_steps: self.full_travel_steps,
        };

        StepperMotor::new(
            step_pin,
            dir_pin,
            enable_pin,
            lower_limit,
            upper_limit,
            delay,
            &config,
        )
    }
}
