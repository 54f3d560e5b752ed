//! Stepper drive engine.
//!
//! Generic over embedded-hal 1.0 pin types. A single mutex (the gate)
//! owns all five GPIO lines and the delay provider, so exactly one pulse
//! train runs at a time no matter how many threads hold a handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, info, warn};

use crate::config::units::{Degrees, Rpm, RpmPerSec, Steps};
use crate::config::{DriveGeometry, LimitPolarity, MotorConfig};
use crate::error::{ConfigError, Error, MotorError, Result};
use crate::motion::{self, Direction, MoveOutcome, StopReason};

use super::position::PositionCounter;
use super::state::{MotionState, StateCell, StateGuard};

/// Runtime-adjustable motion parameters.
///
/// Acceleration is stored for callers that configure it but is not
/// applied to pulse timing: the pulse train runs at a constant rate
/// derived from speed alone.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MotionParameters {
    /// Speed in revolutions per minute.
    pub speed: Rpm,
    /// Acceleration in RPM per second (advisory).
    pub acceleration: RpmPerSec,
}

/// The five GPIO lines plus the delay provider, owned behind the gate.
struct DriveLines<STEP, DIR, EN, LIM, DELAY> {
    step_pin: STEP,
    dir_pin: DIR,
    enable_pin: EN,
    lower_limit: LIM,
    upper_limit: LIM,
    delay: DELAY,
    invert_direction: bool,
    invert_enable: bool,
    limit_polarity: LimitPolarity,
}

impl<STEP, DIR, EN, LIM, DELAY> DriveLines<STEP, DIR, EN, LIM, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    LIM: InputPin,
    DELAY: DelayNs,
{
    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        let high = enabled != self.invert_enable;
        let result = if high {
            self.enable_pin.set_high()
        } else {
            self.enable_pin.set_low()
        };
        result.map_err(|_| Error::Motor(MotorError::PinError))
    }

    fn set_direction(&mut self, direction: Direction) -> Result<()> {
        let high = (direction == Direction::Forward) != self.invert_direction;
        let result = if high {
            self.dir_pin.set_high()
        } else {
            self.dir_pin.set_low()
        };
        result.map_err(|_| Error::Motor(MotorError::PinError))
    }

    /// Read the limit sensor guarding the given direction of travel.
    fn limit_triggered(&mut self, direction: Direction) -> Result<bool> {
        let sensor = match direction {
            Direction::Backward => &mut self.lower_limit,
            Direction::Forward => &mut self.upper_limit,
        };
        let low = sensor.is_low().map_err(|_| Error::Motor(MotorError::PinError))?;
        Ok(match self.limit_polarity {
            LimitPolarity::ActiveLow => low,
            LimitPolarity::ActiveHigh => !low,
        })
    }

    /// One step pulse: high, half delay, low, half delay.
    fn pulse(&mut self, half_delay_us: u32) -> Result<()> {
        self.step_pin
            .set_high()
            .map_err(|_| Error::Motor(MotorError::PinError))?;
        self.delay.delay_us(half_delay_us);
        self.step_pin
            .set_low()
            .map_err(|_| Error::Motor(MotorError::PinError))?;
        self.delay.delay_us(half_delay_us);
        Ok(())
    }
}

/// State shared between all handles to one drive.
struct Shared<STEP, DIR, EN, LIM, DELAY> {
    gate: Mutex<DriveLines<STEP, DIR, EN, LIM, DELAY>>,
    geometry: DriveGeometry,
    params: Mutex<MotionParameters>,
    position: PositionCounter,
    state: StateCell,
    cancel: AtomicBool,
    name: heapless::String<32>,
}

impl<STEP, DIR, EN, LIM, DELAY> Shared<STEP, DIR, EN, LIM, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    LIM: InputPin,
    DELAY: DelayNs,
{
    /// Acquire the gate. A poisoned gate is recovered: the lines carry no
    /// invariant a panicked pulse loop can break that the next move does
    /// not rewrite.
    fn lock_gate(&self) -> MutexGuard<'_, DriveLines<STEP, DIR, EN, LIM, DELAY>> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn speed(&self) -> Rpm {
        self.params
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .speed
    }

    fn acceleration(&self) -> RpmPerSec {
        self.params
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .acceleration
    }

    /// Emit a bounded pulse train. Caller holds the gate.
    ///
    /// The enable line is driven inactive on every exit path, including
    /// pin failures inside the loop.
    fn run_pulses(
        &self,
        lines: &mut DriveLines<STEP, DIR, EN, LIM, DELAY>,
        steps: u32,
        direction: Direction,
        speed: Rpm,
    ) -> Result<MoveOutcome> {
        let _state = StateGuard::enter(&self.state, MotionState::Moving);

        lines.set_enabled(true)?;
        let result = self.pulse_loop(lines, steps, direction, speed);
        let disable = lines.set_enabled(false);

        let outcome = result?;
        disable?;

        if outcome.reason == StopReason::LimitTriggered {
            debug!(
                "{}: limit sensor tripped after {} of {} steps ({:?})",
                self.name, outcome.actual, outcome.requested, direction
            );
        }

        Ok(outcome)
    }

    fn pulse_loop(
        &self,
        lines: &mut DriveLines<STEP, DIR, EN, LIM, DELAY>,
        steps: u32,
        direction: Direction,
        speed: Rpm,
    ) -> Result<MoveOutcome> {
        lines.set_direction(direction)?;

        let half_delay = motion::half_delay_us(speed, self.geometry.steps_per_revolution);

        let mut issued = 0u32;
        let mut reason = StopReason::Completed;

        for _ in 0..steps {
            if self.cancel.load(Ordering::Acquire) {
                reason = StopReason::Cancelled;
                break;
            }

            // The sensor on the direction-of-travel side is checked
            // before each pulse is issued.
            if lines.limit_triggered(direction)? {
                reason = StopReason::LimitTriggered;
                break;
            }

            lines.pulse(half_delay)?;
            self.position.advance(direction.sign());
            issued += 1;
        }

        Ok(MoveOutcome {
            requested: steps,
            actual: issued,
            reason,
        })
    }

    /// Drive toward the lower limit sensor, then define that point as
    /// zero. Caller holds the gate. The position counter is not updated
    /// while seeking; it is reset once the sensor trips.
    fn run_homing(&self, lines: &mut DriveLines<STEP, DIR, EN, LIM, DELAY>) -> Result<()> {
        let _state = StateGuard::enter(&self.state, MotionState::Homing);

        lines.set_enabled(true)?;
        let result = self.homing_loop(lines);
        let disable = lines.set_enabled(false);

        result?;
        disable?;
        Ok(())
    }

    fn homing_loop(&self, lines: &mut DriveLines<STEP, DIR, EN, LIM, DELAY>) -> Result<()> {
        lines.set_direction(Direction::Backward)?;

        let half_delay = motion::half_delay_us(self.speed(), self.geometry.steps_per_revolution);

        for _ in 0..self.geometry.max_homing_steps {
            if self.cancel.load(Ordering::Acquire) {
                return Err(Error::Motor(MotorError::Cancelled));
            }

            if lines.limit_triggered(Direction::Backward)? {
                self.position.reset();
                info!("{}: homed, position zeroed", self.name);
                return Ok(());
            }

            lines.pulse(half_delay)?;
        }

        Err(Error::Motor(MotorError::HomingTimeout {
            budget: self.geometry.max_homing_steps,
        }))
    }
}

/// Thread-safe handle to a stepper drive.
///
/// Cloning the handle shares the same gate, position counter, and cancel
/// flag, so moves issued from any clone serialize against each other.
///
/// Generic over:
/// - `STEP`, `DIR`, `EN`: output pins (must implement `OutputPin`)
/// - `LIM`: limit sensor inputs (must implement `InputPin`)
/// - `DELAY`: delay provider (must implement `DelayNs`)
pub struct StepperMotor<STEP, DIR, EN, LIM, DELAY> {
    shared: Arc<Shared<STEP, DIR, EN, LIM, DELAY>>,
}

impl<STEP, DIR, EN, LIM, DELAY> Clone for StepperMotor<STEP, DIR, EN, LIM, DELAY> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<STEP, DIR, EN, LIM, DELAY> StepperMotor<STEP, DIR, EN, LIM, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    LIM: InputPin,
    DELAY: DelayNs,
{
    /// Create a new drive. Construction is all-or-nothing: the step line
    /// is parked low and the motor is left disabled; any pin failure
    /// yields an error and no drive.
    pub(crate) fn new(
        step_pin: STEP,
        dir_pin: DIR,
        enable_pin: EN,
        lower_limit: LIM,
        upper_limit: LIM,
        delay: DELAY,
        config: &MotorConfig,
    ) -> Result<Self> {
        crate::config::validate_motor(config.name.as_str(), config)?;

        let geometry = DriveGeometry::from_config(config);

        let mut lines = DriveLines {
            step_pin,
            dir_pin,
            enable_pin,
            lower_limit,
            upper_limit,
            delay,
            invert_direction: geometry.invert_direction,
            invert_enable: geometry.invert_enable,
            limit_polarity: geometry.limit_polarity,
        };

        lines
            .step_pin
            .set_low()
            .map_err(|_| Error::Motor(MotorError::PinError))?;
        lines.set_enabled(false)?;

        let params = MotionParameters {
            speed: geometry.default_speed,
            acceleration: geometry.default_acceleration,
        };
        let steps_per_degree = geometry.steps_per_degree;

        Ok(Self {
            shared: Arc::new(Shared {
                gate: Mutex::new(lines),
                geometry,
                params: Mutex::new(params),
                position: PositionCounter::new(steps_per_degree),
                state: StateCell::new(),
                cancel: AtomicBool::new(false),
                name: config.name.clone(),
            }),
        })
    }

    /// Create a builder for this drive.
    pub fn builder() -> super::builder::StepperMotorBuilder<STEP, DIR, EN, LIM, DELAY> {
        super::builder::StepperMotorBuilder::new()
    }

    /// Get the motor name.
    #[inline]
    pub fn name(&self) -> &str {
        self.shared.name.as_str()
    }

    /// Get current position in steps. Lock-free read.
    #[inline]
    pub fn position_steps(&self) -> Steps {
        self.shared.position.steps()
    }

    /// Get current position in degrees. Lock-free read.
    #[inline]
    pub fn position_degrees(&self) -> Degrees {
        self.shared.position.degrees()
    }

    /// Get the current motion state.
    #[inline]
    pub fn state(&self) -> MotionState {
        self.shared.state.get()
    }

    /// Get the drive geometry.
    #[inline]
    pub fn geometry(&self) -> &DriveGeometry {
        &self.shared.geometry
    }

    /// Get the configured speed.
    pub fn speed(&self) -> Rpm {
        self.shared.speed()
    }

    /// Get the configured acceleration.
    pub fn acceleration(&self) -> RpmPerSec {
        self.shared.acceleration()
    }

    /// Set the speed for subsequent moves.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSpeed` for non-positive or non-finite values, so a
    /// bad speed never reaches the timing formula.
    pub fn set_speed(&self, speed: Rpm) -> Result<()> {
        if !speed.is_valid() {
            return Err(Error::Config(ConfigError::InvalidSpeed(speed.0)));
        }
        self.shared
            .params
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .speed = speed;
        Ok(())
    }

    /// Set the acceleration for subsequent moves (stored, not applied to
    /// pulse timing).
    pub fn set_acceleration(&self, acceleration: RpmPerSec) -> Result<()> {
        if !acceleration.is_valid() {
            return Err(Error::Config(ConfigError::InvalidAcceleration(
                acceleration.0,
            )));
        }
        self.shared
            .params
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .acceleration = acceleration;
        Ok(())
    }

    /// Move a number of steps in the given direction, blocking until the
    /// pulse train ends.
    ///
    /// The limit sensor on the direction of travel is checked before each
    /// pulse; a trip ends the move early, reported in the outcome rather
    /// than as an error.
    pub fn move_steps(&self, steps: u32, direction: Direction) -> Result<MoveOutcome> {
        let shared = &self.shared;
        let mut lines = shared.lock_gate();
        shared.cancel.store(false, Ordering::Release);
        let speed = shared.speed();
        shared.run_pulses(&mut lines, steps, direction, speed)
    }

    /// Move by an angle in degrees.
    ///
    /// The step count is `round(angle * steps_per_revolution / 360)`,
    /// rounding half away from zero.
    pub fn move_angle(&self, angle: Degrees, direction: Direction) -> Result<MoveOutcome> {
        let steps = motion::angle_to_steps(angle.value(), self.shared.geometry.steps_per_revolution);
        self.move_steps(steps, direction)
    }

    /// Move `steps` forward, paced evenly over `duration_secs`.
    ///
    /// The pacing speed is derived for this one move and passed down to
    /// the pulse engine; the configured speed is left untouched.
    pub fn move_steps_over_duration(&self, steps: u32, duration_secs: f32) -> Result<MoveOutcome> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(Error::Config(ConfigError::InvalidDuration(duration_secs)));
        }

        // Zero steps has no pacing speed to derive; it completes trivially.
        if steps == 0 {
            return Ok(MoveOutcome {
                requested: 0,
                actual: 0,
                reason: StopReason::Completed,
            });
        }

        let speed = motion::duration_to_rpm(
            steps,
            duration_secs,
            self.shared.geometry.steps_per_revolution,
        );
        if !speed.is_valid() {
            return Err(Error::Config(ConfigError::InvalidSpeed(speed.0)));
        }

        let shared = &self.shared;
        let mut lines = shared.lock_gate();
        shared.cancel.store(false, Ordering::Release);
        shared.run_pulses(&mut lines, steps, Direction::Forward, speed)
    }

    /// Drive toward the lower limit sensor and define that point as
    /// position zero.
    ///
    /// # Errors
    ///
    /// Returns `HomingTimeout` if the sensor has not tripped within the
    /// configured `max_homing_steps` budget, and `Cancelled` if a stop
    /// request arrives mid-seek.
    pub fn home(&self) -> Result<()> {
        let shared = &self.shared;
        let mut lines = shared.lock_gate();
        shared.cancel.store(false, Ordering::Release);
        shared.run_homing(&mut lines)
    }

    /// Measure the full range of travel: home, then sweep forward by the
    /// configured `full_travel_steps` (ending early at the upper sensor),
    /// and report the resulting position.
    ///
    /// The whole sequence runs under one gate acquisition so no other
    /// move can interleave between the homing and the sweep.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` if a stop request arrives during either phase;
    /// a partial sweep is never reported as the measured range.
    pub fn calibrate(&self) -> Result<Steps> {
        let shared = &self.shared;
        let mut lines = shared.lock_gate();
        shared.cancel.store(false, Ordering::Release);

        shared.run_homing(&mut lines)?;
        let speed = shared.speed();
        let sweep = shared.run_pulses(
            &mut lines,
            shared.geometry.full_travel_steps,
            Direction::Forward,
            speed,
        )?;
        if sweep.reason == StopReason::Cancelled {
            return Err(Error::Motor(MotorError::Cancelled));
        }

        let range = shared.position.steps();
        info!("{}: calibration complete, full range {} steps", shared.name, range.value());
        Ok(range)
    }

    /// Request any in-flight pulse train to abort at its next iteration,
    /// then force the enable line inactive.
    ///
    /// Blocks until the gate is free: the running move observes the
    /// cancel flag, winds down its own enable/disable bracket, and
    /// releases the gate. Position is preserved.
    pub fn stop(&self) -> Result<()> {
        let shared = &self.shared;
        shared.cancel.store(true, Ordering::Release);

        let mut lines = shared.lock_gate();
        lines.set_enabled(false)?;
        debug!("{}: stop, motor disabled", shared.name);
        Ok(())
    }

    /// [`stop`](Self::stop) plus an unconditional position reset.
    ///
    /// The counter is zeroed regardless of physical position, so it is
    /// best effort until the next homing.
    pub fn emergency_stop(&self) -> Result<()> {
        let shared = &self.shared;
        shared.cancel.store(true, Ordering::Release);

        let mut lines = shared.lock_gate();
        lines.set_enabled(false)?;
        shared.position.reset();
        warn!("{}: emergency stop, position counter zeroed", shared.name);
        Ok(())
    }
}

impl<STEP, DIR, EN, LIM, DELAY> StepperMotor<STEP, DIR, EN, LIM, DELAY>
where
    STEP: OutputPin + Send + 'static,
    DIR: OutputPin + Send + 'static,
    EN: OutputPin + Send + 'static,
    LIM: InputPin + Send + 'static,
    DELAY: DelayNs + Send + 'static,
{
    /// Run `move_steps` on a detached thread and hand the outcome to
    /// `on_complete`.
    ///
    /// The spawned thread acquires the gate itself, so an async move and
    /// a concurrent blocking move serialize rather than interleave.
    pub fn move_steps_async<F>(&self, steps: u32, direction: Direction, on_complete: F)
    where
        F: FnOnce(Result<MoveOutcome>) + Send + 'static,
    {
        let motor = self.clone();
        thread::spawn(move || {
            let outcome = motor.move_steps(steps, direction);
            on_complete(outcome);
        });
    }
}
