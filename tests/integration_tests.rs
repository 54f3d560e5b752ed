//! Integration tests for stepper-drive.
//!
//! These tests drive the full engine against mock pins: pulse counting,
//! limit-sensor stops, homing, calibration, gate serialization, and the
//! async dispatch path.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal_mock::eh1::delay::NoopDelay;

use stepper_drive::{
    Degrees, Direction, Error, MotionState, Rpm, StepperMotor, StepperMotorBuilder, StopReason,
};

// =============================================================================
// Mock hardware
// =============================================================================

/// Output pin recording its level, shared with the test thread.
#[derive(Clone, Default)]
struct LevelPin {
    level: Arc<AtomicBool>,
}

impl LevelPin {
    fn new() -> Self {
        Self::default()
    }

    fn is_set(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}

impl ErrorType for LevelPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for LevelPin {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Step pin counting rising edges and flagging overlapping pulses.
///
/// A `set_high` while already high means two pulse trains interleaved,
/// which the gate must never allow.
#[derive(Clone, Default)]
struct PulsePin {
    level: Arc<AtomicBool>,
    rises: Arc<AtomicU32>,
    overlap: Arc<AtomicBool>,
}

impl PulsePin {
    fn new() -> Self {
        Self::default()
    }

    fn rises(&self) -> u32 {
        self.rises.load(Ordering::SeqCst)
    }

    fn saw_overlap(&self) -> bool {
        self.overlap.load(Ordering::SeqCst)
    }
}

impl ErrorType for PulsePin {
    type Error = core::convert::Infallible;
}

impl OutputPin for PulsePin {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.level.swap(true, Ordering::SeqCst) {
            self.overlap.store(true, Ordering::SeqCst);
        }
        self.rises.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Limit sensor scripted by a countdown of clear reads.
///
/// Reads as "clear to move" while the countdown is positive, then as
/// triggered forever. `i64::MAX` never triggers, `0` is triggered from
/// the start. Active-low wiring: clear = high, triggered = low.
#[derive(Clone)]
struct SensorPin {
    clear_reads: Arc<AtomicI64>,
}

impl SensorPin {
    fn clear() -> Self {
        Self::after_reads(i64::MAX)
    }

    fn triggered() -> Self {
        Self::after_reads(0)
    }

    fn after_reads(n: i64) -> Self {
        Self {
            clear_reads: Arc::new(AtomicI64::new(n)),
        }
    }

    /// One sensor read; true while clear.
    fn read_clear(&self) -> bool {
        let remaining = self.clear_reads.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != i64::MAX {
                self.clear_reads.fetch_sub(1, Ordering::SeqCst);
            }
            true
        } else {
            false
        }
    }
}

impl ErrorType for SensorPin {
    type Error = core::convert::Infallible;
}

impl InputPin for SensorPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read_clear())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.read_clear())
    }
}

/// Delay provider that really sleeps, for tests that need an in-flight
/// move to race against.
struct SleepDelay;

impl embedded_hal::delay::DelayNs for SleepDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }
}

type TestMotor = StepperMotor<PulsePin, LevelPin, LevelPin, SensorPin, NoopDelay>;

/// Build a 200 steps/rev, 8x microstep motor (1600 steps/revolution).
fn build_motor(lower: SensorPin, upper: SensorPin) -> (TestMotor, PulsePin, LevelPin) {
    let step = PulsePin::new();
    let enable = LevelPin::new();
    let motor = StepperMotorBuilder::new()
        .name("test")
        .step_pin(step.clone())
        .dir_pin(LevelPin::new())
        .enable_pin(enable.clone())
        .lower_limit(lower)
        .upper_limit(upper)
        .delay(NoopDelay)
        .build()
        .expect("motor should build");
    (motor, step, enable)
}

// =============================================================================
// Pulse engine and unit conversion
// =============================================================================

#[test]
fn full_revolution_issues_steps_per_rev_pulses() {
    let (motor, step, _) = build_motor(SensorPin::clear(), SensorPin::clear());

    let outcome = motor.move_angle(Degrees(360.0), Direction::Forward).unwrap();

    assert_eq!(outcome.requested, 1600);
    assert_eq!(outcome.actual, 1600);
    assert!(outcome.is_complete());
    assert_eq!(step.rises(), 1600);
    assert_eq!(motor.position_steps().value(), 1600);
}

#[test]
fn quarter_turn_at_200x8_is_400_steps() {
    let (motor, step, _) = build_motor(SensorPin::clear(), SensorPin::clear());

    let outcome = motor.move_angle(Degrees(90.0), Direction::Forward).unwrap();

    assert_eq!(outcome.actual, 400);
    assert_eq!(step.rises(), 400);
    assert_eq!(motor.position_steps().value(), 400);
    assert!((motor.position_degrees().value() - 90.0).abs() < 0.01);
}

#[test]
fn forward_then_backward_returns_to_start() {
    let (motor, _, _) = build_motor(SensorPin::clear(), SensorPin::clear());

    motor.move_steps(500, Direction::Forward).unwrap();
    assert_eq!(motor.position_steps().value(), 500);

    motor.move_steps(500, Direction::Backward).unwrap();
    assert_eq!(motor.position_steps().value(), 0);
}

#[test]
fn motor_disabled_and_idle_after_move() {
    let (motor, _, enable) = build_motor(SensorPin::clear(), SensorPin::clear());

    motor.move_steps(10, Direction::Forward).unwrap();

    assert!(!enable.is_set());
    assert_eq!(motor.state(), MotionState::Idle);
}

// =============================================================================
// Limit sensor behavior
// =============================================================================

#[test]
fn pre_asserted_limit_issues_zero_pulses() {
    let (motor, step, _) = build_motor(SensorPin::clear(), SensorPin::triggered());

    let outcome = motor.move_steps(400, Direction::Forward).unwrap();

    assert_eq!(outcome.actual, 0);
    assert_eq!(outcome.reason, StopReason::LimitTriggered);
    assert_eq!(outcome.shortfall(), 400);
    assert_eq!(step.rises(), 0);
    assert_eq!(motor.position_steps().value(), 0);
}

#[test]
fn limit_mid_travel_stops_early() {
    // Upper sensor reads clear 250 times, then trips.
    let (motor, step, _) = build_motor(SensorPin::clear(), SensorPin::after_reads(250));

    let outcome = motor.move_steps(400, Direction::Forward).unwrap();

    assert_eq!(outcome.reason, StopReason::LimitTriggered);
    assert_eq!(outcome.actual, 250);
    assert_eq!(step.rises(), 250);
    assert_eq!(motor.position_steps().value(), 250);
}

#[test]
fn opposite_sensor_does_not_block_travel() {
    // Lower sensor triggered; forward moves consult only the upper one.
    let (motor, _, _) = build_motor(SensorPin::triggered(), SensorPin::clear());

    let outcome = motor.move_steps(100, Direction::Forward).unwrap();
    assert!(outcome.is_complete());

    let outcome = motor.move_steps(100, Direction::Backward).unwrap();
    assert_eq!(outcome.actual, 0);
    assert_eq!(outcome.reason, StopReason::LimitTriggered);
}

// =============================================================================
// Homing and calibration
// =============================================================================

#[test]
fn homing_zeroes_position() {
    let lower = SensorPin::after_reads(300);
    let (motor, _, _) = build_motor(lower, SensorPin::clear());

    motor.move_steps(120, Direction::Forward).unwrap();
    assert_ne!(motor.position_steps().value(), 0);

    motor.home().unwrap();
    assert_eq!(motor.position_steps().value(), 0);
    assert_eq!(motor.state(), MotionState::Idle);
}

#[test]
fn homing_at_sensor_returns_immediately() {
    let (motor, step, _) = build_motor(SensorPin::triggered(), SensorPin::clear());

    motor.home().unwrap();

    assert_eq!(step.rises(), 0);
    assert_eq!(motor.position_steps().value(), 0);
}

#[test]
fn homing_budget_exhaustion_is_an_error() {
    let step = PulsePin::new();
    let motor: TestMotor = StepperMotorBuilder::new()
        .name("test")
        .step_pin(step.clone())
        .dir_pin(LevelPin::new())
        .enable_pin(LevelPin::new())
        .lower_limit(SensorPin::clear())
        .upper_limit(SensorPin::clear())
        .delay(NoopDelay)
        .max_homing_steps(50)
        .build()
        .unwrap();

    let result = motor.home();

    assert!(matches!(
        result,
        Err(Error::Motor(stepper_drive::error::MotorError::HomingTimeout { budget: 50 }))
    ));
    assert_eq!(step.rises(), 50);
    assert_eq!(motor.state(), MotionState::Idle);
}

#[test]
fn calibrate_reports_measured_range() {
    let step = PulsePin::new();
    let motor: TestMotor = StepperMotorBuilder::new()
        .name("test")
        .step_pin(step.clone())
        .dir_pin(LevelPin::new())
        .enable_pin(LevelPin::new())
        // Homes immediately, then the sweep trips the upper sensor
        // after 900 clear reads.
        .lower_limit(SensorPin::triggered())
        .upper_limit(SensorPin::after_reads(900))
        .delay(NoopDelay)
        .full_travel_steps(1_700)
        .build()
        .unwrap();

    let range = motor.calibrate().unwrap();

    assert_eq!(range.value(), 900);
    assert_eq!(motor.position_steps().value(), 900);
}

// =============================================================================
// Stops
// =============================================================================

#[test]
fn emergency_stop_zeroes_position_and_idles() {
    let (motor, _, enable) = build_motor(SensorPin::clear(), SensorPin::clear());

    motor.move_steps(300, Direction::Forward).unwrap();
    assert_eq!(motor.position_steps().value(), 300);

    motor.emergency_stop().unwrap();

    assert_eq!(motor.position_steps().value(), 0);
    assert_eq!(motor.state(), MotionState::Idle);
    assert!(!enable.is_set());
}

#[test]
fn stop_preserves_position() {
    let (motor, _, _) = build_motor(SensorPin::clear(), SensorPin::clear());

    motor.move_steps(300, Direction::Forward).unwrap();
    motor.stop().unwrap();

    assert_eq!(motor.position_steps().value(), 300);
}

#[test]
fn stop_cancels_in_flight_move() {
    let step = PulsePin::new();
    let motor: StepperMotor<PulsePin, LevelPin, LevelPin, SensorPin, SleepDelay> =
        StepperMotorBuilder::new()
            .name("test")
            .step_pin(step.clone())
            .dir_pin(LevelPin::new())
            .enable_pin(LevelPin::new())
            .lower_limit(SensorPin::clear())
            .upper_limit(SensorPin::clear())
            .delay(SleepDelay)
            .speed(Rpm(20.0)) // 1875 us per pulse: a 100k-step move takes minutes
            .build()
            .unwrap();

    let (tx, rx) = mpsc::channel();
    motor.move_steps_async(100_000, Direction::Forward, move |outcome| {
        tx.send(outcome).unwrap();
    });

    // Wait for the move to actually start.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while motor.position_steps().value() == 0 {
        assert!(std::time::Instant::now() < deadline, "move never started");
        std::thread::sleep(Duration::from_millis(1));
    }

    motor.stop().unwrap();

    let outcome = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("callback should fire")
        .expect("move should report an outcome");

    assert_eq!(outcome.reason, StopReason::Cancelled);
    assert!(outcome.actual < outcome.requested);
    assert_eq!(motor.position_steps().value() as i64, outcome.actual as i64);
}

#[test]
fn stop_during_calibrate_is_an_error() {
    let motor: StepperMotor<PulsePin, LevelPin, LevelPin, SensorPin, SleepDelay> =
        StepperMotorBuilder::new()
            .name("test")
            .step_pin(PulsePin::new())
            .dir_pin(LevelPin::new())
            .enable_pin(LevelPin::new())
            // Homes immediately; the sweep then runs at 1875 us per pulse,
            // so the full 100k-step range would take minutes.
            .lower_limit(SensorPin::triggered())
            .upper_limit(SensorPin::clear())
            .delay(SleepDelay)
            .speed(Rpm(20.0))
            .full_travel_steps(100_000)
            .build()
            .unwrap();

    let worker = motor.clone();
    let handle = std::thread::spawn(move || worker.calibrate());

    // Wait for the sweep to actually start.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while motor.position_steps().value() == 0 {
        assert!(std::time::Instant::now() < deadline, "sweep never started");
        std::thread::sleep(Duration::from_millis(1));
    }

    motor.stop().unwrap();

    // A partial sweep must never be reported as the measured range.
    let result = handle.join().unwrap();
    assert!(matches!(
        result,
        Err(Error::Motor(stepper_drive::error::MotorError::Cancelled))
    ));
    assert_eq!(motor.state(), MotionState::Idle);
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn concurrent_moves_serialize_without_interleaving() {
    let (motor, step, _) = build_motor(SensorPin::clear(), SensorPin::clear());

    let worker = motor.clone();
    let handle = std::thread::spawn(move || {
        worker.move_steps(800, Direction::Forward).unwrap();
    });

    motor.move_steps(800, Direction::Forward).unwrap();
    handle.join().unwrap();

    assert!(!step.saw_overlap(), "pulse trains interleaved");
    assert_eq!(step.rises(), 1600);
    assert_eq!(motor.position_steps().value(), 1600);
}

#[test]
fn async_move_invokes_completion_callback() {
    let (motor, _, _) = build_motor(SensorPin::clear(), SensorPin::clear());

    let (tx, rx) = mpsc::channel();
    motor.move_steps_async(250, Direction::Forward, move |outcome| {
        tx.send(outcome).unwrap();
    });

    let outcome = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("callback should fire")
        .expect("move should succeed");

    assert!(outcome.is_complete());
    assert_eq!(outcome.actual, 250);
    assert_eq!(motor.position_steps().value(), 250);
}

// =============================================================================
// Parameters and paced moves
// =============================================================================

#[test]
fn invalid_speed_is_rejected() {
    let (motor, _, _) = build_motor(SensorPin::clear(), SensorPin::clear());

    assert!(motor.set_speed(Rpm(0.0)).is_err());
    assert!(motor.set_speed(Rpm(-3.0)).is_err());
    assert!(motor.set_speed(Rpm(f32::NAN)).is_err());
    assert!(motor.set_speed(Rpm(30.0)).is_ok());
}

#[test]
fn paced_move_leaves_configured_speed_untouched() {
    let (motor, _, _) = build_motor(SensorPin::clear(), SensorPin::clear());

    motor.set_speed(Rpm(12.5)).unwrap();
    let outcome = motor.move_steps_over_duration(160, 2.0).unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.actual, 160);
    assert_eq!(motor.position_steps().value(), 160);
    assert!((motor.speed().value() - 12.5).abs() < 0.001);
}

#[test]
fn paced_move_of_zero_steps_completes_trivially() {
    let (motor, step, _) = build_motor(SensorPin::clear(), SensorPin::clear());

    let outcome = motor.move_steps_over_duration(0, 2.0).unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.requested, 0);
    assert_eq!(outcome.actual, 0);
    assert_eq!(step.rises(), 0);
    assert_eq!(motor.position_steps().value(), 0);
}

#[test]
fn paced_move_rejects_bad_duration() {
    let (motor, _, _) = build_motor(SensorPin::clear(), SensorPin::clear());

    assert!(motor.move_steps_over_duration(100, 0.0).is_err());
    assert!(motor.move_steps_over_duration(100, -1.0).is_err());
    assert!(motor.move_steps_over_duration(100, f32::NAN).is_err());
    assert_eq!(motor.position_steps().value(), 0);
}

#[test]
fn builder_requires_all_pins() {
    let result: stepper_drive::Result<TestMotor> = StepperMotorBuilder::new()
        .step_pin(PulsePin::new())
        .dir_pin(LevelPin::new())
        .enable_pin(LevelPin::new())
        .delay(NoopDelay)
        .build();

    assert!(result.is_err());
}

// =============================================================================
// Property tests
// =============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;
    use stepper_drive::motion;

    proptest! {
        #[test]
        fn delay_formula_inverts_rate(rpm in 1.0f32..600.0, spr in 1u32..52_000) {
            let delay = motion::step_delay_us(Rpm(rpm), spr);
            let reconstructed = delay * rpm * spr as f32;
            prop_assert!((reconstructed - 60_000_000.0).abs() / 60_000_000.0 < 1e-4);
        }

        #[test]
        fn whole_revolutions_are_exact(turns in 1u32..8) {
            let steps = motion::angle_to_steps(360.0 * turns as f32, 1600);
            prop_assert_eq!(steps, 1600 * turns);
        }

        #[test]
        fn round_trip_restores_position(n in 0u32..400) {
            let (motor, _, _) = build_motor(SensorPin::clear(), SensorPin::clear());
            motor.move_steps(n, Direction::Forward).unwrap();
            motor.move_steps(n, Direction::Backward).unwrap();
            prop_assert_eq!(motor.position_steps().value(), 0);
        }
    }
}
