//! Pulse-timing and unit-derivation math.
//!
//! All conversions between motion requests (angles, durations) and the
//! pulse train live here as pure functions so they can be tested without
//! hardware.

use libm::roundf;

use crate::config::units::Rpm;

/// Per-pulse delay in microseconds for a constant-rate pulse train.
///
/// `delay_us = 60 * 1_000_000 / (rpm * steps_per_revolution)` where
/// `steps_per_revolution` already includes the microstep multiplier.
/// The delay is split evenly between the pulse-high and pulse-low halves.
///
/// Callers must validate speed and geometry first; this function assumes
/// both are strictly positive.
#[inline]
pub fn step_delay_us(speed: Rpm, steps_per_revolution: u32) -> f32 {
    60.0 * 1_000_000.0 / (speed.0 * steps_per_revolution as f32)
}

/// Half of the per-pulse delay, in whole microseconds, for one pulse edge.
#[inline]
pub fn half_delay_us(speed: Rpm, steps_per_revolution: u32) -> u32 {
    (step_delay_us(speed, steps_per_revolution) / 2.0) as u32
}

/// Convert an angle to a pulse count.
///
/// `steps = round(angle * steps_per_revolution / 360)`, rounding half away
/// from zero.
#[inline]
pub fn angle_to_steps(angle_degrees: f32, steps_per_revolution: u32) -> u32 {
    let steps = roundf(angle_degrees * steps_per_revolution as f32 / 360.0);
    if steps <= 0.0 {
        0
    } else {
        steps as u32
    }
}

/// Derive the speed that paces `steps` pulses evenly over `duration_secs`.
///
/// `rpm = (steps / duration) * 60 / steps_per_revolution`. The result is
/// passed down to the pulse engine for that one move; it never overwrites
/// the configured speed.
#[inline]
pub fn duration_to_rpm(steps: u32, duration_secs: f32, steps_per_revolution: u32) -> Rpm {
    let steps_per_second = steps as f32 / duration_secs;
    Rpm(steps_per_second * 60.0 / steps_per_revolution as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 200 steps/rev * 8 microsteps
    const STEPS_PER_REV: u32 = 1600;

    #[test]
    fn test_step_delay_formula() {
        // 60_000_000 / (20 * 1600) = 1875 us
        let delay = step_delay_us(Rpm(20.0), STEPS_PER_REV);
        assert!((delay - 1875.0).abs() < 0.01);
        assert_eq!(half_delay_us(Rpm(20.0), STEPS_PER_REV), 937);
    }

    #[test]
    fn test_angle_full_revolution() {
        assert_eq!(angle_to_steps(360.0, STEPS_PER_REV), STEPS_PER_REV);
    }

    #[test]
    fn test_angle_quarter_turn() {
        // round(90 * 1600 / 360) = 400
        assert_eq!(angle_to_steps(90.0, STEPS_PER_REV), 400);
    }

    #[test]
    fn test_angle_rounds_half_away_from_zero() {
        // 0.1125 degrees * 1600 / 360 = 0.5 exactly
        assert_eq!(angle_to_steps(0.1125, STEPS_PER_REV), 1);
    }

    #[test]
    fn test_angle_non_positive() {
        assert_eq!(angle_to_steps(0.0, STEPS_PER_REV), 0);
        assert_eq!(angle_to_steps(-45.0, STEPS_PER_REV), 0);
    }

    #[test]
    fn test_duration_to_rpm() {
        // 1600 steps over 60 s = 26.67 steps/s = 1 RPM at 1600 steps/rev
        let rpm = duration_to_rpm(1600, 60.0, STEPS_PER_REV);
        assert!((rpm.0 - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_duration_pacing_matches_delay() {
        // 800 steps over 2 s should come out to 2500 us per pulse
        let rpm = duration_to_rpm(800, 2.0, STEPS_PER_REV);
        let delay = step_delay_us(rpm, STEPS_PER_REV);
        assert!((delay - 2500.0).abs() < 0.5);
    }
}
