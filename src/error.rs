//! Error types for stepper-drive.
//!
//! Provides unified error handling across configuration, construction,
//! and motion execution.

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all stepper-drive operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Motor operation error
    Motor(MotorError),
}

/// Configuration-related errors.
///
/// All parameter problems are rejected here, at configuration or build
/// time, so the pulse-timing formula never sees a zero divisor.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Invalid microstep value (must be power of 2: 1, 2, 4, 8, 16, 32, 64, 128, 256)
    InvalidMicrosteps(u16),
    /// Steps per revolution must be > 0
    InvalidStepsPerRevolution(u16),
    /// Speed must be finite and > 0 RPM
    InvalidSpeed(f32),
    /// Acceleration must be finite and > 0 RPM/s
    InvalidAcceleration(f32),
    /// Duration for a paced move must be finite and > 0 seconds
    InvalidDuration(f32),
    /// Homing step budget must be > 0
    InvalidHomingBudget(u32),
    /// Calibration travel range must be > 0 steps
    InvalidTravelRange(u32),
    /// Motor name not found in configuration
    MotorNotFound(heapless::String<32>),
    /// A required builder field was not provided
    MissingField(&'static str),
    /// File I/O error
    IoError(heapless::String<128>),
}

/// Motor operation errors.
///
/// A limit-sensor interruption is *not* an error: it is reported through
/// [`MoveOutcome`](crate::motion::MoveOutcome) as a short-of-target
/// completion.
#[derive(Debug, Clone, PartialEq)]
pub enum MotorError {
    /// GPIO backend set/read failed; fatal to the operation, no retries
    PinError,
    /// Homing exhausted its step budget without the lower sensor tripping
    HomingTimeout {
        /// The configured maximum pulse count
        budget: u32,
    },
    /// The operation was aborted by a stop request
    Cancelled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Motor(e) => write!(f, "Motor error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidMicrosteps(v) => {
                write!(f, "Invalid microsteps: {}. Valid values: 1, 2, 4, 8, 16, 32, 64, 128, 256", v)
            }
            ConfigError::InvalidStepsPerRevolution(v) => {
                write!(f, "Invalid steps per revolution: {}. Must be > 0", v)
            }
            ConfigError::InvalidSpeed(v) => write!(f, "Invalid speed: {} RPM. Must be > 0", v),
            ConfigError::InvalidAcceleration(v) => {
                write!(f, "Invalid acceleration: {} RPM/s. Must be > 0", v)
            }
            ConfigError::InvalidDuration(v) => {
                write!(f, "Invalid duration: {} s. Must be > 0", v)
            }
            ConfigError::InvalidHomingBudget(v) => {
                write!(f, "Invalid homing budget: {} steps. Must be > 0", v)
            }
            ConfigError::InvalidTravelRange(v) => {
                write!(f, "Invalid travel range: {} steps. Must be > 0", v)
            }
            ConfigError::MotorNotFound(name) => write!(f, "Motor '{}' not found", name),
            ConfigError::MissingField(field) => write!(f, "{} is required", field),
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorError::PinError => write!(f, "GPIO pin operation failed"),
            MotorError::HomingTimeout { budget } => {
                write!(f, "Homing did not reach the lower limit within {} steps", budget)
            }
            MotorError::Cancelled => write!(f, "Operation cancelled by stop request"),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<MotorError> for Error {
    fn from(e: MotorError) -> Self {
        Error::Motor(e)
    }
}

impl std::error::Error for Error {}

impl std::error::Error for ConfigError {}

impl std::error::Error for MotorError {}
