//! Motor module for stepper-drive.
//!
//! Provides the thread-safe stepper drive handle, homing, and position
//! tracking.

mod builder;
mod driver;
mod position;
mod state;

pub use builder::StepperMotorBuilder;
pub use driver::StepperMotor;
pub use position::PositionCounter;
pub use state::MotionState;
