//! Motor module for stepper-ramp.
//!
//! Coil outputs for a four-wire unipolar stepper and the controller builder.

mod builder;
mod driver;
mod recording;

pub use builder::MotionControllerBuilder;
pub use driver::{CoilOutput, FourPinCoils};
pub use recording::{RecordingCoils, HISTORY_DEPTH};
