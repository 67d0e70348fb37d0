//! Motion module for stepper-ramp.
//!
//! Provides ramp planning, coil phase sequencing and tick-driven execution.

mod controller;
mod profile;
mod sequencer;

pub use controller::{ControllerState, MotionController, MotionState, Tick};
pub use profile::{Direction, MotionProfile};
pub use sequencer::{next_pattern, StepMode, StepSequencer};
