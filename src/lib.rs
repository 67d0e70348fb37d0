//! # stepper-ramp
//!
//! Ramped stepper motor control for four-wire unipolar motors, with a queued
//! command pipeline and an emergency stop, built on embedded-hal 1.0.
//!
//! ## Features
//!
//! - **Trapezoidal ramps**: independent acceleration and deceleration,
//!   degrading to a triangle on short moves
//! - **Tick-driven**: one step per [`MotionController::tick`] at most, with a
//!   sleep hint for the caller's scheduler
//! - **Wave, full and half stepping** from a configurable coil table
//! - **Command pipeline**: clamped parameter intake, bounded queues, LED
//!   feedback and a debounced emergency stop that parks and resumes the motor
//! - **no_std compatible**: the core works without the standard library
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stepper_ramp::{FourPinCoils, MotionController, Steps, StepsPerSec};
//!
//! let coils = FourPinCoils::new(in1, in2, in3, in4);
//! let mut motor = MotionController::new(coils);
//! motor.set_speed(StepsPerSec(80.0));
//!
//! // Blocking: ticks against `delay` until the goal is reached
//! motor.move_to_blocking(Steps(2048), &mut delay)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `log` (default): Routes internal logging to the `log` facade
//! - `defmt`: Routes internal logging to defmt for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

// Core modules
pub mod config;
pub mod error;
pub mod feedback;
pub mod motion;
pub mod motor;
pub mod task;

// Re-exports for ergonomic API
pub use config::{validate_config, CoilPattern, CoilTable, OperatingEnvelope, SystemConfig};
pub use error::{Error, Result};
pub use feedback::{FeedbackEvent, FeedbackSink, LedPanel, NullFeedback, QueuedFeedback};
pub use motion::{ControllerState, Direction, MotionController, MotionProfile, StepMode, Tick};
pub use motor::{CoilOutput, FourPinCoils, MotionControllerBuilder, RecordingCoils};
pub use task::{
    ButtonMonitor, CommandIntake, ControlBus, EmergencyCoordinator, EmergencyEvent, EmergencyState,
    MotorParameters, MotorTask,
};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{Milliseconds, Steps, StepsPerSec, StepsPerSecSquared};
