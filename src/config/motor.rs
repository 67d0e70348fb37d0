//! Power-on motor kinematics from TOML.

use serde::Deserialize;

use super::units::{StepsPerSec, StepsPerSecSquared};
use crate::motion::StepMode;

/// Kinematics the controller starts with before any command arrives.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MotorDefaults {
    /// Cruise speed in steps/sec.
    pub speed: StepsPerSec,

    /// Acceleration in steps/sec².
    pub acceleration: StepsPerSecSquared,

    /// Deceleration in steps/sec².
    pub deceleration: StepsPerSecSquared,

    /// Stepping mode.
    pub step_mode: StepMode,
}

impl Default for MotorDefaults {
    fn default() -> Self {
        // A quarter turn per second, full speed reached in 2.5 s.
        let steps = StepMode::Full.steps_per_revolution() as f32;
        Self {
            speed: StepsPerSec(steps / 4.0),
            acceleration: StepsPerSecSquared(steps / 10.0),
            deceleration: StepsPerSecSquared(steps / 10.0),
            step_mode: StepMode::Wave,
        }
    }
}
