//! Operating envelope for incoming motor parameters.

use serde::Deserialize;

/// Bounds every command is clamped into before it reaches the motion core.
///
/// Positions outside `[0, max_position]` are pulled back in (negative values
/// to zero, overlarge values wrapped modulo `max_position`). Rates whose
/// magnitude exceeds the maximum, or which are not finite, fall back to half
/// the maximum.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OperatingEnvelope {
    /// Largest accepted absolute position in steps.
    pub max_position: i64,

    /// Largest accepted speed magnitude in steps/sec.
    pub max_speed: f32,

    /// Largest accepted acceleration or deceleration magnitude in steps/sec².
    pub max_acceleration: f32,
}

impl Default for OperatingEnvelope {
    fn default() -> Self {
        Self {
            max_position: 2048,
            max_speed: 100.0,
            max_acceleration: 100.0,
        }
    }
}

impl OperatingEnvelope {
    /// Create a new envelope.
    pub fn new(max_position: i64, max_speed: f32, max_acceleration: f32) -> Self {
        Self {
            max_position,
            max_speed,
            max_acceleration,
        }
    }

    /// Check if the envelope itself is usable (all bounds > 0).
    pub fn is_valid(&self) -> bool {
        self.max_position > 0 && self.max_speed > 0.0 && self.max_acceleration > 0.0
    }

    /// Pull a position into `[0, max_position]`.
    ///
    /// An envelope with no positive `max_position` admits only 0.
    pub fn clamp_position(&self, position: i64) -> i64 {
        if position < 0 || self.max_position <= 0 {
            0
        } else if position > self.max_position {
            position % self.max_position
        } else {
            position
        }
    }

    /// Pull a speed into `[-max_speed, max_speed]`.
    pub fn clamp_speed(&self, speed: f32) -> f32 {
        clamp_rate(speed, self.max_speed)
    }

    /// Pull an acceleration or deceleration into `[-max_acceleration, max_acceleration]`.
    pub fn clamp_acceleration(&self, accel: f32) -> f32 {
        clamp_rate(accel, self.max_acceleration)
    }
}

fn clamp_rate(value: f32, max: f32) -> f32 {
    if !value.is_finite() || value > max || value < -max {
        max / 2.0
    } else {
        value
    }
}
