//! Motion profile calculation.
//!
//! Plans a trapezoidal speed ramp with independent acceleration and
//! deceleration, degrading to a triangle when the move is too short to
//! reach the requested speed. All periods are in milliseconds.

use libm::{roundf, sqrtf};

use crate::config::units::StepsPerSec;

/// Direction of motor motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Clockwise (positive step count).
    #[default]
    Clockwise,
    /// Counter-clockwise (negative step count).
    CounterClockwise,
}

impl Direction {
    /// Get direction from signed step count.
    #[inline]
    pub fn from_steps(steps: i64) -> Self {
        if steps >= 0 {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        }
    }

    /// Get the sign multiplier.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => -1,
        }
    }

    /// The opposite direction.
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

/// Computed ramp constants for one move.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionProfile {
    /// Total steps to move (absolute value).
    pub total_steps: u64,

    /// Direction of motion.
    pub direction: Direction,

    /// Cruise speed actually reachable, in steps/sec.
    pub cruise_speed: f32,

    /// Whether the requested speed had to be lowered to fit the distance.
    pub speed_clamped: bool,

    /// Period of the very first step leaving rest (ms).
    pub initial_step_period: f32,

    /// Period at cruise speed (ms); the ramp never goes below it.
    pub cruise_step_period: f32,

    /// Steps needed to decelerate from cruise speed to rest.
    pub stop_margin: u64,

    /// Acceleration in steps per ms², used by the ramp recurrence.
    pub accel_rate: f32,

    /// Deceleration in steps per ms², used by the ramp recurrence.
    pub decel_rate: f32,
}

impl MotionProfile {
    /// Plan a ramp.
    ///
    /// # Arguments
    ///
    /// * `total_steps` - Signed step count (positive = CW, negative = CCW)
    /// * `speed` - Requested cruise speed in steps/sec
    /// * `acceleration` - Acceleration in steps/sec²
    /// * `deceleration` - Deceleration in steps/sec²
    ///
    /// A zero distance or non-positive rate yields [`MotionProfile::zero`];
    /// callers are expected to have rejected such rates already.
    pub fn plan(total_steps: i64, speed: f32, acceleration: f32, deceleration: f32) -> Self {
        let direction = Direction::from_steps(total_steps);
        let steps = total_steps.unsigned_abs();

        if steps == 0 || !(speed > 0.0) || !(acceleration > 0.0) || !(deceleration > 0.0) {
            return Self {
                direction,
                ..Self::zero()
            };
        }

        // v_max² (1/2a + 1/2d) = distance
        let distance = steps as f32;
        let reachable = sqrtf(2.0 * acceleration * deceleration * distance / (acceleration + deceleration));

        let (cruise_speed, speed_clamped) = if speed > reachable {
            info!("speed clamped from {} to {} steps/s", speed, reachable);
            (reachable, true)
        } else {
            (speed, false)
        };

        let mut stop_margin =
            roundf(cruise_speed * cruise_speed / (2.0 * deceleration)) as u64;

        // No room for a cruise phase: split the move evenly.
        if steps <= stop_margin * 2 {
            stop_margin = steps / 2;
        }

        Self {
            total_steps: steps,
            direction,
            cruise_speed,
            speed_clamped,
            initial_step_period: 1000.0 / sqrtf(2.0 * acceleration),
            cruise_step_period: StepsPerSec(cruise_speed).period_ms(),
            stop_margin,
            accel_rate: acceleration / 1e6,
            decel_rate: deceleration / 1e6,
        }
    }

    /// Plan with the same rate for acceleration and deceleration.
    pub fn symmetric(total_steps: i64, speed: f32, acceleration: f32) -> Self {
        Self::plan(total_steps, speed, acceleration, acceleration)
    }

    /// Create a zero-length profile (no motion).
    pub fn zero() -> Self {
        Self {
            total_steps: 0,
            direction: Direction::Clockwise,
            cruise_speed: 0.0,
            speed_clamped: false,
            initial_step_period: f32::INFINITY,
            cruise_step_period: f32::INFINITY,
            stop_margin: 0,
            accel_rate: 0.0,
            decel_rate: 0.0,
        }
    }

    /// Check if this is a zero-length profile.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.total_steps == 0
    }

    /// A triangular profile has no sustained cruise phase.
    #[inline]
    pub fn is_triangular(&self) -> bool {
        !self.is_zero() && self.stop_margin * 2 >= self.total_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trapezoidal_profile() {
        let profile = MotionProfile::symmetric(1000, 50.0, 50.0);

        assert_eq!(profile.total_steps, 1000);
        assert_eq!(profile.direction, Direction::Clockwise);
        assert!(!profile.speed_clamped);
        assert!((profile.cruise_step_period - 20.0).abs() < 1e-4);
        // 1000 / sqrt(100)
        assert!((profile.initial_step_period - 100.0).abs() < 1e-3);
        // 50² / (2·50)
        assert_eq!(profile.stop_margin, 25);
        assert!(!profile.is_triangular());
        assert!((profile.accel_rate - 5e-5).abs() < 1e-9);
    }

    #[test]
    fn test_triangle_profile() {
        // sqrt(2·100·100·40 / 200) = 63.2 steps/s reachable
        let profile = MotionProfile::symmetric(40, 1000.0, 100.0);

        assert!(profile.speed_clamped);
        assert!((profile.cruise_speed - 63.245_55).abs() < 1e-2);
        assert_eq!(profile.stop_margin, 20);
        assert!(profile.is_triangular());
    }

    #[test]
    fn test_asymmetric_profile() {
        let profile = MotionProfile::plan(1000, 80.0, 100.0, 20.0);

        // 80² / 40
        assert_eq!(profile.stop_margin, 160);
        assert!((profile.decel_rate - 2e-5).abs() < 1e-9);
    }

    #[test]
    fn test_direction() {
        let cw = MotionProfile::symmetric(100, 50.0, 50.0);
        let ccw = MotionProfile::symmetric(-100, 50.0, 50.0);

        assert_eq!(cw.direction, Direction::Clockwise);
        assert_eq!(ccw.direction, Direction::CounterClockwise);
        assert_eq!(cw.total_steps, ccw.total_steps);
        assert_eq!(cw.stop_margin, ccw.stop_margin);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(MotionProfile::symmetric(0, 50.0, 50.0).is_zero());
        assert!(MotionProfile::symmetric(100, 0.0, 50.0).is_zero());
        assert!(MotionProfile::plan(100, 50.0, 50.0, -1.0).is_zero());
        assert!(MotionProfile::plan(100, f32::NAN, 50.0, 50.0).is_zero());
    }
}
