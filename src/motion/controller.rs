//! Motion controller - ramp execution on a periodic tick.

use embedded_hal::delay::DelayNs;
use libm::roundf;

use super::profile::{Direction, MotionProfile};
use super::sequencer::{StepMode, StepSequencer};
use crate::config::units::{Steps, StepsPerSec, StepsPerSecSquared};
use crate::config::{CoilPattern, CoilTable, MotorDefaults, SystemConfig, TimingConfig};
use crate::error::{MotorError, Result};
use crate::motor::CoilOutput;

/// Coarse controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerState {
    /// No move has been set up since power-on or the last abort.
    Idle,
    /// Accelerating, cruising or decelerating toward the goal.
    Ramping,
    /// Goal reached.
    Complete,
}

/// Result of one [`MotionController::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tick {
    /// Not yet time for the next step.
    Pending,
    /// One step emitted; more remain.
    Stepped {
        /// How long the caller may sleep before ticking again, if worth it.
        sleep_hint_ms: Option<u32>,
    },
    /// The final step of the move was just emitted.
    Arrived,
    /// Nothing to do: already at the goal.
    Complete,
}

impl Tick {
    /// Whether the move is over after this tick.
    #[inline]
    pub fn is_done(self) -> bool {
        matches!(self, Tick::Arrived | Tick::Complete)
    }
}

/// Per-move ramp state, reinitialised by every move setup.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionState {
    /// Current absolute position in steps.
    pub current_position: i64,
    /// Goal position in steps.
    pub goal_position: i64,
    /// Direction of the current move.
    pub direction: Direction,
    /// Period of the last emitted step in ms (0 when at rest).
    pub current_step_period: f32,
    /// Period to wait before the next step in ms.
    pub next_step_period: f32,
    /// Lower bound on the step period in ms.
    pub cruise_step_period: f32,
    /// Signed ramp rate in steps/ms²; negative once decelerating.
    pub accel_rate: f32,
    /// Deceleration rate in steps/ms².
    pub decel_rate: f32,
    /// Steps needed to decelerate to rest.
    pub stop_margin: u64,
    /// Set until the first tick of a move records its start time.
    pub is_new_move: bool,
    /// Timestamp of the last emitted step in ms.
    pub last_step_ms: u64,
}

impl MotionState {
    fn at_rest(position: i64) -> Self {
        Self {
            current_position: position,
            goal_position: position,
            direction: Direction::Clockwise,
            current_step_period: 0.0,
            next_step_period: 0.0,
            cruise_step_period: 0.0,
            accel_rate: 0.0,
            decel_rate: 0.0,
            stop_margin: 0,
            is_new_move: false,
            last_step_ms: 0,
        }
    }

    /// Steps left to the goal.
    #[inline]
    pub fn distance_to_go(&self) -> u64 {
        (self.goal_position - self.current_position).unsigned_abs()
    }

    /// Steps needed to come to rest from the current speed at the
    /// deceleration rate; 0 before the first step.
    pub fn braking_distance(&self) -> u64 {
        if self.current_step_period <= 0.0 || !(self.decel_rate > 0.0) {
            return 0;
        }
        // v² / 2d, with v in steps/ms and d in steps/ms²
        let speed = 1.0 / self.current_step_period;
        roundf(speed * speed / (2.0 * self.decel_rate)) as u64
    }

    /// Whether the ramp has switched to deceleration.
    #[inline]
    pub fn is_decelerating(&self) -> bool {
        self.accel_rate < 0.0
    }
}

/// Stepper motion controller.
///
/// Owns the ramp state, the phase sequencer and the coil outputs. Exactly one
/// execution context should own a controller and call [`tick`](Self::tick);
/// other contexts observe it through [`MotorStatus`](crate::task::MotorStatus).
pub struct MotionController<C: CoilOutput> {
    coils: C,
    sequencer: StepSequencer,
    step_mode: StepMode,
    speed: StepsPerSec,
    acceleration: StepsPerSecSquared,
    deceleration: StepsPerSecSquared,
    timing: TimingConfig,
    motion: MotionState,
    state: ControllerState,
}

impl<C: CoilOutput> MotionController<C> {
    /// Create a controller with the default kinematics and coil table.
    pub fn new(coils: C) -> Self {
        Self::with_parts(
            coils,
            CoilTable::default(),
            &MotorDefaults::default(),
            TimingConfig::default(),
        )
    }

    /// Create a controller from a system configuration.
    pub fn from_config(coils: C, config: &SystemConfig) -> Self {
        Self::with_parts(
            coils,
            config.coils.clone(),
            &config.defaults,
            config.timing.clone(),
        )
    }

    /// Create a controller from its individual parts.
    pub fn with_parts(
        coils: C,
        table: CoilTable,
        defaults: &MotorDefaults,
        timing: TimingConfig,
    ) -> Self {
        Self {
            coils,
            sequencer: StepSequencer::new(table),
            step_mode: defaults.step_mode,
            speed: defaults.speed,
            acceleration: defaults.acceleration,
            deceleration: defaults.deceleration,
            timing,
            motion: MotionState::at_rest(0),
            state: ControllerState::Idle,
        }
    }

    /// Set the requested cruise speed for subsequent moves.
    pub fn set_speed(&mut self, speed: StepsPerSec) {
        self.speed = speed;
    }

    /// Set the acceleration for subsequent moves.
    pub fn set_acceleration(&mut self, acceleration: StepsPerSecSquared) {
        self.acceleration = acceleration;
    }

    /// Set the deceleration for subsequent moves.
    pub fn set_deceleration(&mut self, deceleration: StepsPerSecSquared) {
        self.deceleration = deceleration;
    }

    /// Select the stepping mode; takes effect on the next step.
    pub fn set_step_mode(&mut self, mode: StepMode) {
        self.step_mode = mode;
    }

    /// Redefine the current position without moving.
    ///
    /// Meant for use at rest; a move in progress is abandoned.
    pub fn set_position(&mut self, position: Steps) {
        if self.state == ControllerState::Ramping {
            warn!("position redefined mid-move, move abandoned");
        }
        self.motion = MotionState::at_rest(position.0);
        self.state = ControllerState::Idle;
    }

    /// Abandon any move and come to rest at the current position.
    pub fn abort(&mut self) {
        let position = self.motion.current_position;
        self.motion = MotionState::at_rest(position);
        self.state = ControllerState::Idle;
    }

    /// Set up a move to an absolute position.
    ///
    /// A move already in progress is abandoned where it stands; ramps are
    /// never blended.
    pub fn move_to(&mut self, target: Steps) {
        let start = self.motion.current_position;
        let profile = MotionProfile::plan(
            (target - Steps(start)).0,
            self.speed.0,
            self.acceleration.0,
            self.deceleration.0,
        );

        self.motion = MotionState::at_rest(start);
        self.motion.goal_position = target.0;

        if profile.is_zero() {
            self.motion.goal_position = start;
            self.state = ControllerState::Complete;
            return;
        }

        self.motion.direction = profile.direction;
        // Slow cruise speeds start at cruise, never faster.
        self.motion.next_step_period = profile.initial_step_period.max(profile.cruise_step_period);
        self.motion.cruise_step_period = profile.cruise_step_period;
        self.motion.accel_rate = profile.accel_rate;
        self.motion.decel_rate = profile.decel_rate;
        self.motion.stop_margin = profile.stop_margin;
        self.motion.is_new_move = true;
        self.state = ControllerState::Ramping;

        debug!(
            "move {} -> {}: cruise {} ms, first step {} ms, stop margin {}",
            start,
            target.0,
            profile.cruise_step_period,
            self.motion.next_step_period,
            profile.stop_margin
        );
    }

    /// Set up a move relative to the current position.
    pub fn move_by(&mut self, delta: Steps) {
        self.move_to(self.current_position() + delta);
    }

    /// Shorten the current move to a controlled stop.
    ///
    /// The goal is pulled in to the steps needed to shed the current speed,
    /// never more than the planned `stop_margin`, so the following ticks
    /// decelerate at the commanded rate without replanning.
    pub fn request_stop(&mut self) {
        if self.state != ControllerState::Ramping {
            return;
        }

        let margin = self
            .motion
            .stop_margin
            .min(self.motion.braking_distance())
            .min(self.motion.distance_to_go());
        self.motion.stop_margin = margin;
        self.motion.goal_position =
            self.motion.current_position + self.motion.direction.sign() * margin as i64;
        info!(
            "stop requested at {}, halting at {}",
            self.motion.current_position,
            self.motion.goal_position
        );
    }

    /// Advance the ramp; emits at most one physical step.
    ///
    /// `now_ms` is a monotonic millisecond timestamp.
    pub fn tick(&mut self, now_ms: u64) -> Result<Tick> {
        if self.state != ControllerState::Ramping {
            return Ok(Tick::Complete);
        }

        let motion = &mut self.motion;
        if motion.current_position == motion.goal_position {
            motion.current_step_period = 0.0;
            self.state = ControllerState::Complete;
            return Ok(Tick::Complete);
        }

        if motion.is_new_move {
            motion.last_step_ms = now_ms;
            motion.is_new_move = false;
        }

        let elapsed = now_ms.saturating_sub(motion.last_step_ms);
        if elapsed < motion.next_step_period as u64 {
            return Ok(Tick::Pending);
        }

        // One-way switch to deceleration.
        if motion.distance_to_go() <= motion.stop_margin {
            motion.accel_rate = -motion.decel_rate;
        }

        let pattern = self.sequencer.advance(self.step_mode, motion.direction);
        self.coils.write_pattern(pattern).map_err(|_| MotorError::PinError)?;

        motion.current_position += motion.direction.sign();
        motion.current_step_period = motion.next_step_period;

        // Discrete integration of the ramp law, using the previous period squared.
        let period = motion.next_step_period;
        motion.next_step_period = period * (1.0 - motion.accel_rate * period * period);
        if motion.next_step_period < motion.cruise_step_period {
            motion.next_step_period = motion.cruise_step_period;
        }

        motion.last_step_ms = now_ms;

        if motion.current_position == motion.goal_position {
            motion.current_step_period = 0.0;
            self.state = ControllerState::Complete;
            return Ok(Tick::Arrived);
        }

        let sleep_hint_ms = if roundf(motion.next_step_period) > self.timing.sleep_threshold_ms.0 as f32 {
            Some((roundf(motion.next_step_period) as u32).saturating_sub(self.timing.lookahead_ms.0))
        } else {
            None
        };

        Ok(Tick::Stepped { sleep_hint_ms })
    }

    /// De-energise all windings. Idempotent.
    pub fn disable(&mut self) -> Result<()> {
        self.coils
            .write_pattern(CoilPattern::OFF)
            .map_err(|_| MotorError::PinError)?;
        Ok(())
    }

    /// Milliseconds until the next step is due; 0 when due or not ramping.
    pub fn time_to_next_step(&self, now_ms: u64) -> u32 {
        if self.state != ControllerState::Ramping {
            return 0;
        }
        if self.motion.is_new_move {
            return self.motion.next_step_period as u32;
        }
        let due = self.motion.last_step_ms + self.motion.next_step_period as u64;
        due.saturating_sub(now_ms).min(u32::MAX as u64) as u32
    }

    /// Run the current move to completion, sleeping on `delay` between ticks,
    /// then disable the coils.
    pub fn run_to_completion<D: DelayNs>(&mut self, delay: &mut D) -> Result<()> {
        let mut now_ms: u64 = 0;
        loop {
            let sleep_ms = match self.tick(now_ms)? {
                Tick::Arrived | Tick::Complete => break,
                Tick::Pending => self.time_to_next_step(now_ms).max(1),
                Tick::Stepped { sleep_hint_ms } => sleep_hint_ms.unwrap_or(0),
            };
            if sleep_ms > 0 {
                delay.delay_ms(sleep_ms);
                now_ms += sleep_ms as u64;
            }
        }
        self.disable()
    }

    /// Move to an absolute position and run to completion (blocking).
    pub fn move_to_blocking<D: DelayNs>(&mut self, target: Steps, delay: &mut D) -> Result<()> {
        self.move_to(target);
        self.run_to_completion(delay)
    }

    /// Signed speed in steps/sec; 0 at rest.
    pub fn current_speed(&self) -> f32 {
        if self.motion.current_step_period == 0.0 {
            0.0
        } else {
            self.motion.direction.sign() as f32 * 1000.0 / self.motion.current_step_period
        }
    }

    /// Current absolute position.
    #[inline]
    pub fn current_position(&self) -> Steps {
        Steps(self.motion.current_position)
    }

    /// Goal of the current (or last) move.
    #[inline]
    pub fn goal_position(&self) -> Steps {
        Steps(self.motion.goal_position)
    }

    /// Whether the motor is at its goal.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.motion.current_position == self.motion.goal_position
    }

    /// Coarse controller state.
    #[inline]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Ramp state of the current move.
    #[inline]
    pub fn motion_state(&self) -> &MotionState {
        &self.motion
    }

    /// Selected stepping mode.
    #[inline]
    pub fn step_mode(&self) -> StepMode {
        self.step_mode
    }

    /// Requested cruise speed.
    #[inline]
    pub fn speed(&self) -> StepsPerSec {
        self.speed
    }

    /// Configured acceleration.
    #[inline]
    pub fn acceleration(&self) -> StepsPerSecSquared {
        self.acceleration
    }

    /// Configured deceleration.
    #[inline]
    pub fn deceleration(&self) -> StepsPerSecSquared {
        self.deceleration
    }

    /// Current sequencer phase index.
    #[inline]
    pub fn phase(&self) -> u8 {
        self.sequencer.phase()
    }

    /// Borrow the coil outputs.
    #[inline]
    pub fn coils(&self) -> &C {
        &self.coils
    }

    /// Release the coil outputs.
    pub fn release(self) -> C {
        self.coils
    }
}
