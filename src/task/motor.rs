//! Motor execution context.
//!
//! The only owner of the [`MotionController`]. Takes one command at a time
//! from the bus, runs it to completion, dwells, and reacts to the emergency
//! gate by stopping, parking and later resuming from the last position.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;

use super::bus::{ControlBus, EmergencyState, StatusSnapshot};
use super::intake::MotorParameters;
use crate::config::units::{Steps, StepsPerSec, StepsPerSecSquared};
use crate::config::TimingConfig;
use crate::error::Result;
use crate::feedback::FeedbackSink;
use crate::motion::{MotionController, Tick};
use crate::motor::CoilOutput;

/// Motor task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorTaskState {
    /// Polling the command queue.
    AwaitingCommand,
    /// Ticking the controller.
    Moving,
    /// Pausing after a move.
    Dwelling {
        /// When the pause ends.
        until_ms: u64,
    },
    /// Stopped by an emergency; coils disabled.
    Parked,
}

/// Outcome of one [`MotorTask::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPoll {
    /// State after the poll.
    pub state: MotorTaskState,
    /// How long the caller may sleep before polling again.
    pub sleep_ms: u32,
}

/// Drives one motor from the command queue.
pub struct MotorTask<'a, C, F, M, const N: usize>
where
    C: CoilOutput,
    F: FeedbackSink,
    M: RawMutex,
{
    controller: MotionController<C>,
    feedback: F,
    bus: &'a ControlBus<M, N>,
    timing: TimingConfig,
    state: MotorTaskState,
    dwell_ms: u64,
    stop_requested: bool,
    completed_moves: u32,
}

impl<'a, C, F, M, const N: usize> MotorTask<'a, C, F, M, N>
where
    C: CoilOutput,
    F: FeedbackSink,
    M: RawMutex,
{
    /// Create a task with the default timing.
    pub fn new(controller: MotionController<C>, feedback: F, bus: &'a ControlBus<M, N>) -> Self {
        Self::with_timing(controller, feedback, bus, TimingConfig::default())
    }

    /// Create a task with explicit timing.
    pub fn with_timing(
        controller: MotionController<C>,
        feedback: F,
        bus: &'a ControlBus<M, N>,
        timing: TimingConfig,
    ) -> Self {
        Self {
            controller,
            feedback,
            bus,
            timing,
            state: MotorTaskState::AwaitingCommand,
            dwell_ms: 0,
            stop_requested: false,
            completed_moves: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> MotorTaskState {
        self.state
    }

    /// The controller being driven.
    pub fn controller(&self) -> &MotionController<C> {
        &self.controller
    }

    /// Moves that ran to their (possibly shortened) goal.
    pub fn completed_moves(&self) -> u32 {
        self.completed_moves
    }

    /// The feedback sink.
    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    /// Release the controller and the feedback sink.
    pub fn release(self) -> (MotionController<C>, F) {
        (self.controller, self.feedback)
    }

    /// Do one slice of work.
    ///
    /// `now_ms` is a monotonic millisecond timestamp. At most one step is
    /// emitted per call.
    pub fn poll(&mut self, now_ms: u64) -> Result<TaskPoll> {
        let sleep_ms = match self.bus.gate.state() {
            EmergencyState::Stopped => self.park()?,
            EmergencyState::Stopping => self.wind_down(now_ms)?,
            EmergencyState::Normal => {
                if self.state == MotorTaskState::Parked {
                    self.resume();
                }
                self.run(now_ms)?
            }
        };

        Ok(TaskPoll {
            state: self.state,
            sleep_ms,
        })
    }

    /// Poll against a virtual clock starting at `now_ms`, sleeping on
    /// `delay`, until `done` returns true. Returns the final clock value.
    pub fn run_until<D, P>(&mut self, delay: &mut D, mut now_ms: u64, mut done: P) -> Result<u64>
    where
        D: DelayNs,
        P: FnMut(&Self) -> bool,
    {
        while !done(self) {
            let poll = self.poll(now_ms)?;
            if poll.sleep_ms > 0 {
                delay.delay_ms(poll.sleep_ms);
                now_ms += poll.sleep_ms as u64;
            }
        }
        Ok(now_ms)
    }

    fn idle(&self) -> u32 {
        self.timing.idle_poll_ms.0
    }

    fn run(&mut self, now_ms: u64) -> Result<u32> {
        match self.state {
            MotorTaskState::AwaitingCommand => match self.bus.commands.try_receive() {
                Ok(command) => {
                    self.start(command);
                    self.step(now_ms)
                }
                Err(_) => Ok(self.idle()),
            },
            MotorTaskState::Moving => self.step(now_ms),
            MotorTaskState::Dwelling { until_ms } => {
                if now_ms >= until_ms {
                    self.state = MotorTaskState::AwaitingCommand;
                    Ok(0)
                } else {
                    Ok(((until_ms - now_ms) as u32).min(self.idle()))
                }
            }
            MotorTaskState::Parked => Ok(self.idle()),
        }
    }

    fn wind_down(&mut self, now_ms: u64) -> Result<u32> {
        match self.state {
            MotorTaskState::Moving => {
                if !self.stop_requested {
                    self.controller.request_stop();
                    self.stop_requested = true;
                }
                self.step(now_ms)
            }
            MotorTaskState::Dwelling { .. } => {
                debug!("dwell abandoned for emergency stop");
                self.state = MotorTaskState::AwaitingCommand;
                Ok(self.idle())
            }
            _ => Ok(self.idle()),
        }
    }

    fn park(&mut self) -> Result<u32> {
        if self.state != MotorTaskState::Parked {
            self.controller.disable()?;
            self.feedback.motion_idle();
            self.state = MotorTaskState::Parked;
            self.stop_requested = false;
            self.publish();
            warn!(
                "motor parked at position {}",
                self.controller.current_position().0
            );
        }
        Ok(self.idle())
    }

    fn resume(&mut self) {
        self.controller.abort();
        self.state = MotorTaskState::AwaitingCommand;
        self.publish();
        info!(
            "motor resumed at position {}",
            self.controller.current_position().0
        );
    }

    fn start(&mut self, command: MotorParameters) {
        info!(
            "command received: {} -> {}, speed {}, accel {}, decel {}, mode {}, dwell {} ms",
            command.current_position,
            command.final_position,
            command.rotational_speed,
            command.rotational_accel,
            command.rotational_decel,
            command.step_mode.index(),
            command.dwell_ms
        );

        let c = &mut self.controller;
        c.set_speed(StepsPerSec(command.rotational_speed));
        c.set_acceleration(StepsPerSecSquared(command.rotational_accel));
        c.set_deceleration(StepsPerSecSquared(command.rotational_decel));
        c.set_position(Steps(command.current_position));
        c.set_step_mode(command.step_mode);
        self.feedback.step_mode(command.step_mode);
        c.move_to(Steps(command.final_position));

        self.dwell_ms = command.dwell_ms.max(0) as u64;
        self.stop_requested = false;
        self.state = MotorTaskState::Moving;
    }

    fn step(&mut self, now_ms: u64) -> Result<u32> {
        let tick = self.controller.tick(now_ms)?;
        self.publish();

        match tick {
            Tick::Pending => Ok(self
                .controller
                .time_to_next_step(now_ms)
                .saturating_sub(self.timing.lookahead_ms.0)
                .max(1)),
            Tick::Stepped { sleep_hint_ms } => Ok(sleep_hint_ms.unwrap_or(0)),
            Tick::Arrived | Tick::Complete => {
                self.finish(now_ms)?;
                Ok(0)
            }
        }
    }

    fn finish(&mut self, now_ms: u64) -> Result<()> {
        self.controller.disable()?;
        self.feedback.motion_idle();
        self.completed_moves = self.completed_moves.saturating_add(1);
        info!(
            "move finished at position {}",
            self.controller.current_position().0
        );

        self.state = if self.stop_requested {
            MotorTaskState::AwaitingCommand
        } else {
            MotorTaskState::Dwelling {
                until_ms: now_ms + self.dwell_ms,
            }
        };
        Ok(())
    }

    fn publish(&self) {
        self.bus.status.publish(StatusSnapshot {
            position: self.controller.current_position().0,
            speed: self.controller.current_speed(),
            complete: self.controller.is_complete(),
        });
    }
}
