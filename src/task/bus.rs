//! Shared queues and cells connecting the tasks.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;

use super::intake::MotorParameters;
use crate::feedback::FeedbackEvent;

/// Command queue depth used by the lab firmware.
pub const DEFAULT_QUEUE_DEPTH: usize = 25;

/// Feedback queue depth.
pub const FEEDBACK_QUEUE_DEPTH: usize = 4;

/// Event on the emergency channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EmergencyEvent {
    /// Debounced button press: triggers when normal, resets when stopped.
    Pressed,
    /// Trigger an emergency stop unconditionally.
    Trigger,
    /// Leave the stopped state unconditionally.
    Reset,
}

/// Emergency state shared by every task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EmergencyState {
    /// Commands flow and moves run.
    #[default]
    Normal,
    /// A stop was requested; the motor is decelerating.
    Stopping,
    /// The motor is at rest and disabled until reset.
    Stopped,
}

/// Emergency state cell.
///
/// Written only by the [`EmergencyCoordinator`](super::EmergencyCoordinator);
/// everything else reads it.
pub struct EmergencyGate<M: RawMutex> {
    state: Mutex<M, Cell<EmergencyState>>,
}

impl<M: RawMutex> EmergencyGate<M> {
    /// Create a gate in the normal state.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(EmergencyState::Normal)),
        }
    }

    /// Current state.
    pub fn state(&self) -> EmergencyState {
        self.state.lock(|s| s.get())
    }

    /// Whether commands may be forwarded to the motor.
    pub fn is_open(&self) -> bool {
        self.state() == EmergencyState::Normal
    }

    pub(crate) fn set(&self, state: EmergencyState) {
        self.state.lock(|s| s.set(state));
    }
}

impl<M: RawMutex> Default for EmergencyGate<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the motor published after every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusSnapshot {
    /// Absolute position in steps.
    pub position: i64,
    /// Signed speed in steps/sec, 0 at rest.
    pub speed: f32,
    /// Whether the motor is at its goal.
    pub complete: bool,
}

impl StatusSnapshot {
    /// Motor at rest at position zero.
    pub const fn at_rest() -> Self {
        Self {
            position: 0,
            speed: 0.0,
            complete: true,
        }
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::at_rest()
    }
}

/// Last published motor status.
pub struct MotorStatus<M: RawMutex> {
    snapshot: Mutex<M, Cell<StatusSnapshot>>,
}

impl<M: RawMutex> MotorStatus<M> {
    /// Create a status cell at rest.
    pub const fn new() -> Self {
        Self {
            snapshot: Mutex::new(Cell::new(StatusSnapshot::at_rest())),
        }
    }

    /// Latest snapshot.
    pub fn get(&self) -> StatusSnapshot {
        self.snapshot.lock(|s| s.get())
    }

    /// Latest position.
    pub fn current_position(&self) -> i64 {
        self.get().position
    }

    /// Latest speed.
    pub fn current_speed(&self) -> f32 {
        self.get().speed
    }

    /// Whether the motor was at its goal.
    pub fn is_complete(&self) -> bool {
        self.get().complete
    }

    pub(crate) fn publish(&self, snapshot: StatusSnapshot) {
        self.snapshot.lock(|s| s.set(snapshot));
    }
}

impl<M: RawMutex> Default for MotorStatus<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Every queue and shared cell the tasks communicate through.
///
/// Usually placed in a `static` with `CriticalSectionRawMutex`:
///
/// ```rust,ignore
/// static BUS: ControlBus<CriticalSectionRawMutex, DEFAULT_QUEUE_DEPTH> = ControlBus::new();
/// ```
pub struct ControlBus<M: RawMutex, const N: usize> {
    /// Validated commands, FIFO.
    pub commands: Channel<M, MotorParameters, N>,
    /// Emergency button and remote events.
    pub emergency: Channel<M, EmergencyEvent, 1>,
    /// Step mode, idle and alarm notifications for the LEDs.
    pub feedback: Channel<M, FeedbackEvent, FEEDBACK_QUEUE_DEPTH>,
    /// Emergency state.
    pub gate: EmergencyGate<M>,
    /// Published motor status.
    pub status: MotorStatus<M>,
}

impl<M: RawMutex, const N: usize> ControlBus<M, N> {
    /// Create an empty bus.
    pub const fn new() -> Self {
        Self {
            commands: Channel::new(),
            emergency: Channel::new(),
            feedback: Channel::new(),
            gate: EmergencyGate::new(),
            status: MotorStatus::new(),
        }
    }

    /// Post an emergency event without blocking.
    ///
    /// Returns `false` (and logs) if an event is already pending.
    pub fn post_emergency(&self, event: EmergencyEvent) -> bool {
        match self.emergency.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                warn!("emergency event dropped, one already pending");
                false
            }
        }
    }

    /// Commands waiting for the motor.
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }
}

impl<M: RawMutex, const N: usize> Default for ControlBus<M, N> {
    fn default() -> Self {
        Self::new()
    }
}
