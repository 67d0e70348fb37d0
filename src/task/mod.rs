//! Task layer: the command pipeline around the motion core.
//!
//! Three execution contexts share one [`ControlBus`]:
//!
//! - the intake ([`CommandIntake`]) parses and clamps commands and queues them;
//! - the motor task ([`MotorTask`]) owns the controller and runs one command
//!   at a time;
//! - the emergency side ([`ButtonMonitor`], [`EmergencyCoordinator`]) stops,
//!   parks and releases the motor through the emergency gate.
//!
//! Every type is poll-driven and takes the current time in milliseconds, so
//! the same code runs under an RTOS, an async executor or a host test loop.

mod bus;
mod emergency;
mod intake;
mod motor;

pub use bus::{
    ControlBus, EmergencyEvent, EmergencyGate, EmergencyState, MotorStatus, StatusSnapshot,
    DEFAULT_QUEUE_DEPTH, FEEDBACK_QUEUE_DEPTH,
};
pub use emergency::{AlarmBlinker, ButtonMonitor, CoordinatorPhase, Debouncer, EmergencyCoordinator};
pub use intake::{check_kinematics, clamp_parameters, CommandIntake, MotorParameters, ParameterField};
pub use motor::{MotorTask, MotorTaskState, TaskPoll};
