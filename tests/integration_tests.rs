//! Integration tests for the stepper-ramp library.
//!
//! These tests drive the full pipeline (intake, queue, motor task, emergency
//! coordinator) against a virtual millisecond clock.

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
use embedded_hal::delay::DelayNs;
use embedded_hal_mock::eh1::delay::NoopDelay;

use critical_section as _;

use stepper_ramp::config::{parse_config, IntakeConfig, OperatingEnvelope};
use stepper_ramp::error::{Error, IntakeError};
use stepper_ramp::task::{CoordinatorPhase, MotorTaskState, DEFAULT_QUEUE_DEPTH};
use stepper_ramp::{
    CoilPattern, CommandIntake, ControlBus, EmergencyCoordinator, EmergencyEvent, EmergencyState,
    MotionController, MotionControllerBuilder, MotorTask, NullFeedback, QueuedFeedback,
    RecordingCoils, StepMode, Steps,
};

// =============================================================================
// Test fakes
// =============================================================================

/// Delay that only adds up the time it was asked to wait.
#[derive(Default)]
struct CountingDelay {
    total_ns: u64,
}

impl DelayNs for CountingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}

fn intake() -> CommandIntake {
    CommandIntake::new(OperatingEnvelope::default(), IntakeConfig::default())
}

// =============================================================================
// Blocking moves
// =============================================================================

#[test]
fn blocking_move_from_config() {
    let config = parse_config(
        r#"
[defaults]
speed = 60.0
acceleration = 80.0
deceleration = 40.0
step_mode = "full"
"#,
    )
    .expect("Config should parse");

    let mut motor = MotionControllerBuilder::new()
        .from_config(&config)
        .coils(RecordingCoils::default())
        .build()
        .expect("Controller should build");

    let mut delay = CountingDelay::default();
    motor
        .move_to_blocking(Steps(-200), &mut delay)
        .expect("Move should complete");

    assert_eq!(motor.current_position(), Steps(-200));
    assert_eq!(motor.current_speed(), 0.0);
    assert_eq!(motor.coils().steps(), 200);
    assert_eq!(motor.coils().last(), Some(CoilPattern::OFF));

    // 200 steps at no more than 60 steps/s takes well over 3 s
    assert!(delay.total_ns > 3_000_000_000);
}

#[test]
fn relative_moves_accumulate() {
    let mut motor = MotionController::new(RecordingCoils::default());
    motor.set_step_mode(StepMode::Half);

    let mut delay = NoopDelay::new();
    motor.move_by(Steps(30));
    motor.run_to_completion(&mut delay).unwrap();
    motor.move_by(Steps(-45));
    motor.run_to_completion(&mut delay).unwrap();

    assert_eq!(motor.current_position(), Steps(-15));
    assert_eq!(motor.coils().steps(), 75);
}

// =============================================================================
// Command pipeline
// =============================================================================

#[test]
fn command_move_then_dwell() {
    let bus = ControlBus::<NoopRawMutex, DEFAULT_QUEUE_DEPTH>::new();
    let mut intake = intake();
    let mut task = MotorTask::new(
        MotionController::new(RecordingCoils::default()),
        QueuedFeedback::new(&bus.feedback),
        &bus,
    );

    let mut delay = NoopDelay::new();
    intake
        .handle_query("GET /setParams?rs=80&ra=60&rd=60&cis=100&fis=20&sm=1&dt=750 HTTP/1.1", &bus, &mut delay)
        .expect("Command should be queued");

    let now = task
        .run_until(&mut delay, 0, |t| t.completed_moves() == 1)
        .unwrap();

    assert_eq!(bus.status.current_position(), 20);
    assert!(bus.status.is_complete());
    assert_eq!(task.controller().step_mode(), StepMode::Full);
    assert_eq!(task.controller().coils().steps(), 80);
    assert!(matches!(task.state(), MotorTaskState::Dwelling { until_ms } if until_ms == now + 750));

    // The next command waits for the dwell to end.
    intake.handle_query("fis=60", &bus, &mut delay).unwrap();
    task.poll(now + 100).unwrap();
    assert_eq!(bus.pending_commands(), 1);

    task.run_until(&mut delay, now + 750, |t| t.completed_moves() == 2)
        .unwrap();
    assert_eq!(bus.status.current_position(), 60);
}

#[test]
fn oversized_speed_is_clamped_before_the_queue() {
    let bus = ControlBus::<NoopRawMutex, 4>::new();
    let mut intake = intake();

    intake.apply_query("rs=1000000&ra=50&rd=50&fis=100");
    let queued = intake.try_submit(&bus).expect("Command should be queued");

    assert!(queued.rotational_speed <= OperatingEnvelope::default().max_speed);
    assert_eq!(bus.commands.try_receive().unwrap().rotational_speed, 50.0);
}

#[test]
fn zero_speed_command_is_rejected() {
    let bus = ControlBus::<NoopRawMutex, 4>::new();
    let mut intake = intake();

    intake.apply_query("ra=50&rd=50&fis=100");
    assert_eq!(
        intake.try_submit(&bus).unwrap_err(),
        Error::Intake(IntakeError::DegenerateKinematics("rotational_speed"))
    );
    assert_eq!(bus.pending_commands(), 0);
}

#[test]
fn full_queue_drops_newest_after_retries() {
    let bus = ControlBus::<NoopRawMutex, 2>::new();
    let mut intake = intake();
    let mut delay = CountingDelay::default();

    intake.apply_query("rs=50&ra=50&rd=50");
    for target in ["fis=10", "fis=20"] {
        intake.handle_query(target, &bus, &mut delay).unwrap();
    }
    assert_eq!(
        intake.handle_query("fis=30", &bus, &mut delay).unwrap_err(),
        Error::Intake(IntakeError::QueueFull)
    );

    // Five retries, 100 ms apart
    assert_eq!(delay.total_ns, 500_000_000);
    assert_eq!(bus.commands.try_receive().unwrap().final_position, 10);
    assert_eq!(bus.commands.try_receive().unwrap().final_position, 20);
}

// =============================================================================
// Emergency stop
// =============================================================================

#[test]
fn emergency_at_step_fifty_stops_within_margin() {
    let bus = ControlBus::<NoopRawMutex, 4>::new();
    let mut intake = intake();
    let mut task = MotorTask::new(
        MotionController::new(RecordingCoils::default()),
        NullFeedback,
        &bus,
    );
    let mut coordinator = EmergencyCoordinator::new(&bus, &Default::default());
    let mut feedback = NullFeedback;

    // 40² / (2·40) = 20 steps to stop
    intake.apply_query("rs=40&ra=100&rd=40&cis=0&fis=100");
    intake.try_submit(&bus).unwrap();

    let mut now = 0;
    while bus.status.current_position() < 50 {
        task.poll(now).unwrap();
        coordinator.poll(now, &mut feedback);
        now += 1;
    }
    assert_eq!(task.controller().motion_state().stop_margin, 20);
    assert_eq!(bus.status.current_position(), 50);

    assert!(bus.post_emergency(EmergencyEvent::Pressed));
    while coordinator.poll(now, &mut feedback) != CoordinatorPhase::Recovering {
        task.poll(now).unwrap();
        now += 1;
    }

    let stopped_at = bus.status.current_position();
    assert!(stopped_at > 50 && stopped_at <= 71, "stopped at {}", stopped_at);
    assert_eq!(bus.status.current_speed(), 0.0);

    assert_eq!(task.poll(now).unwrap().state, MotorTaskState::Parked);
    assert_eq!(task.controller().coils().last(), Some(CoilPattern::OFF));
    assert_eq!(bus.gate.state(), EmergencyState::Stopped);

    // Parked means parked: nothing moves until the reset.
    let steps = task.controller().coils().steps();
    for t in now..now + 1000 {
        task.poll(t).unwrap();
    }
    assert_eq!(task.controller().coils().steps(), steps);
}

#[test]
fn emergency_while_accelerating_parks_promptly() {
    let bus = ControlBus::<NoopRawMutex, 4>::new();
    let mut intake = intake();
    let mut task = MotorTask::new(
        MotionController::new(RecordingCoils::default()),
        NullFeedback,
        &bus,
    );
    let mut coordinator = EmergencyCoordinator::new(&bus, &Default::default());
    let mut feedback = NullFeedback;

    intake.apply_query("rs=100&ra=100&rd=100&cis=0&fis=1000");
    intake.try_submit(&bus).unwrap();

    let mut now = 0;
    while bus.status.current_position() < 3 {
        task.poll(now).unwrap();
        coordinator.poll(now, &mut feedback);
        now += 1;
    }

    assert!(bus.post_emergency(EmergencyEvent::Pressed));
    let deadline = now + 2_000;
    while coordinator.poll(now, &mut feedback) != CoordinatorPhase::Recovering {
        assert!(now < deadline, "still stopping at {} ms", now);
        task.poll(now).unwrap();
        now += 1;
    }

    let stopped_at = bus.status.current_position();
    assert!(stopped_at > 3 && stopped_at < 50, "stopped at {}", stopped_at);
    assert_eq!(bus.status.current_speed(), 0.0);
    assert_eq!(task.poll(now).unwrap().state, MotorTaskState::Parked);
    assert_eq!(task.controller().coils().last(), Some(CoilPattern::OFF));

    // The reset press is honoured once parked.
    bus.post_emergency(EmergencyEvent::Pressed);
    assert_eq!(coordinator.poll(now + 1, &mut feedback), CoordinatorPhase::Normal);
    assert_eq!(
        task.poll(now + 2).unwrap().state,
        MotorTaskState::AwaitingCommand
    );
}

#[test]
fn commands_queued_during_emergency_run_after_reset() {
    let bus = ControlBus::<NoopRawMutex, DEFAULT_QUEUE_DEPTH>::new();
    let mut intake = intake();
    let mut task = MotorTask::new(
        MotionController::new(RecordingCoils::default()),
        NullFeedback,
        &bus,
    );
    let mut coordinator = EmergencyCoordinator::new(&bus, &Default::default());
    let mut feedback = NullFeedback;

    intake.apply_query("rs=50&ra=50&rd=50&cis=0&fis=500");
    intake.try_submit(&bus).unwrap();
    intake.apply_query("cis=0&fis=300");
    intake.try_submit(&bus).unwrap();

    let mut now = 0;
    while bus.status.current_position() < 100 {
        task.poll(now).unwrap();
        now += 1;
    }

    bus.post_emergency(EmergencyEvent::Trigger);
    while coordinator.poll(now, &mut feedback) != CoordinatorPhase::Recovering {
        task.poll(now).unwrap();
        now += 1;
    }
    task.poll(now).unwrap();
    let parked_at = bus.status.current_position();

    // Held, not applied
    intake.apply_query("cis=0&fis=40");
    intake.try_submit(&bus).unwrap();
    for t in now..now + 500 {
        task.poll(t).unwrap();
    }
    now += 500;
    assert_eq!(bus.pending_commands(), 2);
    assert_eq!(bus.status.current_position(), parked_at);

    bus.post_emergency(EmergencyEvent::Pressed);
    assert_eq!(coordinator.poll(now, &mut feedback), CoordinatorPhase::Normal);

    let mut delay = NoopDelay::new();
    task.run_until(&mut delay, now, |t| t.completed_moves() == 3)
        .unwrap();
    assert_eq!(bus.status.current_position(), 40);
    assert_eq!(bus.pending_commands(), 0);
}

// =============================================================================
// Threaded producer
// =============================================================================

static BUS: ControlBus<CriticalSectionRawMutex, DEFAULT_QUEUE_DEPTH> = ControlBus::new();

#[test]
fn threaded_producer_feeds_motor_task() {
    let producer = std::thread::spawn(|| {
        let mut intake = intake();
        let mut delay = NoopDelay::new();
        intake.apply_query("rs=100&ra=100&rd=100&dt=0");
        for target in [10, 30, 5] {
            let query = format!("cis={}&fis={}", target / 2, target);
            intake
                .handle_query(&query, &BUS, &mut delay)
                .expect("Command should be queued");
        }
    });

    let mut task = MotorTask::new(
        MotionController::new(RecordingCoils::default()),
        NullFeedback,
        &BUS,
    );
    let mut delay = NoopDelay::new();
    task.run_until(&mut delay, 0, |t| t.completed_moves() == 3)
        .unwrap();
    producer.join().expect("Producer should not panic");

    // 5 + 15 + 3 steps
    assert_eq!(task.controller().coils().steps(), 23);
    assert_eq!(BUS.status.current_position(), 5);
}
