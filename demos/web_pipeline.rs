//! Web-controlled pipeline example.
//!
//! Demonstrates the full command pipeline with one thread per task:
//! - the "web server" (main thread) turns query strings into queued commands
//! - the motor task runs them one at a time
//! - the emergency task polls a pushbutton, stops and releases the motor, and
//!   animates the LEDs
//!
//! Pins are simulated; the button is pressed twice from the main thread.
//!
//! Run with: `cargo run --example web_pipeline`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use critical_section as _;

use stepper_ramp::task::DEFAULT_QUEUE_DEPTH;
use stepper_ramp::{
    ButtonMonitor, CommandIntake, ControlBus, EmergencyCoordinator, LedPanel, MotionController,
    MotorTask, QueuedFeedback, RecordingCoils, SystemConfig,
};

static BUS: ControlBus<CriticalSectionRawMutex, DEFAULT_QUEUE_DEPTH> = ControlBus::new();

/// Button pin backed by a shared flag.
struct MockButton(Arc<AtomicBool>);

impl embedded_hal::digital::ErrorType for MockButton {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::InputPin for MockButton {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.load(Ordering::Relaxed))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.load(Ordering::Relaxed))
    }
}

/// Alarm LED that prints its transitions.
struct MockAlarmLed;

impl embedded_hal::digital::ErrorType for MockAlarmLed {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for MockAlarmLed {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        println!("  [alarm] on");
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        println!("  [alarm] off");
        Ok(())
    }
}

/// Real-time sleep for submission back-off.
struct StdDelay;

impl embedded_hal::delay::DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns as u64));
    }
}

fn press(button: &AtomicBool) {
    button.store(true, Ordering::Relaxed);
    thread::sleep(Duration::from_millis(500));
    button.store(false, Ordering::Relaxed);
}

fn main() {
    println!("=== Web Pipeline Example ===\n");

    let config = SystemConfig::default();
    let start = Instant::now();
    let clock = move || start.elapsed().as_millis() as u64;
    let done = Arc::new(AtomicBool::new(false));
    let button = Arc::new(AtomicBool::new(false));

    // Motor task
    let motor = {
        let config = config.clone();
        let done = done.clone();
        thread::spawn(move || {
            let controller = MotionController::from_config(RecordingCoils::default(), &config);
            let mut task = MotorTask::with_timing(
                controller,
                QueuedFeedback::new(&BUS.feedback),
                &BUS,
                config.timing.clone(),
            );
            while !done.load(Ordering::Relaxed) {
                let poll = task.poll(clock()).expect("Motor task failed");
                thread::sleep(Duration::from_millis(poll.sleep_ms.max(1) as u64));
            }
            task.completed_moves()
        })
    };

    // Emergency task with the LED panel
    let emergency = {
        let config = config.clone();
        let done = done.clone();
        let button = button.clone();
        thread::spawn(move || {
            let mut monitor = ButtonMonitor::from_config(MockButton(button), &config.emergency);
            let mut coordinator = EmergencyCoordinator::new(&BUS, &config.emergency);
            let mut panel = LedPanel::new(RecordingCoils::default(), MockAlarmLed, config.coils.clone());
            let mut last = coordinator.phase();
            let period = Duration::from_millis(monitor.poll_period().0 as u64);

            while !done.load(Ordering::Relaxed) {
                let now = clock();
                monitor.poll(&BUS).expect("Button read failed");
                let phase = coordinator.poll(now, &mut panel);
                if phase != last {
                    println!("  [emergency] {:?} -> {:?}", last, phase);
                    last = phase;
                }
                panel.service(&BUS.feedback, now).expect("LED update failed");
                thread::sleep(period);
            }
        })
    };

    // "Web server"
    let mut intake = CommandIntake::from_config(&config);
    let mut delay = StdDelay;
    for request in [
        "GET /setParams?rs=100&ra=100&rd=100&cis=0&fis=300&sm=1&dt=200 HTTP/1.1",
        "GET /setParams?cis=300&fis=100&sm=2 HTTP/1.1",
        "GET /setParams?rs=1000000&cis=100&fis=150&sm=0 HTTP/1.1",
    ] {
        match intake.handle_query(request, &BUS, &mut delay) {
            Ok(params) => println!(
                "queued {} -> {} at {} steps/s",
                params.current_position, params.final_position, params.rotational_speed
            ),
            Err(e) => println!("rejected: {}", e),
        }
    }

    thread::sleep(Duration::from_millis(1500));
    println!("\npressing emergency button at position {}", BUS.status.current_position());
    press(&button);

    thread::sleep(Duration::from_millis(1500));
    println!("releasing emergency at position {}", BUS.status.current_position());
    press(&button);

    // Wait for the queue to drain
    while BUS.pending_commands() > 0 || !BUS.status.is_complete() || !BUS.gate.is_open() {
        thread::sleep(Duration::from_millis(100));
    }
    thread::sleep(Duration::from_millis(500));
    done.store(true, Ordering::Relaxed);

    let completed = motor.join().expect("Motor thread panicked");
    emergency.join().expect("Emergency thread panicked");

    println!("\nCompleted moves: {}", completed);
    println!("Final position: {}", BUS.status.current_position());
    println!("\n=== Example Complete ===");
}
