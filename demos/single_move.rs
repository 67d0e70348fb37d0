//! Single move example.
//!
//! Demonstrates planning a ramp, then driving a four-wire stepper through a
//! blocking absolute move and a relative move.
//!
//! This example uses in-memory pins so it runs without real hardware.
//!
//! Run with: `cargo run --example single_move`

use stepper_ramp::{
    motion::MotionProfile, FourPinCoils, MotionControllerBuilder, StepMode, Steps, StepsPerSec,
    StepsPerSecSquared,
};

/// Mock delay that only counts elapsed time.
#[derive(Default)]
struct MockDelay {
    elapsed_ns: u64,
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        // In real code, this would use a hardware timer
        self.elapsed_ns += ns as u64;
    }
}

/// Mock coil pin for demonstration.
struct MockPin {
    state: bool,
}

impl MockPin {
    fn new() -> Self {
        Self { state: false }
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.state = true;
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.state = false;
        Ok(())
    }
}

fn main() -> stepper_ramp::Result<()> {
    println!("=== Single Move Example ===\n");

    // Ramp planning on its own
    let profile = MotionProfile::plan(
        512,   // a quarter turn in full-step mode
        90.0,  // requested speed (steps/sec)
        100.0, // acceleration (steps/sec²)
        40.0,  // deceleration (steps/sec²) - gentler stop
    );

    println!("=== Motion Profile ===");
    println!("Total steps: {}", profile.total_steps);
    println!("Direction: {:?}", profile.direction);
    println!("Cruise speed: {:.1} steps/s (clamped: {})", profile.cruise_speed, profile.speed_clamped);
    println!("First step period: {:.1} ms", profile.initial_step_period);
    println!("Cruise step period: {:.1} ms", profile.cruise_step_period);
    println!("Stop margin: {} steps", profile.stop_margin);
    println!("Triangular: {}", profile.is_triangular());

    // Drive four mock coil pins
    let coils = FourPinCoils::new(MockPin::new(), MockPin::new(), MockPin::new(), MockPin::new());
    let mut motor = MotionControllerBuilder::new()
        .coils(coils)
        .speed(StepsPerSec(90.0))
        .acceleration(StepsPerSecSquared(100.0))
        .deceleration(StepsPerSecSquared(40.0))
        .step_mode(StepMode::Full)
        .build()?;

    let mut delay = MockDelay::default();

    println!("\n=== Absolute Move ===");
    motor.move_to_blocking(Steps(512), &mut delay)?;
    println!("Position: {} steps", motor.current_position().0);
    println!("Elapsed: {:.2} s", delay.elapsed_ns as f64 / 1e9);

    println!("\n=== Relative Move (half stepping) ===");
    motor.set_step_mode(StepMode::Half);
    motor.move_by(Steps(-1024));
    motor.run_to_completion(&mut delay)?;
    println!("Position: {} steps", motor.current_position().0);
    println!("Phase: {}", motor.phase());

    let coils = motor.release();
    let (a, b, c, d) = coils.release();
    println!("Coils released: [{}, {}, {}, {}]", a.state, b.state, c.state, d.state);

    println!("\n=== Example Complete ===");
    Ok(())
}
