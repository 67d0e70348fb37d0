//! Configuration module for stepper-ramp.
//!
//! Provides types for loading and validating the operating envelope, power-on
//! kinematics, coil tables and task timing from TOML files (with `std`
//! feature) or from code.

mod coils;
mod envelope;
mod motor;
mod runtime;
mod system;
pub mod units;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use coils::{CoilPattern, CoilTable};
pub use envelope::OperatingEnvelope;
pub use motor::MotorDefaults;
pub use runtime::{EmergencyConfig, IntakeConfig, TimingConfig};
pub use system::SystemConfig;
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{Milliseconds, Steps, StepsPerSec, StepsPerSecSquared};
