//! Error types for stepper-ramp.
//!
//! Provides unified error handling across configuration, motor output and
//! command intake. Nothing in the motion core is fatal: the worst outcome of
//! any error here is a motor that stays disabled until the next valid move.

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all stepper-ramp operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Motor or GPIO operation error
    Motor(MotorError),
    /// Command intake error
    Intake(IntakeError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Maximum position must be > 0
    InvalidMaxPosition(i64),
    /// Maximum speed must be > 0
    InvalidMaxSpeed(f32),
    /// Maximum acceleration must be > 0
    InvalidMaxAcceleration(f32),
    /// Power-on speed, acceleration or deceleration must be > 0
    InvalidDefault {
        /// Name of the offending default
        field: &'static str,
        /// Configured value
        value: f32,
    },
    /// Coil patterns must be non-zero and fit in four bits
    InvalidCoilPattern(u8),
    /// Emergency debounce count must be at least one poll
    InvalidDebounce(u8),
    /// A period in milliseconds must be > 0
    InvalidPeriod(&'static str),
    /// Builder is missing a required component
    MissingComponent(&'static str),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Motor and GPIO errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MotorError {
    /// Pin operation failed
    PinError,
}

/// Command intake errors.
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeError {
    /// Field name is not part of the motor parameter set
    UnrecognizedField(heapless::String<32>),
    /// Speed, acceleration or deceleration is zero after clamping
    DegenerateKinematics(&'static str),
    /// Command queue stayed full through every retry
    QueueFull,
    /// Emergency stop is active and the intake drops new commands
    Halted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Motor(e) => write!(f, "Motor error: {}", e),
            Error::Intake(e) => write!(f, "Intake error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidMaxPosition(v) => write!(f, "Invalid max position: {}. Must be > 0", v),
            ConfigError::InvalidMaxSpeed(v) => write!(f, "Invalid max speed: {}. Must be > 0", v),
            ConfigError::InvalidMaxAcceleration(v) => {
                write!(f, "Invalid max acceleration: {}. Must be > 0", v)
            }
            ConfigError::InvalidDefault { field, value } => {
                write!(f, "Invalid default {}: {}. Must be > 0", field, value)
            }
            ConfigError::InvalidCoilPattern(p) => {
                write!(f, "Invalid coil pattern: {:#06b}. Must be non-zero and at most 0b1111", p)
            }
            ConfigError::InvalidDebounce(v) => write!(f, "Invalid debounce count: {}. Must be >= 1", v),
            ConfigError::InvalidPeriod(name) => write!(f, "Invalid period '{}': must be > 0 ms", name),
            ConfigError::MissingComponent(name) => write!(f, "Missing required component: {}", name),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorError::PinError => write!(f, "GPIO pin operation failed"),
        }
    }
}

impl fmt::Display for IntakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntakeError::UnrecognizedField(name) => write!(f, "Unrecognized parameter: {}", name),
            IntakeError::DegenerateKinematics(field) => {
                write!(f, "Parameter '{}' is zero, no motion profile possible", field)
            }
            IntakeError::QueueFull => write!(f, "Command queue full, command dropped"),
            IntakeError::Halted => write!(f, "Emergency stop active, command dropped"),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<MotorError> for Error {
    fn from(e: MotorError) -> Self {
        Error::Motor(e)
    }
}

impl From<IntakeError> for Error {
    fn from(e: IntakeError) -> Self {
        Error::Intake(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for MotorError {}

#[cfg(feature = "std")]
impl std::error::Error for IntakeError {}
