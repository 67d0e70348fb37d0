//! Configuration validation.

use crate::error::{ConfigError, Error, Result};

use super::SystemConfig;

/// Validate a system configuration.
///
/// Checks:
/// - Envelope bounds are positive
/// - Power-on kinematics are positive
/// - Every coil pattern is non-zero and fits in four bits
/// - Debounce count and all periods are non-zero
pub fn validate_config(config: &SystemConfig) -> Result<()> {
    validate_envelope(config)?;
    validate_defaults(config)?;

    if let Some(bad) = config.coils.patterns().find(|p| !p.is_valid()) {
        return Err(Error::Config(ConfigError::InvalidCoilPattern(bad.bits())));
    }

    validate_timing(config)?;

    Ok(())
}

fn validate_envelope(config: &SystemConfig) -> Result<()> {
    let envelope = &config.envelope;

    if envelope.max_position <= 0 {
        return Err(Error::Config(ConfigError::InvalidMaxPosition(
            envelope.max_position,
        )));
    }

    if !(envelope.max_speed > 0.0) {
        return Err(Error::Config(ConfigError::InvalidMaxSpeed(envelope.max_speed)));
    }

    if !(envelope.max_acceleration > 0.0) {
        return Err(Error::Config(ConfigError::InvalidMaxAcceleration(
            envelope.max_acceleration,
        )));
    }

    Ok(())
}

fn validate_defaults(config: &SystemConfig) -> Result<()> {
    let defaults = &config.defaults;

    for (field, value) in [
        ("speed", defaults.speed.0),
        ("acceleration", defaults.acceleration.0),
        ("deceleration", defaults.deceleration.0),
    ] {
        // NaN fails this too
        if !(value > 0.0) {
            return Err(Error::Config(ConfigError::InvalidDefault { field, value }));
        }
    }

    Ok(())
}

fn validate_timing(config: &SystemConfig) -> Result<()> {
    if config.emergency.debounce_polls == 0 {
        return Err(Error::Config(ConfigError::InvalidDebounce(0)));
    }

    for (name, period) in [
        ("emergency.poll_period_ms", config.emergency.poll_period_ms),
        ("emergency.alarm_toggle_ms", config.emergency.alarm_toggle_ms),
        ("timing.idle_poll_ms", config.timing.idle_poll_ms),
    ] {
        if period.0 == 0 {
            return Err(Error::Config(ConfigError::InvalidPeriod(name)));
        }
    }

    Ok(())
}
