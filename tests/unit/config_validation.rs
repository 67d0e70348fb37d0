//! Unit tests for configuration validation.

use stepper_ramp::config::{parse_config, validate_config, CoilPattern, Milliseconds, SystemConfig};
use stepper_ramp::error::{ConfigError, Error};

/// Test validation of the default configuration.
#[test]
fn test_default_config_passes_validation() {
    assert!(validate_config(&SystemConfig::default()).is_ok());
}

/// Test validation fails for a non-positive max position.
#[test]
fn test_invalid_max_position() {
    let result = parse_config("[envelope]\nmax_position = 0\n");
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidMaxPosition(0)))
    ));
}

/// Test validation fails for a negative max speed.
#[test]
fn test_invalid_max_speed() {
    let mut config = SystemConfig::default();
    config.envelope.max_speed = -10.0;

    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidMaxSpeed(_)))
    ));
}

/// Test validation fails for a zero max acceleration.
#[test]
fn test_invalid_max_acceleration() {
    let mut config = SystemConfig::default();
    config.envelope.max_acceleration = 0.0;

    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidMaxAcceleration(_)))
    ));
}

/// Test validation names the offending power-on default.
#[test]
fn test_invalid_default_deceleration() {
    let result = parse_config("[defaults]\ndeceleration = 0.0\n");

    match result {
        Err(Error::Config(ConfigError::InvalidDefault { field, .. })) => {
            assert_eq!(field, "deceleration")
        }
        other => panic!("Expected InvalidDefault, got {:?}", other),
    }
}

/// Test validation rejects patterns that energise nothing or overflow 4 bits.
#[test]
fn test_invalid_coil_pattern() {
    let mut config = SystemConfig::default();
    config.coils.half[5] = CoilPattern(0x1F);

    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidCoilPattern(0x1F)))
    ));

    let result = parse_config("[coils]\nwave = [1, 2, 0, 8]\n");
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidCoilPattern(0)))
    ));
}

/// Test validation fails for a zero debounce count.
#[test]
fn test_invalid_debounce() {
    let mut config = SystemConfig::default();
    config.emergency.debounce_polls = 0;

    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidDebounce(0)))
    ));
}

/// Test validation fails for a zero period.
#[test]
fn test_invalid_period() {
    let mut config = SystemConfig::default();
    config.emergency.alarm_toggle_ms = Milliseconds(0);

    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidPeriod("emergency.alarm_toggle_ms")))
    ));
}

/// Test error messages are human readable.
#[test]
fn test_error_display() {
    let err = Error::Config(ConfigError::InvalidCoilPattern(0));
    let msg = format!("{}", err);

    assert!(msg.contains("Configuration error"));
    assert!(msg.contains("coil pattern"));
}
