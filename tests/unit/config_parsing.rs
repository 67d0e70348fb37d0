//! Unit tests for TOML configuration parsing.

use stepper_ramp::config::{load_config, parse_config, CoilPattern, SystemConfig};
use stepper_ramp::error::{ConfigError, Error};
use stepper_ramp::StepMode;

/// Test parsing the operating envelope and power-on kinematics.
#[test]
fn test_parse_envelope_and_defaults() {
    let toml_str = r#"
[envelope]
max_position = 4096
max_speed = 200.0
max_acceleration = 150.0

[defaults]
speed = 80.0
acceleration = 40.0
deceleration = 20.0
step_mode = "half"
"#;

    let config: SystemConfig = toml::from_str(toml_str).expect("Failed to parse TOML");

    assert_eq!(config.envelope.max_position, 4096);
    assert_eq!(config.envelope.max_speed, 200.0);
    assert_eq!(config.envelope.max_acceleration, 150.0);
    assert_eq!(config.defaults.speed.0, 80.0);
    assert_eq!(config.defaults.acceleration.0, 40.0);
    assert_eq!(config.defaults.deceleration.0, 20.0);
    assert_eq!(config.defaults.step_mode, StepMode::Half);
}

/// Test that omitted sections keep the firmware defaults.
#[test]
fn test_partial_config_keeps_defaults() {
    let toml_str = r#"
[emergency]
debounce_polls = 5
"#;

    let config = parse_config(toml_str).expect("Failed to parse config");
    let defaults = SystemConfig::default();

    assert_eq!(config.emergency.debounce_polls, 5);
    assert_eq!(config.emergency.alarm_toggle_ms, defaults.emergency.alarm_toggle_ms);
    assert_eq!(config.envelope, defaults.envelope);
    assert_eq!(config.coils, defaults.coils);
    assert_eq!(config.intake, defaults.intake);
}

/// Test parsing a custom coil table.
#[test]
fn test_parse_coil_table() {
    let toml_str = r#"
[coils]
wave = [8, 4, 2, 1]
full = [12, 6, 3, 9]
half = [8, 12, 4, 6, 2, 3, 1, 9]
"#;

    let config = parse_config(toml_str).expect("Failed to parse config");

    assert_eq!(config.coils.wave[0], CoilPattern(8));
    assert_eq!(config.coils.full[3], CoilPattern(9));
    assert_eq!(config.coils.half[1], CoilPattern(12));
}

/// Test parsing intake and timing sections.
#[test]
fn test_parse_intake_and_timing() {
    let toml_str = r#"
[intake]
retry_attempts = 2
retry_backoff_ms = 50
hold_during_emergency = false

[timing]
idle_poll_ms = 20
sleep_threshold_ms = 5
lookahead_ms = 2
"#;

    let config = parse_config(toml_str).expect("Failed to parse config");

    assert_eq!(config.intake.retry_attempts, 2);
    assert_eq!(config.intake.retry_backoff_ms.0, 50);
    assert!(!config.intake.hold_during_emergency);
    assert_eq!(config.timing.idle_poll_ms.0, 20);
    assert_eq!(config.timing.sleep_threshold_ms.0, 5);
    assert_eq!(config.timing.lookahead_ms.0, 2);
}

/// Test that malformed TOML is reported as a parse error.
#[test]
fn test_malformed_toml() {
    let result = parse_config("[envelope\nmax_position = ");
    assert!(matches!(result, Err(Error::Config(ConfigError::ParseError(_)))));
}

/// Test that an unknown step mode name is rejected.
#[test]
fn test_unknown_step_mode() {
    let result = parse_config("[defaults]\nstep_mode = \"quarter\"\n");
    assert!(matches!(result, Err(Error::Config(ConfigError::ParseError(_)))));
}

/// Test loading from a file.
#[test]
fn test_load_from_file() {
    let path = std::env::temp_dir().join("stepper_ramp_unit_load.toml");
    std::fs::write(&path, "[envelope]\nmax_position = 1024\n").expect("Failed to write file");

    let config = load_config(&path).expect("Failed to load config");
    assert_eq!(config.envelope.max_position, 1024);

    let _ = std::fs::remove_file(&path);
}

/// Test that a missing file is reported as an I/O error.
#[test]
fn test_load_missing_file() {
    let result = load_config("/nonexistent/stepper_ramp.toml");
    assert!(matches!(result, Err(Error::Config(ConfigError::IoError(_)))));
}
