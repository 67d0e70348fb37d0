//! Configuration loading from files (std only).

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Error, Result};

use super::SystemConfig;

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
///
/// ```rust,ignore
/// use stepper_ramp::load_config;
///
/// let config = load_config("stepper.toml")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SystemConfig> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| {
        let msg = truncated(&e.to_string());
        Error::Config(ConfigError::IoError(msg))
    })?;

    parse_config(&content)
}

/// Parse configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or fails validation.
pub fn parse_config(content: &str) -> Result<SystemConfig> {
    let config: SystemConfig = toml::from_str(content).map_err(|e| {
        Error::Config(ConfigError::ParseError(truncated(e.message())))
    })?;

    super::validation::validate_config(&config)?;

    Ok(config)
}

/// Copy as much of `msg` as fits, cutting on a char boundary.
fn truncated(msg: &str) -> heapless::String<128> {
    let mut out = heapless::String::new();
    for c in msg.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
[envelope]
max_position = 4096
"#;

        let config = parse_config(toml).unwrap();
        assert_eq!(config.envelope.max_position, 4096);
        assert_eq!(config.envelope.max_speed, 100.0);
    }

    #[test]
    fn test_parse_coil_override() {
        let toml = r#"
[coils]
wave = [8, 4, 2, 1]
"#;

        let config = parse_config(toml).unwrap();
        assert_eq!(config.coils.wave[0].bits(), 8);
        assert_eq!(config.coils.full[0].bits(), 0b0011);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        let toml = r#"
[emergency]
debounce_polls = 0
"#;

        assert!(matches!(
            parse_config(toml),
            Err(Error::Config(ConfigError::InvalidDebounce(0)))
        ));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let result = parse_config("[envelope\nmax_position = ");
        assert!(matches!(result, Err(Error::Config(ConfigError::ParseError(_)))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config("/nonexistent/stepper.toml");
        assert!(matches!(result, Err(Error::Config(ConfigError::IoError(_)))));
    }

    #[test]
    fn test_truncation_keeps_prefix() {
        let long = "x".repeat(300);
        assert_eq!(truncated(&long).len(), 128);
    }
}
