//! Command intake: parameter parsing, clamping and queue submission.
//!
//! Transports (an HTTP query string, a serial line) deliver `name=value`
//! pairs. The intake folds them into a template of the last submitted
//! parameters, clamps the result into the operating envelope and posts it to
//! the command queue.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;
use serde::{Deserialize, Serialize};

use super::bus::{ControlBus, EmergencyState};
use crate::config::{IntakeConfig, OperatingEnvelope, SystemConfig};
use crate::error::{Error, IntakeError, Result};
use crate::motion::StepMode;

/// One motor command.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MotorParameters {
    /// Position the motor is declared to be at before moving.
    pub current_position: i64,
    /// Absolute goal position.
    pub final_position: i64,
    /// Pause after the move, in ms.
    #[serde(rename = "dwell_time")]
    pub dwell_ms: i64,
    /// Cruise speed in steps/sec.
    pub rotational_speed: f32,
    /// Acceleration in steps/sec².
    pub rotational_accel: f32,
    /// Deceleration in steps/sec².
    pub rotational_decel: f32,
    /// Stepping mode.
    pub step_mode: StepMode,
}

impl MotorParameters {
    /// Signed travel of the move.
    pub fn travel(&self) -> i64 {
        self.final_position - self.current_position
    }
}

/// Recognised parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParameterField {
    /// `rotational_speed` / `rs`
    RotationalSpeed,
    /// `rotational_accel` / `ra`
    RotationalAccel,
    /// `rotational_decel` / `rd`
    RotationalDecel,
    /// `current_position` / `cis`
    CurrentPosition,
    /// `final_position` / `fis`
    FinalPosition,
    /// `step_mode` / `sm`
    StepMode,
    /// `dwell_time` / `dt`
    DwellTime,
}

impl ParameterField {
    /// Look up a field by its long name or web form key.
    pub fn from_key(key: &str) -> Option<Self> {
        let field = match key {
            "rotational_speed" | "rs" => Self::RotationalSpeed,
            "rotational_accel" | "ra" => Self::RotationalAccel,
            "rotational_decel" | "rd" => Self::RotationalDecel,
            "current_position" | "cis" => Self::CurrentPosition,
            "final_position" | "fis" => Self::FinalPosition,
            "step_mode" | "sm" => Self::StepMode,
            "dwell_time" | "dt" => Self::DwellTime,
            _ => return None,
        };
        Some(field)
    }

    /// Long name.
    pub fn name(self) -> &'static str {
        match self {
            Self::RotationalSpeed => "rotational_speed",
            Self::RotationalAccel => "rotational_accel",
            Self::RotationalDecel => "rotational_decel",
            Self::CurrentPosition => "current_position",
            Self::FinalPosition => "final_position",
            Self::StepMode => "step_mode",
            Self::DwellTime => "dwell_time",
        }
    }
}

/// Unparsable numbers read as zero.
fn parse_number(value: &str) -> f64 {
    match value.trim().parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            debug!("unparsable value, using 0");
            0.0
        }
    }
}

fn field_name(key: &str) -> heapless::String<32> {
    let mut name = heapless::String::new();
    for c in key.chars() {
        if name.push(c).is_err() {
            break;
        }
    }
    name
}

/// Clamp every field into `envelope`.
///
/// Rates come out as magnitudes; direction is carried by the positions.
pub fn clamp_parameters(envelope: &OperatingEnvelope, params: MotorParameters) -> MotorParameters {
    let clamped = MotorParameters {
        current_position: envelope.clamp_position(params.current_position),
        final_position: envelope.clamp_position(params.final_position),
        dwell_ms: params.dwell_ms.max(0),
        rotational_speed: envelope.clamp_speed(params.rotational_speed).abs(),
        rotational_accel: envelope.clamp_acceleration(params.rotational_accel).abs(),
        rotational_decel: envelope.clamp_acceleration(params.rotational_decel).abs(),
        step_mode: params.step_mode,
    };
    if clamped != params {
        debug!("command parameters corrected into operating envelope");
    }
    clamped
}

/// Reject parameters no ramp can be planned for.
pub fn check_kinematics(params: &MotorParameters) -> core::result::Result<(), IntakeError> {
    for (field, value) in [
        (ParameterField::RotationalSpeed, params.rotational_speed),
        (ParameterField::RotationalAccel, params.rotational_accel),
        (ParameterField::RotationalDecel, params.rotational_decel),
    ] {
        if !(value > 0.0) {
            return Err(IntakeError::DegenerateKinematics(field.name()));
        }
    }
    Ok(())
}

/// Parses, clamps and submits motor commands.
pub struct CommandIntake {
    envelope: OperatingEnvelope,
    config: IntakeConfig,
    template: MotorParameters,
}

impl CommandIntake {
    /// Create an intake with an all-zero template.
    pub fn new(envelope: OperatingEnvelope, config: IntakeConfig) -> Self {
        if !envelope.is_valid() {
            warn!(
                "operating envelope has non-positive bounds: position {}, speed {}, accel {}",
                envelope.max_position,
                envelope.max_speed,
                envelope.max_acceleration
            );
        }
        Self {
            envelope,
            config,
            template: MotorParameters::default(),
        }
    }

    /// Create an intake from a system configuration.
    pub fn from_config(config: &SystemConfig) -> Self {
        Self::new(config.envelope.clone(), config.intake.clone())
    }

    /// Start from `template` instead of all zeros.
    pub fn with_template(mut self, template: MotorParameters) -> Self {
        self.template = template;
        self
    }

    /// Parameters the next submission will carry.
    pub fn template(&self) -> &MotorParameters {
        &self.template
    }

    /// Operating envelope.
    pub fn envelope(&self) -> &OperatingEnvelope {
        &self.envelope
    }

    /// Set one field of the template from its textual value.
    ///
    /// # Errors
    ///
    /// `IntakeError::UnrecognizedField` if `key` names no parameter.
    pub fn apply_field(&mut self, key: &str, value: &str) -> Result<ParameterField> {
        let Some(field) = ParameterField::from_key(key) else {
            return Err(Error::Intake(IntakeError::UnrecognizedField(field_name(key))));
        };

        let number = parse_number(value);
        let t = &mut self.template;
        match field {
            ParameterField::RotationalSpeed => t.rotational_speed = number as f32,
            ParameterField::RotationalAccel => t.rotational_accel = number as f32,
            ParameterField::RotationalDecel => t.rotational_decel = number as f32,
            ParameterField::CurrentPosition => t.current_position = number as i64,
            ParameterField::FinalPosition => t.final_position = number as i64,
            ParameterField::DwellTime => t.dwell_ms = number as i64,
            ParameterField::StepMode => {
                t.step_mode = StepMode::from_index(number as i64).unwrap_or_else(|| {
                    debug!("step mode out of range, using wave");
                    StepMode::Wave
                });
            }
        }
        Ok(field)
    }

    /// Fold a `name=value&...` query into the template.
    ///
    /// Anything up to a `?` is skipped, and parsing stops at the first space
    /// so a raw HTTP request line can be passed in. Unrecognised names are
    /// logged and ignored. Returns the number of fields applied.
    pub fn apply_query(&mut self, query: &str) -> usize {
        let query = match query.split_once('?') {
            Some((_, rest)) => rest,
            None => query,
        };
        let query = query.split(' ').next().unwrap_or("");

        let mut applied = 0;
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let Some((key, value)) = pair.split_once('=') else {
                debug!("query pair without value skipped");
                continue;
            };
            match self.apply_field(key, value) {
                Ok(_) => applied += 1,
                Err(_) => warn!("unrecognized parameter ignored"),
            }
        }
        applied
    }

    /// Clamp the template in place and return it if a ramp can be planned.
    pub fn prepare(&mut self) -> Result<MotorParameters> {
        self.template = clamp_parameters(&self.envelope, self.template);
        check_kinematics(&self.template)?;
        Ok(self.template)
    }

    fn admit<M: RawMutex, const N: usize>(&self, bus: &ControlBus<M, N>) -> Result<()> {
        match bus.gate.state() {
            EmergencyState::Normal => Ok(()),
            _ if self.config.hold_during_emergency => {
                info!("emergency active, command held in queue");
                Ok(())
            }
            _ => {
                warn!("emergency active, command dropped");
                Err(Error::Intake(IntakeError::Halted))
            }
        }
    }

    /// Prepare and post the template once, without waiting.
    pub fn try_submit<M: RawMutex, const N: usize>(
        &mut self,
        bus: &ControlBus<M, N>,
    ) -> Result<MotorParameters> {
        let params = self.prepare()?;
        self.admit(bus)?;

        bus.commands.try_send(params).map_err(|_| {
            warn!("command queue full, command dropped");
            Error::Intake(IntakeError::QueueFull)
        })?;
        info!(
            "command queued: {} -> {} at {} steps/s",
            params.current_position,
            params.final_position,
            params.rotational_speed
        );
        Ok(params)
    }

    /// Prepare and post the template, retrying with back-off on a full queue.
    pub fn submit_with_backoff<M: RawMutex, const N: usize, D: DelayNs>(
        &mut self,
        bus: &ControlBus<M, N>,
        delay: &mut D,
    ) -> Result<MotorParameters> {
        let params = self.prepare()?;
        self.admit(bus)?;

        let mut retries = 0;
        loop {
            if bus.commands.try_send(params).is_ok() {
                info!(
                    "command queued: {} -> {} at {} steps/s",
                    params.current_position,
                    params.final_position,
                    params.rotational_speed
                );
                return Ok(params);
            }
            if retries >= self.config.retry_attempts {
                warn!("command queue full after {} retries, command dropped", retries);
                return Err(Error::Intake(IntakeError::QueueFull));
            }
            retries += 1;
            debug!("command queue full, retry {}", retries);
            delay.delay_ms(self.config.retry_backoff_ms.0);
        }
    }

    /// Apply a query and submit the result with back-off.
    pub fn handle_query<M: RawMutex, const N: usize, D: DelayNs>(
        &mut self,
        query: &str,
        bus: &ControlBus<M, N>,
        delay: &mut D,
    ) -> Result<MotorParameters> {
        self.apply_query(query);
        self.submit_with_backoff(bus, delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Milliseconds;
    use crate::task::EmergencyState;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embedded_hal_mock::eh1::delay::NoopDelay;

    fn intake() -> CommandIntake {
        CommandIntake::new(OperatingEnvelope::default(), IntakeConfig::default())
    }

    #[test]
    fn test_short_and_long_keys() {
        assert_eq!(ParameterField::from_key("rs"), Some(ParameterField::RotationalSpeed));
        assert_eq!(ParameterField::from_key("final_position"), Some(ParameterField::FinalPosition));
        assert_eq!(ParameterField::from_key("dt"), Some(ParameterField::DwellTime));
        assert_eq!(ParameterField::from_key("speed"), None);
    }

    #[test]
    fn test_query_from_request_line() {
        let mut intake = intake();
        let applied = intake.apply_query("GET /setParams?rs=50&ra=20&rd=30&cis=10&fis=400&sm=2&dt=500&xx=1 HTTP/1.1");

        assert_eq!(applied, 7);
        let t = intake.template();
        assert_eq!(t.rotational_speed, 50.0);
        assert_eq!(t.rotational_accel, 20.0);
        assert_eq!(t.rotational_decel, 30.0);
        assert_eq!(t.current_position, 10);
        assert_eq!(t.final_position, 400);
        assert_eq!(t.step_mode, StepMode::Half);
        assert_eq!(t.dwell_ms, 500);
    }

    #[test]
    fn test_template_persists_between_queries() {
        let mut intake = intake();
        intake.apply_query("rs=40&ra=10&rd=10&fis=100");
        intake.apply_query("fis=200");

        assert_eq!(intake.template().rotational_speed, 40.0);
        assert_eq!(intake.template().final_position, 200);
    }

    #[test]
    fn test_unrecognized_field_error() {
        let mut intake = intake();
        let err = intake.apply_field("bogus", "1").unwrap_err();
        assert!(matches!(err, Error::Intake(IntakeError::UnrecognizedField(ref n)) if n.as_str() == "bogus"));
    }

    #[test]
    fn test_garbage_reads_as_zero_and_bad_mode_as_wave() {
        let mut intake = intake();
        intake.apply_field("rs", "fast").unwrap();
        intake.apply_field("sm", "7").unwrap();

        assert_eq!(intake.template().rotational_speed, 0.0);
        assert_eq!(intake.template().step_mode, StepMode::Wave);
    }

    #[test]
    fn test_clamping() {
        let envelope = OperatingEnvelope::default();
        let params = MotorParameters {
            current_position: -5,
            final_position: 3000,
            dwell_ms: -1,
            rotational_speed: 1e6,
            rotational_accel: -40.0,
            rotational_decel: f32::NAN,
            step_mode: StepMode::Full,
        };

        let clamped = clamp_parameters(&envelope, params);
        assert_eq!(clamped.current_position, 0);
        assert_eq!(clamped.final_position, 3000 % 2048);
        assert_eq!(clamped.dwell_ms, 0);
        assert_eq!(clamped.rotational_speed, 50.0);
        assert_eq!(clamped.rotational_accel, 40.0);
        assert_eq!(clamped.rotational_decel, 50.0);
    }

    #[test]
    fn test_unvalidated_envelope_does_not_panic() {
        let mut intake = CommandIntake::new(
            OperatingEnvelope::new(0, 100.0, 100.0),
            IntakeConfig::default(),
        );
        intake.apply_query("rs=50&ra=50&rd=50&cis=9&fis=5000");

        let params = intake.prepare().unwrap();
        assert_eq!(params.current_position, 0);
        assert_eq!(params.final_position, 0);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_parameters_use_wire_names() {
        let params: MotorParameters = toml::from_str(
            r#"
final_position = 400
dwell_time = 250
rotational_speed = 80.0
step_mode = "half"
"#,
        )
        .unwrap();

        assert_eq!(params.final_position, 400);
        assert_eq!(params.dwell_ms, 250);
        assert_eq!(params.rotational_speed, 80.0);
        assert_eq!(params.rotational_accel, 0.0);
        assert_eq!(params.step_mode, StepMode::Half);

        let text = toml::to_string(&params).unwrap();
        assert!(text.contains("dwell_time = 250"));
        assert!(!text.contains("dwell_ms"));
    }

    #[test]
    fn test_degenerate_rejected() {
        let mut intake = intake();
        intake.apply_query("rs=50&ra=0&rd=10&fis=100");

        let err = intake.prepare().unwrap_err();
        assert_eq!(
            err,
            Error::Intake(IntakeError::DegenerateKinematics("rotational_accel"))
        );
    }

    #[test]
    fn test_submit_and_queue_full() {
        let bus = ControlBus::<NoopRawMutex, 1>::new();
        let mut intake = intake();
        intake.apply_query("rs=50&ra=50&rd=50&fis=100");

        assert!(intake.try_submit(&bus).is_ok());
        assert_eq!(bus.pending_commands(), 1);
        assert_eq!(
            intake.try_submit(&bus).unwrap_err(),
            Error::Intake(IntakeError::QueueFull)
        );

        let mut delay = NoopDelay::new();
        assert_eq!(
            intake.submit_with_backoff(&bus, &mut delay).unwrap_err(),
            Error::Intake(IntakeError::QueueFull)
        );
    }

    #[test]
    fn test_emergency_hold_or_drop() {
        let bus = ControlBus::<NoopRawMutex, 4>::new();
        bus.gate.set(EmergencyState::Stopped);

        let mut holding = intake();
        holding.apply_query("rs=50&ra=50&rd=50&fis=100");
        assert!(holding.try_submit(&bus).is_ok());

        let config = IntakeConfig {
            hold_during_emergency: false,
            retry_backoff_ms: Milliseconds(1),
            ..IntakeConfig::default()
        };
        let mut dropping = CommandIntake::new(OperatingEnvelope::default(), config)
            .with_template(*holding.template());
        assert_eq!(
            dropping.try_submit(&bus).unwrap_err(),
            Error::Intake(IntakeError::Halted)
        );
        assert_eq!(bus.pending_commands(), 1);
    }
}
