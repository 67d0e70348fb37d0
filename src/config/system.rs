//! System configuration - root configuration structure.

use serde::Deserialize;

use super::coils::CoilTable;
use super::envelope::OperatingEnvelope;
use super::motor::MotorDefaults;
use super::runtime::{EmergencyConfig, IntakeConfig, TimingConfig};

/// Root configuration structure from TOML.
///
/// Every section is optional; missing sections take the defaults of the
/// reference lab hardware (28BYJ-48 on a four-line PMOD driver).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Bounds applied to incoming commands.
    pub envelope: OperatingEnvelope,

    /// Kinematics used before the first command.
    pub defaults: MotorDefaults,

    /// Coil pattern tables.
    pub coils: CoilTable,

    /// Emergency button and alarm.
    pub emergency: EmergencyConfig,

    /// Command submission.
    pub intake: IntakeConfig,

    /// Motor task scheduling.
    pub timing: TimingConfig,
}
