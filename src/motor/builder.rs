//! Builder pattern for MotionController.

use crate::config::units::{StepsPerSec, StepsPerSecSquared};
use crate::config::{CoilTable, MotorDefaults, SystemConfig, TimingConfig};
use crate::error::{ConfigError, Error, Result};
use crate::motion::{MotionController, StepMode};

use super::driver::CoilOutput;

/// Builder for creating MotionController instances.
pub struct MotionControllerBuilder<C: CoilOutput> {
    coils: Option<C>,
    table: CoilTable,
    defaults: MotorDefaults,
    timing: TimingConfig,
}

impl<C: CoilOutput> Default for MotionControllerBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CoilOutput> MotionControllerBuilder<C> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            coils: None,
            table: CoilTable::default(),
            defaults: MotorDefaults::default(),
            timing: TimingConfig::default(),
        }
    }

    /// Set the coil output.
    pub fn coils(mut self, coils: C) -> Self {
        self.coils = Some(coils);
        self
    }

    /// Set the coil pattern tables.
    pub fn coil_table(mut self, table: CoilTable) -> Self {
        self.table = table;
        self
    }

    /// Set the initial cruise speed.
    pub fn speed(mut self, speed: StepsPerSec) -> Self {
        self.defaults.speed = speed;
        self
    }

    /// Set the initial acceleration.
    pub fn acceleration(mut self, acceleration: StepsPerSecSquared) -> Self {
        self.defaults.acceleration = acceleration;
        self
    }

    /// Set the initial deceleration.
    pub fn deceleration(mut self, deceleration: StepsPerSecSquared) -> Self {
        self.defaults.deceleration = deceleration;
        self
    }

    /// Set the initial stepping mode.
    pub fn step_mode(mut self, mode: StepMode) -> Self {
        self.defaults.step_mode = mode;
        self
    }

    /// Set scheduling hints.
    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Configure tables, kinematics and timing from a SystemConfig.
    pub fn from_config(mut self, config: &SystemConfig) -> Self {
        self.table = config.coils.clone();
        self.defaults = config.defaults.clone();
        self.timing = config.timing.clone();
        self
    }

    /// Build the MotionController.
    ///
    /// # Errors
    ///
    /// Returns an error if the coil output is missing, a coil pattern is
    /// invalid, or an initial rate is not positive.
    pub fn build(self) -> Result<MotionController<C>> {
        let coils = self
            .coils
            .ok_or(Error::Config(ConfigError::MissingComponent("coils")))?;

        if let Some(bad) = self.table.patterns().find(|p| !p.is_valid()) {
            return Err(Error::Config(ConfigError::InvalidCoilPattern(bad.bits())));
        }

        for (field, value) in [
            ("speed", self.defaults.speed.0),
            ("acceleration", self.defaults.acceleration.0),
            ("deceleration", self.defaults.deceleration.0),
        ] {
            if !(value > 0.0) {
                return Err(Error::Config(ConfigError::InvalidDefault { field, value }));
            }
        }

        Ok(MotionController::with_parts(
            coils,
            self.table,
            &self.defaults,
            self.timing,
        ))
    }
}
