//! Coil phase sequencing.
//!
//! Each physical step moves the phase index one slot forward or backward in
//! the mode's pattern table, wrapping at both ends.

use serde::{Deserialize, Serialize};

use super::profile::Direction;
use crate::config::{CoilPattern, CoilTable};

/// Stepping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    /// One coil energised at a time (4 phases).
    #[default]
    Wave,
    /// Two coils energised at a time (4 phases).
    Full,
    /// Alternating one and two coils (8 phases).
    Half,
}

impl StepMode {
    /// Map the wire index (0, 1, 2) to a mode.
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(StepMode::Wave),
            1 => Some(StepMode::Full),
            2 => Some(StepMode::Half),
            _ => None,
        }
    }

    /// Wire index of this mode.
    pub fn index(self) -> u8 {
        match self {
            StepMode::Wave => 0,
            StepMode::Full => 1,
            StepMode::Half => 2,
        }
    }

    /// Number of distinct phases before the pattern repeats.
    pub fn phase_count(self) -> u8 {
        match self {
            StepMode::Wave | StepMode::Full => 4,
            StepMode::Half => 8,
        }
    }

    /// Output shaft steps per revolution on the geared 28BYJ-48.
    pub fn steps_per_revolution(self) -> u32 {
        match self {
            StepMode::Wave | StepMode::Full => 2048,
            StepMode::Half => 4096,
        }
    }
}

/// Compute the next phase index and its coil pattern.
///
/// `phase` is first normalised into the mode's range, so a phase left over
/// from a mode with more slots is still valid.
pub fn next_pattern(
    table: &CoilTable,
    mode: StepMode,
    phase: u8,
    direction: Direction,
) -> (u8, CoilPattern) {
    let count = mode.phase_count() as i16;
    let next = (phase as i16 % count + direction.sign() as i16).rem_euclid(count) as u8;
    (next, table.sequence(mode)[next as usize])
}

/// Stateful phase tracker for one motor.
#[derive(Debug, Clone)]
pub struct StepSequencer {
    table: CoilTable,
    phase: u8,
}

impl StepSequencer {
    /// Create a sequencer at phase 0.
    pub fn new(table: CoilTable) -> Self {
        Self { table, phase: 0 }
    }

    /// Current phase index.
    #[inline]
    pub fn phase(&self) -> u8 {
        self.phase
    }

    /// Advance one physical step and return the pattern to drive.
    pub fn advance(&mut self, mode: StepMode, direction: Direction) -> CoilPattern {
        let (phase, pattern) = next_pattern(&self.table, mode, self.phase, direction);
        self.phase = phase;
        pattern
    }
}
