//! Coil energisation tables.

use serde::Deserialize;

use crate::motion::StepMode;

/// Four-bit coil energisation pattern; bit 0 drives coil A, bit 3 coil D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(transparent)]
pub struct CoilPattern(pub u8);

impl CoilPattern {
    /// All windings de-energised.
    pub const OFF: Self = Self(0b0000);

    /// Get the raw bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether coil `index` (0..4) is energised.
    #[inline]
    pub const fn is_energized(self, index: u8) -> bool {
        index < 4 && (self.0 >> index) & 1 == 1
    }

    /// A pattern is valid when it fits in four bits and energises something.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0 && self.0 <= 0b1111
    }
}

/// Pattern lookup tables for every stepping mode.
///
/// The bit values are a hardware contract between the sequencer and the
/// driver board; the defaults match a unipolar 28BYJ-48 style wiring.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoilTable {
    /// One coil at a time.
    pub wave: [CoilPattern; 4],
    /// Two adjacent coils at a time.
    pub full: [CoilPattern; 4],
    /// Alternating one and two coils.
    pub half: [CoilPattern; 8],
}

impl Default for CoilTable {
    fn default() -> Self {
        Self {
            wave: [
                CoilPattern(0b0001),
                CoilPattern(0b0010),
                CoilPattern(0b0100),
                CoilPattern(0b1000),
            ],
            full: [
                CoilPattern(0b0011),
                CoilPattern(0b0110),
                CoilPattern(0b1100),
                CoilPattern(0b1001),
            ],
            half: [
                CoilPattern(0b0001),
                CoilPattern(0b0011),
                CoilPattern(0b0010),
                CoilPattern(0b0110),
                CoilPattern(0b0100),
                CoilPattern(0b1100),
                CoilPattern(0b1000),
                CoilPattern(0b1001),
            ],
        }
    }
}

impl CoilTable {
    /// Pattern sequence for a stepping mode.
    pub fn sequence(&self, mode: StepMode) -> &[CoilPattern] {
        match mode {
            StepMode::Wave => &self.wave,
            StepMode::Full => &self.full,
            StepMode::Half => &self.half,
        }
    }

    /// Iterate over every pattern in every table.
    pub fn patterns(&self) -> impl Iterator<Item = CoilPattern> + '_ {
        self.wave
            .iter()
            .chain(self.full.iter())
            .chain(self.half.iter())
            .copied()
    }
}
