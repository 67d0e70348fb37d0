//! In-memory coil output for simulation and host-side testing.

use core::convert::Infallible;

use heapless::HistoryBuffer;

use super::driver::CoilOutput;
use crate::config::CoilPattern;

/// Number of recent patterns kept by [`RecordingCoils`].
pub const HISTORY_DEPTH: usize = 16;

/// Coil output that records what it was asked to drive.
pub struct RecordingCoils {
    steps: usize,
    disables: usize,
    history: HistoryBuffer<CoilPattern, HISTORY_DEPTH>,
}

impl Default for RecordingCoils {
    fn default() -> Self {
        Self {
            steps: 0,
            disables: 0,
            history: HistoryBuffer::new(),
        }
    }
}

impl RecordingCoils {
    /// Energising writes seen (one per physical step).
    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// All-off writes seen.
    #[inline]
    pub fn disables(&self) -> usize {
        self.disables
    }

    /// Most recent pattern.
    #[inline]
    pub fn last(&self) -> Option<CoilPattern> {
        self.history.recent().copied()
    }

    /// Up to [`HISTORY_DEPTH`] recent patterns, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = CoilPattern> + '_ {
        self.history.oldest_ordered().copied()
    }
}

impl CoilOutput for RecordingCoils {
    type Error = Infallible;

    fn write_pattern(&mut self, pattern: CoilPattern) -> Result<(), Self::Error> {
        if pattern == CoilPattern::OFF {
            self.disables += 1;
        } else {
            self.steps += 1;
        }
        self.history.write(pattern);
        Ok(())
    }
}
