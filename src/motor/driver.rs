//! Coil drivers.
//!
//! Generic over embedded-hal 1.0 output pins.

use embedded_hal::digital::{OutputPin, PinState};

use crate::config::CoilPattern;
use crate::error::MotorError;

/// Sink for four-bit coil patterns.
///
/// Implemented by the motor windings driver and by anything that mirrors the
/// pattern (LED banks, recorders).
pub trait CoilOutput {
    /// Error raised by the underlying hardware.
    type Error: core::fmt::Debug;

    /// Drive all four lines to match `pattern`.
    fn write_pattern(&mut self, pattern: CoilPattern) -> Result<(), Self::Error>;
}

impl<T: CoilOutput + ?Sized> CoilOutput for &mut T {
    type Error = T::Error;

    fn write_pattern(&mut self, pattern: CoilPattern) -> Result<(), Self::Error> {
        (**self).write_pattern(pattern)
    }
}

/// Four GPIO lines driving a unipolar stepper through a ULN2003-style driver.
///
/// Generic over:
/// - `A`..`D`: coil pins in pattern bit order (bit 0 = `A`)
pub struct FourPinCoils<A, B, C, D>
where
    A: OutputPin,
    B: OutputPin,
    C: OutputPin,
    D: OutputPin,
{
    a: A,
    b: B,
    c: C,
    d: D,
    /// Last pattern written, to skip redundant pin writes.
    current: Option<CoilPattern>,
}

impl<A, B, C, D> FourPinCoils<A, B, C, D>
where
    A: OutputPin,
    B: OutputPin,
    C: OutputPin,
    D: OutputPin,
{
    /// Wrap four coil pins. Nothing is written until the first pattern.
    pub fn new(a: A, b: B, c: C, d: D) -> Self {
        Self {
            a,
            b,
            c,
            d,
            current: None,
        }
    }

    /// Last pattern written, if any.
    #[inline]
    pub fn current(&self) -> Option<CoilPattern> {
        self.current
    }

    /// Release the pins.
    pub fn release(self) -> (A, B, C, D) {
        (self.a, self.b, self.c, self.d)
    }
}

impl<A, B, C, D> CoilOutput for FourPinCoils<A, B, C, D>
where
    A: OutputPin,
    B: OutputPin,
    C: OutputPin,
    D: OutputPin,
{
    type Error = MotorError;

    fn write_pattern(&mut self, pattern: CoilPattern) -> Result<(), Self::Error> {
        if self.current == Some(pattern) {
            return Ok(());
        }

        let state = |coil| PinState::from(pattern.is_energized(coil));
        self.a.set_state(state(0)).map_err(|_| MotorError::PinError)?;
        self.b.set_state(state(1)).map_err(|_| MotorError::PinError)?;
        self.c.set_state(state(2)).map_err(|_| MotorError::PinError)?;
        self.d.set_state(state(3)).map_err(|_| MotorError::PinError)?;

        self.current = Some(pattern);
        Ok(())
    }
}
