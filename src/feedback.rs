//! Operator feedback: step-mode animation and the emergency alarm.
//!
//! Feedback is fire-and-forget. A sink that cannot keep up drops events
//! instead of stalling the motor.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embedded_hal::digital::{OutputPin, PinState};

use crate::config::{CoilPattern, CoilTable, Milliseconds};
use crate::error::{MotorError, Result};
use crate::motion::StepMode;
use crate::motor::CoilOutput;

/// Feedback notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FeedbackEvent {
    /// A move in this mode is starting.
    StepMode(StepMode),
    /// The motor stopped and was disabled.
    Idle,
    /// Alarm indicator level.
    Alarm(bool),
}

/// Receiver of feedback notifications.
pub trait FeedbackSink {
    /// A move in `mode` is starting.
    fn step_mode(&mut self, mode: StepMode);

    /// The motor is at rest and disabled.
    fn motion_idle(&mut self);

    /// Drive the alarm indicator.
    fn alarm(&mut self, on: bool);
}

impl<T: FeedbackSink + ?Sized> FeedbackSink for &mut T {
    fn step_mode(&mut self, mode: StepMode) {
        (**self).step_mode(mode)
    }

    fn motion_idle(&mut self) {
        (**self).motion_idle()
    }

    fn alarm(&mut self, on: bool) {
        (**self).alarm(on)
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFeedback;

impl FeedbackSink for NullFeedback {
    fn step_mode(&mut self, _mode: StepMode) {}
    fn motion_idle(&mut self) {}
    fn alarm(&mut self, _on: bool) {}
}

/// Forwards notifications to a feedback channel, dropping them when it is full.
pub struct QueuedFeedback<'a, M: RawMutex, const N: usize> {
    channel: &'a Channel<M, FeedbackEvent, N>,
    dropped: u32,
}

impl<'a, M: RawMutex, const N: usize> QueuedFeedback<'a, M, N> {
    /// Wrap a feedback channel.
    pub fn new(channel: &'a Channel<M, FeedbackEvent, N>) -> Self {
        Self { channel, dropped: 0 }
    }

    /// Events lost to a full channel so far.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    fn post(&mut self, event: FeedbackEvent) {
        if self.channel.try_send(event).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            debug!("feedback queue full, event dropped");
        }
    }
}

impl<M: RawMutex, const N: usize> FeedbackSink for QueuedFeedback<'_, M, N> {
    fn step_mode(&mut self, mode: StepMode) {
        self.post(FeedbackEvent::StepMode(mode));
    }

    fn motion_idle(&mut self) {
        self.post(FeedbackEvent::Idle);
    }

    fn alarm(&mut self, on: bool) {
        self.post(FeedbackEvent::Alarm(on));
    }
}

/// Four step-mode LEDs plus one alarm LED.
///
/// While a move runs, the LEDs cycle through the active mode's coil patterns,
/// one pattern per frame. The frame period is 250 ms on the lab board.
pub struct LedPanel<L: CoilOutput, A: OutputPin> {
    leds: L,
    alarm: A,
    table: CoilTable,
    frame_ms: Milliseconds,
    animating: Option<StepMode>,
    frame: usize,
    last_frame_ms: Option<u64>,
}

impl<L: CoilOutput, A: OutputPin> LedPanel<L, A> {
    /// Frame period used by the lab firmware.
    pub const DEFAULT_FRAME: Milliseconds = Milliseconds(250);

    /// Create a panel; LEDs stay dark until the first step-mode event.
    pub fn new(leds: L, alarm: A, table: CoilTable) -> Self {
        Self {
            leds,
            alarm,
            table,
            frame_ms: Self::DEFAULT_FRAME,
            animating: None,
            frame: 0,
            last_frame_ms: None,
        }
    }

    /// Override the animation frame period.
    pub fn with_frame_period(mut self, frame_ms: Milliseconds) -> Self {
        self.frame_ms = frame_ms;
        self
    }

    /// Mode being animated, if any.
    pub fn animating(&self) -> Option<StepMode> {
        self.animating
    }

    /// Apply one feedback event.
    pub fn handle(&mut self, event: FeedbackEvent) -> Result<()> {
        match event {
            FeedbackEvent::StepMode(mode) => {
                debug!("animating step mode {}", mode.index());
                self.animating = Some(mode);
                self.frame = 0;
                self.last_frame_ms = None;
            }
            FeedbackEvent::Idle => {
                self.animating = None;
                self.leds
                    .write_pattern(CoilPattern::OFF)
                    .map_err(|_| MotorError::PinError)?;
            }
            FeedbackEvent::Alarm(on) => {
                self.alarm
                    .set_state(PinState::from(on))
                    .map_err(|_| MotorError::PinError)?;
            }
        }
        Ok(())
    }

    /// Drain `channel`, then advance the animation.
    pub fn service<M: RawMutex, const N: usize>(
        &mut self,
        channel: &Channel<M, FeedbackEvent, N>,
        now_ms: u64,
    ) -> Result<()> {
        while let Ok(event) = channel.try_receive() {
            self.handle(event)?;
        }
        self.poll(now_ms)
    }

    /// Show the next animation frame if one is due.
    pub fn poll(&mut self, now_ms: u64) -> Result<()> {
        let Some(mode) = self.animating else {
            return Ok(());
        };

        let due = match self.last_frame_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.frame_ms.0 as u64,
        };
        if !due {
            return Ok(());
        }

        let sequence = self.table.sequence(mode);
        let pattern = sequence[self.frame % sequence.len()];
        self.leds
            .write_pattern(pattern)
            .map_err(|_| MotorError::PinError)?;
        self.frame = (self.frame + 1) % sequence.len();
        self.last_frame_ms = Some(now_ms);
        Ok(())
    }

    /// Release the LEDs and the alarm pin.
    pub fn release(self) -> (L, A) {
        (self.leds, self.alarm)
    }
}

impl<L: CoilOutput, A: OutputPin> FeedbackSink for LedPanel<L, A> {
    fn step_mode(&mut self, mode: StepMode) {
        if self.handle(FeedbackEvent::StepMode(mode)).is_err() {
            warn!("LED panel update failed");
        }
    }

    fn motion_idle(&mut self) {
        if self.handle(FeedbackEvent::Idle).is_err() {
            warn!("LED panel update failed");
        }
    }

    fn alarm(&mut self, on: bool) {
        if self.handle(FeedbackEvent::Alarm(on)).is_err() {
            warn!("alarm LED update failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::RecordingCoils;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction};

    #[test]
    fn test_queued_feedback_drops_when_full() {
        let channel = Channel::<NoopRawMutex, FeedbackEvent, 2>::new();
        let mut sink = QueuedFeedback::new(&channel);

        sink.step_mode(StepMode::Half);
        sink.motion_idle();
        sink.alarm(true);

        assert_eq!(sink.dropped(), 1);
        assert_eq!(channel.try_receive(), Ok(FeedbackEvent::StepMode(StepMode::Half)));
        assert_eq!(channel.try_receive(), Ok(FeedbackEvent::Idle));
    }

    #[test]
    fn test_panel_animates_half_step() {
        let alarm = PinMock::new(&[]);
        let mut panel = LedPanel::new(RecordingCoils::default(), alarm, CoilTable::default());

        panel.handle(FeedbackEvent::StepMode(StepMode::Half)).unwrap();
        for frame in 0..9u64 {
            panel.poll(frame * 250).unwrap();
            // not yet due
            panel.poll(frame * 250 + 100).unwrap();
        }

        let (leds, mut alarm) = panel.release();
        assert_eq!(leds.steps(), 9);
        let bits: heapless::Vec<u8, 16> = leds.recent().map(CoilPattern::bits).collect();
        assert_eq!(bits.as_slice(), &[1, 3, 2, 6, 4, 12, 8, 9, 1]);
        alarm.done();
    }

    #[test]
    fn test_panel_idle_blanks_and_alarm_drives_pin() {
        let alarm = PinMock::new(&[Transaction::set(State::High), Transaction::set(State::Low)]);
        let mut panel = LedPanel::new(RecordingCoils::default(), alarm, CoilTable::default());

        panel.step_mode(StepMode::Wave);
        panel.poll(0).unwrap();
        panel.motion_idle();
        panel.poll(1000).unwrap();
        panel.alarm(true);
        panel.alarm(false);

        assert_eq!(panel.animating(), None);
        let (leds, mut alarm) = panel.release();
        assert_eq!(leds.steps(), 1);
        assert_eq!(leds.last(), Some(CoilPattern::OFF));
        alarm.done();
    }
}
