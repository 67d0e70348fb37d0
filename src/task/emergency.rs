//! Emergency stop: button debouncing, alarm blinking and the coordinator.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::digital::InputPin;

use super::bus::{ControlBus, EmergencyEvent, EmergencyState};
use crate::config::{EmergencyConfig, Milliseconds};
use crate::error::{MotorError, Result};
use crate::feedback::FeedbackSink;

/// Counts consecutive active samples and fires once per hold.
#[derive(Debug, Clone)]
pub struct Debouncer {
    required: u8,
    count: u16,
}

impl Debouncer {
    /// Fire after `required` consecutive active samples.
    pub fn new(required: u8) -> Self {
        Self {
            required: required.max(1),
            count: 0,
        }
    }

    /// Feed one sample; true exactly on the sample that completes the hold.
    pub fn update(&mut self, active: bool) -> bool {
        if active {
            self.count = self.count.saturating_add(1);
            self.count == self.required as u16
        } else {
            self.count = 0;
            false
        }
    }

    /// Forget the current hold.
    pub fn reset(&mut self) {
        self.count = 0;
    }
}

/// Polls an active-high pushbutton and posts one event per debounced press.
pub struct ButtonMonitor<P: InputPin> {
    pin: P,
    debouncer: Debouncer,
    poll_period: Milliseconds,
}

impl<P: InputPin> ButtonMonitor<P> {
    /// Create a monitor firing after `debounce_polls` active polls.
    pub fn new(pin: P, debounce_polls: u8) -> Self {
        Self {
            pin,
            debouncer: Debouncer::new(debounce_polls),
            poll_period: Milliseconds(100),
        }
    }

    /// Create a monitor from the emergency configuration.
    pub fn from_config(pin: P, config: &EmergencyConfig) -> Self {
        Self {
            poll_period: config.poll_period_ms,
            ..Self::new(pin, config.debounce_polls)
        }
    }

    /// How often [`poll`](Self::poll) should be called.
    pub fn poll_period(&self) -> Milliseconds {
        self.poll_period
    }

    /// Sample the button once. Returns whether a press was posted.
    pub fn poll<M: RawMutex, const N: usize>(&mut self, bus: &ControlBus<M, N>) -> Result<bool> {
        let active = self.pin.is_high().map_err(|_| MotorError::PinError)?;
        if !self.debouncer.update(active) {
            return Ok(false);
        }

        warn!("emergency button pressed");
        Ok(bus.post_emergency(EmergencyEvent::Pressed))
    }

    /// Release the pin.
    pub fn release(self) -> P {
        self.pin
    }
}

/// Square-wave alarm indicator.
#[derive(Debug, Clone)]
pub struct AlarmBlinker {
    half_period: Milliseconds,
    level: bool,
    last_toggle_ms: Option<u64>,
}

impl AlarmBlinker {
    /// Toggle every `half_period` (250 ms gives 2 Hz).
    pub fn new(half_period: Milliseconds) -> Self {
        Self {
            half_period,
            level: false,
            last_toggle_ms: None,
        }
    }

    /// Whether the alarm is running.
    pub fn is_active(&self) -> bool {
        self.last_toggle_ms.is_some()
    }

    /// Current indicator level.
    pub fn level(&self) -> bool {
        self.level
    }

    /// Start blinking, lit.
    pub fn start(&mut self, now_ms: u64) {
        self.level = true;
        self.last_toggle_ms = Some(now_ms);
    }

    /// Stop blinking, dark.
    pub fn stop(&mut self) {
        self.level = false;
        self.last_toggle_ms = None;
    }

    /// New level when a toggle is due.
    pub fn poll(&mut self, now_ms: u64) -> Option<bool> {
        let last = self.last_toggle_ms?;
        if now_ms.saturating_sub(last) < self.half_period.0 as u64 {
            return None;
        }
        self.level = !self.level;
        self.last_toggle_ms = Some(now_ms);
        Some(self.level)
    }
}

/// Coordinator phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoordinatorPhase {
    /// No emergency.
    Normal,
    /// Stop requested; waiting for the motor to reach zero speed.
    EmergencyTriggered,
    /// Motor parked and disabled; waiting for a manual reset.
    Recovering,
}

/// Owns the emergency gate and sequences stop, park and reset.
///
/// The coordinator never touches the controller. It flips the gate to
/// `Stopping`, waits until the published speed is zero, then flips it to
/// `Stopped`; the motor task reacts to each transition.
pub struct EmergencyCoordinator<'a, M: RawMutex, const N: usize> {
    bus: &'a ControlBus<M, N>,
    phase: CoordinatorPhase,
    alarm: AlarmBlinker,
}

impl<'a, M: RawMutex, const N: usize> EmergencyCoordinator<'a, M, N> {
    /// Create a coordinator bound to `bus`.
    pub fn new(bus: &'a ControlBus<M, N>, config: &EmergencyConfig) -> Self {
        Self {
            bus,
            phase: CoordinatorPhase::Normal,
            alarm: AlarmBlinker::new(config.alarm_toggle_ms),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> CoordinatorPhase {
        self.phase
    }

    /// Alarm indicator state.
    pub fn alarm(&self) -> &AlarmBlinker {
        &self.alarm
    }

    /// Handle pending events, advance the stop sequence and blink the alarm.
    pub fn poll<F: FeedbackSink>(&mut self, now_ms: u64, feedback: &mut F) -> CoordinatorPhase {
        while let Ok(event) = self.bus.emergency.try_receive() {
            self.handle(event, now_ms, feedback);
        }

        if self.phase == CoordinatorPhase::EmergencyTriggered && self.bus.status.current_speed() == 0.0 {
            self.bus.gate.set(EmergencyState::Stopped);
            self.phase = CoordinatorPhase::Recovering;
            info!(
                "zero speed reached at position {}, motor parked",
                self.bus.status.current_position()
            );
        }

        if let Some(level) = self.alarm.poll(now_ms) {
            feedback.alarm(level);
        }

        self.phase
    }

    fn handle<F: FeedbackSink>(&mut self, event: EmergencyEvent, now_ms: u64, feedback: &mut F) {
        match (event, self.phase) {
            (EmergencyEvent::Pressed | EmergencyEvent::Trigger, CoordinatorPhase::Normal) => {
                self.trigger(now_ms, feedback)
            }
            (EmergencyEvent::Pressed | EmergencyEvent::Reset, CoordinatorPhase::Recovering) => {
                self.reset(feedback)
            }
            (_, CoordinatorPhase::EmergencyTriggered) => {
                info!("emergency event ignored, motor still decelerating");
            }
            _ => debug!("emergency event ignored in current phase"),
        }
    }

    fn trigger<F: FeedbackSink>(&mut self, now_ms: u64, feedback: &mut F) {
        warn!(
            "emergency stop at position {}",
            self.bus.status.current_position()
        );
        self.bus.gate.set(EmergencyState::Stopping);
        self.phase = CoordinatorPhase::EmergencyTriggered;
        self.alarm.start(now_ms);
        feedback.alarm(true);
    }

    fn reset<F: FeedbackSink>(&mut self, feedback: &mut F) {
        info!(
            "emergency reset, resuming from position {}",
            self.bus.status.current_position()
        );
        self.alarm.stop();
        feedback.alarm(false);
        self.bus.gate.set(EmergencyState::Normal);
        self.phase = CoordinatorPhase::Normal;
    }
}
