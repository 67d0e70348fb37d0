//! Task timing and pipeline tuning.

use serde::Deserialize;

use super::units::Milliseconds;

/// Emergency button and alarm settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmergencyConfig {
    /// Consecutive active polls before the button counts as pressed.
    pub debounce_polls: u8,

    /// Button polling period.
    pub poll_period_ms: Milliseconds,

    /// Alarm LED half-period (250 ms gives a 2 Hz blink).
    pub alarm_toggle_ms: Milliseconds,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            debounce_polls: 3,
            poll_period_ms: Milliseconds(100),
            alarm_toggle_ms: Milliseconds(250),
        }
    }
}

/// Command submission settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Extra attempts after the first failed send.
    pub retry_attempts: u8,

    /// Delay between send attempts.
    pub retry_backoff_ms: Milliseconds,

    /// Queue commands that arrive during an emergency (true) or drop them.
    pub hold_during_emergency: bool,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 5,
            retry_backoff_ms: Milliseconds(100),
            hold_during_emergency: true,
        }
    }
}

/// Motor task scheduling settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// How long the motor task sleeps when it has nothing to do.
    pub idle_poll_ms: Milliseconds,

    /// Step periods at or below this are not worth sleeping through.
    pub sleep_threshold_ms: Milliseconds,

    /// Wake this much before the next step is due.
    pub lookahead_ms: Milliseconds,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            idle_poll_ms: Milliseconds(100),
            sleep_threshold_ms: Milliseconds(2),
            lookahead_ms: Milliseconds(1),
        }
    }
}
