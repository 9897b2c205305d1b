//! Timing and behavior configuration for the modem controller
//!
//! Defaults match the Si2457 board: a 10 ms fast tick, a 1 s slow tick, a
//! 55-tick hard reset released after the first 5 ticks, and a 200 ms echo
//! window during detection (the modem answers in about 54 ms).

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound on the postcard encoding of [`ModemConfig`].
pub const CONFIG_ENCODED_MAX: usize = 48;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemConfig {
    /// Fast tick period in milliseconds
    pub fast_tick_ms: u16,
    /// Slow tick period in milliseconds
    pub slow_tick_ms: u16,
    /// The reset line is released once the reset countdown drops below this
    pub reset_hold_threshold: u16,
    /// Countdown armed by a hard reset, in fast ticks
    pub hard_reset_ticks: u16,
    /// Settle period after detection or shutdown, in seconds
    pub settle_secs: u16,
    /// Low phase of the boot reset pulse
    pub pulse_low_ms: u32,
    /// Wait after releasing the boot reset pulse
    pub pulse_settle_ms: u32,
    /// Number of receive-ready polls while waiting for the echo
    pub detect_poll_budget: u16,
    /// Delay between two receive-ready polls, in microseconds
    pub detect_poll_step_us: u32,
    /// Maximum number of stale bytes drained before probing
    pub discard_limit: u16,
    /// Append the answer command to the init sequence
    pub answer_on_init: bool,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            fast_tick_ms: 10,
            slow_tick_ms: 1000,
            reset_hold_threshold: 50,
            hard_reset_ticks: 55,
            settle_secs: 2,
            pulse_low_ms: 200,
            pulse_settle_ms: 500,
            detect_poll_budget: 200,
            detect_poll_step_us: 1000,
            discard_limit: 16,
            answer_on_init: false,
        }
    }
}

impl ModemConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fast_tick_ms == 0 || self.slow_tick_ms == 0 {
            return Err(ConfigError::ZeroTickPeriod);
        }
        if self.hard_reset_ticks <= self.reset_hold_threshold {
            return Err(ConfigError::HardResetTooShort {
                hard_reset_ticks: self.hard_reset_ticks,
                threshold: self.reset_hold_threshold,
            });
        }
        if self.detect_poll_budget == 0 {
            return Err(ConfigError::ZeroPollBudget);
        }
        Ok(())
    }

    pub fn fast_tick_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.fast_tick_ms))
    }

    pub fn slow_tick_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.slow_tick_ms))
    }

    /// Settle period expressed in fast ticks, clamped to the counter range.
    pub fn settle_ticks(&self) -> u16 {
        let millis = u32::from(self.settle_secs) * 1000;
        let ticks = millis / u32::from(self.fast_tick_ms.max(1));
        u16::try_from(ticks).unwrap_or(u16::MAX)
    }

    /// Encode for persistent storage.
    pub fn to_slice<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        Ok(postcard::to_slice(self, buf)?)
    }

    /// Decode from persistent storage. The result is validated.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes)?;
        config.validate()?;
        Ok(config)
    }
}
