//! Error types for the modem controller

use thiserror_no_std::Error;

/// Hardware failures surfaced while driving the modem.
///
/// Domain conditions (no modem answered, a guarded reset was skipped, a
/// connection timed out) are reported through state and return values, never
/// through this type.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemError {
    #[error("Reset line error: {0:?}")]
    ResetLine(embedded_hal::digital::ErrorKind),
    #[error("Hook line error: {0:?}")]
    HookLine(embedded_hal::digital::ErrorKind),
    #[error("Serial link error: {0:?}")]
    Serial(embedded_io::ErrorKind),
}

impl ModemError {
    pub(crate) fn reset_line<E: embedded_hal::digital::Error>(error: E) -> Self {
        Self::ResetLine(error.kind())
    }

    pub(crate) fn hook_line<E: embedded_hal::digital::Error>(error: E) -> Self {
        Self::HookLine(error.kind())
    }

    pub(crate) fn serial<E: embedded_io::Error>(error: E) -> Self {
        Self::Serial(error.kind())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Tick periods must be non-zero")]
    ZeroTickPeriod,
    #[error("Hard reset of {hard_reset_ticks} ticks does not exceed the hold threshold of {threshold}")]
    HardResetTooShort { hard_reset_ticks: u16, threshold: u16 },
    #[error("Detection poll budget must be non-zero")]
    ZeroPollBudget,
    #[error("Config encoding error: {0:?}")]
    Encoding(#[from] postcard::Error),
}
