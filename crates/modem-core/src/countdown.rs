//! Saturating countdown timers
//!
//! Every timing decision in the controller is made by counting ticks down to
//! zero. Nothing reads a clock.

/// An unsigned tick counter that stops at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Countdown(u16);

impl Countdown {
    pub const fn new(ticks: u16) -> Self {
        Self(ticks)
    }

    /// Ticks left before expiry.
    pub const fn remaining(self) -> u16 {
        self.0
    }

    pub const fn is_expired(self) -> bool {
        self.0 == 0
    }

    /// Overwrite the counter. Re-arming never accumulates.
    pub fn arm(&mut self, ticks: u16) {
        self.0 = ticks;
    }

    /// Advance by one tick and return what is left.
    pub fn tick(&mut self) -> u16 {
        self.0 = self.0.saturating_sub(1);
        self.0
    }
}
