//! Modem state machine
//!
//! [`ModemState`] holds the flags and the three countdowns and implements every
//! transition as a pure, allocation-free function. It never touches hardware:
//! handlers report what the reset line should do and
//! [`crate::ModemController`] applies it. The reset and tick transitions are
//! crate-private so the line and the countdown cannot drift apart; outside
//! code only reaches the session flags and connection hooks.

use log::{info, trace, warn};

use crate::config::ModemConfig;
use crate::countdown::Countdown;
use crate::flags::{LinkState, ModemFlags};

/// Outcome of one fast tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastTick {
    /// No reset in progress
    Idle,
    /// Reset line held low
    Holding { remaining: u16 },
    /// Reset line released, modem powering back up
    Releasing { remaining: u16 },
    /// Countdown elapsed, reset finished this tick
    Completed {
        /// The finished reset was issued to initialize the modem
        init_due: bool,
    },
}

impl FastTick {
    /// The reset line must be high after this tick.
    pub fn releases_line(self) -> bool {
        matches!(self, Self::Releasing { .. } | Self::Completed { .. })
    }
}

/// Outcome of one slow tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlowTick {
    Idle,
    /// The init countdown elapsed and a hard reset was armed
    HardResetIssued,
    /// The connection countdown reached its last second
    ConnectionTimeout,
}

#[derive(Debug, Clone)]
pub struct ModemState {
    flags: ModemFlags,
    /// Fast ticks, owned by the fast tick handler
    reset: Countdown,
    /// Seconds, owned by the slow tick handler
    init: Countdown,
    /// Seconds left on the active connection
    connection: Countdown,
    init_sequence_pending: bool,
    hold_threshold: u16,
    hard_reset_ticks: u16,
}

impl ModemState {
    pub fn new(config: &ModemConfig) -> Self {
        Self {
            flags: ModemFlags::default(),
            reset: Countdown::default(),
            init: Countdown::default(),
            connection: Countdown::default(),
            init_sequence_pending: false,
            hold_threshold: config.reset_hold_threshold,
            hard_reset_ticks: config.hard_reset_ticks,
        }
    }

    pub fn flags(&self) -> &ModemFlags {
        &self.flags
    }

    pub fn reset_countdown(&self) -> u16 {
        self.reset.remaining()
    }

    pub fn init_countdown(&self) -> u16 {
        self.init.remaining()
    }

    pub fn connection_countdown(&self) -> u16 {
        self.connection.remaining()
    }

    pub(crate) fn record_detection(&mut self, present: bool) {
        self.flags.detected = present;
    }

    /// Start a reset countdown of `ticks` fast ticks. The caller drives the
    /// reset line low.
    ///
    /// A reset always wins over a connection: arming while connected drops it.
    pub(crate) fn arm_reset(&mut self, ticks: u16) {
        if self.flags.connected() {
            warn!("Reset armed while connected, dropping the connection");
            self.connection.arm(0);
        }
        self.flags.link = LinkState::Resetting;
        self.reset.arm(ticks);
        trace!("Reset armed for {} ticks", ticks);
    }

    /// Arm a hard reset unless a call, a remote synchronization or an answer
    /// sequence owns the modem, or no modem was detected.
    ///
    /// Returns whether the reset was armed; a refused trigger changes nothing.
    pub(crate) fn try_hard_reset(&mut self) -> bool {
        if !self.flags.hard_reset_permitted() {
            trace!("Hard reset skipped: {:?}", self.flags);
            return false;
        }
        self.arm_reset(self.hard_reset_ticks);
        true
    }

    pub(crate) fn fast_tick(&mut self) -> FastTick {
        if !self.flags.resetting() {
            return FastTick::Idle;
        }

        let remaining = self.reset.tick();
        if remaining >= self.hold_threshold {
            FastTick::Holding { remaining }
        } else if remaining > 0 {
            FastTick::Releasing { remaining }
        } else {
            self.flags.link = LinkState::Idle;
            let init_due = core::mem::take(&mut self.init_sequence_pending);
            info!("Modem reset complete");
            FastTick::Completed { init_due }
        }
    }

    pub(crate) fn slow_tick(&mut self) -> SlowTick {
        if self.flags.connected() {
            if self.connection.remaining() == 1 {
                return SlowTick::ConnectionTimeout;
            }
            self.connection.tick();
            return SlowTick::Idle;
        }

        self.init.tick();
        if !self.init.is_expired() || self.flags.init_done || self.flags.resetting() {
            return SlowTick::Idle;
        }

        if self.try_hard_reset() {
            self.flags.init_done = true;
            self.init_sequence_pending = true;
            info!("Init countdown elapsed, hard reset issued");
            SlowTick::HardResetIssued
        } else {
            SlowTick::Idle
        }
    }

    /// Schedule a (re)initialization `seconds` slow ticks from now.
    pub(crate) fn start_init_countdown(&mut self, seconds: u16) {
        self.init.arm(seconds);
        self.flags.init_done = false;
    }

    /// Record an established connection that times out after `timeout_secs`.
    ///
    /// Refused while a reset is running; the reset owns the modem.
    pub fn mark_connected(&mut self, timeout_secs: u16) -> bool {
        if self.flags.resetting() {
            warn!("Connection refused while the modem is resetting");
            return false;
        }
        self.flags.link = LinkState::Connected;
        self.connection.arm(timeout_secs);
        true
    }

    pub fn mark_disconnected(&mut self) {
        if self.flags.connected() {
            self.flags.link = LinkState::Idle;
            self.connection.arm(0);
        }
    }

    pub fn set_ringing(&mut self, ringing: bool) {
        self.flags.ringing = ringing;
    }

    pub fn set_hard_sync(&mut self, hard_sync: bool) {
        self.flags.hard_sync = hard_sync;
    }

    pub fn set_answer_in_progress(&mut self, answer_in_progress: bool) {
        self.flags.answer_in_progress = answer_in_progress;
    }
}
