//! Events reported upward by the tick handlers

use crate::state::{FastTick, SlowTick};

/// Number of events buffered between the tick contexts and the consumer task
pub const EVENT_CHANNEL_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemEvent {
    /// The init countdown elapsed and the reset line was pulled low
    HardResetIssued,
    /// A reset countdown finished and the reset line is high again
    ResetComplete,
    /// The finished reset was the init reset; send the init sequence
    InitSequenceDue,
    /// The connection countdown expired. What to do is the caller's decision.
    ConnectionTimeout,
}

impl ModemEvent {
    /// Events implied by a fast tick, in the order they should be handled.
    pub fn from_fast_tick(tick: FastTick) -> impl Iterator<Item = ModemEvent> {
        let (complete, init) = match tick {
            FastTick::Completed { init_due } => (true, init_due),
            _ => (false, false),
        };
        complete
            .then_some(Self::ResetComplete)
            .into_iter()
            .chain(init.then_some(Self::InitSequenceDue))
    }

    pub fn from_slow_tick(tick: SlowTick) -> Option<ModemEvent> {
        match tick {
            SlowTick::Idle => None,
            SlowTick::HardResetIssued => Some(Self::HardResetIssued),
            SlowTick::ConnectionTimeout => Some(Self::ConnectionTimeout),
        }
    }
}
