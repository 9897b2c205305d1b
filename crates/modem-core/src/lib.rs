//! Hardware-independent core library for the Si2457 modem controller
//!
//! This crate contains all platform-agnostic logic for bringing the modem up
//! and keeping it in a known state: presence detection at boot, the hard reset
//! state machine driven from the fast tick, the initialization countdown driven
//! from the slow tick, and the AT command sequence issued once a reset settles.
//!
//! It is `#![no_std]` so it compiles on both embedded targets (ESP32-S3) and
//! desktop hosts (for the simulator and tests). Hardware is reached only
//! through `embedded-hal` output pins, `embedded-io` serial traits and
//! `critical-section`.

#![no_std]

pub mod commands;
pub mod config;
pub mod controller;
pub mod countdown;
pub mod detection;
pub mod error;
pub mod events;
pub mod flags;
pub mod shared;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ModemConfig;
pub use controller::ModemController;
pub use detection::Detection;
pub use error::{ConfigError, ModemError};
pub use events::ModemEvent;
pub use flags::{LinkState, ModemFlags};
pub use shared::{EventChannel, SharedModem};
pub use state::{FastTick, ModemState, SlowTick};
