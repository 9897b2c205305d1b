//! Interrupt-safe access to the modem controller
//!
//! The controller is built once at startup and then shared between the fast
//! tick, the slow tick and the task that consumes [`ModemEvent`]s. Every access
//! goes through a critical-section mutex; the tick handlers never block, so the
//! critical sections stay short.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embedded_hal::digital::OutputPin;
use embedded_io::{Read, ReadReady, Write};
use log::warn;

use crate::controller::ModemController;
use crate::error::ModemError;
use crate::events::{EVENT_CHANNEL_CAPACITY, ModemEvent};
use crate::state::{FastTick, SlowTick};

/// Channel carrying events from the tick handlers to the consumer task
///
/// ```rust,ignore
/// static MODEM_EVENTS: EventChannel = EventChannel::new();
/// ```
pub type EventChannel = Channel<CriticalSectionRawMutex, ModemEvent, EVENT_CHANNEL_CAPACITY>;

pub struct SharedModem<'a, R, H, S> {
    controller: Mutex<CriticalSectionRawMutex, RefCell<ModemController<R, H, S>>>,
    events: &'a EventChannel,
}

impl<'a, R, H, S> SharedModem<'a, R, H, S>
where
    R: OutputPin,
    H: OutputPin,
    S: Read + ReadReady + Write,
{
    pub fn new(controller: ModemController<R, H, S>, events: &'a EventChannel) -> Self {
        Self {
            controller: Mutex::new(RefCell::new(controller)),
            events,
        }
    }

    /// Run `f` with exclusive access to the controller.
    pub fn with<T>(&self, f: impl FnOnce(&mut ModemController<R, H, S>) -> T) -> T {
        self.controller.lock(|controller| f(&mut controller.borrow_mut()))
    }

    /// Fast tick entry point. Publishes reset completion events.
    pub fn fast_tick(&self) -> Result<FastTick, ModemError> {
        let tick = self.with(|controller| controller.fast_tick())?;
        for event in ModemEvent::from_fast_tick(tick) {
            self.publish(event);
        }
        Ok(tick)
    }

    /// Slow tick entry point. Publishes hard resets and connection timeouts.
    pub fn slow_tick(&self) -> Result<SlowTick, ModemError> {
        let tick = self.with(|controller| controller.slow_tick())?;
        if let Some(event) = ModemEvent::from_slow_tick(tick) {
            self.publish(event);
        }
        Ok(tick)
    }

    pub fn events(&self) -> &'a EventChannel {
        self.events
    }

    fn publish(&self, event: ModemEvent) {
        if self.events.try_send(event).is_err() {
            warn!("Modem event channel full, dropped {:?}", event);
        }
    }
}
