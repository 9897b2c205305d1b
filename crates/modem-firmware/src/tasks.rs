//! Loops driving the modem controller
//!
//! The two tickers stand in for the periodic timer interrupts: each tick takes
//! the controller's critical section for a bounded, non-blocking update. Work
//! that must not run in tick context (sending the init sequence) is handed to
//! [`handle_events`] through the event channel.

use embassy_time::{Duration, Ticker};
use log::{error, info, warn};

use modem_core::ModemEvent;

use crate::board::FirmwareModem;

/// Fast tick (~10 ms): advances the hard reset countdown.
pub async fn run_fast_ticks(modem: &FirmwareModem, period: Duration) {
    let mut ticker = Ticker::every(period);
    loop {
        ticker.next().await;
        if let Err(e) = modem.fast_tick() {
            error!("Modem fast tick failed: {}", e);
        }
    }
}

/// Slow tick (~1 s): advances the init and connection countdowns.
pub async fn run_slow_ticks(modem: &FirmwareModem, period: Duration) {
    let mut ticker = Ticker::every(period);
    loop {
        ticker.next().await;
        if let Err(e) = modem.slow_tick() {
            error!("Modem slow tick failed: {}", e);
        }
    }
}

/// Consume controller events.
pub async fn handle_events(modem: &FirmwareModem) {
    loop {
        match modem.events().receive().await {
            ModemEvent::InitSequenceDue => {
                match modem.with(|controller| controller.send_init_sequence()) {
                    Ok(count) => info!("Modem initialized ({} commands)", count),
                    Err(e) => error!("Modem init sequence failed: {}", e),
                }
            }
            ModemEvent::ConnectionTimeout => {
                // Hang-up policy belongs to the AT session layer.
                warn!("Modem connection timed out");
            }
            event => info!("Modem event: {:?}", event),
        }
    }
}
