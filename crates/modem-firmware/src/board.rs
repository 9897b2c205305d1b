//! Board wiring for the Si2457
//!
//! The modem hangs off UART1 with two GPIOs: the active-low reset input and the
//! line seizure (hook) relay.

use esp_hal::Blocking;
use esp_hal::gpio::interconnect::{PeripheralInput, PeripheralOutput};
use esp_hal::gpio::{Level, Output, OutputConfig, OutputPin};
use esp_hal::uart::{Config as UartConfig, ConfigError, Uart};

use modem_core::SharedModem;

/// The Si2457 autobauds; this is what the controller talks at.
pub const MODEM_BAUDRATE: u32 = 115_200;

pub type ModemUart = Uart<'static, Blocking>;

/// The controller as shared between the tick loops and the event loop.
pub type FirmwareModem = SharedModem<'static, Output<'static>, Output<'static>, ModemUart>;

/// Reset line, starting high so the modem runs until detection pulses it.
pub fn reset_line(pin: impl OutputPin + 'static) -> Output<'static> {
    Output::new(pin, Level::High, OutputConfig::default())
}

/// Hook relay, starting on-hook.
pub fn hook_line(pin: impl OutputPin + 'static) -> Output<'static> {
    Output::new(pin, Level::Low, OutputConfig::default())
}

/// Blocking UART towards the modem. Detection busy-polls it, so it stays
/// blocking rather than async.
pub fn modem_uart(
    uart: esp_hal::peripherals::UART1<'static>,
    rx: impl PeripheralInput<'static>,
    tx: impl PeripheralOutput<'static>,
) -> Result<ModemUart, ConfigError> {
    let config = UartConfig::default().with_baudrate(MODEM_BAUDRATE);
    Ok(Uart::new(uart, config)?.with_rx(rx).with_tx(tx))
}
