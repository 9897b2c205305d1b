//! AT commands sent to the Si2457
//!
//! The strings are reproduced byte for byte, carriage return included. No
//! response is awaited here; answers are consumed by the AT session layer.

use embedded_io::Write;
use log::debug;

use crate::error::ModemError;

/// Echo probe sent during detection. An attached modem echoes it back.
pub const DETECT_PROBE: u8 = b'\r';

/// Echo off, numeric results, no auto-answer, basic result codes,
/// country code 0x3D.
pub const AT_INIT: &[u8] = b"ATE0V0S0=0X0\\V2+GCI=3D\r";
/// Enable caller ID delivery.
pub const AT_CALLER_ID_ON: &[u8] = b"AT+VCDT=1\r";
/// Formatted caller ID.
pub const AT_CALLER_ID_FORMAT: &[u8] = b"AT+VCID=1\r";
/// Line parameters (register U67).
pub const AT_LINE_PARAMS: &[u8] = b"AT:U67,0008\r";
/// Go off-hook and synchronize with the remote modem.
pub const AT_ANSWER: &[u8] = b"ATA\r";

/// Commands issued after a hard reset, in order.
pub fn init_sequence(answer: bool) -> impl Iterator<Item = &'static [u8]> {
    [AT_INIT, AT_CALLER_ID_ON, AT_CALLER_ID_FORMAT, AT_LINE_PARAMS]
        .into_iter()
        .chain(answer.then_some(AT_ANSWER))
}

/// Write one command with interrupts masked, so the interrupt driven receive
/// path cannot interleave with it.
pub fn send_command<S: Write>(serial: &mut S, command: &[u8]) -> Result<(), ModemError> {
    critical_section::with(|_| {
        serial.write_all(command).map_err(ModemError::serial)?;
        serial.flush().map_err(ModemError::serial)
    })
}

/// Send the full init sequence. Returns the number of commands written.
pub fn send_init_sequence<S: Write>(serial: &mut S, answer: bool) -> Result<usize, ModemError> {
    let mut sent = 0;
    for command in init_sequence(answer) {
        send_command(serial, command)?;
        sent += 1;
    }
    debug!("Init sequence sent ({} commands)", sent);
    Ok(sent)
}
