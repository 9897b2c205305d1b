//! Boot-time modem detection
//!
//! Method:
//! - hard reset the modem with a blocking pulse
//! - drain whatever the UART buffered meanwhile
//! - send `\r`
//! - wait for the echo (200 ms window by default, measured response 54 ms)
//!
//! No echo, or anything other than `\r`, means no modem is fitted.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_io::{Read, ReadReady, Write};
use log::{debug, info};

use crate::commands::DETECT_PROBE;
use crate::config::ModemConfig;
use crate::error::ModemError;

/// Result of the boot probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// The probe was echoed
    Present,
    /// Nothing arrived within the poll window
    Silent,
    /// Something other than the probe arrived
    Unexpected(u8),
}

impl Detection {
    pub fn is_present(self) -> bool {
        self == Self::Present
    }
}

/// Blocking reset pulse, run with interrupts masked.
///
/// The line is seized for the duration of the pulse so the modem does not
/// report RING while it comes up, then released once it has settled.
pub fn reset_pulse<R, H, D>(
    reset: &mut R,
    hook: &mut H,
    delay: &mut D,
    config: &ModemConfig,
) -> Result<(), ModemError>
where
    R: OutputPin,
    H: OutputPin,
    D: DelayNs,
{
    critical_section::with(|_| {
        hook.set_high().map_err(ModemError::hook_line)?;
        reset.set_low().map_err(ModemError::reset_line)?;
        delay.delay_ms(config.pulse_low_ms);

        reset.set_high().map_err(ModemError::reset_line)?;
        delay.delay_ms(config.pulse_settle_ms);

        hook.set_low().map_err(ModemError::hook_line)
    })
}

/// Read and drop buffered bytes, at most `limit` of them.
pub fn discard_pending<S>(serial: &mut S, limit: u16) -> Result<u16, ModemError>
where
    S: Read + ReadReady,
{
    let mut byte = [0u8; 1];
    let mut discarded = 0;
    while discarded < limit && serial.read_ready().map_err(ModemError::serial)? {
        serial.read(&mut byte).map_err(ModemError::serial)?;
        discarded += 1;
    }
    Ok(discarded)
}

/// Send the probe and spin until a byte is ready or the poll budget runs out.
pub fn probe<S, D>(serial: &mut S, delay: &mut D, config: &ModemConfig) -> Result<Detection, ModemError>
where
    S: Read + ReadReady + Write,
    D: DelayNs,
{
    serial.write_all(&[DETECT_PROBE]).map_err(ModemError::serial)?;
    serial.flush().map_err(ModemError::serial)?;

    let mut budget = config.detect_poll_budget;
    let mut ready = serial.read_ready().map_err(ModemError::serial)?;
    while !ready && budget > 0 {
        budget -= 1;
        delay.delay_us(config.detect_poll_step_us);
        ready = serial.read_ready().map_err(ModemError::serial)?;
    }

    if !ready {
        return Ok(Detection::Silent);
    }

    let mut byte = [0u8; 1];
    let received = serial.read(&mut byte).map_err(ModemError::serial)?;
    debug!(
        "Probe answered after {} polls",
        config.detect_poll_budget - budget
    );
    Ok(match (received, byte[0]) {
        (1, DETECT_PROBE) => Detection::Present,
        (1, other) => Detection::Unexpected(other),
        _ => Detection::Silent,
    })
}

/// Full detection routine. Leaves the reset line in whatever state the pulse
/// left it (high); the caller decides where to park it.
pub fn detect<R, H, S, D>(
    reset: &mut R,
    hook: &mut H,
    serial: &mut S,
    delay: &mut D,
    config: &ModemConfig,
) -> Result<Detection, ModemError>
where
    R: OutputPin,
    H: OutputPin,
    S: Read + ReadReady + Write,
    D: DelayNs,
{
    reset_pulse(reset, hook, delay, config)?;

    let stale = discard_pending(serial, config.discard_limit)?;
    if stale > 0 {
        debug!("Discarded {} stale bytes before probing", stale);
    }

    let detection = probe(serial, delay, config)?;
    info!("Modem detection: {:?}", detection);
    Ok(detection)
}
