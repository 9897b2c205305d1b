//! Host-side doubles for the modem's hardware, sharing one simulated clock.

extern crate std;

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_io::{Read, ReadReady, Write};

const NANOS_PER_MILLI: u64 = 1_000_000;

/// Simulated time in nanoseconds. Only [`MockDelay`] advances it.
#[derive(Debug, Clone, Default)]
pub struct Clock(Rc<Cell<u64>>);

impl Clock {
    pub fn now_ns(&self) -> u64 {
        self.0.get()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ns() / NANOS_PER_MILLI
    }

    pub fn advance_ns(&self, ns: u64) {
        self.0.set(self.0.get() + ns);
    }
}

pub struct MockDelay {
    clock: Clock,
}

impl MockDelay {
    pub fn new(clock: Clock) -> Self {
        Self { clock }
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance_ns(u64::from(ns));
    }
}

#[derive(Debug, Default)]
struct PinLog {
    high: bool,
    transitions: Vec<(u64, bool)>,
}

/// Output pin recording every write as `(ms, level)`. Clones share the log.
#[derive(Debug, Clone)]
pub struct MockPin {
    clock: Clock,
    log: Rc<RefCell<PinLog>>,
}

impl MockPin {
    pub fn new(clock: Clock, high: bool) -> Self {
        Self {
            clock,
            log: Rc::new(RefCell::new(PinLog {
                high,
                transitions: Vec::new(),
            })),
        }
    }

    pub fn is_high(&self) -> bool {
        self.log.borrow().high
    }

    pub fn transitions(&self) -> Vec<(u64, bool)> {
        self.log.borrow().transitions.clone()
    }

    fn set(&mut self, high: bool) {
        let mut log = self.log.borrow_mut();
        log.high = high;
        log.transitions.push((self.clock.now_ms(), high));
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}

/// Serial link that answers the detection probe after a fixed latency.
pub struct MockSerial {
    clock: Clock,
    stale: heapless::Deque<u8, 32>,
    /// Latency and byte sent back when a `\r` is written
    reply: Option<(u64, u8)>,
    /// Byte waiting to be delivered and the time it becomes readable
    pending: Option<(u64, u8)>,
    transmitted: Rc<RefCell<Vec<u8>>>,
}

impl MockSerial {
    pub fn silent(clock: Clock) -> Self {
        Self {
            clock,
            stale: heapless::Deque::new(),
            reply: None,
            pending: None,
            transmitted: Rc::default(),
        }
    }

    pub fn echoing(clock: Clock, latency_ms: u64) -> Self {
        Self::replying(clock, latency_ms, b'\r')
    }

    pub fn replying(clock: Clock, latency_ms: u64, byte: u8) -> Self {
        Self {
            reply: Some((latency_ms * NANOS_PER_MILLI, byte)),
            ..Self::silent(clock)
        }
    }

    /// Bytes already sitting in the receive buffer.
    pub fn with_stale(mut self, bytes: &[u8]) -> Self {
        for &byte in bytes {
            self.stale.push_back(byte).expect("stale buffer full");
        }
        self
    }

    /// Handle on the transmit log that outlives a move into the controller.
    pub fn transmit_log(&self) -> Rc<RefCell<Vec<u8>>> {
        self.transmitted.clone()
    }

    pub fn transmitted(&self) -> Vec<u8> {
        self.transmitted.borrow().clone()
    }

    fn reply_ready(&self) -> bool {
        matches!(self.pending, Some((at, _)) if self.clock.now_ns() >= at)
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = Infallible;
}

impl Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(byte) = self.stale.pop_front() {
            buf[0] = byte;
            return Ok(1);
        }
        if self.reply_ready() {
            if let Some((_, byte)) = self.pending.take() {
                buf[0] = byte;
                return Ok(1);
            }
        }
        Ok(0)
    }
}

impl ReadReady for MockSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.stale.is_empty() || self.reply_ready())
    }
}

impl Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.transmitted.borrow_mut().extend_from_slice(buf);
        if let Some((latency, byte)) = self.reply {
            if buf.contains(&b'\r') && self.pending.is_none() {
                self.pending = Some((self.clock.now_ns() + latency, byte));
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
