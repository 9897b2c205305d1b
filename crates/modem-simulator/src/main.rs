//! Desktop simulator for the Si2457 modem controller.
//!
//! Runs modem-core against a simulated modem: the reset and hook lines are
//! plain booleans, the serial link echoes and answers AT commands after a fixed
//! latency, and both tick sources are driven from a simulated clock.
//!
//! # Options
//!
//! | Flag          | Effect                                          |
//! |---------------|-------------------------------------------------|
//! | `--no-modem`  | Nothing answers the detection probe             |
//! | `--garbled`   | The modem answers with noise instead of an echo |
//! | `--answer`    | Append `ATA` to the init sequence               |
//! | `--seconds N` | Simulated run length (default 20)               |
//! | `--realtime`  | Pace ticks against the wall clock               |
//!
//! With a modem present, a scripted call rings, connects and times out, after
//! which the modem is shut down and initialized again.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_io::{Read, ReadReady, Write};
use log::{error, info, warn};

use modem_core::{EventChannel, ModemConfig, ModemController, ModemEvent, SharedModem};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Measured echo latency of the Si2457.
const ECHO_LATENCY_MS: u64 = 54;

/// Numeric result code for `OK` once `V0` is in effect.
const RESULT_OK: &[u8] = b"0\r";

const NANOS_PER_MILLI: u64 = 1_000_000;

static MODEM_EVENTS: EventChannel = EventChannel::new();

// ---------------------------------------------------------------------------
// Simulated modem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fitted {
    Modem,
    Garbled,
    Absent,
}

/// Simulated time, advanced by the delay and the tick loop.
#[derive(Debug, Clone, Default)]
struct SimClock(Rc<Cell<u64>>);

impl SimClock {
    fn now_ns(&self) -> u64 {
        self.0.get()
    }

    fn advance_ns(&self, ns: u64) {
        self.0.set(self.0.get() + ns);
    }

    fn seconds(&self) -> f64 {
        self.now_ns() as f64 / 1e9
    }
}

struct SimModem {
    clock: SimClock,
    fitted: Fitted,
    reset_high: bool,
    hook_high: bool,
    echo: bool,
    command: Vec<u8>,
    /// Bytes on their way to the controller, with the time they arrive
    outbound: VecDeque<(u64, u8)>,
}

impl SimModem {
    fn new(clock: SimClock, fitted: Fitted) -> Self {
        Self {
            clock,
            fitted,
            reset_high: true,
            hook_high: false,
            echo: true,
            command: Vec::new(),
            outbound: VecDeque::new(),
        }
    }

    fn powered(&self) -> bool {
        self.fitted != Fitted::Absent && self.reset_high
    }

    fn set_reset(&mut self, high: bool) {
        if self.reset_high != high {
            info!("[{:7.3}s] RESET {}", self.clock.seconds(), if high { "high" } else { "low" });
        }
        self.reset_high = high;
        if !high {
            // Powered down: the modem forgets everything, echo comes back on.
            self.echo = true;
            self.command.clear();
            self.outbound.clear();
        }
    }

    fn set_hook(&mut self, high: bool) {
        if self.hook_high != high {
            info!(
                "[{:7.3}s] line {}",
                self.clock.seconds(),
                if high { "seized" } else { "released" }
            );
        }
        self.hook_high = high;
    }

    fn queue(&mut self, bytes: &[u8]) {
        let due = self.clock.now_ns() + ECHO_LATENCY_MS * NANOS_PER_MILLI;
        self.outbound.extend(bytes.iter().map(|&byte| (due, byte)));
    }

    fn receive(&mut self, byte: u8) {
        if !self.powered() {
            return;
        }
        if self.fitted == Fitted::Garbled {
            self.queue(b"?");
            return;
        }
        if self.echo {
            self.queue(&[byte]);
        }
        if byte != b'\r' {
            self.command.push(byte);
            return;
        }

        let command = core::mem::take(&mut self.command);
        if command.is_empty() {
            return;
        }
        info!(
            "[{:7.3}s] modem <- {}",
            self.clock.seconds(),
            String::from_utf8_lossy(&command)
        );
        if command.starts_with(b"ATE0") {
            self.echo = false;
        }
        self.queue(RESULT_OK);
    }

    fn next_ready(&mut self) -> Option<u8> {
        match self.outbound.front() {
            Some(&(due, byte)) if due <= self.clock.now_ns() => {
                self.outbound.pop_front();
                Some(byte)
            }
            _ => None,
        }
    }
}

type ModemHandle = Rc<RefCell<SimModem>>;

#[derive(Clone, Copy)]
enum Line {
    Reset,
    Hook,
}

struct SimPin {
    modem: ModemHandle,
    line: Line,
}

impl embedded_hal::digital::ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}

impl SimPin {
    fn set(&mut self, high: bool) {
        let mut modem = self.modem.borrow_mut();
        match self.line {
            Line::Reset => modem.set_reset(high),
            Line::Hook => modem.set_hook(high),
        }
    }
}

struct SimSerial {
    modem: ModemHandle,
}

impl embedded_io::ErrorType for SimSerial {
    type Error = Infallible;
}

impl Read for SimSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut modem = self.modem.borrow_mut();
        let mut count = 0;
        while count < buf.len() {
            match modem.next_ready() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

impl ReadReady for SimSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        let modem = self.modem.borrow();
        Ok(matches!(modem.outbound.front(), Some(&(due, _)) if due <= modem.clock.now_ns()))
    }
}

impl Write for SimSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut modem = self.modem.borrow_mut();
        for &byte in buf {
            modem.receive(byte);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Blocking delay that advances the simulated clock.
struct SimDelay {
    clock: SimClock,
    realtime: bool,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance_ns(u64::from(ns));
        if self.realtime {
            std::thread::sleep(Duration::from_nanos(u64::from(ns)));
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

struct Options {
    fitted: Fitted,
    answer: bool,
    seconds: u32,
    realtime: bool,
}

fn parse_options() -> Options {
    let mut options = Options {
        fitted: Fitted::Modem,
        answer: false,
        seconds: 20,
        realtime: false,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--no-modem" => options.fitted = Fitted::Absent,
            "--garbled" => options.fitted = Fitted::Garbled,
            "--answer" => options.answer = true,
            "--realtime" => options.realtime = true,
            "--seconds" => match args.next().and_then(|value| value.parse().ok()) {
                Some(seconds) => options.seconds = seconds,
                None => warn!("--seconds needs a number, keeping {}", options.seconds),
            },
            other => warn!("Ignoring unknown option {}", other),
        }
    }
    options
}

// ---------------------------------------------------------------------------
// Call script
// ---------------------------------------------------------------------------

/// Plays the AT session layer: a call rings at 5 s, is answered at 7 s and
/// connects at 8 s with a 4 s timeout.
fn run_call_script(second: u32, modem: &SharedModem<'_, SimPin, SimPin, SimSerial>) {
    modem.with(|controller| {
        let state = controller.state_mut();
        match second {
            5 => {
                info!("Incoming call ringing");
                state.set_ringing(true);
            }
            7 => {
                info!("Answering");
                state.set_ringing(false);
                state.set_answer_in_progress(true);
            }
            8 => {
                state.set_answer_in_progress(false);
                if state.mark_connected(4) {
                    info!("Connected");
                }
            }
            _ => {}
        }
    });
}

fn handle_event(event: ModemEvent, modem: &SharedModem<'_, SimPin, SimPin, SimSerial>) {
    info!("Event: {:?}", event);
    match event {
        ModemEvent::InitSequenceDue => match modem.with(|controller| controller.send_init_sequence()) {
            Ok(count) => info!("Sent {} init commands", count),
            Err(e) => error!("Init sequence failed: {}", e),
        },
        ModemEvent::ConnectionTimeout => {
            // Policy: hang up and bring the modem back from scratch.
            let result = modem.with(|controller| {
                controller.state_mut().mark_disconnected();
                controller.shutdown()
            });
            if let Err(e) = result {
                error!("Shutdown failed: {}", e);
            }
        }
        ModemEvent::HardResetIssued | ModemEvent::ResetComplete => {}
    }
}

fn drain_responses(modem: &SharedModem<'_, SimPin, SimPin, SimSerial>, clock: &SimClock) {
    let mut buf = [0u8; 32];
    let count = modem.with(|controller| controller.serial_mut().read(&mut buf).unwrap_or(0));
    if count > 0 {
        info!(
            "[{:7.3}s] modem -> {:?}",
            clock.seconds(),
            String::from_utf8_lossy(&buf[..count])
        );
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    let options = parse_options();
    let config = ModemConfig {
        answer_on_init: options.answer,
        ..ModemConfig::default()
    };
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return;
    }

    info!("Starting modem simulator ({:?}, {} s)", options.fitted, options.seconds);

    let clock = SimClock::default();
    let sim = Rc::new(RefCell::new(SimModem::new(clock.clone(), options.fitted)));
    let mut delay = SimDelay {
        clock: clock.clone(),
        realtime: options.realtime,
    };

    let controller = match ModemController::boot(
        SimPin {
            modem: sim.clone(),
            line: Line::Reset,
        },
        SimPin {
            modem: sim.clone(),
            line: Line::Hook,
        },
        SimSerial { modem: sim.clone() },
        &mut delay,
        config,
    ) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Modem boot failed: {}", e);
            return;
        }
    };
    let detected = controller.state().flags().detected();
    let modem = SharedModem::new(controller, &MODEM_EVENTS);

    let fast_period_ns = u64::from(config.fast_tick_ms) * NANOS_PER_MILLI;
    let fast_per_slow = u32::from(config.slow_tick_ms / config.fast_tick_ms).max(1);
    let total_fast_ticks = options.seconds * 1000 / u32::from(config.fast_tick_ms);

    // -----------------------------------------------------------------------
    // Tick loop
    // -----------------------------------------------------------------------
    for tick in 1..=total_fast_ticks {
        clock.advance_ns(fast_period_ns);

        if let Err(e) = modem.fast_tick() {
            error!("Fast tick failed: {}", e);
        }

        if tick % fast_per_slow == 0 {
            if let Err(e) = modem.slow_tick() {
                error!("Slow tick failed: {}", e);
            }
            if detected {
                run_call_script(tick / fast_per_slow, &modem);
            }
        }

        while let Ok(event) = MODEM_EVENTS.try_receive() {
            handle_event(event, &modem);
        }
        drain_responses(&modem, &clock);

        if options.realtime {
            std::thread::sleep(Duration::from_nanos(fast_period_ns));
        }
    }

    modem.with(|controller| {
        let state = controller.state();
        info!(
            "Simulation finished at {:.3}s: {:?}, detected={}, init_done={}",
            clock.seconds(),
            state.flags().link(),
            state.flags().detected(),
            state.flags().init_done()
        );
    });
}
