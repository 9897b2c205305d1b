//! Modem controller
//!
//! Owns the modem's hardware (reset line, hook line, serial link) together with
//! its [`ModemState`], and applies the state machine's decisions to the pins.
//! A controller only exists once detection has run, so the tick handlers can
//! never observe a modem that was not probed.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_io::{Read, ReadReady, Write};
use log::{info, warn};

use crate::commands;
use crate::config::ModemConfig;
use crate::detection::{self, Detection};
use crate::error::ModemError;
use crate::state::{FastTick, ModemState, SlowTick};

pub struct ModemController<R, H, S> {
    reset: R,
    hook: H,
    serial: S,
    state: ModemState,
    config: ModemConfig,
    detection: Detection,
}

impl<R, H, S> ModemController<R, H, S>
where
    R: OutputPin,
    H: OutputPin,
    S: Read + ReadReady + Write,
{
    /// Probe for the modem and build the controller.
    ///
    /// Runs the blocking detection routine, so call it once at startup before
    /// the tick sources are started. The reset line is parked low either way;
    /// a detected modem then gets a settle reset and an init countdown of
    /// [`ModemConfig::settle_secs`].
    pub fn boot<D: DelayNs>(
        mut reset: R,
        mut hook: H,
        mut serial: S,
        delay: &mut D,
        config: ModemConfig,
    ) -> Result<Self, ModemError> {
        let detection = detection::detect(&mut reset, &mut hook, &mut serial, delay, &config)?;

        let mut state = ModemState::new(&config);
        state.record_detection(detection.is_present());

        let mut controller = Self {
            reset,
            hook,
            serial,
            state,
            config,
            detection,
        };

        // Keep the modem off for now so it does not report RING.
        controller.reset.set_low().map_err(ModemError::reset_line)?;

        if detection.is_present() {
            controller.arm_reset(controller.config.settle_ticks())?;
            controller.start_init_countdown(controller.config.settle_secs);
            info!(
                "Modem detected, initializing in {} s",
                controller.config.settle_secs
            );
        } else {
            warn!("No modem detected, modem support disabled until reboot");
        }

        Ok(controller)
    }

    pub fn state(&self) -> &ModemState {
        &self.state
    }

    /// Access for the AT session layer (ring, answer and connection flags).
    ///
    /// Resets go through [`Self::arm_reset`] and [`Self::hard_reset`], which
    /// drive the line together with the countdown:
    ///
    /// ```compile_fail
    /// use modem_core::{ModemConfig, ModemState};
    ///
    /// let mut state = ModemState::new(&ModemConfig::default());
    /// state.try_hard_reset();
    /// ```
    pub fn state_mut(&mut self) -> &mut ModemState {
        &mut self.state
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    pub fn detection(&self) -> Detection {
        self.detection
    }

    /// The serial link, for the AT session layer reading modem responses.
    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }

    /// Drive the reset line low and start a reset countdown.
    pub fn arm_reset(&mut self, ticks: u16) -> Result<(), ModemError> {
        self.state.arm_reset(ticks);
        self.reset.set_low().map_err(ModemError::reset_line)
    }

    /// Guarded hard reset. Returns `false` when a guard forbids it.
    pub fn hard_reset(&mut self) -> Result<bool, ModemError> {
        if !self.state.try_hard_reset() {
            return Ok(false);
        }
        self.reset.set_low().map_err(ModemError::reset_line)?;
        Ok(true)
    }

    pub fn start_init_countdown(&mut self, seconds: u16) {
        self.state.start_init_countdown(seconds);
    }

    /// Power the modem down, e.g. when the PC cable is removed. It is reset
    /// and initialized again once the settle period elapses.
    ///
    /// A reset countdown already running is not cancelled: it still releases
    /// the line when it drops below the hold threshold.
    pub fn shutdown(&mut self) -> Result<(), ModemError> {
        self.reset.set_low().map_err(ModemError::reset_line)?;
        self.state.start_init_countdown(self.config.settle_secs);
        info!("Modem shut down");
        Ok(())
    }

    /// Fast tick handler (~10 ms). Never blocks.
    pub fn fast_tick(&mut self) -> Result<FastTick, ModemError> {
        let tick = self.state.fast_tick();
        if tick.releases_line() {
            self.reset.set_high().map_err(ModemError::reset_line)?;
        }
        Ok(tick)
    }

    /// Slow tick handler (~1 s). Never blocks.
    pub fn slow_tick(&mut self) -> Result<SlowTick, ModemError> {
        let tick = self.state.slow_tick();
        if tick == SlowTick::HardResetIssued {
            self.reset.set_low().map_err(ModemError::reset_line)?;
        }
        Ok(tick)
    }

    /// Configure the modem after its init reset. Not for tick context.
    pub fn send_init_sequence(&mut self) -> Result<usize, ModemError> {
        commands::send_init_sequence(&mut self.serial, self.config.answer_on_init)
    }

    /// Give the hardware back.
    pub fn release(self) -> (R, H, S) {
        (self.reset, self.hook, self.serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::LinkState;
    use crate::testing::{Clock, MockDelay, MockPin, MockSerial};

    type TestController = ModemController<MockPin, MockPin, MockSerial>;

    fn boot(serial: impl FnOnce(Clock) -> MockSerial) -> (TestController, MockPin, Clock) {
        let clock = Clock::default();
        let reset = MockPin::new(clock.clone(), true);
        let hook = MockPin::new(clock.clone(), false);
        let mut delay = MockDelay::new(clock.clone());
        let controller = ModemController::boot(
            reset.clone(),
            hook,
            serial(clock.clone()),
            &mut delay,
            ModemConfig::default(),
        )
        .unwrap();
        (controller, reset, clock)
    }

    #[test]
    fn test_boot_with_modem_arms_settle_reset() {
        let (controller, reset, _) = boot(|clock| MockSerial::echoing(clock, 54));

        let flags = controller.state().flags();
        assert!(flags.detected());
        assert!(flags.resetting());
        assert_eq!(controller.state().reset_countdown(), 200);
        assert_eq!(controller.state().init_countdown(), 2);
        assert!(!reset.is_high());
        assert_eq!(controller.detection(), Detection::Present);
    }

    #[test]
    fn test_boot_settle_end_to_end() {
        let (mut controller, reset, _) = boot(|clock| MockSerial::echoing(clock, 54));

        // Pulse low at 0, released at 200 ms, echo at 754 ms, then parked low.
        let transitions = reset.transitions();
        assert_eq!(transitions[..2], [(0, false), (200, true)]);
        assert_eq!(transitions.last(), Some(&(754, false)));

        let mut ticks = 0;
        while controller.state().flags().resetting() {
            controller.fast_tick().unwrap();
            ticks += 1;
        }
        assert_eq!(ticks, 200);
        assert!(reset.is_high());
    }

    #[test]
    fn test_boot_without_modem_parks_reset_low() {
        let (mut controller, reset, _) = boot(MockSerial::silent);

        assert!(!controller.state().flags().detected());
        assert!(!controller.state().flags().resetting());
        assert!(!reset.is_high());

        // Nothing ever wakes it up again.
        for _ in 0..10 {
            assert_eq!(controller.slow_tick(), Ok(SlowTick::Idle));
            assert_eq!(controller.fast_tick(), Ok(FastTick::Idle));
        }
        assert!(!reset.is_high());
    }

    #[test]
    fn test_boot_with_garbled_echo_is_absent() {
        let (controller, _, _) = boot(|clock| MockSerial::replying(clock, 54, b'?'));
        assert!(!controller.state().flags().detected());
        assert_eq!(controller.detection(), Detection::Unexpected(b'?'));
    }

    #[test]
    fn test_hard_reset_line_low_then_high() {
        let (mut controller, reset, _) = boot(|clock| MockSerial::echoing(clock, 54));
        while controller.fast_tick().unwrap() != (FastTick::Completed { init_due: false }) {}

        assert_eq!(controller.hard_reset(), Ok(true));
        assert_eq!(controller.state().reset_countdown(), 55);
        assert!(!reset.is_high());

        let mut released_at = None;
        for _ in 0..55 {
            let tick = controller.fast_tick().unwrap();
            let remaining = controller.state().reset_countdown();
            if remaining >= 50 {
                assert!(!reset.is_high(), "line released at {}", remaining);
            } else if released_at.is_none() {
                assert!(reset.is_high());
                released_at = Some(remaining);
            }
            if remaining == 0 {
                assert_eq!(tick, FastTick::Completed { init_due: false });
            }
        }
        assert_eq!(released_at, Some(49));
        assert!(reset.is_high());
        assert!(!controller.state().flags().resetting());
    }

    #[test]
    fn test_hard_reset_refused_while_ringing() {
        let (mut controller, _, _) = boot(|clock| MockSerial::echoing(clock, 54));
        while controller.fast_tick().unwrap() != (FastTick::Completed { init_due: false }) {}

        controller.state_mut().set_ringing(true);
        assert_eq!(controller.hard_reset(), Ok(false));
        assert_eq!(controller.state().flags().link(), LinkState::Idle);
    }

    #[test]
    fn test_boot_to_initialized_modem() {
        let (mut controller, reset, _) = boot(|clock| MockSerial::echoing(clock, 54));

        // Drive both tick sources: 100 fast ticks per slow tick.
        let mut init_due = false;
        let mut hard_resets = 0;
        for _second in 0..5 {
            for _ in 0..100 {
                if let FastTick::Completed { init_due: true } = controller.fast_tick().unwrap() {
                    init_due = true;
                }
            }
            if controller.slow_tick().unwrap() == SlowTick::HardResetIssued {
                hard_resets += 1;
            }
        }

        assert_eq!(hard_resets, 1);
        assert!(init_due);
        assert!(controller.state().flags().init_done());
        assert!(!controller.state().flags().resetting());
        assert!(reset.is_high());
    }

    #[test]
    fn test_shutdown_schedules_reinit() {
        let (mut controller, reset, _) = boot(|clock| MockSerial::echoing(clock, 54));
        while controller.fast_tick().unwrap() != (FastTick::Completed { init_due: false }) {}
        controller.slow_tick().unwrap();
        assert_eq!(controller.slow_tick(), Ok(SlowTick::HardResetIssued));
        while controller.fast_tick().unwrap() != (FastTick::Completed { init_due: true }) {}

        controller.shutdown().unwrap();
        assert!(!reset.is_high());
        assert!(!controller.state().flags().init_done());

        assert_eq!(controller.slow_tick(), Ok(SlowTick::Idle));
        assert_eq!(controller.slow_tick(), Ok(SlowTick::HardResetIssued));
    }

    #[test]
    fn test_session_flags_then_hard_reset_holds_line_low() {
        let (mut controller, reset, _) = boot(|clock| MockSerial::echoing(clock, 54));
        while controller.fast_tick().unwrap() != (FastTick::Completed { init_due: false }) {}
        assert!(reset.is_high());

        let state = controller.state_mut();
        state.set_ringing(true);
        state.set_ringing(false);
        assert_eq!(controller.hard_reset(), Ok(true));

        while controller.state().reset_countdown() > 50 {
            controller.fast_tick().unwrap();
            assert!(controller.state().flags().resetting());
            assert!(!reset.is_high(), "line released at {}", controller.state().reset_countdown());
        }
    }

    #[test]
    fn test_shutdown_during_settle_keeps_running_reset() {
        let (mut controller, reset, _) = boot(|clock| MockSerial::echoing(clock, 54));
        controller.shutdown().unwrap();
        assert!(!reset.is_high());
        assert!(controller.state().flags().resetting());

        // The settle reset still runs out and powers the modem back up.
        for _ in 0..160 {
            controller.fast_tick().unwrap();
        }
        assert!(reset.is_high());
        while controller.state().flags().resetting() {
            controller.fast_tick().unwrap();
        }

        assert_eq!(controller.slow_tick(), Ok(SlowTick::Idle));
        assert_eq!(controller.slow_tick(), Ok(SlowTick::HardResetIssued));
        assert!(!reset.is_high());
    }

    #[test]
    fn test_init_sequence_goes_out_on_serial() {
        let clock = Clock::default();
        let serial = MockSerial::echoing(clock.clone(), 54);
        let log = serial.transmit_log();
        let mut delay = MockDelay::new(clock.clone());
        let config = ModemConfig {
            answer_on_init: true,
            ..ModemConfig::default()
        };
        let mut controller = ModemController::boot(
            MockPin::new(clock.clone(), true),
            MockPin::new(clock.clone(), false),
            serial,
            &mut delay,
            config,
        )
        .unwrap();

        assert_eq!(controller.send_init_sequence(), Ok(5));
        let sent = log.borrow();
        assert!(sent.starts_with(b"\rATE0V0S0=0X0\\V2+GCI=3D\r"));
        assert!(sent.ends_with(b"ATA\r"));
    }
}
