//! Modem status flags

/// What currently owns the modem's reset pin and line.
///
/// Encoding reset and connection as one enum makes "resetting while
/// connected" unrepresentable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkState {
    #[default]
    Idle,
    /// A hard reset countdown is running
    Resetting,
    /// A remote connection is established
    Connected,
}

/// Sticky status flags, one per concern.
///
/// Read-only outside the crate; transitions go through [`crate::ModemState`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModemFlags {
    pub(crate) link: LinkState,
    pub(crate) detected: bool,
    pub(crate) ringing: bool,
    pub(crate) hard_sync: bool,
    pub(crate) answer_in_progress: bool,
    pub(crate) init_done: bool,
}

impl ModemFlags {
    pub fn link(&self) -> LinkState {
        self.link
    }

    /// A modem answered the boot probe.
    pub fn detected(&self) -> bool {
        self.detected
    }

    pub fn resetting(&self) -> bool {
        self.link == LinkState::Resetting
    }

    pub fn connected(&self) -> bool {
        self.link == LinkState::Connected
    }

    /// An incoming call is ringing.
    pub fn ringing(&self) -> bool {
        self.ringing
    }

    /// A reset for synchronizing with a remote modem is underway.
    pub fn hard_sync(&self) -> bool {
        self.hard_sync
    }

    pub fn answer_in_progress(&self) -> bool {
        self.answer_in_progress
    }

    /// The initialization reset has been issued.
    pub fn init_done(&self) -> bool {
        self.init_done
    }

    /// Every condition that forbids a hard reset is clear.
    pub(crate) fn hard_reset_permitted(&self) -> bool {
        self.detected
            && !self.connected()
            && !self.ringing
            && !self.hard_sync
            && !self.answer_in_progress
    }
}
