//! Terminal mode registry.
//!
//! Tracks the current value of every toggle-able mode the core understands,
//! plus an opaque store for unknown DEC private mode numbers so a later
//! query or reset round-trips them. Mode numbers arrive from `CSI ? Pm h/l`
//! (DEC private) and `CSI Pm h/l` (ANSI); the registry holds the values, the
//! mutator performs any side effects (buffer switching, cursor save).

use std::collections::HashMap;

/// Which mouse events the child process asked to receive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MouseTracking {
    /// No tracking; mouse events are not forwarded.
    #[default]
    Off,
    /// Mode 1000: button presses and releases only.
    Normal,
    /// Mode 1002: presses, releases, and drag motion.
    ButtonEvent,
    /// Mode 1003: all motion.
    AnyEvent,
}

/// The closed set of modes the rest of the crate consults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    ApplicationCursorKeys,
    Origin,
    AutoWrap,
    Insert,
    CursorVisible,
    AlternateScreen,
    BracketedPaste,
    LinefeedNewline,
}

/// Current value of every terminal mode.
#[derive(Clone, Debug)]
pub struct ModeRegistry {
    pub application_cursor: bool,
    /// DECOM: row addressing relative to the scroll region.
    pub origin: bool,
    pub auto_wrap: bool,
    /// IRM: printing shifts existing cells right instead of overwriting.
    pub insert: bool,
    pub cursor_visible: bool,
    pub alternate_screen: bool,
    pub bracketed_paste: bool,
    /// LNM: Enter sends CR LF and LF implies CR.
    pub linefeed_newline: bool,
    pub mouse: MouseTracking,
    /// Mode 1006: mouse reports use the SGR decimal encoding.
    pub sgr_mouse: bool,
    /// Unknown DEC private modes, stored but never consulted.
    unknown: HashMap<u16, bool>,
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self {
            application_cursor: false,
            origin: false,
            auto_wrap: true, // on by default per VT100
            insert: false,
            cursor_visible: true,
            alternate_screen: false,
            bracketed_paste: false,
            linefeed_newline: false,
            mouse: MouseTracking::Off,
            sgr_mouse: false,
            unknown: HashMap::new(),
        }
    }
}

impl ModeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, mode: Mode) -> bool {
        match mode {
            Mode::ApplicationCursorKeys => self.application_cursor,
            Mode::Origin => self.origin,
            Mode::AutoWrap => self.auto_wrap,
            Mode::Insert => self.insert,
            Mode::CursorVisible => self.cursor_visible,
            Mode::AlternateScreen => self.alternate_screen,
            Mode::BracketedPaste => self.bracketed_paste,
            Mode::LinefeedNewline => self.linefeed_newline,
        }
    }

    pub fn set(&mut self, mode: Mode, enable: bool) {
        match mode {
            Mode::ApplicationCursorKeys => self.application_cursor = enable,
            Mode::Origin => self.origin = enable,
            Mode::AutoWrap => self.auto_wrap = enable,
            Mode::Insert => self.insert = enable,
            Mode::CursorVisible => self.cursor_visible = enable,
            Mode::AlternateScreen => self.alternate_screen = enable,
            Mode::BracketedPaste => self.bracketed_paste = enable,
            Mode::LinefeedNewline => self.linefeed_newline = enable,
        }
    }

    /// Apply a DEC private mode number that has no buffer-level side effect.
    /// Returns false when the number is one the mutator must handle itself
    /// (alternate screen and cursor save variants) or is unknown.
    pub fn set_private(&mut self, mode: u16, enable: bool) -> bool {
        match mode {
            1 => self.application_cursor = enable,
            6 => self.origin = enable,
            7 => self.auto_wrap = enable,
            25 => self.cursor_visible = enable,
            1000 => self.track_mouse(MouseTracking::Normal, enable),
            1002 => self.track_mouse(MouseTracking::ButtonEvent, enable),
            1003 => self.track_mouse(MouseTracking::AnyEvent, enable),
            1006 => self.sgr_mouse = enable,
            2004 => self.bracketed_paste = enable,
            _ => return false,
        }
        true
    }

    /// Apply an ANSI (non-private) mode number.
    pub fn set_ansi(&mut self, mode: u16, enable: bool) {
        match mode {
            4 => self.insert = enable,
            20 => self.linefeed_newline = enable,
            _ => {
                tracing::debug!("ignoring unknown ANSI mode {} (enable={})", mode, enable);
            }
        }
    }

    /// Remember an unrecognized private mode without acting on it.
    pub fn set_unknown(&mut self, mode: u16, enable: bool) {
        tracing::debug!("storing unknown DEC private mode {} (enable={})", mode, enable);
        self.unknown.insert(mode, enable);
    }

    pub fn get_unknown(&self, mode: u16) -> Option<bool> {
        self.unknown.get(&mode).copied()
    }

    fn track_mouse(&mut self, variant: MouseTracking, enable: bool) {
        if enable {
            self.mouse = variant;
        } else if self.mouse == variant {
            self.mouse = MouseTracking::Off;
        }
    }
}
