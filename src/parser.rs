//! VT sequence parser.
//!
//! A byte-at-a-time state machine that turns the raw output stream of a
//! child process into a sequence of [`Action`]s. The parser holds no screen
//! state of its own: interpretation of completed sequences belongs to the
//! mutator. State persists across [`VtParser::feed`] calls, so sequences
//! split at arbitrary read boundaries parse identically to whole ones.
//!
//! Robustness rules for untrusted input:
//! - a C0 control arriving mid-sequence executes immediately and aborts the
//!   sequence in progress
//! - parameter lists are capped; excess parameters are dropped, not errors
//! - OSC/DCS payloads are capped; further bytes are consumed but not stored
//! - unrecognized final bytes still complete an action for the mutator to
//!   ignore

use std::mem;

/// Maximum number of numeric parameters kept per CSI/DCS sequence.
pub const MAX_PARAMS: usize = 32;
/// Maximum stored OSC payload length in bytes.
pub const MAX_OSC_LEN: usize = 4096;
/// Maximum stored intermediate bytes per sequence.
pub const MAX_INTERMEDIATES: usize = 2;
/// Maximum DCS payload bytes forwarded before the rest is swallowed.
pub const MAX_DCS_LEN: usize = 4096;

/// A completed unit of parser output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A printable character (decoded from UTF-8 where applicable).
    Print(char),
    /// A C0 control code to execute (BS, HT, LF, CR, ...).
    Execute(u8),
    /// A complete CSI sequence.
    CsiDispatch {
        final_byte: u8,
        params: Vec<u16>,
        intermediates: Vec<u8>,
        /// Private-parameter marker (`?`, `>`, `=`, `<`), if present.
        private: Option<u8>,
    },
    /// A complete non-CSI escape sequence (`ESC 7`, `ESC ( B`, ...).
    EscDispatch {
        final_byte: u8,
        intermediates: Vec<u8>,
    },
    /// A complete OSC string, introducer and terminator stripped.
    OscDispatch(String),
    /// A DCS sequence has opened; payload bytes follow as [`Action::DcsPut`].
    DcsHook {
        final_byte: u8,
        params: Vec<u16>,
        intermediates: Vec<u8>,
    },
    /// One byte of DCS payload.
    DcsPut(u8),
    /// The open DCS sequence terminated.
    DcsUnhook,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum ParserState {
    #[default]
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    OscString,
    /// ESC seen inside an OSC string; next byte decides ST vs. new sequence.
    OscEsc,
    DcsEntry,
    DcsParam,
    DcsIntermediate,
    DcsPassthrough,
    /// ESC seen inside DCS passthrough.
    DcsEsc,
    /// Collecting continuation bytes of a multi-byte UTF-8 character.
    Utf8,
}

/// Escape sequence parser state machine.
#[derive(Clone, Debug)]
pub struct VtParser {
    state: ParserState,
    params: Vec<u16>,
    current_param: Option<u16>,
    intermediates: Vec<u8>,
    private: Option<u8>,
    osc: Vec<u8>,
    dcs_len: usize,
    utf8_buf: [u8; 4],
    utf8_len: usize,
    utf8_remaining: usize,
}

impl Default for VtParser {
    fn default() -> Self {
        Self::new()
    }
}

impl VtParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Ground,
            params: Vec::with_capacity(MAX_PARAMS),
            current_param: None,
            intermediates: Vec::with_capacity(MAX_INTERMEDIATES),
            private: None,
            osc: Vec::new(),
            dcs_len: 0,
            utf8_buf: [0; 4],
            utf8_len: 0,
            utf8_remaining: 0,
        }
    }

    /// Feed a chunk of bytes, returning the actions completed by it.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Action> {
        let mut out = Vec::new();
        for &byte in bytes {
            self.advance(byte, &mut out);
        }
        out
    }

    /// Advance the state machine by one byte, appending any completed
    /// actions. A single byte can complete up to two actions (e.g. an OSC
    /// dispatch followed by the control that cut it short).
    pub fn advance(&mut self, byte: u8, out: &mut Vec<Action>) {
        match self.state {
            ParserState::Ground => self.ground(byte, out),
            ParserState::Escape => self.escape(byte, out),
            ParserState::EscapeIntermediate => self.escape_intermediate(byte, out),
            ParserState::CsiEntry => self.csi_entry(byte, out),
            ParserState::CsiParam => self.csi_param(byte, out),
            ParserState::CsiIntermediate => self.csi_intermediate(byte, out),
            ParserState::OscString => self.osc_string(byte, out),
            ParserState::OscEsc => self.osc_esc(byte, out),
            ParserState::DcsEntry => self.dcs_entry(byte, out),
            ParserState::DcsParam => self.dcs_param(byte, out),
            ParserState::DcsIntermediate => self.dcs_intermediate(byte, out),
            ParserState::DcsPassthrough => self.dcs_passthrough(byte, out),
            ParserState::DcsEsc => self.dcs_esc(byte, out),
            ParserState::Utf8 => self.utf8(byte, out),
        }
    }

    fn enter_escape(&mut self) {
        self.state = ParserState::Escape;
        self.params.clear();
        self.current_param = None;
        self.intermediates.clear();
        self.private = None;
    }

    /// Shared C0 handling for the non-string sequence states: ESC restarts,
    /// any other control executes and aborts the sequence in progress.
    /// Returns true when the byte was consumed here.
    fn handle_c0(&mut self, byte: u8, out: &mut Vec<Action>) -> bool {
        if byte >= 0x20 {
            return false;
        }
        if byte == 0x1b {
            self.enter_escape();
        } else {
            out.push(Action::Execute(byte));
            self.state = ParserState::Ground;
        }
        true
    }

    fn ground(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            0x1b => self.enter_escape(),
            0x00..=0x1a | 0x1c..=0x1f => out.push(Action::Execute(byte)),
            0x20..=0x7e => out.push(Action::Print(byte as char)),
            0x7f => {} // DEL is ignored on output
            0xc2..=0xdf => self.start_utf8(byte, 1),
            0xe0..=0xef => self.start_utf8(byte, 2),
            0xf0..=0xf4 => self.start_utf8(byte, 3),
            // Stray continuation or invalid lead byte.
            _ => {}
        }
    }

    fn start_utf8(&mut self, byte: u8, continuations: usize) {
        self.utf8_buf[0] = byte;
        self.utf8_len = 1;
        self.utf8_remaining = continuations;
        self.state = ParserState::Utf8;
    }

    fn utf8(&mut self, byte: u8, out: &mut Vec<Action>) {
        if (0x80..=0xbf).contains(&byte) {
            self.utf8_buf[self.utf8_len] = byte;
            self.utf8_len += 1;
            self.utf8_remaining -= 1;
            if self.utf8_remaining == 0 {
                if let Ok(s) = std::str::from_utf8(&self.utf8_buf[..self.utf8_len]) {
                    if let Some(ch) = s.chars().next() {
                        out.push(Action::Print(ch));
                    }
                }
                self.state = ParserState::Ground;
            }
        } else {
            // Truncated sequence: drop it and reprocess this byte fresh.
            self.state = ParserState::Ground;
            self.advance(byte, out);
        }
    }

    fn escape(&mut self, byte: u8, out: &mut Vec<Action>) {
        if self.handle_c0(byte, out) {
            return;
        }
        match byte {
            b'[' => self.state = ParserState::CsiEntry,
            b']' => {
                self.state = ParserState::OscString;
                self.osc.clear();
            }
            b'P' => self.state = ParserState::DcsEntry,
            0x20..=0x2f => {
                self.push_intermediate(byte);
                self.state = ParserState::EscapeIntermediate;
            }
            0x30..=0x7e => {
                out.push(Action::EscDispatch {
                    final_byte: byte,
                    intermediates: mem::take(&mut self.intermediates),
                });
                self.state = ParserState::Ground;
            }
            _ => self.state = ParserState::Ground,
        }
    }

    fn escape_intermediate(&mut self, byte: u8, out: &mut Vec<Action>) {
        if self.handle_c0(byte, out) {
            return;
        }
        match byte {
            0x20..=0x2f => self.push_intermediate(byte),
            0x30..=0x7e => {
                out.push(Action::EscDispatch {
                    final_byte: byte,
                    intermediates: mem::take(&mut self.intermediates),
                });
                self.state = ParserState::Ground;
            }
            _ => self.state = ParserState::Ground,
        }
    }

    fn csi_entry(&mut self, byte: u8, out: &mut Vec<Action>) {
        if self.handle_c0(byte, out) {
            return;
        }
        match byte {
            b'0'..=b'9' => {
                self.current_param = Some(u16::from(byte - b'0'));
                self.state = ParserState::CsiParam;
            }
            b';' | b':' => {
                self.push_param(0);
                self.state = ParserState::CsiParam;
            }
            0x3c..=0x3f => {
                // Private marker; only the first one counts.
                if self.private.is_none() {
                    self.private = Some(byte);
                }
            }
            0x20..=0x2f => {
                self.push_intermediate(byte);
                self.state = ParserState::CsiIntermediate;
            }
            0x40..=0x7e => self.dispatch_csi(byte, out),
            _ => self.state = ParserState::Ground,
        }
    }

    fn csi_param(&mut self, byte: u8, out: &mut Vec<Action>) {
        if self.handle_c0(byte, out) {
            return;
        }
        match byte {
            b'0'..=b'9' => {
                let digit = u16::from(byte - b'0');
                // Oversized parameters clamp rather than wrap.
                self.current_param = Some(
                    self.current_param
                        .unwrap_or(0)
                        .saturating_mul(10)
                        .saturating_add(digit),
                );
            }
            // Sub-parameter separators are folded into the flat list.
            b';' | b':' => {
                let param = self.current_param.take().unwrap_or(0);
                self.push_param(param);
            }
            0x20..=0x2f => {
                self.finish_param();
                self.push_intermediate(byte);
                self.state = ParserState::CsiIntermediate;
            }
            0x40..=0x7e => {
                self.finish_param();
                self.dispatch_csi(byte, out);
            }
            _ => self.state = ParserState::Ground,
        }
    }

    fn csi_intermediate(&mut self, byte: u8, out: &mut Vec<Action>) {
        if self.handle_c0(byte, out) {
            return;
        }
        match byte {
            0x20..=0x2f => self.push_intermediate(byte),
            0x40..=0x7e => self.dispatch_csi(byte, out),
            _ => self.state = ParserState::Ground,
        }
    }

    fn osc_string(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            0x07 => {
                // BEL terminator
                out.push(self.dispatch_osc());
                self.state = ParserState::Ground;
            }
            0x1b => self.state = ParserState::OscEsc,
            0x00..=0x06 | 0x08..=0x1a | 0x1c..=0x1f => {
                // A stray control aborts the string without dispatching it.
                self.osc.clear();
                out.push(Action::Execute(byte));
                self.state = ParserState::Ground;
            }
            _ => {
                if self.osc.len() < MAX_OSC_LEN {
                    self.osc.push(byte);
                }
            }
        }
    }

    fn osc_esc(&mut self, byte: u8, out: &mut Vec<Action>) {
        out.push(self.dispatch_osc());
        if byte == b'\\' {
            // ST (ESC \)
            self.state = ParserState::Ground;
        } else {
            // Not ST: the ESC opened a new sequence. Dispatch what we have
            // and reprocess this byte as its first byte.
            self.enter_escape();
            self.escape(byte, out);
        }
    }

    fn dcs_entry(&mut self, byte: u8, out: &mut Vec<Action>) {
        if self.handle_c0(byte, out) {
            return;
        }
        match byte {
            b'0'..=b'9' => {
                self.current_param = Some(u16::from(byte - b'0'));
                self.state = ParserState::DcsParam;
            }
            b';' | b':' => {
                self.push_param(0);
                self.state = ParserState::DcsParam;
            }
            0x3c..=0x3f => {
                if self.private.is_none() {
                    self.private = Some(byte);
                }
            }
            0x20..=0x2f => {
                self.push_intermediate(byte);
                self.state = ParserState::DcsIntermediate;
            }
            0x40..=0x7e => self.hook_dcs(byte, out),
            _ => self.state = ParserState::Ground,
        }
    }

    fn dcs_param(&mut self, byte: u8, out: &mut Vec<Action>) {
        if self.handle_c0(byte, out) {
            return;
        }
        match byte {
            b'0'..=b'9' => {
                let digit = u16::from(byte - b'0');
                self.current_param = Some(
                    self.current_param
                        .unwrap_or(0)
                        .saturating_mul(10)
                        .saturating_add(digit),
                );
            }
            b';' | b':' => {
                let param = self.current_param.take().unwrap_or(0);
                self.push_param(param);
            }
            0x20..=0x2f => {
                self.finish_param();
                self.push_intermediate(byte);
                self.state = ParserState::DcsIntermediate;
            }
            0x40..=0x7e => {
                self.finish_param();
                self.hook_dcs(byte, out);
            }
            _ => self.state = ParserState::Ground,
        }
    }

    fn dcs_intermediate(&mut self, byte: u8, out: &mut Vec<Action>) {
        if self.handle_c0(byte, out) {
            return;
        }
        match byte {
            0x20..=0x2f => self.push_intermediate(byte),
            0x40..=0x7e => self.hook_dcs(byte, out),
            _ => self.state = ParserState::Ground,
        }
    }

    fn dcs_passthrough(&mut self, byte: u8, out: &mut Vec<Action>) {
        if byte == 0x1b {
            self.state = ParserState::DcsEsc;
            return;
        }
        if self.dcs_len < MAX_DCS_LEN {
            self.dcs_len += 1;
            out.push(Action::DcsPut(byte));
        }
        // Past the cap: keep consuming so the stream stays framed.
    }

    fn dcs_esc(&mut self, byte: u8, out: &mut Vec<Action>) {
        out.push(Action::DcsUnhook);
        if byte == b'\\' {
            self.state = ParserState::Ground;
        } else {
            self.enter_escape();
            self.escape(byte, out);
        }
    }

    /// OSC payloads accumulate as raw bytes; titles and color specs arrive
    /// UTF-8 encoded, so decode here (lossily, for untrusted input).
    fn dispatch_osc(&mut self) -> Action {
        let payload = mem::take(&mut self.osc);
        Action::OscDispatch(String::from_utf8_lossy(&payload).into_owned())
    }

    fn hook_dcs(&mut self, final_byte: u8, out: &mut Vec<Action>) {
        out.push(Action::DcsHook {
            final_byte,
            params: mem::take(&mut self.params),
            intermediates: mem::take(&mut self.intermediates),
        });
        self.dcs_len = 0;
        self.state = ParserState::DcsPassthrough;
    }

    fn dispatch_csi(&mut self, final_byte: u8, out: &mut Vec<Action>) {
        out.push(Action::CsiDispatch {
            final_byte,
            params: mem::take(&mut self.params),
            intermediates: mem::take(&mut self.intermediates),
            private: self.private.take(),
        });
        self.state = ParserState::Ground;
    }

    fn finish_param(&mut self) {
        if let Some(param) = self.current_param.take() {
            self.push_param(param);
        }
    }

    fn push_param(&mut self, param: u16) {
        // Excess parameters are dropped, never an error.
        if self.params.len() < MAX_PARAMS {
            self.params.push(param);
        }
    }

    fn push_intermediate(&mut self, byte: u8) {
        if self.intermediates.len() < MAX_INTERMEDIATES {
            self.intermediates.push(byte);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(bytes: &[u8]) -> Vec<Action> {
        VtParser::new().feed(bytes)
    }

    #[test]
    fn prints_and_executes() {
        let actions = feed_all(b"a\nb");
        assert_eq!(
            actions,
            vec![
                Action::Print('a'),
                Action::Execute(0x0a),
                Action::Print('b'),
            ]
        );
    }

    #[test]
    fn csi_with_params() {
        let actions = feed_all(b"\x1b[2;5H");
        assert_eq!(
            actions,
            vec![Action::CsiDispatch {
                final_byte: b'H',
                params: vec![2, 5],
                intermediates: vec![],
                private: None,
            }]
        );
    }

    #[test]
    fn private_marker_captured() {
        let actions = feed_all(b"\x1b[?1049h");
        assert_eq!(
            actions,
            vec![Action::CsiDispatch {
                final_byte: b'h',
                params: vec![1049],
                intermediates: vec![],
                private: Some(b'?'),
            }]
        );
    }

    #[test]
    fn repeated_separator_yields_zero() {
        let actions = feed_all(b"\x1b[1;;3m");
        assert_eq!(
            actions,
            vec![Action::CsiDispatch {
                final_byte: b'm',
                params: vec![1, 0, 3],
                intermediates: vec![],
                private: None,
            }]
        );
    }

    #[test]
    fn split_sequence_matches_whole() {
        let input = b"\x1b[38;2;10;20;30mX\x1b]0;title\x07";
        let whole = feed_all(input);
        for split in 1..input.len() {
            let mut parser = VtParser::new();
            let mut actions = parser.feed(&input[..split]);
            actions.extend(parser.feed(&input[split..]));
            assert_eq!(actions, whole, "split at {split}");
        }
    }

    #[test]
    fn excess_params_dropped() {
        let mut seq = b"\x1b[".to_vec();
        for i in 0..100 {
            if i > 0 {
                seq.push(b';');
            }
            seq.extend_from_slice(i.to_string().as_bytes());
        }
        seq.push(b'm');
        seq.extend_from_slice(b"ok");
        let actions = feed_all(&seq);
        match &actions[0] {
            Action::CsiDispatch { params, .. } => assert_eq!(params.len(), MAX_PARAMS),
            other => panic!("unexpected action {other:?}"),
        }
        // Parsing continues cleanly after the oversized sequence.
        assert_eq!(actions[1], Action::Print('o'));
        assert_eq!(actions[2], Action::Print('k'));
    }

    #[test]
    fn oversized_param_clamps() {
        let actions = feed_all(b"\x1b[99999999999999A");
        match &actions[0] {
            Action::CsiDispatch { params, .. } => assert_eq!(params[0], u16::MAX),
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn c0_mid_sequence_executes_and_aborts() {
        let actions = feed_all(b"\x1b[12\n34m");
        assert_eq!(actions[0], Action::Execute(0x0a));
        // The aborted CSI never dispatches; "34m" prints as text.
        assert_eq!(
            actions[1..],
            [Action::Print('3'), Action::Print('4'), Action::Print('m')]
        );
    }

    #[test]
    fn osc_bel_and_st_terminators() {
        assert_eq!(
            feed_all(b"\x1b]2;hello\x07"),
            vec![Action::OscDispatch("2;hello".to_string())]
        );
        assert_eq!(
            feed_all(b"\x1b]2;hello\x1b\\"),
            vec![Action::OscDispatch("2;hello".to_string())]
        );
    }

    #[test]
    fn osc_payload_decodes_utf8() {
        assert_eq!(
            feed_all("\x1b]0;café ☕\x07".as_bytes()),
            vec![Action::OscDispatch("0;café ☕".to_string())]
        );
        // Invalid bytes degrade to replacement characters, never an abort.
        let actions = feed_all(b"\x1b]2;a\xffb\x07");
        assert_eq!(
            actions,
            vec![Action::OscDispatch("2;a\u{fffd}b".to_string())]
        );
    }

    #[test]
    fn osc_cap_truncates_but_keeps_consuming() {
        let mut seq = b"\x1b]2;".to_vec();
        seq.extend(std::iter::repeat(b'x').take(MAX_OSC_LEN + 100));
        seq.push(0x07);
        seq.push(b'!');
        let actions = feed_all(&seq);
        match &actions[0] {
            Action::OscDispatch(payload) => assert_eq!(payload.len(), MAX_OSC_LEN),
            other => panic!("unexpected action {other:?}"),
        }
        assert_eq!(actions[1], Action::Print('!'));
    }

    #[test]
    fn dcs_hook_put_unhook() {
        let actions = feed_all(b"\x1bP1;2q#0\x1b\\");
        assert_eq!(
            actions[0],
            Action::DcsHook {
                final_byte: b'q',
                params: vec![1, 2],
                intermediates: vec![],
            }
        );
        assert_eq!(actions[1], Action::DcsPut(b'#'));
        assert_eq!(actions[2], Action::DcsPut(b'0'));
        assert_eq!(actions[3], Action::DcsUnhook);
    }

    #[test]
    fn utf8_print() {
        let actions = feed_all("héあ".as_bytes());
        assert_eq!(
            actions,
            vec![Action::Print('h'), Action::Print('é'), Action::Print('あ')]
        );
    }

    #[test]
    fn esc_dispatch_with_intermediate() {
        assert_eq!(
            feed_all(b"\x1b(B"),
            vec![Action::EscDispatch {
                final_byte: b'B',
                intermediates: vec![b'('],
            }]
        );
    }
}
