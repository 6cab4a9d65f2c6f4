//! Buffer mutator: applies parser actions to terminal state.
//!
//! One dispatch table from (private marker, final byte) to the matching
//! `TerminalState` mutation. Everything here degrades gracefully: out of
//! range coordinates clamp, recognized-but-unimplemented sequences log and
//! drop, unrecognized final bytes are silent no-ops. The mutator never
//! fails; it has to keep accepting whatever an adversarial child process
//! emits.

use crate::cell::{AttrFlags, CellAttrs, Color};
use crate::parser::Action;
use crate::screen::CursorShape;
use crate::term::{Charset, TerminalState};

/// A reply owed to the child process for a device query. The host writes
/// these bytes to the child's input; the core only produces them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// DSR 6: `ESC [ row ; col R`, 1-indexed.
    CursorPosition(u16, u16),
    /// DSR 5: terminal OK.
    Status,
    /// Primary device attributes (VT220-class).
    DeviceAttributes,
    /// Secondary device attributes.
    SecondaryDeviceAttributes,
}

impl Response {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Response::CursorPosition(row, col) => format!("\x1b[{};{}R", row, col).into_bytes(),
            Response::Status => b"\x1b[0n".to_vec(),
            Response::DeviceAttributes => b"\x1b[?62;22c".to_vec(),
            Response::SecondaryDeviceAttributes => b"\x1b[>1;10;0c".to_vec(),
        }
    }
}

/// Apply one completed action, returning a reply when the action was a
/// device query.
pub fn apply(state: &mut TerminalState, action: Action) -> Option<Response> {
    match action {
        Action::Print(ch) => {
            state.put_char(ch);
            None
        }
        Action::Execute(byte) => {
            execute_control(state, byte);
            None
        }
        Action::CsiDispatch {
            final_byte,
            params,
            intermediates,
            private,
        } => apply_csi(state, final_byte, &params, &intermediates, private),
        Action::EscDispatch {
            final_byte,
            intermediates,
        } => {
            apply_esc(state, final_byte, &intermediates);
            None
        }
        Action::OscDispatch(payload) => {
            apply_osc(state, &payload);
            None
        }
        // Device control strings (e.g. DECRQSS, sixel) are consumed so the
        // stream stays framed, but not interpreted.
        Action::DcsHook { final_byte, .. } => {
            tracing::debug!("ignoring DCS sequence: final={:?}", final_byte as char);
            None
        }
        Action::DcsPut(_) | Action::DcsUnhook => None,
    }
}

fn execute_control(state: &mut TerminalState, byte: u8) {
    match byte {
        0x07 => {} // BEL
        0x08 => state.backspace(),
        0x09 => state.horizontal_tab(),
        0x0a | 0x0b | 0x0c => {
            state.linefeed();
            if state.modes.linefeed_newline {
                state.carriage_return();
            }
        }
        0x0d => state.carriage_return(),
        0x0e => state.shift_charset(1), // SO
        0x0f => state.shift_charset(0), // SI
        _ => {
            tracing::trace!("ignoring C0 control {:#04x}", byte);
        }
    }
}

fn apply_esc(state: &mut TerminalState, final_byte: u8, intermediates: &[u8]) {
    match (intermediates.first().copied(), final_byte) {
        (None, b'7') => state.save_cursor(),
        (None, b'8') => state.restore_cursor(),
        (None, b'D') => state.index(),
        (None, b'E') => state.next_line(),
        (None, b'M') => state.reverse_index(),
        (None, b'c') => state.full_reset(),
        // Keypad modes are recognized but have no buffer effect here.
        (None, b'=') | (None, b'>') => {
            tracing::trace!("ignoring keypad mode ESC {}", final_byte as char);
        }
        (Some(b'('), final_byte) => state.designate_charset(0, charset_for(final_byte)),
        (Some(b')'), final_byte) => state.designate_charset(1, charset_for(final_byte)),
        // Other designations (#8 screen alignment, % UTF-8 select, ...)
        (Some(_), _) | (None, _) => {
            tracing::debug!(
                "ignoring ESC sequence: intermediates={:?}, final={:?}",
                intermediates,
                final_byte as char
            );
        }
    }
}

fn charset_for(final_byte: u8) -> Charset {
    match final_byte {
        b'0' => Charset::DecSpecial,
        _ => Charset::Ascii,
    }
}

fn apply_csi(
    state: &mut TerminalState,
    final_byte: u8,
    params: &[u16],
    intermediates: &[u8],
    private: Option<u8>,
) -> Option<Response> {
    // DECSCUSR carries a space intermediate.
    if private.is_none() && final_byte == b'q' && intermediates.contains(&b' ') {
        let shape = CursorShape::from_decscusr(param(params, 0, 0));
        state.active_cursor_mut().shape = shape;
        return None;
    }

    match (private, final_byte) {
        // Cursor motion
        (None, b'A') => state.cursor_up(param_or_1(params, 0)),
        (None, b'B') => state.cursor_down(param_or_1(params, 0)),
        (None, b'C') => state.cursor_forward(param_or_1(params, 0)),
        (None, b'D') => state.cursor_backward(param_or_1(params, 0)),
        (None, b'E') => {
            state.cursor_down(param_or_1(params, 0));
            state.carriage_return();
        }
        (None, b'F') => {
            state.cursor_up(param_or_1(params, 0));
            state.carriage_return();
        }
        (None, b'G') => state.cursor_to_col(param(params, 0, 1)),
        (None, b'd') => state.cursor_to_row(param(params, 0, 1)),
        (None, b'H') | (None, b'f') => {
            state.cursor_position(param(params, 0, 1), param(params, 1, 1));
        }

        // Erase
        (None, b'J') => state.erase_in_display(param(params, 0, 0)),
        (None, b'K') => state.erase_in_line(param(params, 0, 0)),

        // Line and character edits
        (None, b'L') => state.insert_lines(param_or_1(params, 0)),
        (None, b'M') => state.delete_lines(param_or_1(params, 0)),
        (None, b'@') => state.insert_chars(param_or_1(params, 0)),
        (None, b'P') => state.delete_chars(param_or_1(params, 0)),
        (None, b'X') => state.erase_chars(param_or_1(params, 0)),

        // Scrolling
        (None, b'S') => state.scroll_up(param_or_1(params, 0)),
        (None, b'T') => state.scroll_down(param_or_1(params, 0)),
        (None, b'r') => {
            state.set_scroll_region(param(params, 0, 1), param(params, 1, 0));
        }

        // Rendition
        (None, b'm') => apply_sgr(params, &mut state.current_attrs),

        // Cursor save/restore (ANSI.SYS flavor)
        (None, b's') => state.save_cursor(),
        (None, b'u') => state.restore_cursor(),

        // Device queries
        (None, b'n') => match param(params, 0, 0) {
            5 => return Some(Response::Status),
            6 => {
                // Under DECOM the reported row is relative to the region top.
                let origin_row = if state.modes.origin {
                    state.scroll_region().0
                } else {
                    0
                };
                let cursor = state.active_cursor();
                let row = cursor.row.saturating_sub(origin_row) + 1;
                return Some(Response::CursorPosition(row, cursor.col + 1));
            }
            other => {
                tracing::debug!("ignoring DSR variant {}", other);
            }
        },
        (None, b'c') => return Some(Response::DeviceAttributes),
        (Some(b'>'), b'c') => return Some(Response::SecondaryDeviceAttributes),

        // Modes
        (Some(b'?'), b'h') => {
            for &mode in params {
                state.set_private_mode(mode, true);
            }
        }
        (Some(b'?'), b'l') => {
            for &mode in params {
                state.set_private_mode(mode, false);
            }
        }
        (None, b'h') => {
            for &mode in params {
                state.modes.set_ansi(mode, true);
            }
        }
        (None, b'l') => {
            for &mode in params {
                state.modes.set_ansi(mode, false);
            }
        }

        _ => {
            tracing::debug!(
                "ignoring CSI sequence: private={:?}, params={:?}, intermediates={:?}, final={:?}",
                private,
                params,
                intermediates,
                final_byte as char
            );
        }
    }
    None
}

/// SGR: parameters apply left to right; empty means reset. The extended
/// color forms (38/48;5;n and 38/48;2;r;g;b) consume their sub-parameters
/// from the same list; malformed tails fall off the end harmlessly.
fn apply_sgr(params: &[u16], attrs: &mut CellAttrs) {
    if params.is_empty() {
        attrs.reset();
        return;
    }

    let mut iter = params.iter().copied();
    while let Some(param) = iter.next() {
        match param {
            0 => attrs.reset(),
            1 => attrs.flags |= AttrFlags::BOLD,
            2 => attrs.flags |= AttrFlags::DIM,
            3 => attrs.flags |= AttrFlags::ITALIC,
            4 => attrs.flags |= AttrFlags::UNDERLINE,
            5 | 6 => attrs.flags |= AttrFlags::BLINK,
            7 => attrs.flags |= AttrFlags::INVERSE,
            8 => attrs.flags |= AttrFlags::HIDDEN,
            9 => attrs.flags |= AttrFlags::STRIKETHROUGH,
            21 => attrs.flags |= AttrFlags::DOUBLE_UNDERLINE,

            22 => attrs.flags &= !(AttrFlags::BOLD | AttrFlags::DIM),
            23 => attrs.flags &= !AttrFlags::ITALIC,
            24 => attrs.flags &= !(AttrFlags::UNDERLINE | AttrFlags::DOUBLE_UNDERLINE),
            25 => attrs.flags &= !AttrFlags::BLINK,
            27 => attrs.flags &= !AttrFlags::INVERSE,
            28 => attrs.flags &= !AttrFlags::HIDDEN,
            29 => attrs.flags &= !AttrFlags::STRIKETHROUGH,

            30..=37 => attrs.fg = Color::Indexed((param - 30) as u8),
            38 => {
                if let Some(color) = extended_color(&mut iter) {
                    attrs.fg = color;
                }
            }
            39 => attrs.fg = Color::Default,

            40..=47 => attrs.bg = Color::Indexed((param - 40) as u8),
            48 => {
                if let Some(color) = extended_color(&mut iter) {
                    attrs.bg = color;
                }
            }
            49 => attrs.bg = Color::Default,

            90..=97 => attrs.fg = Color::Indexed((param - 90 + 8) as u8),
            100..=107 => attrs.bg = Color::Indexed((param - 100 + 8) as u8),

            other => {
                tracing::trace!("ignoring SGR parameter {}", other);
            }
        }
    }
}

/// Consume a `5;n` or `2;r;g;b` tail after SGR 38/48. Out-of-range values
/// clamp to the channel/index ceiling.
fn extended_color(iter: &mut impl Iterator<Item = u16>) -> Option<Color> {
    match iter.next()? {
        5 => Some(Color::Indexed(iter.next()?.min(255) as u8)),
        2 => {
            let r = iter.next()?.min(255) as u8;
            let g = iter.next()?.min(255) as u8;
            let b = iter.next()?.min(255) as u8;
            Some(Color::Rgb(r, g, b))
        }
        _ => None,
    }
}

/// OSC payloads update the title/palette side channel, never the grid.
fn apply_osc(state: &mut TerminalState, payload: &str) {
    let (code, rest) = match payload.split_once(';') {
        Some((code, rest)) => (code, rest),
        None => (payload, ""),
    };
    match code {
        "0" | "1" | "2" => state.title = rest.to_string(),
        "4" => {
            // OSC 4: repeating index;colorspec pairs.
            let mut parts = rest.split(';');
            while let (Some(index), Some(spec)) = (parts.next(), parts.next()) {
                if let (Ok(index), Some(rgb)) = (index.parse::<u16>(), parse_color_spec(spec)) {
                    if index <= 255 {
                        state.set_palette_entry(index as u8, rgb);
                    }
                }
            }
        }
        "104" => {
            if rest.is_empty() {
                state.reset_palette();
            } else {
                for index in rest.split(';') {
                    if let Ok(index) = index.parse::<u16>() {
                        if index <= 255 {
                            state.reset_palette_entry(index as u8);
                        }
                    }
                }
            }
        }
        _ => {
            tracing::debug!("ignoring OSC sequence with code {:?}", code);
        }
    }
}

/// Parse `#RRGGBB` or X11 `rgb:R/G/B` with 1-4 hex digits per channel,
/// scaled to 8 bits.
fn parse_color_spec(spec: &str) -> Option<(u8, u8, u8)> {
    if let Some(hex) = spec.strip_prefix('#') {
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            return Some((r, g, b));
        }
        return None;
    }
    let channels = spec.strip_prefix("rgb:")?;
    let mut parts = channels.split('/');
    let r = parse_channel(parts.next()?)?;
    let g = parse_channel(parts.next()?)?;
    let b = parse_channel(parts.next()?)?;
    Some((r, g, b))
}

fn parse_channel(digits: &str) -> Option<u8> {
    if digits.is_empty() || digits.len() > 4 {
        return None;
    }
    let value = u32::from_str_radix(digits, 16).ok()?;
    let max = (1u32 << (4 * digits.len())) - 1;
    Some((value * 255 / max) as u8)
}

/// Default a missing parameter at the dispatch site.
fn param(params: &[u16], index: usize, default: u16) -> u16 {
    params.get(index).copied().unwrap_or(default)
}

/// Count parameters default to 1, and 0 means 1.
fn param_or_1(params: &[u16], index: usize) -> u16 {
    param(params, index, 1).max(1)
}
