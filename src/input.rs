//! Input encoding: user events to child-process bytes.
//!
//! Converts key, mouse, and paste events into the escape-sequence dialect
//! the child expects, consulting the mode registry for cursor-key mode,
//! mouse tracking variant, and bracketed paste. Events that cannot be
//! expressed under the current modes encode to an empty sequence, never an
//! error.

use bitflags::bitflags;

use crate::modes::{ModeRegistry, MouseTracking};

bitflags! {
    /// Modifier keys held during an event.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl Modifiers {
    /// xterm modifier parameter: 1 + shift(1) + alt(2) + ctrl(4).
    fn code(self) -> u8 {
        1 + if self.contains(Modifiers::SHIFT) { 1 } else { 0 }
            + if self.contains(Modifiers::ALT) { 2 } else { 0 }
            + if self.contains(Modifiers::CTRL) { 4 } else { 0 }
    }
}

/// A named or printable key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCode {
    Char(char),
    Enter,
    Backspace,
    Tab,
    Esc,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F(u8),
}

/// A key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::empty(),
        }
    }

    pub fn with_modifiers(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseEventKind {
    Down(MouseButton),
    Up(MouseButton),
    Drag(MouseButton),
    Moved,
    ScrollUp,
    ScrollDown,
}

/// A mouse event in 0-indexed grid coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub column: u16,
    pub row: u16,
    pub modifiers: Modifiers,
}

/// Any encodable user input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Paste(String),
}

/// Encode an input event against the current terminal modes.
pub fn encode(event: &InputEvent, modes: &ModeRegistry) -> Vec<u8> {
    match event {
        InputEvent::Key(key) => encode_key(key, modes),
        InputEvent::Mouse(mouse) => encode_mouse(mouse, modes),
        InputEvent::Paste(text) => encode_paste(text, modes),
    }
}

fn encode_key(event: &KeyEvent, modes: &ModeRegistry) -> Vec<u8> {
    let mods = event.modifiers;
    match event.code {
        KeyCode::Char(ch) => encode_char(ch, mods),

        KeyCode::Enter => {
            if modes.linefeed_newline {
                vec![0x0d, 0x0a]
            } else {
                vec![0x0d]
            }
        }

        KeyCode::Backspace => {
            if mods.contains(Modifiers::ALT) {
                vec![0x1b, 0x7f]
            } else {
                vec![0x7f]
            }
        }

        KeyCode::Tab => {
            if mods.contains(Modifiers::SHIFT) {
                b"\x1b[Z".to_vec()
            } else {
                vec![0x09]
            }
        }

        KeyCode::Esc => vec![0x1b],

        KeyCode::Up => arrow_key(b'A', mods, modes),
        KeyCode::Down => arrow_key(b'B', mods, modes),
        KeyCode::Right => arrow_key(b'C', mods, modes),
        KeyCode::Left => arrow_key(b'D', mods, modes),

        KeyCode::Home => special_key(b'H', mods),
        KeyCode::End => special_key(b'F', mods),
        KeyCode::PageUp => tilde_key(5, mods),
        KeyCode::PageDown => tilde_key(6, mods),
        KeyCode::Insert => tilde_key(2, mods),
        KeyCode::Delete => tilde_key(3, mods),

        KeyCode::F(n) => function_key(n, mods),
    }
}

fn encode_char(ch: char, mods: Modifiers) -> Vec<u8> {
    // Ctrl + letter maps to the matching control code.
    if mods.contains(Modifiers::CTRL) && !mods.contains(Modifiers::ALT) {
        if ch.is_ascii_lowercase() {
            return vec![(ch as u8) - b'a' + 1];
        }
        if ch.is_ascii_uppercase() {
            return vec![(ch as u8) - b'A' + 1];
        }
        match ch {
            '@' | '`' | ' ' => return vec![0x00],
            '[' => return vec![0x1b],
            '\\' => return vec![0x1c],
            ']' => return vec![0x1d],
            '^' | '~' => return vec![0x1e],
            '_' | '?' => return vec![0x1f],
            _ => {}
        }
    }

    if mods.contains(Modifiers::CTRL) && mods.contains(Modifiers::ALT) {
        if ch.is_ascii_alphabetic() {
            return vec![0x1b, (ch.to_ascii_lowercase() as u8) - b'a' + 1];
        }
        return Vec::new();
    }

    // Alt prefixes ESC.
    if mods.contains(Modifiers::ALT) {
        let mut bytes = vec![0x1b];
        bytes.extend(ch.to_string().into_bytes());
        return bytes;
    }

    ch.to_string().into_bytes()
}

fn arrow_key(key: u8, mods: Modifiers, modes: &ModeRegistry) -> Vec<u8> {
    if !mods.is_empty() {
        format!("\x1b[1;{}{}", mods.code(), key as char).into_bytes()
    } else if modes.application_cursor {
        // SS3 form in application cursor-key mode.
        vec![0x1b, b'O', key]
    } else {
        vec![0x1b, b'[', key]
    }
}

fn special_key(key: u8, mods: Modifiers) -> Vec<u8> {
    if mods.is_empty() {
        vec![0x1b, b'[', key]
    } else {
        format!("\x1b[1;{}{}", mods.code(), key as char).into_bytes()
    }
}

fn tilde_key(code: u8, mods: Modifiers) -> Vec<u8> {
    if mods.is_empty() {
        format!("\x1b[{}~", code).into_bytes()
    } else {
        format!("\x1b[{};{}~", code, mods.code()).into_bytes()
    }
}

fn function_key(n: u8, mods: Modifiers) -> Vec<u8> {
    let base: &[u8] = match n {
        1 => b"\x1bOP",
        2 => b"\x1bOQ",
        3 => b"\x1bOR",
        4 => b"\x1bOS",
        5 => b"\x1b[15~",
        6 => b"\x1b[17~",
        7 => b"\x1b[18~",
        8 => b"\x1b[19~",
        9 => b"\x1b[20~",
        10 => b"\x1b[21~",
        11 => b"\x1b[23~",
        12 => b"\x1b[24~",
        _ => return Vec::new(),
    };

    if mods.is_empty() {
        return base.to_vec();
    }
    match n {
        1..=4 => {
            // ESC O X becomes ESC [ 1 ; mod X
            let key = base[2];
            format!("\x1b[1;{}{}", mods.code(), key as char).into_bytes()
        }
        _ => {
            let code = String::from_utf8_lossy(&base[2..base.len() - 1]).into_owned();
            format!("\x1b[{};{}~", code, mods.code()).into_bytes()
        }
    }
}

/// X10-style coordinates top out here; SGR encoding has no such ceiling.
const X10_COORD_MAX: u16 = 223;

fn encode_mouse(event: &MouseEvent, modes: &ModeRegistry) -> Vec<u8> {
    let wanted = match (modes.mouse, event.kind) {
        (MouseTracking::Off, _) => false,
        (MouseTracking::Normal, MouseEventKind::Drag(_) | MouseEventKind::Moved) => false,
        (MouseTracking::ButtonEvent, MouseEventKind::Moved) => false,
        _ => true,
    };
    if !wanted {
        return Vec::new();
    }

    let (button, pressed) = match event.kind {
        MouseEventKind::Down(btn) => (button_code(btn), true),
        MouseEventKind::Up(btn) => (button_code(btn), false),
        MouseEventKind::Drag(btn) => (button_code(btn) + 32, true),
        MouseEventKind::Moved => (35, true),
        MouseEventKind::ScrollUp => (64, true),
        MouseEventKind::ScrollDown => (65, true),
    };

    let mut cb = button;
    if event.modifiers.contains(Modifiers::SHIFT) {
        cb += 4;
    }
    if event.modifiers.contains(Modifiers::ALT) {
        cb += 8;
    }
    if event.modifiers.contains(Modifiers::CTRL) {
        cb += 16;
    }

    // Protocol coordinates are 1-based.
    let x = event.column.saturating_add(1);
    let y = event.row.saturating_add(1);

    if modes.sgr_mouse {
        let suffix = if pressed { 'M' } else { 'm' };
        format!("\x1b[<{};{};{}{}", cb, x, y, suffix).into_bytes()
    } else if x <= X10_COORD_MAX && y <= X10_COORD_MAX {
        // X10 encoding folds release into button 3.
        let cb = if pressed { cb } else { 3 };
        vec![0x1b, b'[', b'M', cb + 32, x as u8 + 32, y as u8 + 32]
    } else {
        // Out of range for the single-byte encoding: drop the event.
        Vec::new()
    }
}

fn button_code(button: MouseButton) -> u8 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
    }
}

fn encode_paste(text: &str, modes: &ModeRegistry) -> Vec<u8> {
    if modes.bracketed_paste {
        let mut bytes = b"\x1b[200~".to_vec();
        bytes.extend_from_slice(text.as_bytes());
        bytes.extend_from_slice(b"\x1b[201~");
        bytes
    } else {
        text.as_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> InputEvent {
        InputEvent::Key(KeyEvent::new(code))
    }

    fn key_mod(code: KeyCode, modifiers: Modifiers) -> InputEvent {
        InputEvent::Key(KeyEvent::with_modifiers(code, modifiers))
    }

    #[test]
    fn char_keys() {
        let modes = ModeRegistry::default();
        assert_eq!(encode(&key(KeyCode::Char('a')), &modes), b"a".to_vec());
        assert_eq!(
            encode(&key_mod(KeyCode::Char('c'), Modifiers::CTRL), &modes),
            vec![0x03]
        );
        assert_eq!(
            encode(&key_mod(KeyCode::Char('x'), Modifiers::ALT), &modes),
            vec![0x1b, b'x']
        );
    }

    #[test]
    fn arrows_follow_cursor_key_mode() {
        let mut modes = ModeRegistry::default();
        assert_eq!(encode(&key(KeyCode::Up), &modes), b"\x1b[A".to_vec());
        modes.application_cursor = true;
        assert_eq!(encode(&key(KeyCode::Up), &modes), b"\x1bOA".to_vec());
        // Modifiers force the CSI form either way.
        assert_eq!(
            encode(&key_mod(KeyCode::Up, Modifiers::CTRL), &modes),
            b"\x1b[1;5A".to_vec()
        );
    }

    #[test]
    fn function_keys() {
        let modes = ModeRegistry::default();
        assert_eq!(encode(&key(KeyCode::F(1)), &modes), b"\x1bOP".to_vec());
        assert_eq!(encode(&key(KeyCode::F(5)), &modes), b"\x1b[15~".to_vec());
        assert_eq!(
            encode(&key_mod(KeyCode::F(5), Modifiers::SHIFT), &modes),
            b"\x1b[15;2~".to_vec()
        );
        assert_eq!(encode(&key(KeyCode::F(20)), &modes), Vec::<u8>::new());
    }

    #[test]
    fn mouse_dropped_without_tracking() {
        let modes = ModeRegistry::default();
        let event = InputEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 3,
            row: 4,
            modifiers: Modifiers::empty(),
        });
        assert_eq!(encode(&event, &modes), Vec::<u8>::new());
    }

    #[test]
    fn mouse_x10_encoding_and_ceiling() {
        let mut modes = ModeRegistry::default();
        modes.set_private(1000, true);

        let event = InputEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 0,
            row: 0,
            modifiers: Modifiers::empty(),
        });
        assert_eq!(encode(&event, &modes), vec![0x1b, b'[', b'M', 32, 33, 33]);

        let far = InputEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 500,
            row: 0,
            modifiers: Modifiers::empty(),
        });
        // Beyond the single-byte ceiling without SGR: dropped.
        assert_eq!(encode(&far, &modes), Vec::<u8>::new());
    }

    #[test]
    fn mouse_sgr_encoding() {
        let mut modes = ModeRegistry::default();
        modes.set_private(1000, true);
        modes.set_private(1006, true);

        let down = InputEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 10,
            row: 20,
            modifiers: Modifiers::empty(),
        });
        assert_eq!(encode(&down, &modes), b"\x1b[<0;11;21M".to_vec());

        let up = InputEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Left),
            column: 500,
            row: 20,
            modifiers: Modifiers::empty(),
        });
        // No ceiling in SGR mode.
        assert_eq!(encode(&up, &modes), b"\x1b[<0;501;21m".to_vec());
    }

    #[test]
    fn drag_needs_button_event_tracking() {
        let mut modes = ModeRegistry::default();
        modes.set_private(1000, true);
        let drag = InputEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Drag(MouseButton::Left),
            column: 1,
            row: 1,
            modifiers: Modifiers::empty(),
        });
        assert_eq!(encode(&drag, &modes), Vec::<u8>::new());
        modes.set_private(1002, true);
        assert!(!encode(&drag, &modes).is_empty());
    }

    #[test]
    fn bracketed_paste_wraps() {
        let mut modes = ModeRegistry::default();
        let paste = InputEvent::Paste("hi".to_string());
        assert_eq!(encode(&paste, &modes), b"hi".to_vec());
        modes.set_private(2004, true);
        assert_eq!(encode(&paste, &modes), b"\x1b[200~hi\x1b[201~".to_vec());
    }
}
