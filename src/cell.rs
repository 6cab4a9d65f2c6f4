//! Cell, color, and attribute types.
//!
//! A `Cell` is one column of one row: a grapheme (possibly empty for blanks,
//! possibly multi-char when combining marks attach) plus the colors and
//! attribute flags it was written with. Double-width glyphs occupy two cells;
//! the second is a zero-width continuation carrying no glyph of its own.

use bitflags::bitflags;

/// Color definition as carried by SGR sequences.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Color {
    /// Terminal default foreground/background.
    #[default]
    Default,
    /// One of the 256 indexed palette colors (0-15 are the classic ANSI set).
    Indexed(u8),
    /// 24-bit truecolor.
    Rgb(u8, u8, u8),
}

bitflags! {
    /// Text attribute flags set by SGR.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct AttrFlags: u16 {
        const BOLD          = 0b0000_0000_0001;
        const DIM           = 0b0000_0000_0010;
        const ITALIC        = 0b0000_0000_0100;
        const UNDERLINE     = 0b0000_0000_1000;
        const BLINK         = 0b0000_0001_0000;
        const INVERSE       = 0b0000_0010_0000;
        const HIDDEN        = 0b0000_0100_0000;
        const STRIKETHROUGH = 0b0000_1000_0000;
        const DOUBLE_UNDERLINE = 0b0001_0000_0000;
    }
}

/// Current graphic rendition: what the next printed cell will carry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellAttrs {
    pub fg: Color,
    pub bg: Color,
    pub flags: AttrFlags,
}

impl CellAttrs {
    /// Reset to the terminal default rendition (SGR 0).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A single grid cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    /// The glyph, plus any combining characters appended to it. Empty means
    /// a blank cell that renders as a space.
    pub grapheme: String,
    /// Display width: 1 for normal glyphs, 2 for wide glyphs, 0 for the
    /// continuation half of a wide glyph.
    pub width: u8,
    pub attrs: CellAttrs,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            grapheme: String::new(),
            width: 1,
            attrs: CellAttrs::default(),
        }
    }
}

impl Cell {
    /// A blank cell painted with the given background color. Erase and
    /// scroll operations vacate cells with the *current* background, not
    /// the default one.
    pub fn blank(bg: Color) -> Self {
        Self {
            grapheme: String::new(),
            width: 1,
            attrs: CellAttrs {
                fg: Color::Default,
                bg,
                flags: AttrFlags::empty(),
            },
        }
    }

    /// Clear this cell in place, keeping only the given background.
    pub fn clear(&mut self, bg: Color) {
        self.grapheme.clear();
        self.width = 1;
        self.attrs = CellAttrs {
            fg: Color::Default,
            bg,
            flags: AttrFlags::empty(),
        };
    }

    /// The trailing half of a double-width glyph.
    pub fn continuation(attrs: CellAttrs) -> Self {
        Self {
            grapheme: String::new(),
            width: 0,
            attrs,
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.width == 0
    }

    /// The string to render: a space for blanks.
    pub fn display(&self) -> &str {
        if self.grapheme.is_empty() {
            " "
        } else {
            &self.grapheme
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_keeps_background_only() {
        let cell = Cell::blank(Color::Indexed(4));
        assert_eq!(cell.attrs.bg, Color::Indexed(4));
        assert_eq!(cell.attrs.fg, Color::Default);
        assert!(cell.attrs.flags.is_empty());
        assert_eq!(cell.display(), " ");
    }

    #[test]
    fn clear_drops_glyph_and_flags() {
        let mut cell = Cell {
            grapheme: "x".to_string(),
            width: 1,
            attrs: CellAttrs {
                fg: Color::Indexed(1),
                bg: Color::Default,
                flags: AttrFlags::BOLD,
            },
        };
        cell.clear(Color::Rgb(1, 2, 3));
        assert!(cell.grapheme.is_empty());
        assert_eq!(cell.attrs.bg, Color::Rgb(1, 2, 3));
        assert!(cell.attrs.flags.is_empty());
    }
}
