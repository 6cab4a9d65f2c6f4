//! Terminal state and session facade.
//!
//! `TerminalState` owns everything a session's display state consists of:
//! both screen buffers (main and alternate), their cursors, the current
//! graphic rendition, the mode registry, scroll region, charsets, and the
//! OSC side channel (title, palette overrides). Its methods are the grid
//! mutations the mutator maps completed sequences onto.
//!
//! `Terminal` wires a parser to a `TerminalState` and is the type hosts
//! hold: one per session, a plain owned value with no interior locking.
//! Independent sessions are fully parallel; snapshots are owned copies that
//! may cross threads.

use std::collections::HashMap;

use unicode_width::UnicodeWidthChar;

use crate::cell::{Cell, CellAttrs};
use crate::error::Error;
use crate::input::{self, InputEvent};
use crate::modes::ModeRegistry;
use crate::mutator;
use crate::parser::VtParser;
use crate::screen::{
    CursorSnapshot, CursorState, DirtyRegion, Row, SavedCursor, ScreenBuffer, Snapshot,
    SCROLLBACK_LIMIT,
};

/// Character set designated to a G0/G1 slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Charset {
    #[default]
    Ascii,
    /// DEC Special Graphics: 0x60-0x7e render as line-drawing glyphs.
    DecSpecial,
}

impl Charset {
    fn map(self, ch: char) -> char {
        if self != Charset::DecSpecial {
            return ch;
        }
        match ch {
            '`' => '◆',
            'a' => '▒',
            'f' => '°',
            'g' => '±',
            'j' => '┘',
            'k' => '┐',
            'l' => '┌',
            'm' => '└',
            'n' => '┼',
            'o' => '⎺',
            'p' => '⎻',
            'q' => '─',
            'r' => '⎼',
            's' => '⎽',
            't' => '├',
            'u' => '┤',
            'v' => '┴',
            'w' => '┬',
            'x' => '│',
            'y' => '≤',
            'z' => '≥',
            '{' => 'π',
            '|' => '≠',
            '}' => '£',
            '~' => '·',
            _ => ch,
        }
    }
}

/// Mutable display state for one session.
#[derive(Clone, Debug)]
pub struct TerminalState {
    pub cols: u16,
    pub rows: u16,
    primary_screen: ScreenBuffer,
    alternate_screen: ScreenBuffer,
    primary_cursor: CursorState,
    alternate_cursor: CursorState,
    pub current_attrs: CellAttrs,
    pub modes: ModeRegistry,
    /// Window title from OSC 0/1/2.
    pub title: String,
    /// Palette overrides from OSC 4, index to RGB.
    palette: HashMap<u8, (u8, u8, u8)>,
    /// Scroll region (top, bottom), 0-indexed inclusive.
    scroll_region: (u16, u16),
    charsets: [Charset; 2],
    active_charset: usize,
}

impl TerminalState {
    /// Caller guarantees non-zero dimensions; `Terminal::new` is the
    /// validating entry point.
    pub(crate) fn new(cols: u16, rows: u16) -> Self {
        debug_assert!(cols > 0 && rows > 0);
        Self {
            cols,
            rows,
            primary_screen: ScreenBuffer::new(cols, rows, SCROLLBACK_LIMIT),
            alternate_screen: ScreenBuffer::new(cols, rows, 0),
            primary_cursor: CursorState::default(),
            alternate_cursor: CursorState::default(),
            current_attrs: CellAttrs::default(),
            modes: ModeRegistry::default(),
            title: String::new(),
            palette: HashMap::new(),
            scroll_region: (0, rows.saturating_sub(1)),
            charsets: [Charset::Ascii; 2],
            active_charset: 0,
        }
    }

    pub fn active_screen(&self) -> &ScreenBuffer {
        if self.modes.alternate_screen {
            &self.alternate_screen
        } else {
            &self.primary_screen
        }
    }

    pub fn active_screen_mut(&mut self) -> &mut ScreenBuffer {
        if self.modes.alternate_screen {
            &mut self.alternate_screen
        } else {
            &mut self.primary_screen
        }
    }

    pub fn active_cursor(&self) -> &CursorState {
        if self.modes.alternate_screen {
            &self.alternate_cursor
        } else {
            &self.primary_cursor
        }
    }

    pub fn active_cursor_mut(&mut self) -> &mut CursorState {
        if self.modes.alternate_screen {
            &mut self.alternate_cursor
        } else {
            &mut self.primary_cursor
        }
    }

    pub fn scroll_region(&self) -> (u16, u16) {
        self.scroll_region
    }

    pub fn palette(&self) -> &HashMap<u8, (u8, u8, u8)> {
        &self.palette
    }

    /// Resize both buffers. The main buffer keeps as much content as fits;
    /// the alternate buffer clears to blank at the new size.
    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), Error> {
        if cols == 0 || rows == 0 {
            return Err(Error::InvalidDimensions { cols, rows });
        }
        self.cols = cols;
        self.rows = rows;
        self.primary_screen.resize(cols, rows);
        self.alternate_screen.reset(cols, rows);
        self.scroll_region = (0, rows - 1);

        let max_col = cols - 1;
        let max_row = rows - 1;
        for cursor in [&mut self.primary_cursor, &mut self.alternate_cursor] {
            cursor.col = cursor.col.min(max_col);
            cursor.row = cursor.row.min(max_row);
            cursor.pending_wrap = false;
        }
        Ok(())
    }

    /// Write a glyph at the cursor with the current rendition, honoring
    /// deferred autowrap, insert mode, charset mapping, and wide glyphs.
    pub fn put_char(&mut self, ch: char) {
        let ch = self.charsets[self.active_charset].map(ch);
        let width = ch.width().unwrap_or(0);

        if width == 0 {
            self.append_to_previous_cell(ch);
            return;
        }
        // A glyph wider than the grid can never be placed.
        if width > self.cols as usize {
            return;
        }

        // Deferred wrap from the previous print lands here, exactly at the
        // boundary column.
        if self.active_cursor().pending_wrap {
            self.active_cursor_mut().pending_wrap = false;
            if self.modes.auto_wrap {
                let row = self.active_cursor().row as usize;
                self.active_screen_mut().rows[row].wrapped = true;
                self.active_cursor_mut().col = 0;
                self.linefeed();
            }
        }

        let cols = self.cols as usize;
        let (mut row, mut col) = {
            let cursor = self.active_cursor();
            (cursor.row as usize, cursor.col as usize)
        };

        // A wide glyph that would straddle the last column wraps early (the
        // orphan cell blanks) or is dropped when autowrap is off.
        if width == 2 && col + 2 > cols {
            if !self.modes.auto_wrap {
                return;
            }
            let bg = self.current_attrs.bg;
            let screen = self.active_screen_mut();
            if let Some(cell) = screen.rows[row].cells.get_mut(col) {
                cell.clear(bg);
            }
            screen.rows[row].wrapped = true;
            screen.mark_dirty(row);
            self.active_cursor_mut().col = 0;
            self.linefeed();
            let cursor = self.active_cursor();
            row = cursor.row as usize;
            col = 0;
        }

        if self.modes.insert {
            let bg = self.current_attrs.bg;
            let screen = self.active_screen_mut();
            let cells = &mut screen.rows[row].cells;
            for _ in 0..width {
                if col < cells.len() {
                    cells.pop();
                    cells.insert(col, Cell::blank(bg));
                }
            }
        }

        self.repair_wide_overwrite(row, col);
        if width == 2 {
            self.repair_wide_overwrite(row, col + 1);
        }

        let attrs = self.current_attrs;
        let auto_wrap = self.modes.auto_wrap;
        let screen = self.active_screen_mut();
        screen.rows[row].cells[col] = Cell {
            grapheme: ch.to_string(),
            width: width as u8,
            attrs,
        };
        if width == 2 {
            screen.rows[row].cells[col + 1] = Cell::continuation(attrs);
        }
        screen.mark_dirty(row);

        let new_col = col + width;
        let cursor = self.active_cursor_mut();
        if new_col >= cols {
            cursor.col = (cols - 1) as u16;
            cursor.pending_wrap = auto_wrap;
        } else {
            cursor.col = new_col as u16;
        }
    }

    /// Combining characters attach to the most recently written cell.
    fn append_to_previous_cell(&mut self, ch: char) {
        let (row, col) = {
            let cursor = self.active_cursor();
            (cursor.row as usize, cursor.col as usize)
        };
        // The cursor sits one past the glyph unless wrap is pending.
        let target = if self.active_cursor().pending_wrap {
            Some(col)
        } else {
            col.checked_sub(1)
        };
        if let Some(target) = target {
            let screen = self.active_screen_mut();
            if let Some(cell) = screen.rows[row].cells.get_mut(target) {
                if !cell.is_continuation() {
                    cell.grapheme.push(ch);
                    screen.mark_dirty(row);
                }
            }
        }
    }

    /// Overwriting either half of a double-width pair blanks the orphaned
    /// half instead of leaving a dangling continuation.
    fn repair_wide_overwrite(&mut self, row: usize, col: usize) {
        let bg = self.current_attrs.bg;
        let cols = self.cols as usize;
        let screen = self.active_screen_mut();
        if col >= cols {
            return;
        }

        if col > 0 && screen.rows[row].cells[col].is_continuation() {
            screen.rows[row].cells[col - 1].clear(bg);
        }
        if screen.rows[row].cells[col].width == 2 && col + 1 < cols {
            screen.rows[row].cells[col + 1].clear(bg);
        }
    }

    pub fn carriage_return(&mut self) {
        let cursor = self.active_cursor_mut();
        cursor.col = 0;
        cursor.pending_wrap = false;
    }

    /// Move down one line, scrolling when at the bottom of the scroll region.
    pub fn linefeed(&mut self) {
        let cursor_row = self.active_cursor().row;
        let (_, bottom) = self.scroll_region;

        if cursor_row == bottom {
            self.scroll_up(1);
        } else if cursor_row < self.rows - 1 {
            self.active_cursor_mut().row += 1;
        }
    }

    pub fn backspace(&mut self) {
        let cursor = self.active_cursor_mut();
        cursor.col = cursor.col.saturating_sub(1);
        cursor.pending_wrap = false;
    }

    /// Advance to the next 8-column tab stop.
    pub fn horizontal_tab(&mut self) {
        let cols = self.cols;
        let cursor = self.active_cursor_mut();
        cursor.col = (((cursor.col / 8) + 1) * 8).min(cols - 1);
        cursor.pending_wrap = false;
    }

    /// IND: down one line, scrolling at the region bottom.
    pub fn index(&mut self) {
        self.linefeed();
    }

    /// RI: up one line, scrolling down at the region top.
    pub fn reverse_index(&mut self) {
        let cursor_row = self.active_cursor().row;
        let (top, _) = self.scroll_region;

        if cursor_row == top {
            self.scroll_down(1);
        } else {
            self.cursor_up(1);
        }
    }

    /// NEL: carriage return plus line feed.
    pub fn next_line(&mut self) {
        self.carriage_return();
        self.linefeed();
    }

    /// Scroll the region up by n lines; vacated rows fill with the current
    /// background. Rows leaving the top of a full-width main-buffer region
    /// go to scrollback.
    pub fn scroll_up(&mut self, n: u16) {
        let (top, bottom) = self.scroll_region;
        let cols = self.cols;
        let bg = self.current_attrs.bg;
        let keep_history = !self.modes.alternate_screen && top == 0;

        let screen = self.active_screen_mut();
        for _ in 0..n {
            if (bottom as usize) < screen.rows.len() {
                let removed = screen.rows.remove(top as usize);
                if keep_history {
                    screen.push_to_scrollback(removed);
                }
                screen.rows.insert(bottom as usize, Row::blank(cols, bg));
            }
        }
        screen.mark_all_dirty();
    }

    /// Scroll the region down by n lines; vacated rows fill with the
    /// current background.
    pub fn scroll_down(&mut self, n: u16) {
        let (top, bottom) = self.scroll_region;
        let cols = self.cols;
        let bg = self.current_attrs.bg;

        let screen = self.active_screen_mut();
        for _ in 0..n {
            if (bottom as usize) < screen.rows.len() {
                screen.rows.remove(bottom as usize);
                screen.rows.insert(top as usize, Row::blank(cols, bg));
            }
        }
        screen.mark_all_dirty();
    }

    pub fn cursor_up(&mut self, n: u16) {
        let cursor = self.active_cursor_mut();
        cursor.row = cursor.row.saturating_sub(n);
        cursor.pending_wrap = false;
    }

    pub fn cursor_down(&mut self, n: u16) {
        let rows = self.rows;
        let cursor = self.active_cursor_mut();
        cursor.row = (cursor.row.saturating_add(n)).min(rows - 1);
        cursor.pending_wrap = false;
    }

    pub fn cursor_forward(&mut self, n: u16) {
        let cols = self.cols;
        let cursor = self.active_cursor_mut();
        cursor.col = (cursor.col.saturating_add(n)).min(cols - 1);
        cursor.pending_wrap = false;
    }

    pub fn cursor_backward(&mut self, n: u16) {
        let cursor = self.active_cursor_mut();
        cursor.col = cursor.col.saturating_sub(n);
        cursor.pending_wrap = false;
    }

    /// CUP/HVP with 1-indexed parameters, honoring origin mode. Out-of-range
    /// coordinates clamp to the grid (or the scroll region under DECOM).
    pub fn cursor_position(&mut self, row: u16, col: u16) {
        let row = row.max(1) - 1;
        let col = col.max(1) - 1;
        let (top, bottom) = self.scroll_region;

        let target_row = if self.modes.origin {
            top.saturating_add(row).min(bottom)
        } else {
            row.min(self.rows - 1)
        };
        let target_col = col.min(self.cols - 1);

        let cursor = self.active_cursor_mut();
        cursor.row = target_row;
        cursor.col = target_col;
        cursor.pending_wrap = false;
    }

    /// CHA: absolute column, 1-indexed.
    pub fn cursor_to_col(&mut self, col: u16) {
        let cols = self.cols;
        let cursor = self.active_cursor_mut();
        cursor.col = (col.max(1) - 1).min(cols - 1);
        cursor.pending_wrap = false;
    }

    /// VPA: absolute row, 1-indexed, honoring origin mode.
    pub fn cursor_to_row(&mut self, row: u16) {
        let row = row.max(1) - 1;
        let (top, bottom) = self.scroll_region;
        let target = if self.modes.origin {
            top.saturating_add(row).min(bottom)
        } else {
            row.min(self.rows - 1)
        };
        let cursor = self.active_cursor_mut();
        cursor.row = target;
        cursor.pending_wrap = false;
    }

    /// ED: 0 = cursor to end, 1 = start to cursor, 2 = all, 3 = all plus
    /// scrollback. Erased cells take the current background.
    pub fn erase_in_display(&mut self, mode: u16) {
        let bg = self.current_attrs.bg;
        match mode {
            0 => {
                self.erase_in_line(0);
                let cursor_row = self.active_cursor().row as usize;
                let screen = self.active_screen_mut();
                for r in (cursor_row + 1)..screen.rows.len() {
                    screen.rows[r].clear(bg);
                    screen.mark_dirty(r);
                }
            }
            1 => {
                let cursor_row = self.active_cursor().row as usize;
                {
                    let screen = self.active_screen_mut();
                    for r in 0..cursor_row.min(screen.rows.len()) {
                        screen.rows[r].clear(bg);
                        screen.mark_dirty(r);
                    }
                }
                self.erase_in_line(1);
            }
            2 | 3 => {
                let screen = self.active_screen_mut();
                for row in &mut screen.rows {
                    row.clear(bg);
                }
                if mode == 3 {
                    screen.clear_scrollback();
                }
                screen.mark_all_dirty();
            }
            _ => {}
        }
    }

    /// EL: 0 = cursor to end, 1 = start through cursor, 2 = whole line.
    pub fn erase_in_line(&mut self, mode: u16) {
        let (cursor_row, cursor_col) = {
            let cursor = self.active_cursor();
            (cursor.row as usize, cursor.col as usize)
        };
        let bg = self.current_attrs.bg;

        let screen = self.active_screen_mut();
        let Some(row) = screen.rows.get_mut(cursor_row) else {
            return;
        };
        let len = row.cells.len();

        let range = match mode {
            0 => cursor_col.min(len)..len,
            1 => 0..(cursor_col + 1).min(len),
            2 => 0..len,
            _ => return,
        };
        for cell in &mut row.cells[range] {
            cell.clear(bg);
        }
        if mode == 2 {
            row.wrapped = false;
        }
        screen.mark_dirty(cursor_row);
    }

    /// IL: insert blank lines at the cursor, shifting rows down within the
    /// scroll region. No-op when the cursor is outside the region.
    pub fn insert_lines(&mut self, n: u16) {
        let cursor_row = self.active_cursor().row;
        let (top, bottom) = self.scroll_region;
        if cursor_row < top || cursor_row > bottom {
            return;
        }
        let cols = self.cols;
        let bg = self.current_attrs.bg;

        let screen = self.active_screen_mut();
        for _ in 0..n.min(bottom - cursor_row + 1) {
            screen.rows.remove(bottom as usize);
            screen.rows.insert(cursor_row as usize, Row::blank(cols, bg));
        }
        screen.mark_all_dirty();
        self.carriage_return();
    }

    /// DL: delete lines at the cursor, shifting rows up within the scroll
    /// region. No-op when the cursor is outside the region.
    pub fn delete_lines(&mut self, n: u16) {
        let cursor_row = self.active_cursor().row;
        let (top, bottom) = self.scroll_region;
        if cursor_row < top || cursor_row > bottom {
            return;
        }
        let cols = self.cols;
        let bg = self.current_attrs.bg;

        let screen = self.active_screen_mut();
        for _ in 0..n.min(bottom - cursor_row + 1) {
            screen.rows.remove(cursor_row as usize);
            screen.rows.insert(bottom as usize, Row::blank(cols, bg));
        }
        screen.mark_all_dirty();
        self.carriage_return();
    }

    /// ICH: shift the rest of the row right, inserting blanks at the cursor.
    pub fn insert_chars(&mut self, n: u16) {
        let (row, col) = {
            let cursor = self.active_cursor();
            (cursor.row as usize, cursor.col as usize)
        };
        let bg = self.current_attrs.bg;
        let screen = self.active_screen_mut();
        let cells = &mut screen.rows[row].cells;
        for _ in 0..n {
            if col < cells.len() {
                cells.pop();
                cells.insert(col, Cell::blank(bg));
            }
        }
        screen.mark_dirty(row);
    }

    /// DCH: delete cells at the cursor, the row tail shifts left and blanks
    /// fill in from the right edge.
    pub fn delete_chars(&mut self, n: u16) {
        let (row, col) = {
            let cursor = self.active_cursor();
            (cursor.row as usize, cursor.col as usize)
        };
        let bg = self.current_attrs.bg;
        let screen = self.active_screen_mut();
        let cells = &mut screen.rows[row].cells;
        for _ in 0..n {
            if col < cells.len() {
                cells.remove(col);
                cells.push(Cell::blank(bg));
            }
        }
        screen.mark_dirty(row);
    }

    /// ECH: blank n cells at the cursor without shifting.
    pub fn erase_chars(&mut self, n: u16) {
        let (row, col) = {
            let cursor = self.active_cursor();
            (cursor.row as usize, cursor.col as usize)
        };
        let bg = self.current_attrs.bg;
        let screen = self.active_screen_mut();
        let cells = &mut screen.rows[row].cells;
        let start = col.min(cells.len());
        let end = col.saturating_add(n as usize).min(cells.len());
        for cell in &mut cells[start..end] {
            cell.clear(bg);
        }
        screen.mark_dirty(row);
    }

    /// DECSTBM with 1-indexed parameters; a missing/zero bottom means the
    /// last row. Out-of-range bounds clamp; an inverted pair resets to the
    /// full screen. The cursor homes afterwards, honoring origin mode.
    pub fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        let last = self.rows - 1;
        let top = top.max(1) - 1;
        let bottom = if bottom == 0 { last } else { bottom - 1 };
        let (top, bottom) = (top.min(last), bottom.min(last));

        self.scroll_region = if top <= bottom {
            (top, bottom)
        } else {
            (0, last)
        };
        self.cursor_position(1, 1);
    }

    /// DECSC: remember position and rendition for the active buffer.
    pub fn save_cursor(&mut self) {
        let (col, row) = {
            let cursor = self.active_cursor();
            (cursor.col, cursor.row)
        };
        let attrs = self.current_attrs;
        self.active_cursor_mut().saved = Some(SavedCursor { col, row, attrs });
    }

    /// DECRC: restore the saved position and rendition, or home when
    /// nothing was saved. Positions saved before a shrink clamp to the
    /// current grid.
    pub fn restore_cursor(&mut self) {
        let saved = self.active_cursor().saved.clone();
        let (col, row, attrs) = match saved {
            Some(saved) => (saved.col, saved.row, saved.attrs),
            None => (0, 0, CellAttrs::default()),
        };
        let (max_col, max_row) = (self.cols - 1, self.rows - 1);
        let cursor = self.active_cursor_mut();
        cursor.col = col.min(max_col);
        cursor.row = row.min(max_row);
        cursor.pending_wrap = false;
        self.current_attrs = attrs;
    }

    /// Apply a DEC private mode set/reset, including the alternate-buffer
    /// family, and store unrecognized numbers opaquely.
    pub fn set_private_mode(&mut self, mode: u16, enable: bool) {
        if self.modes.set_private(mode, enable) {
            return;
        }
        match mode {
            47 | 1047 => {
                if enable && !self.modes.alternate_screen {
                    self.enter_alternate_screen();
                } else if !enable && self.modes.alternate_screen {
                    self.leave_alternate_screen();
                }
            }
            1048 => {
                if enable {
                    self.save_cursor();
                } else {
                    self.restore_cursor();
                }
            }
            1049 => {
                if enable && !self.modes.alternate_screen {
                    self.save_cursor();
                    self.enter_alternate_screen();
                } else if !enable && self.modes.alternate_screen {
                    self.leave_alternate_screen();
                    self.restore_cursor();
                }
            }
            _ => self.modes.set_unknown(mode, enable),
        }
    }

    /// Switch to a cleared, scrollback-free alternate buffer. The main
    /// buffer is left untouched underneath.
    fn enter_alternate_screen(&mut self) {
        self.modes.alternate_screen = true;
        let (cols, rows) = (self.cols, self.rows);
        self.alternate_screen.reset(cols, rows);
        self.alternate_cursor = CursorState::default();
        self.active_screen_mut().mark_all_dirty();
    }

    fn leave_alternate_screen(&mut self) {
        self.modes.alternate_screen = false;
        self.active_screen_mut().mark_all_dirty();
    }

    /// SO/SI shift between the G0 and G1 charsets.
    pub fn shift_charset(&mut self, slot: usize) {
        if slot < self.charsets.len() {
            self.active_charset = slot;
        }
    }

    /// ESC ( / ESC ) charset designation.
    pub fn designate_charset(&mut self, slot: usize, charset: Charset) {
        if slot < self.charsets.len() {
            self.charsets[slot] = charset;
        }
    }

    pub fn set_palette_entry(&mut self, index: u8, rgb: (u8, u8, u8)) {
        self.palette.insert(index, rgb);
    }

    pub fn reset_palette_entry(&mut self, index: u8) {
        self.palette.remove(&index);
    }

    pub fn reset_palette(&mut self) {
        self.palette.clear();
    }

    /// RIS: back to the power-on state at the current size.
    pub fn full_reset(&mut self) {
        *self = TerminalState::new(self.cols, self.rows);
    }

    /// Immutable copy of the visible grid and cursor.
    pub fn snapshot(&self) -> Snapshot {
        let screen = self.active_screen();
        let mut cells = Vec::with_capacity(self.cols as usize * self.rows as usize);
        for row in &screen.rows {
            cells.extend(row.cells.iter().cloned());
        }
        let cursor = self.active_cursor();
        Snapshot {
            cols: self.cols,
            rows: self.rows,
            cursor: CursorSnapshot {
                col: cursor.col,
                row: cursor.row,
                visible: self.modes.cursor_visible,
                shape: cursor.shape,
            },
            cells,
        }
    }

    /// Rows mutated since the last call, cleared on return.
    pub fn take_dirty(&mut self) -> DirtyRegion {
        self.active_screen_mut().take_dirty()
    }
}

/// One terminal session: parser plus state, fed from the child process's
/// output stream.
///
/// A chunk passed to [`Terminal::feed`] is fully processed before the call
/// returns; interpretation of each byte depends on the state left by the
/// previous one, so hosts must serialize delivery into one session (an
/// owning thread or single-consumer queue). Separate sessions share nothing.
#[derive(Clone, Debug)]
pub struct Terminal {
    parser: VtParser,
    state: TerminalState,
    responses: Vec<u8>,
}

impl Terminal {
    pub fn new(cols: u16, rows: u16) -> Result<Self, Error> {
        if cols == 0 || rows == 0 {
            return Err(Error::InvalidDimensions { cols, rows });
        }
        Ok(Self {
            parser: VtParser::new(),
            state: TerminalState::new(cols, rows),
            responses: Vec::new(),
        })
    }

    /// Process a chunk of child-process output. Chunk boundaries are
    /// arbitrary; sequences split across calls parse identically.
    pub fn feed(&mut self, bytes: &[u8]) {
        for action in self.parser.feed(bytes) {
            if let Some(response) = mutator::apply(&mut self.state, action) {
                self.responses.extend_from_slice(&response.to_bytes());
            }
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), Error> {
        self.state.resize(cols, rows)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    pub fn take_dirty(&mut self) -> DirtyRegion {
        self.state.take_dirty()
    }

    /// Reply bytes accumulated for device queries (DSR, DA). The host owns
    /// writing these to the child's input.
    pub fn take_responses(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.responses)
    }

    /// Encode a user input event against the current modes.
    pub fn encode_input(&self, event: &InputEvent) -> Vec<u8> {
        input::encode(event, &self.state.modes)
    }

    pub fn title(&self) -> &str {
        &self.state.title
    }

    pub fn palette(&self) -> &HashMap<u8, (u8, u8, u8)> {
        self.state.palette()
    }

    pub fn modes(&self) -> &ModeRegistry {
        &self.state.modes
    }

    pub fn state(&self) -> &TerminalState {
        &self.state
    }

    pub fn cols(&self) -> u16 {
        self.state.cols
    }

    pub fn rows(&self) -> u16 {
        self.state.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Color;

    #[test]
    fn autowrap_defers_until_next_print() {
        let mut state = TerminalState::new(4, 2);
        for ch in "abcd".chars() {
            state.put_char(ch);
        }
        // Cursor parks on the last column with wrap pending.
        assert_eq!(state.active_cursor().col, 3);
        assert_eq!(state.active_cursor().row, 0);
        assert!(state.active_cursor().pending_wrap);

        state.put_char('e');
        assert_eq!(state.active_cursor().row, 1);
        assert_eq!(state.active_cursor().col, 1);
        assert_eq!(state.active_screen().rows[1].cells[0].grapheme, "e");
        assert!(state.active_screen().rows[0].wrapped);
    }

    #[test]
    fn wide_glyph_occupies_two_cells() {
        let mut state = TerminalState::new(10, 2);
        state.put_char('あ');
        let row = &state.active_screen().rows[0];
        assert_eq!(row.cells[0].grapheme, "あ");
        assert_eq!(row.cells[0].width, 2);
        assert!(row.cells[1].is_continuation());
        assert_eq!(state.active_cursor().col, 2);
    }

    #[test]
    fn overwriting_wide_half_blanks_partner() {
        let mut state = TerminalState::new(10, 2);
        state.put_char('あ');
        state.cursor_position(1, 2);
        state.put_char('x');
        let row = &state.active_screen().rows[0];
        assert_eq!(row.cells[0].grapheme, "");
        assert_eq!(row.cells[0].width, 1);
        assert_eq!(row.cells[1].grapheme, "x");
    }

    #[test]
    fn erase_uses_current_background() {
        let mut state = TerminalState::new(4, 2);
        state.put_char('a');
        state.current_attrs.bg = Color::Indexed(2);
        state.cursor_position(1, 1);
        state.erase_in_line(2);
        for cell in &state.active_screen().rows[0].cells {
            assert_eq!(cell.attrs.bg, Color::Indexed(2));
            assert!(cell.grapheme.is_empty());
        }
    }

    #[test]
    fn scroll_region_confines_linefeed() {
        let mut state = TerminalState::new(4, 4);
        state.set_scroll_region(2, 3);
        // Region is rows 1..=2 (0-indexed). Fill row 0 as a marker.
        state.cursor_position(1, 1);
        state.put_char('!');
        state.cursor_position(3, 1);
        state.put_char('x');
        state.linefeed(); // at region bottom: scrolls the region only
        assert_eq!(state.active_screen().rows[0].cells[0].grapheme, "!");
        assert_eq!(state.active_screen().rows[1].cells[0].grapheme, "x");
    }

    #[test]
    fn alternate_screen_restores_main_exactly() {
        let mut state = TerminalState::new(8, 3);
        for ch in "hi".chars() {
            state.put_char(ch);
        }
        let saved_row = state.active_cursor().row;
        let saved_col = state.active_cursor().col;

        state.set_private_mode(1049, true);
        assert!(state.modes.alternate_screen);
        state.put_char('X');
        state.set_private_mode(1049, false);

        assert!(!state.modes.alternate_screen);
        assert_eq!(state.active_screen().rows[0].cells[0].grapheme, "h");
        assert_eq!(state.active_screen().rows[0].cells[1].grapheme, "i");
        assert_eq!(state.active_screen().rows[0].cells[2].grapheme, "");
        assert_eq!(state.active_cursor().row, saved_row);
        assert_eq!(state.active_cursor().col, saved_col);
    }

    #[test]
    fn resize_rejects_zero() {
        let mut state = TerminalState::new(8, 3);
        assert_eq!(
            state.resize(0, 3),
            Err(Error::InvalidDimensions { cols: 0, rows: 3 })
        );
        assert!(state.resize(4, 2).is_ok());
        assert_eq!(state.active_screen().rows.len(), 2);
    }

    #[test]
    fn origin_mode_addresses_relative_to_region() {
        let mut state = TerminalState::new(8, 6);
        state.set_scroll_region(3, 5);
        state.modes.origin = true;
        state.cursor_position(1, 1);
        assert_eq!(state.active_cursor().row, 2);
        // Clamped to the region bottom, not the screen bottom.
        state.cursor_position(99, 1);
        assert_eq!(state.active_cursor().row, 4);
    }

    #[test]
    fn erase_chars_clamps_to_row_end() {
        let mut state = TerminalState::new(6, 2);
        for ch in "abcdef".chars() {
            state.put_char(ch);
        }
        state.cursor_position(1, 5);
        state.erase_chars(99);
        let row = &state.active_screen().rows[0];
        assert_eq!(row.cells[3].grapheme, "d");
        assert_eq!(row.cells[4].grapheme, "");
        assert_eq!(row.cells[5].grapheme, "");
    }

    #[test]
    fn restore_after_shrink_clamps_saved_position() {
        let mut state = TerminalState::new(20, 10);
        state.cursor_position(9, 18);
        state.save_cursor();
        state.resize(8, 4).unwrap();
        state.restore_cursor();
        assert_eq!(state.active_cursor().row, 3);
        assert_eq!(state.active_cursor().col, 7);
        // Printing at the restored position must stay in bounds.
        state.put_char('x');
        assert_eq!(state.active_screen().rows[3].cells[7].grapheme, "x");
    }

    #[test]
    fn insert_mode_shifts_row_right() {
        let mut state = TerminalState::new(4, 2);
        for ch in "abc".chars() {
            state.put_char(ch);
        }
        state.modes.insert = true;
        state.cursor_position(1, 1);
        state.put_char('X');
        let row = &state.active_screen().rows[0];
        let text: Vec<&str> = row.cells.iter().map(|c| c.grapheme.as_str()).collect();
        assert_eq!(text, ["X", "a", "b", "c"]);
    }

    #[test]
    fn dec_special_graphics_maps_line_drawing() {
        let mut state = TerminalState::new(8, 2);
        state.designate_charset(0, Charset::DecSpecial);
        state.put_char('q');
        assert_eq!(state.active_screen().rows[0].cells[0].grapheme, "─");
        state.designate_charset(0, Charset::Ascii);
        state.put_char('q');
        assert_eq!(state.active_screen().rows[0].cells[1].grapheme, "q");
    }
}
