//! Screen buffer: grid rows, scrollback, cursor state, and dirty tracking.
//!
//! `ScreenBuffer` owns the visible rows of one buffer (main or alternate)
//! plus its scrollback history. The terminal keeps two of these and switches
//! between them for the alternate-screen modes. All coordinates here are
//! 0-indexed; the 1-indexed conversion happens where CSI parameters are
//! interpreted.

use std::collections::HashSet;

use crate::cell::{Cell, CellAttrs, Color};

/// A single row of cells.
#[derive(Clone, Debug)]
pub struct Row {
    pub cells: Vec<Cell>,
    /// Set when the cursor wrapped off the end of this row, so hosts that
    /// reassemble logical lines (copy/paste) can join it with the next row.
    pub wrapped: bool,
}

impl Row {
    pub fn new(cols: u16) -> Self {
        Self {
            cells: vec![Cell::default(); cols as usize],
            wrapped: false,
        }
    }

    /// A row of blanks painted with the given background.
    pub fn blank(cols: u16, bg: Color) -> Self {
        Self {
            cells: vec![Cell::blank(bg); cols as usize],
            wrapped: false,
        }
    }

    pub fn resize(&mut self, new_cols: u16) {
        self.cells.resize(new_cols as usize, Cell::default());
    }

    pub fn clear(&mut self, bg: Color) {
        for cell in &mut self.cells {
            cell.clear(bg);
        }
        self.wrapped = false;
    }
}

/// Cursor shape as set by DECSCUSR (`CSI Ps SP q`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CursorShape {
    /// Terminal dependent.
    #[default]
    Default,
    BlinkingBlock,
    SteadyBlock,
    BlinkingUnderline,
    SteadyUnderline,
    BlinkingBar,
    SteadyBar,
}

impl CursorShape {
    pub fn from_decscusr(n: u16) -> Self {
        match n {
            0 => CursorShape::Default,
            1 => CursorShape::BlinkingBlock,
            2 => CursorShape::SteadyBlock,
            3 => CursorShape::BlinkingUnderline,
            4 => CursorShape::SteadyUnderline,
            5 => CursorShape::BlinkingBar,
            6 => CursorShape::SteadyBar,
            _ => CursorShape::Default,
        }
    }
}

/// Cursor position saved by DECSC / `CSI s` / mode 1048.
#[derive(Clone, Debug)]
pub struct SavedCursor {
    pub col: u16,
    pub row: u16,
    pub attrs: CellAttrs,
}

/// Cursor state for one buffer.
#[derive(Clone, Debug)]
pub struct CursorState {
    pub col: u16,
    pub row: u16,
    pub shape: CursorShape,
    /// Deferred autowrap: set after printing into the last column, consumed
    /// by the next print. Any explicit cursor motion clears it.
    pub pending_wrap: bool,
    pub saved: Option<SavedCursor>,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            col: 0,
            row: 0,
            shape: CursorShape::Default,
            pending_wrap: false,
            saved: None,
        }
    }
}

/// One screen buffer with optional scrollback.
#[derive(Clone, Debug)]
pub struct ScreenBuffer {
    /// Visible rows, exactly `rows` long with uniform width.
    pub rows: Vec<Row>,
    /// Scrollback history, oldest first. Always empty for the alternate
    /// buffer.
    scrollback: Vec<Row>,
    scrollback_limit: usize,
    dirty_rows: HashSet<usize>,
    full_redraw: bool,
}

/// Default scrollback depth for the main buffer.
pub const SCROLLBACK_LIMIT: usize = 10_000;

impl ScreenBuffer {
    pub fn new(cols: u16, rows: u16, scrollback_limit: usize) -> Self {
        Self {
            rows: (0..rows).map(|_| Row::new(cols)).collect(),
            scrollback: Vec::new(),
            scrollback_limit,
            dirty_rows: HashSet::new(),
            full_redraw: true,
        }
    }

    /// Fit the grid to new dimensions. Existing content is preserved where
    /// it fits; new rows and columns are blank; excess is truncated. Reflow
    /// of wrapped lines is deliberately not attempted.
    pub fn resize(&mut self, new_cols: u16, new_rows: u16) {
        while self.rows.len() < new_rows as usize {
            self.rows.push(Row::new(new_cols));
        }
        self.rows.truncate(new_rows as usize);

        for row in &mut self.rows {
            row.resize(new_cols);
        }
        for row in &mut self.scrollback {
            row.resize(new_cols);
        }

        self.mark_all_dirty();
    }

    /// Replace all content with blanks at the given size. Used when the
    /// alternate buffer is entered or resized.
    pub fn reset(&mut self, cols: u16, rows: u16) {
        self.rows = (0..rows).map(|_| Row::new(cols)).collect();
        self.scrollback.clear();
        self.mark_all_dirty();
    }

    /// Move a row into scrollback, trimming the history to its limit.
    pub fn push_to_scrollback(&mut self, row: Row) {
        if self.scrollback_limit == 0 {
            return;
        }
        self.scrollback.push(row);
        if self.scrollback.len() > self.scrollback_limit {
            self.scrollback.remove(0);
        }
    }

    pub fn scrollback(&self) -> &[Row] {
        &self.scrollback
    }

    pub fn clear_scrollback(&mut self) {
        self.scrollback.clear();
    }

    pub fn mark_dirty(&mut self, row: usize) {
        self.dirty_rows.insert(row);
    }

    pub fn mark_all_dirty(&mut self) {
        self.full_redraw = true;
    }

    /// Return the rows mutated since the last call and reset the tracking.
    pub fn take_dirty(&mut self) -> DirtyRegion {
        let full = self.full_redraw;
        let mut rows: Vec<usize> = self.dirty_rows.drain().collect();
        rows.sort_unstable();
        self.full_redraw = false;
        DirtyRegion { full, rows }
    }
}

/// Rows changed since the previous render query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirtyRegion {
    /// The whole screen needs redrawing (scroll, resize, buffer switch).
    pub full: bool,
    /// Individually dirtied row indices, sorted ascending. Meaningless when
    /// `full` is set.
    pub rows: Vec<usize>,
}

impl DirtyRegion {
    pub fn is_empty(&self) -> bool {
        !self.full && self.rows.is_empty()
    }
}

/// Immutable copy of the visible display state, safe to hand to a renderer
/// on another thread.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub cols: u16,
    pub rows: u16,
    pub cursor: CursorSnapshot,
    /// Row-major cells, `rows * cols` long.
    pub cells: Vec<Cell>,
}

/// Cursor portion of a [`Snapshot`].
#[derive(Clone, Debug)]
pub struct CursorSnapshot {
    pub col: u16,
    pub row: u16,
    pub visible: bool,
    pub shape: CursorShape,
}

impl Snapshot {
    /// Cell at (row, col), if in bounds.
    pub fn cell(&self, row: u16, col: u16) -> Option<&Cell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row as usize * self.cols as usize + col as usize)
    }

    /// The visible text of one row, blanks rendered as spaces and
    /// continuation cells skipped.
    pub fn row_text(&self, row: u16) -> String {
        let mut out = String::new();
        for col in 0..self.cols {
            if let Some(cell) = self.cell(row, col) {
                if !cell.is_continuation() {
                    out.push_str(cell.display());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_pads_and_truncates() {
        let mut screen = ScreenBuffer::new(4, 2, 0);
        screen.rows[0].cells[0].grapheme = "a".to_string();
        screen.resize(6, 3);
        assert_eq!(screen.rows.len(), 3);
        assert_eq!(screen.rows[0].cells.len(), 6);
        assert_eq!(screen.rows[0].cells[0].grapheme, "a");

        screen.resize(2, 1);
        assert_eq!(screen.rows.len(), 1);
        assert_eq!(screen.rows[0].cells.len(), 2);
        assert_eq!(screen.rows[0].cells[0].grapheme, "a");
    }

    #[test]
    fn scrollback_respects_limit() {
        let mut screen = ScreenBuffer::new(4, 2, 3);
        for _ in 0..5 {
            screen.push_to_scrollback(Row::new(4));
        }
        assert_eq!(screen.scrollback().len(), 3);
    }

    #[test]
    fn take_dirty_drains() {
        let mut screen = ScreenBuffer::new(4, 4, 0);
        screen.take_dirty(); // clear the initial full redraw
        screen.mark_dirty(2);
        screen.mark_dirty(0);
        let dirty = screen.take_dirty();
        assert!(!dirty.full);
        assert_eq!(dirty.rows, vec![0, 2]);
        assert!(screen.take_dirty().is_empty());
    }
}
