//! VT100/xterm terminal state core.
//!
//! `vtcore` decodes the byte stream a child process writes into structured
//! display state, and encodes user input back into the escape-sequence
//! dialect the child expects. It is the state engine beneath a terminal UI:
//! no rendering, no process management, no I/O.
//!
//! - **parser**: escape sequence state machine, bytes to [`Action`]s
//! - **mutator**: applies actions to the screen buffer and mode registry
//! - **term**: terminal state and the [`Terminal`] session facade
//! - **screen**: cell grid, cursor, scrollback, dirty-row tracking
//! - **modes**: toggle-able terminal modes
//! - **input**: key/mouse/paste events to outbound bytes
//!
//! # Architecture
//!
//! ```text
//! child output bytes -> VtParser -> Actions -> mutator
//!                                                 |
//!                         ScreenBuffer / ModeRegistry / side channels
//!                                                 |
//!                              snapshot() + take_dirty() -> renderer
//!
//! user input -> input::encode (reads ModeRegistry) -> child input bytes
//! ```
//!
//! # Example
//!
//! ```
//! use vtcore::Terminal;
//!
//! let mut term = Terminal::new(80, 24).unwrap();
//! term.feed(b"\x1b[31mhello\x1b[0m");
//! let snapshot = term.snapshot();
//! assert_eq!(snapshot.row_text(0).trim_end(), "hello");
//! ```

pub mod cell;
pub mod error;
pub mod input;
pub mod modes;
pub mod mutator;
pub mod parser;
pub mod screen;
pub mod term;

pub use cell::{AttrFlags, Cell, CellAttrs, Color};
pub use error::Error;
pub use input::{InputEvent, KeyCode, KeyEvent, Modifiers, MouseButton, MouseEvent, MouseEventKind};
pub use modes::{Mode, ModeRegistry, MouseTracking};
pub use mutator::Response;
pub use parser::{Action, VtParser};
pub use screen::{CursorShape, CursorSnapshot, DirtyRegion, Snapshot};
pub use term::{Charset, Terminal, TerminalState};
