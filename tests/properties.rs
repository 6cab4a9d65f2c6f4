//! Property-based invariants over arbitrary and adversarial input.

use proptest::prelude::*;
use vtcore::{Terminal, VtParser};

/// A mix of plain text and realistic escape sequences, so generated streams
/// actually exercise the non-ground parser states.
fn stream_fragment() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        "[ -~]{0,12}".prop_map(|s| s.into_bytes()),
        Just(b"\x1b[2;5H".to_vec()),
        Just(b"\x1b[38;2;1;2;3m".to_vec()),
        Just(b"\x1b[48;5;17m".to_vec()),
        Just(b"\x1b[0m".to_vec()),
        Just(b"\x1b[2J".to_vec()),
        Just(b"\x1b[K".to_vec()),
        Just(b"\x1b[?1049h".to_vec()),
        Just(b"\x1b[?1049l".to_vec()),
        Just(b"\x1b[3;10r".to_vec()),
        Just(b"\x1b]0;title\x07".to_vec()),
        Just(b"\x1b]4;1;rgb:ff/00/00\x1b\\".to_vec()),
        Just(b"\x1bP1q#0\x1b\\".to_vec()),
        Just(b"\r\n".to_vec()),
        Just("wide あ text".as_bytes().to_vec()),
        proptest::collection::vec(any::<u8>(), 0..16),
    ]
}

fn stream() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(stream_fragment(), 0..24).prop_map(|frags| frags.concat())
}

proptest! {
    /// Splitting a stream at any byte boundary yields the same actions as
    /// feeding it whole.
    #[test]
    fn split_feed_equals_whole_feed(bytes in stream(), split_at in any::<proptest::sample::Index>()) {
        let whole = VtParser::new().feed(&bytes);

        let split = split_at.index(bytes.len() + 1);
        let mut parser = VtParser::new();
        let mut actions = parser.feed(&bytes[..split]);
        actions.extend(parser.feed(&bytes[split..]));

        prop_assert_eq!(actions, whole);
    }

    /// The same holds for full terminal state, not just parser output.
    #[test]
    fn split_feed_same_screen(bytes in stream(), split_at in any::<proptest::sample::Index>()) {
        let mut whole = Terminal::new(40, 12).unwrap();
        whole.feed(&bytes);

        let split = split_at.index(bytes.len() + 1);
        let mut parts = Terminal::new(40, 12).unwrap();
        parts.feed(&bytes[..split]);
        parts.feed(&bytes[split..]);

        let a = whole.snapshot();
        let b = parts.snapshot();
        prop_assert_eq!(a.cells, b.cells);
        prop_assert_eq!((a.cursor.row, a.cursor.col), (b.cursor.row, b.cursor.col));
    }

    /// Arbitrary garbage never panics the pipeline and never moves the
    /// cursor out of bounds.
    #[test]
    fn arbitrary_bytes_never_panic(chunks in proptest::collection::vec(
        proptest::collection::vec(any::<u8>(), 0..64), 0..8))
    {
        let mut term = Terminal::new(20, 6).unwrap();
        for chunk in &chunks {
            term.feed(chunk);
            let snap = term.snapshot();
            prop_assert!(snap.cursor.row < 6);
            prop_assert!(snap.cursor.col < 20);
        }
    }

    /// Resize at any moment keeps the session usable.
    #[test]
    fn resize_mid_stream_is_safe(bytes in stream(), cols in 1u16..100, rows in 1u16..50) {
        let mut term = Terminal::new(40, 12).unwrap();
        term.feed(&bytes);
        term.resize(cols, rows).unwrap();
        term.feed(&bytes);
        let snap = term.snapshot();
        prop_assert!(snap.cursor.row < rows);
        prop_assert!(snap.cursor.col < cols);
        prop_assert_eq!(snap.cells.len(), cols as usize * rows as usize);
    }

    /// SGR reset returns rendition to defaults no matter what preceded it.
    #[test]
    fn sgr_reset_always_restores_defaults(bytes in stream()) {
        let mut term = Terminal::new(40, 12).unwrap();
        term.feed(&bytes);
        // Neutralize addressing state left by the stream, then reset SGR.
        term.feed(b"\x1b[?1049l\x1b[?6l\x1b[r\x1b[0m\x1b[1;1Hz");
        let snap = term.snapshot();
        let cell = snap.cell(0, 0).unwrap();
        prop_assert_eq!(cell.attrs.fg, vtcore::Color::Default);
        prop_assert_eq!(cell.attrs.bg, vtcore::Color::Default);
        prop_assert!(cell.attrs.flags.is_empty());
    }
}
