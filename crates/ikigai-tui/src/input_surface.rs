// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Grapheme-cursor input buffer.
//!
//! Backs the single-line (possibly wrapped) text field the REPL reads
//! commands and messages from. The cursor moves by grapheme cluster, not
//! byte or `char`, so combining marks and multi-codepoint emoji move as one
//! unit; vertical motion at a given wrap width remembers a preferred
//! display column the way most line editors do, so moving up through a
//! short line and back down lands on the original column rather than
//! snapping to end-of-line.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::scrollback::wrap_line;

/// Splits `graphemes` into `(start, end)` index ranges, one per physical
/// row, at `wrap_width` columns. `wrap_width == 0` means unbounded.
fn physical_rows(graphemes: &[String], wrap_width: usize) -> Vec<(usize, usize)> {
    if wrap_width == 0 {
        return vec![(0, graphemes.len())];
    }
    let mut rows = Vec::new();
    let mut row_start = 0usize;
    let mut current_width = 0usize;
    for (i, g) in graphemes.iter().enumerate() {
        let w = g.width();
        if current_width > 0 && current_width + w > wrap_width {
            rows.push((row_start, i));
            row_start = i;
            current_width = 0;
        }
        current_width += w;
    }
    rows.push((row_start, graphemes.len()));
    rows
}

/// The grapheme index within `graphemes[start..end]` whose cumulative
/// display width first reaches `target_col`, or `end` if the row is
/// shorter than `target_col`.
fn resolve_column(graphemes: &[String], start: usize, end: usize, target_col: usize) -> usize {
    let mut width = 0usize;
    for i in start..end {
        let w = graphemes[i].width();
        if width + w > target_col {
            return i;
        }
        width += w;
    }
    end
}

#[derive(Debug, Default)]
pub struct InputBuffer {
    graphemes: Vec<String>,
    cursor: usize,
    preferred_column: Option<usize>,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_str(s: &str) -> Self {
        let graphemes: Vec<String> = s.graphemes(true).map(str::to_string).collect();
        let cursor = graphemes.len();
        Self { graphemes, cursor, preferred_column: None }
    }

    pub fn text(&self) -> String {
        self.graphemes.concat()
    }

    pub fn len(&self) -> usize {
        self.graphemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphemes.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Display width of the whole buffer's text, at an unbounded wrap width.
    pub fn display_width(&self) -> usize {
        wrap_line(&self.text(), 0).0
    }

    /// Insert `s` (possibly several grapheme clusters) at the cursor,
    /// advancing the cursor past the inserted text.
    pub fn insert(&mut self, s: &str) {
        self.preferred_column = None;
        let new_graphemes: Vec<String> = s.graphemes(true).map(str::to_string).collect();
        let count = new_graphemes.len();
        self.graphemes.splice(self.cursor..self.cursor, new_graphemes);
        self.cursor += count;
    }

    /// Remove the grapheme before the cursor. Returns `false` at start of
    /// buffer.
    pub fn backspace(&mut self) -> bool {
        self.preferred_column = None;
        if self.cursor == 0 {
            return false;
        }
        self.graphemes.remove(self.cursor - 1);
        self.cursor -= 1;
        true
    }

    /// Remove the grapheme at the cursor. Returns `false` at end of buffer.
    pub fn delete(&mut self) -> bool {
        self.preferred_column = None;
        if self.cursor >= self.graphemes.len() {
            return false;
        }
        self.graphemes.remove(self.cursor);
        true
    }

    pub fn move_left(&mut self) -> bool {
        self.preferred_column = None;
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn move_right(&mut self) -> bool {
        self.preferred_column = None;
        if self.cursor >= self.graphemes.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn move_to_start(&mut self) {
        self.preferred_column = None;
        self.cursor = 0;
    }

    pub fn move_to_end(&mut self) {
        self.preferred_column = None;
        self.cursor = self.graphemes.len();
    }

    /// Delete back to the start of the current/previous word (whitespace
    /// delimited), returning the removed text.
    pub fn delete_word_left(&mut self) -> String {
        self.preferred_column = None;
        if self.cursor == 0 {
            return String::new();
        }
        let mut start = self.cursor;
        while start > 0 && self.graphemes[start - 1].chars().all(char::is_whitespace) {
            start -= 1;
        }
        while start > 0 && !self.graphemes[start - 1].chars().all(char::is_whitespace) {
            start -= 1;
        }
        let removed: String = self.graphemes[start..self.cursor].concat();
        self.graphemes.drain(start..self.cursor);
        self.cursor = start;
        removed
    }

    fn locate(&self, rows: &[(usize, usize)]) -> (usize, usize, usize) {
        for (row_idx, &(start, end)) in rows.iter().enumerate() {
            if self.cursor >= start && self.cursor <= end {
                let col = self.graphemes[start..self.cursor].iter().map(|g| g.width()).sum();
                return (row_idx, start, col);
            }
        }
        let last = rows.len() - 1;
        (last, rows[last].0, 0)
    }

    /// Move up one wrapped row at `wrap_width`, preserving the display
    /// column across repeated vertical moves. Returns `false` already on
    /// the first row.
    pub fn move_up(&mut self, wrap_width: usize) -> bool {
        let rows = physical_rows(&self.graphemes, wrap_width);
        let (row, _start, col) = self.locate(&rows);
        if row == 0 {
            return false;
        }
        let target = *self.preferred_column.get_or_insert(col);
        let (ts, te) = rows[row - 1];
        self.cursor = resolve_column(&self.graphemes, ts, te, target);
        true
    }

    /// Move down one wrapped row at `wrap_width`, preserving the display
    /// column across repeated vertical moves. Returns `false` already on
    /// the last row.
    pub fn move_down(&mut self, wrap_width: usize) -> bool {
        let rows = physical_rows(&self.graphemes, wrap_width);
        let (row, _start, col) = self.locate(&rows);
        if row + 1 >= rows.len() {
            return false;
        }
        let target = *self.preferred_column.get_or_insert(col);
        let (ts, te) = rows[row + 1];
        self.cursor = resolve_column(&self.graphemes, ts, te, target);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_text_round_trip() {
        let mut buf = InputBuffer::new();
        buf.insert("hello");
        assert_eq!(buf.text(), "hello");
        assert_eq!(buf.cursor(), 5);
    }

    #[test]
    fn backspace_removes_grapheme_before_cursor() {
        let mut buf = InputBuffer::from_str("hello");
        assert!(buf.backspace());
        assert_eq!(buf.text(), "hell");
        assert_eq!(buf.cursor(), 4);
    }

    #[test]
    fn backspace_at_start_is_a_no_op() {
        let mut buf = InputBuffer::from_str("hello");
        buf.move_to_start();
        assert!(!buf.backspace());
        assert_eq!(buf.text(), "hello");
    }

    #[test]
    fn insert_moves_cursor_between_graphemes_not_chars() {
        let mut buf = InputBuffer::new();
        buf.insert("cafe\u{0301}"); // "café" with a combining acute accent
        assert_eq!(buf.len(), 4); // c, a, f, e+combining-mark as one grapheme
        assert!(buf.backspace());
        assert_eq!(buf.text(), "caf");
    }

    #[test]
    fn delete_word_left_stops_at_whitespace() {
        let mut buf = InputBuffer::from_str("hello there world");
        let removed = buf.delete_word_left();
        assert_eq!(removed, "world");
        assert_eq!(buf.text(), "hello there ");
    }

    #[test]
    fn vertical_motion_preserves_preferred_column() {
        // A single logical line wrapped at width 10 over 20 'a's gives two
        // physical rows of 10 graphemes each.
        let mut buf = InputBuffer::from_str(&"a".repeat(20));
        buf.move_to_start();
        for _ in 0..7 {
            buf.move_right();
        }
        assert_eq!(buf.cursor(), 7);
        assert!(buf.move_down(10));
        assert_eq!(buf.cursor(), 17);
        assert!(buf.move_up(10));
        assert_eq!(buf.cursor(), 7);
    }

    #[test]
    fn move_up_at_first_row_is_a_no_op() {
        let mut buf = InputBuffer::from_str("hello");
        assert!(!buf.move_up(80));
    }
}
