// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Append-only scrollback buffer.
//!
//! Holds one entry per logical line (a full message or a line of one), with
//! a cached `{display_width, physical_lines}` layout computed against a
//! wrap width. Layout is grapheme-cluster aware, not byte- or char-aware, so
//! combining marks and wide CJK glyphs wrap the way a real terminal renders
//! them. The terminal renderer itself is out of scope here; this module
//! only owns the data the renderer would read.

use std::cell::Cell;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Cached wrap result for one logical line at a given wrap width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineLayout {
    wrap_width: usize,
    display_width: usize,
    physical_lines: usize,
}

/// One appended entry. Layout is recomputed lazily and only when the
/// requested wrap width differs from the cached one.
#[derive(Debug)]
struct LogicalLine {
    text: String,
    layout: Cell<Option<LineLayout>>,
}

/// Computes the total display width and the number of physical (wrapped)
/// rows `text` occupies at `wrap_width` columns. `wrap_width == 0` means
/// unbounded (never wraps).
pub(crate) fn wrap_line(text: &str, wrap_width: usize) -> (usize, usize) {
    let display_width = text.width();
    if wrap_width == 0 || display_width <= wrap_width {
        return (display_width, 1);
    }

    let mut physical_lines = 1usize;
    let mut current_width = 0usize;
    for grapheme in text.graphemes(true) {
        let w = grapheme.width();
        if current_width > 0 && current_width + w > wrap_width {
            physical_lines += 1;
            current_width = 0;
        }
        current_width += w;
    }
    (display_width, physical_lines)
}

/// An append-only log of logical lines with cached wrap layout.
#[derive(Debug, Default)]
pub struct Scrollback {
    lines: Vec<LogicalLine>,
}

impl Scrollback {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Append one logical line, returning its index.
    pub fn append(&mut self, text: impl Into<String>) -> usize {
        self.lines.push(LogicalLine { text: text.into(), layout: Cell::new(None) });
        self.lines.len() - 1
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn text(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(|l| l.text.as_str())
    }

    /// Returns `(display_width, physical_lines)` for logical line `index`
    /// at `wrap_width`, computing and caching it if the cache is stale.
    pub fn ensure_layout(&self, index: usize, wrap_width: usize) -> Option<(usize, usize)> {
        let line = self.lines.get(index)?;
        if let Some(cached) = line.layout.get() {
            if cached.wrap_width == wrap_width {
                return Some((cached.display_width, cached.physical_lines));
            }
        }
        let (display_width, physical_lines) = wrap_line(&line.text, wrap_width);
        line.layout.set(Some(LineLayout { wrap_width, display_width, physical_lines }));
        Some((display_width, physical_lines))
    }

    /// Total physical rows across every logical line at `wrap_width`.
    pub fn total_physical_rows(&self, wrap_width: usize) -> usize {
        (0..self.lines.len())
            .map(|i| self.ensure_layout(i, wrap_width).map(|(_, rows)| rows).unwrap_or(0))
            .sum()
    }

    /// Given a physical row index (0-based, from the top of the whole
    /// scrollback at `wrap_width`), find which logical line it falls in and
    /// the row offset within that line. Returns `None` if `row` is past the
    /// end of the buffer.
    pub fn find_logical_line_at_physical_row(&self, wrap_width: usize, row: usize) -> Option<(usize, usize)> {
        let mut remaining = row;
        for index in 0..self.lines.len() {
            let (_, physical_lines) = self.ensure_layout(index, wrap_width)?;
            if remaining < physical_lines {
                return Some((index, remaining));
            }
            remaining -= physical_lines;
        }
        None
    }
}
