//! Line realization (greedy soft wrapping).
//!
//! [`LineRealizer`] produces one wrapped line at a time from any start offset. A wrapped line
//! depends only on the text from its own start: tab stops are measured from the wrapped line's
//! start, which is what lets realization resume from a [`crate::Checkpoint`] and still produce
//! the same boundaries as a single pass from offset 0.

use crate::metrics::{GlyphMetrics, advance_at};
use crate::storage::TextSnapshot;

/// Soft wrapping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    /// No soft wrapping (each paragraph is a single visual line).
    None,
    /// Wrap at character boundaries (greedy character fill).
    #[default]
    Char,
    /// Prefer wrapping after whitespace, falling back to character wrap.
    Word,
}

/// One visual row of text.
///
/// Lines are contiguous: line `i + 1` starts at [`next_start`](Self::next_start) of line `i`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WrappedLine {
    /// Offset of the first character.
    pub start: usize,
    /// Number of characters, excluding a terminating `'\n'`.
    pub len: usize,
    /// Rendered width.
    pub width: f32,
    /// Whether the line is terminated by an explicit `'\n'` (consumed, not part of `len`).
    pub hard_break: bool,
}

impl WrappedLine {
    /// Exclusive end offset of the line's visible characters.
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Offset where the following line starts.
    pub fn next_start(&self) -> usize {
        self.end() + usize::from(self.hard_break)
    }

    /// Returns `true` if no line follows this one in a buffer of `text_len` chars.
    pub fn is_last(&self, text_len: usize) -> bool {
        !self.hard_break && self.end() >= text_len
    }

    /// Returns `true` if a caret at `offset` belongs to this line.
    ///
    /// The offset at a soft-wrap boundary belongs to the following line; the offset just before
    /// a `'\n'` belongs to the line the break terminates.
    pub fn contains_offset(&self, offset: usize, text_len: usize) -> bool {
        self.start <= offset && (offset < self.next_start() || self.is_last(text_len))
    }
}

/// Greedy line builder over a [`TextSnapshot`].
pub struct LineRealizer<'a, M: ?Sized> {
    snapshot: &'a TextSnapshot,
    metrics: &'a M,
    viewport_width: f32,
    wrap_mode: WrapMode,
    tab_size: usize,
}

impl<'a, M: GlyphMetrics + ?Sized> LineRealizer<'a, M> {
    /// Create a realizer for the given viewport width.
    ///
    /// A non-positive (or NaN) width disables wrapping, as does [`WrapMode::None`].
    pub fn new(
        snapshot: &'a TextSnapshot,
        metrics: &'a M,
        viewport_width: f32,
        wrap_mode: WrapMode,
        tab_size: usize,
    ) -> Self {
        let wrap_mode = if viewport_width > 0.0 {
            wrap_mode
        } else {
            WrapMode::None
        };
        Self {
            snapshot,
            metrics,
            viewport_width,
            wrap_mode,
            tab_size: tab_size.max(1),
        }
    }

    /// The snapshot being laid out.
    pub fn snapshot(&self) -> &'a TextSnapshot {
        self.snapshot
    }

    /// Effective wrap mode.
    pub fn wrap_mode(&self) -> WrapMode {
        self.wrap_mode
    }

    /// Build the wrapped line starting at `start`.
    ///
    /// Returns `None` when `start` is past the end of the buffer, or at the end without an owed
    /// trailing empty line (the buffer is non-empty and does not end in `'\n'`).
    pub fn realize(&self, start: usize) -> Option<WrappedLine> {
        self.fill(start).map(|(line, _)| line)
    }

    /// Last offset `line` looked at to decide where it ends: the char that did not fit, the
    /// `'\n'`, or the end of the buffer.
    ///
    /// An edit starting after this offset leaves `line` unchanged.
    pub fn scan_end(&self, line: &WrappedLine) -> usize {
        self.fill(line.start)
            .map_or(line.start, |(_, scan_end)| scan_end)
    }

    fn fill(&self, start: usize) -> Option<(WrappedLine, usize)> {
        let text_len = self.snapshot.len();
        if start > text_len {
            return None;
        }
        if start == text_len {
            let owed = text_len == 0 || self.snapshot.try_get_char(text_len - 1) == Some('\n');
            let line = WrappedLine {
                start,
                ..WrappedLine::default()
            };
            return owed.then_some((line, text_len));
        }

        let line = |len: usize, width: f32, hard_break: bool| WrappedLine {
            start,
            len,
            width,
            hard_break,
        };

        let mut x = 0.0f32;
        let mut len = 0usize;
        // (len, width) of the line if it were cut right after the last whitespace.
        let mut last_break: Option<(usize, f32)> = None;

        for ch in self.snapshot.chars_from(start) {
            let at = start + len;
            if ch == '\n' {
                return Some((line(len, x, true), at));
            }

            let advance = advance_at(self.metrics, ch, x, self.tab_size);
            if self.wrap_mode != WrapMode::None && len > 0 && x + advance > self.viewport_width {
                if self.wrap_mode == WrapMode::Word
                    && let Some((break_len, break_width)) = last_break
                {
                    return Some((line(break_len, break_width, false), at));
                }
                return Some((line(len, x, false), at));
            }

            x += advance;
            len += 1;
            if ch.is_whitespace() {
                last_break = Some((len, x));
            }
        }

        Some((line(len, x, false), text_len))
    }

    /// Iterate every wrapped line from `start` to the end of the buffer.
    pub fn lines_from(&self, start: usize) -> RealizedLines<'_, 'a, M> {
        RealizedLines {
            realizer: self,
            next: Some(start),
        }
    }
}

/// Iterator returned by [`LineRealizer::lines_from`].
pub struct RealizedLines<'r, 'a, M: ?Sized> {
    realizer: &'r LineRealizer<'a, M>,
    next: Option<usize>,
}

impl<M: GlyphMetrics + ?Sized> Iterator for RealizedLines<'_, '_, M> {
    type Item = WrappedLine;

    fn next(&mut self) -> Option<WrappedLine> {
        let start = self.next.take()?;
        let line = self.realizer.realize(start)?;
        if !line.is_last(self.realizer.snapshot.len()) {
            self.next = Some(line.next_start());
        }
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MonospaceMetrics;

    fn wrap(text: &str, width: f32, mode: WrapMode) -> Vec<String> {
        let snapshot = TextSnapshot::from_text(text);
        let metrics = MonospaceMetrics::cells();
        let realizer = LineRealizer::new(&snapshot, &metrics, width, mode, 4);
        realizer
            .lines_from(0)
            .map(|line| snapshot.build_range_text(line.start, line.len))
            .collect()
    }

    #[test]
    fn test_empty_text_yields_one_empty_line() {
        assert_eq!(wrap("", 10.0, WrapMode::Char), vec![""]);
    }

    #[test]
    fn test_trailing_newline_yields_trailing_empty_line() {
        assert_eq!(wrap("abc\n", 10.0, WrapMode::Char), vec!["abc", ""]);
        assert_eq!(wrap("\n\n", 10.0, WrapMode::Char), vec!["", "", ""]);
    }

    #[test]
    fn test_exact_fit_does_not_wrap() {
        assert_eq!(wrap("1234567890", 10.0, WrapMode::Char), vec!["1234567890"]);
    }

    #[test]
    fn test_one_over_wraps() {
        assert_eq!(
            wrap("12345678901", 10.0, WrapMode::Char),
            vec!["1234567890", "1"]
        );
    }

    #[test]
    fn test_scan_end_covers_the_char_that_did_not_fit() {
        let snapshot = TextSnapshot::from_text("ab cd ef\nxy");
        let metrics = MonospaceMetrics::cells();
        let scan_ends = |mode| {
            let realizer = LineRealizer::new(&snapshot, &metrics, 4.0, mode, 4);
            realizer
                .lines_from(0)
                .map(|line| realizer.scan_end(&line))
                .collect::<Vec<_>>()
        };
        // Word: "ab " stopped at 'd', "cd " at 'f', "ef" at the break, "xy" at the end.
        assert_eq!(scan_ends(WrapMode::Word), vec![4, 7, 8, 11]);
        // Char: a soft line stops at the next line's first char.
        assert_eq!(scan_ends(WrapMode::Char), vec![4, 8, 11]);
    }

    #[test]
    fn test_cjk_wraps_intact() {
        // 6 CJK characters = 12 cells
        assert_eq!(wrap("你好世界测试", 10.0, WrapMode::Char), vec!["你好世界测", "试"]);
        // "Hello" takes 5 cells, "你" needs 2 but only 1 remains
        assert_eq!(wrap("Hello你", 6.0, WrapMode::Char), vec!["Hello", "你"]);
    }

    #[test]
    fn test_overwide_char_sits_alone() {
        assert_eq!(wrap("a你b", 1.0, WrapMode::Char), vec!["a", "你", "b"]);
    }

    #[test]
    fn test_simple_wrap_scenario() {
        assert_eq!(wrap("ab cd ef", 4.0, WrapMode::Word), vec!["ab ", "cd ", "ef"]);
        assert_eq!(wrap("ab cd ef", 4.0, WrapMode::Char), vec!["ab c", "d ef"]);
    }

    #[test]
    fn test_word_wrap_falls_back_to_char_wrap() {
        assert_eq!(wrap("hello world", 7.0, WrapMode::Word), vec!["hello ", "world"]);
        assert_eq!(wrap("abcdefgh", 3.0, WrapMode::Word), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_wrap_mode_none_and_zero_width_disable_wrapping() {
        assert_eq!(wrap("abcdefghij", 5.0, WrapMode::None), vec!["abcdefghij"]);
        assert_eq!(wrap("abcdefghij\nxy", 0.0, WrapMode::Char), vec!["abcdefghij", "xy"]);
    }

    #[test]
    fn test_tabs_expand_from_wrapped_line_start() {
        let snapshot = TextSnapshot::from_text("ab\tcdefg\t");
        let metrics = MonospaceMetrics::cells();
        let realizer = LineRealizer::new(&snapshot, &metrics, 6.0, WrapMode::Char, 4);
        let lines: Vec<WrappedLine> = realizer.lines_from(0).collect();

        // "ab" + tab to 4 + "cd" = 6 cells; "efg" + tab to 4 = 4 cells.
        assert_eq!(lines.len(), 2);
        assert_eq!((lines[0].start, lines[0].len, lines[0].width), (0, 5, 6.0));
        assert_eq!((lines[1].start, lines[1].len, lines[1].width), (5, 4, 4.0));
    }

    #[test]
    fn test_line_geometry_and_contiguity() {
        let snapshot = TextSnapshot::from_text("hello world\nxy");
        let metrics = MonospaceMetrics::new(2.0, 10.0);
        let realizer = LineRealizer::new(&snapshot, &metrics, 16.0, WrapMode::Char, 4);
        let lines: Vec<WrappedLine> = realizer.lines_from(0).collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], WrappedLine { start: 0, len: 8, width: 16.0, hard_break: false });
        assert_eq!(lines[1], WrappedLine { start: 8, len: 3, width: 6.0, hard_break: true });
        assert_eq!(lines[2], WrappedLine { start: 12, len: 2, width: 4.0, hard_break: false });
        for pair in lines.windows(2) {
            assert_eq!(pair[0].next_start(), pair[1].start);
        }
        assert!(lines[2].is_last(snapshot.len()));
    }

    #[test]
    fn test_realize_past_end_fails() {
        let snapshot = TextSnapshot::from_text("abc");
        let metrics = MonospaceMetrics::cells();
        let realizer = LineRealizer::new(&snapshot, &metrics, 10.0, WrapMode::Char, 4);
        assert!(realizer.realize(3).is_none());
        assert!(realizer.realize(4).is_none());
    }

    #[test]
    fn test_contains_offset_boundaries() {
        let soft = WrappedLine { start: 0, len: 4, width: 4.0, hard_break: false };
        assert!(soft.contains_offset(3, 10));
        assert!(!soft.contains_offset(4, 10));

        let hard = WrappedLine { start: 4, len: 2, width: 2.0, hard_break: true };
        assert!(hard.contains_offset(6, 10));
        assert!(!hard.contains_offset(7, 10));

        let last = WrappedLine { start: 7, len: 3, width: 3.0, hard_break: false };
        assert!(last.contains_offset(10, 10));
    }
}
