//! Caret-adjacent line lookup hint.

use crate::layout::WrappedLine;

/// Most recently resolved offset-to-line lookup.
///
/// `[range_start, range_end]` (inclusive) are the caret offsets that belonged to line `line` when
/// the hint was recorded. A hint is never trusted blindly; callers re-check the live line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaretLineHint {
    /// Wrapped-line index.
    pub line: usize,
    /// First caret offset on the line.
    pub range_start: usize,
    /// Last caret offset on the line.
    pub range_end: usize,
}

impl CaretLineHint {
    /// Record `line` (at `index`) in a buffer of `text_len` chars.
    pub fn new(index: usize, line: &WrappedLine, text_len: usize) -> Self {
        let range_end = if line.is_last(text_len) {
            line.end()
        } else {
            line.next_start().saturating_sub(1).max(line.start)
        };
        Self {
            line: index,
            range_start: line.start,
            range_end,
        }
    }

    /// Returns `true` if `offset` fell on the hinted line.
    pub fn covers(&self, offset: usize) -> bool {
        (self.range_start..=self.range_end).contains(&offset)
    }

    /// Neighbouring lines worth probing for `offset`, nearest first, at most `max` of them.
    pub fn probe_lines(&self, offset: usize, max: usize) -> impl Iterator<Item = usize> {
        let line = self.line;
        let forward = offset > self.range_end;
        (1..=max).map_while(move |distance| {
            if forward {
                line.checked_add(distance)
            } else {
                line.checked_sub(distance)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_wrapped_line_excludes_next_start() {
        let line = WrappedLine { start: 10, len: 5, width: 5.0, hard_break: false };
        let hint = CaretLineHint::new(3, &line, 100);
        assert_eq!((hint.range_start, hint.range_end), (10, 14));
        assert!(hint.covers(10) && hint.covers(14));
        assert!(!hint.covers(15));
    }

    #[test]
    fn test_hard_break_line_includes_offset_before_break() {
        let line = WrappedLine { start: 10, len: 5, width: 5.0, hard_break: true };
        let hint = CaretLineHint::new(3, &line, 100);
        assert!(hint.covers(15));
        assert!(!hint.covers(16));

        let empty = WrappedLine { start: 20, len: 0, width: 0.0, hard_break: true };
        assert!(CaretLineHint::new(4, &empty, 100).covers(20));
    }

    #[test]
    fn test_last_line_includes_end_of_buffer() {
        let line = WrappedLine { start: 95, len: 5, width: 5.0, hard_break: false };
        assert!(CaretLineHint::new(9, &line, 100).covers(100));
    }

    #[test]
    fn test_probe_direction() {
        let line = WrappedLine { start: 10, len: 5, width: 5.0, hard_break: true };
        let hint = CaretLineHint::new(2, &line, 100);
        assert_eq!(hint.probe_lines(30, 3).collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(hint.probe_lines(2, 4).collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(hint.probe_lines(2, 0).count(), 0);
    }

    #[test]
    fn test_no_probes_before_the_first_line() {
        let line = WrappedLine { start: 10, len: 5, width: 5.0, hard_break: true };
        let hint = CaretLineHint::new(0, &line, 100);
        assert_eq!(hint.probe_lines(3, 4).count(), 0);
    }
}
