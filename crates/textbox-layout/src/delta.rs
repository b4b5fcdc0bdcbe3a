//! Edit deltas pushed by the caret/selection edit source.
//!
//! A delta describes one committed mutation in **character offsets** (Unicode scalar values):
//! the text removed at `start` and the text inserted in its place. The engine consumes each
//! delta exactly once.

/// A single atomic text mutation.
///
/// Semantics:
/// - `start` is a character offset into the document **before** the edit is applied.
/// - `old_len` / `new_len` are the character lengths of `removed_text` / `inserted_text`.
/// - `start + old_len` must not exceed the pre-edit document length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDelta {
    /// Start character offset of the edit.
    pub start: usize,
    /// Number of characters removed.
    pub old_len: usize,
    /// Number of characters inserted.
    pub new_len: usize,
    /// Exact removed text (may be empty).
    pub removed_text: String,
    /// Exact inserted text (may be empty).
    pub inserted_text: String,
}

impl EditDelta {
    /// Build a delta, deriving both lengths from the texts.
    pub fn new(
        start: usize,
        removed_text: impl Into<String>,
        inserted_text: impl Into<String>,
    ) -> Self {
        let removed_text = removed_text.into();
        let inserted_text = inserted_text.into();
        Self {
            start,
            old_len: removed_text.chars().count(),
            new_len: inserted_text.chars().count(),
            removed_text,
            inserted_text,
        }
    }

    /// Pure insertion at `start`.
    pub fn insert(start: usize, text: impl Into<String>) -> Self {
        Self::new(start, String::new(), text)
    }

    /// Pure removal of `removed_text`, which must currently sit at `start`.
    pub fn remove(start: usize, removed_text: impl Into<String>) -> Self {
        Self::new(start, removed_text, String::new())
    }

    /// Exclusive end offset of the removed range in the pre-edit document.
    pub fn old_end(&self) -> usize {
        self.start.saturating_add(self.old_len)
    }

    /// Signed change in document length.
    pub fn len_change(&self) -> isize {
        self.new_len as isize - self.old_len as isize
    }

    /// Returns `true` if the declared lengths match the carried texts.
    pub fn lengths_match(&self) -> bool {
        self.removed_text.chars().count() == self.old_len
            && self.inserted_text.chars().count() == self.new_len
    }

    /// Returns `true` if either side of the edit contains an explicit line break.
    pub fn touches_line_break(&self) -> bool {
        self.removed_text.contains('\n') || self.inserted_text.contains('\n')
    }

    /// Returns `true` if the delta neither removes nor inserts anything.
    pub fn is_noop(&self) -> bool {
        self.old_len == 0 && self.new_len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths_are_counted_in_chars() {
        let delta = EditDelta::new(3, "你好", "abc");
        assert_eq!(delta.old_len, 2);
        assert_eq!(delta.new_len, 3);
        assert_eq!(delta.old_end(), 5);
        assert_eq!(delta.len_change(), 1);
        assert!(delta.lengths_match());
    }

    #[test]
    fn test_mismatched_lengths_are_detected() {
        let mut delta = EditDelta::insert(0, "xy");
        delta.new_len = 1;
        assert!(!delta.lengths_match());
    }

    #[test]
    fn test_line_break_detection() {
        assert!(EditDelta::insert(0, "a\nb").touches_line_break());
        assert!(EditDelta::remove(0, "\n").touches_line_break());
        assert!(!EditDelta::new(0, "ab", "cd").touches_line_break());
        assert!(EditDelta::new(4, "", "").is_noop());
    }
}
