//! Sparse wrapped-line checkpoints.
//!
//! A [`CheckpointIndex`] maps a handful of wrapped-line indices to the text offset where that
//! line starts. Line realization resumes from the closest checkpoint instead of from the
//! document start, so a lookup costs O(log checkpoints + lines since the checkpoint).

/// Anchor for resumed realization: wrapped line `line` starts at text offset `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Checkpoint {
    /// Wrapped-line index.
    pub line: usize,
    /// Character offset of the line's first character.
    pub offset: usize,
}

impl Checkpoint {
    /// Create a checkpoint.
    pub fn new(line: usize, offset: usize) -> Self {
        Self { line, offset }
    }
}

/// Sorted table of checkpoints.
///
/// Invariants: entries are strictly increasing in both `line` and `offset`, and the table is
/// never empty (entry 0 is always `(0, 0)`).
#[derive(Debug, Clone)]
pub struct CheckpointIndex {
    entries: Vec<Checkpoint>,
}

impl CheckpointIndex {
    /// Create an index holding only `(0, 0)`.
    pub fn new() -> Self {
        Self {
            entries: vec![Checkpoint::default()],
        }
    }

    /// Clear to the single checkpoint `(0, 0)`.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.entries.push(Checkpoint::default());
    }

    /// Number of checkpoints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; the index keeps its `(0, 0)` anchor.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All checkpoints, sorted.
    pub fn entries(&self) -> &[Checkpoint] {
        &self.entries
    }

    /// Insert a checkpoint, replacing an existing one for the same line.
    ///
    /// Entries that would break offset monotonicity are dropped: they were recorded against text
    /// that no longer exists in that shape.
    pub fn add(&mut self, line: usize, offset: usize) {
        let checkpoint = Checkpoint::new(line, offset);
        match self.entries.binary_search_by_key(&line, |c| c.line) {
            Ok(idx) => self.entries[idx] = checkpoint,
            Err(idx) => self.entries.insert(idx, checkpoint),
        }
        self.restore_monotonicity(line);
    }

    /// Greatest checkpoint with `line <= target`.
    pub fn find_for_line(&self, target: usize) -> Checkpoint {
        let idx = self.entries.partition_point(|c| c.line <= target);
        idx.checked_sub(1)
            .and_then(|idx| self.entries.get(idx))
            .copied()
            .unwrap_or_default()
    }

    /// Greatest checkpoint with `offset <= target`.
    pub fn find_for_offset(&self, target: usize) -> Checkpoint {
        let idx = self.entries.partition_point(|c| c.offset <= target);
        idx.checked_sub(1)
            .and_then(|idx| self.entries.get(idx))
            .copied()
            .unwrap_or_default()
    }

    /// Remove every checkpoint with `line >= target`; re-seeds `(0, 0)` if nothing is left.
    pub fn invalidate_from(&mut self, target: usize) {
        let keep = self.entries.partition_point(|c| c.line < target);
        self.entries.truncate(keep);
        if self.entries.is_empty() {
            self.entries.push(Checkpoint::default());
        }
    }

    fn restore_monotonicity(&mut self, line: usize) {
        let Ok(idx) = self.entries.binary_search_by_key(&line, |c| c.line) else {
            return;
        };
        let offset = self.entries[idx].offset;

        let mut before = idx;
        while before > 0 && self.entries[before - 1].offset >= offset {
            before -= 1;
        }
        let mut after = idx + 1;
        while after < self.entries.len() && self.entries[after].offset <= offset {
            after += 1;
        }

        self.entries.drain(idx + 1..after);
        self.entries.drain(before..idx);
        if self.entries.first().is_none_or(|c| c.line != 0) {
            self.entries.insert(0, Checkpoint::default());
        }
    }
}

impl Default for CheckpointIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(index: &CheckpointIndex) -> Vec<(usize, usize)> {
        index.entries().iter().map(|c| (c.line, c.offset)).collect()
    }

    #[test]
    fn test_new_index_holds_origin() {
        let index = CheckpointIndex::new();
        assert_eq!(lines(&index), vec![(0, 0)]);
        assert_eq!(index.find_for_line(1000), Checkpoint::new(0, 0));
        assert_eq!(index.find_for_offset(1000), Checkpoint::new(0, 0));
    }

    #[test]
    fn test_add_keeps_sorted_order_and_replaces() {
        let mut index = CheckpointIndex::new();
        index.add(256, 4000);
        index.add(128, 2000);
        index.add(384, 6000);
        assert_eq!(lines(&index), vec![(0, 0), (128, 2000), (256, 4000), (384, 6000)]);

        index.add(256, 4100);
        assert_eq!(lines(&index), vec![(0, 0), (128, 2000), (256, 4100), (384, 6000)]);
    }

    #[test]
    fn test_add_drops_entries_that_break_offset_order() {
        let mut index = CheckpointIndex::new();
        index.add(128, 2000);
        index.add(256, 4000);
        index.add(384, 6000);

        // Line 256 now starts after what was recorded for line 384.
        index.add(256, 6500);
        assert_eq!(lines(&index), vec![(0, 0), (128, 2000), (256, 6500)]);

        index.add(300, 1500);
        assert_eq!(lines(&index), vec![(0, 0), (300, 1500)]);
    }

    #[test]
    fn test_find_for_line() {
        let mut index = CheckpointIndex::new();
        index.add(128, 2000);
        index.add(256, 4000);

        assert_eq!(index.find_for_line(0), Checkpoint::new(0, 0));
        assert_eq!(index.find_for_line(127), Checkpoint::new(0, 0));
        assert_eq!(index.find_for_line(128), Checkpoint::new(128, 2000));
        assert_eq!(index.find_for_line(255), Checkpoint::new(128, 2000));
        assert_eq!(index.find_for_line(9999), Checkpoint::new(256, 4000));
    }

    #[test]
    fn test_find_for_offset() {
        let mut index = CheckpointIndex::new();
        index.add(128, 2000);
        index.add(256, 4000);

        assert_eq!(index.find_for_offset(1999), Checkpoint::new(0, 0));
        assert_eq!(index.find_for_offset(2000), Checkpoint::new(128, 2000));
        assert_eq!(index.find_for_offset(3999), Checkpoint::new(128, 2000));
        assert_eq!(index.find_for_offset(4000), Checkpoint::new(256, 4000));
    }

    #[test]
    fn test_invalidate_from() {
        let mut index = CheckpointIndex::new();
        index.add(128, 2000);
        index.add(256, 4000);

        index.invalidate_from(200);
        assert_eq!(lines(&index), vec![(0, 0), (128, 2000)]);

        index.invalidate_from(128);
        assert_eq!(lines(&index), vec![(0, 0)]);

        index.invalidate_from(0);
        assert_eq!(lines(&index), vec![(0, 0)]);
    }

    #[test]
    fn test_reset() {
        let mut index = CheckpointIndex::new();
        index.add(128, 2000);
        index.reset();
        assert_eq!(lines(&index), vec![(0, 0)]);
        assert!(!index.is_empty());
    }
}
