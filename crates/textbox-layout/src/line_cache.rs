//! Wrapped-line caches.
//!
//! - [`LineCache`]: sparse map of line index to [`WrappedLine`], filled lazily around the
//!   requested window by walking forward from the closest anchor (checkpoint or cached line).
//! - [`FlatLayout`]: fully materialized line list for the no-wrap mode, patched in place by the
//!   no-wrap fast edit path.

use std::collections::BTreeMap;

use tracing::trace;

use crate::checkpoint::{Checkpoint, CheckpointIndex};
use crate::layout::{LineRealizer, WrappedLine};
use crate::metrics::GlyphMetrics;

/// Chars per line assumed before any line has been realized.
const INITIAL_CHARS_PER_LINE: f64 = 80.0;

/// Total number of wrapped lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCount {
    /// Realization reached the end of the buffer; the count is final.
    Exact(usize),
    /// Running estimate extrapolated from the lines realized so far.
    Estimated(usize),
}

impl LineCount {
    /// The count, exact or estimated.
    pub fn value(self) -> usize {
        match self {
            LineCount::Exact(count) | LineCount::Estimated(count) => count,
        }
    }

    /// Returns `true` once the count is final.
    pub fn is_exact(self) -> bool {
        matches!(self, LineCount::Exact(_))
    }
}

/// Sparse cache of realized lines.
///
/// Every cached line is valid for the current text: edits drop the cache from the first
/// affected line onwards, and trims drop lines outside a window.
#[derive(Debug, Clone)]
pub struct LineCache {
    lines: BTreeMap<usize, WrappedLine>,
    count: LineCount,
    max_width: f32,
    chars_per_line: f64,
}

impl LineCache {
    /// Create an empty cache for a buffer of `text_len` chars.
    pub fn new(text_len: usize) -> Self {
        let mut cache = Self {
            lines: BTreeMap::new(),
            count: LineCount::Exact(1),
            max_width: 0.0,
            chars_per_line: INITIAL_CHARS_PER_LINE,
        };
        cache.reset(text_len);
        cache
    }

    /// Drop every cached line and restart the count estimate for `text_len` chars.
    pub fn reset(&mut self, text_len: usize) {
        self.lines.clear();
        self.max_width = 0.0;
        self.count = if text_len == 0 {
            LineCount::Exact(1)
        } else {
            LineCount::Estimated(self.estimate_for(text_len).max(1))
        };
    }

    /// Number of cached lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if no line is cached.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Cached line at `index`, without realizing anything.
    pub fn get(&self, index: usize) -> Option<WrappedLine> {
        self.lines.get(&index).copied()
    }

    /// Returns `true` if line `index` is cached.
    pub fn contains(&self, index: usize) -> bool {
        self.lines.contains_key(&index)
    }

    /// Cached lines with index in `[first, last]`, in order.
    pub fn cached(&self, first: usize, last: usize) -> impl Iterator<Item = (usize, WrappedLine)> {
        self.lines
            .range(first..)
            .take_while(move |&(&index, _)| index <= last)
            .map(|(&index, &line)| (index, line))
    }

    /// Total line count.
    pub fn line_count(&self) -> LineCount {
        self.count
    }

    /// Widest line realized since the last reset.
    pub fn max_width(&self) -> f32 {
        self.max_width
    }

    /// Average characters per line observed so far.
    pub fn chars_per_line(&self) -> f64 {
        self.chars_per_line
    }

    /// Make sure lines `[first, last]` are cached (clamped to the end of the buffer) and return
    /// line `first`.
    ///
    /// Realization resumes from the closest checkpoint or cached line at or before `first`.
    /// Lines walked on the way to `first` only feed checkpoints; just the window is cached.
    pub fn ensure_range<M: GlyphMetrics + ?Sized>(
        &mut self,
        realizer: &LineRealizer<'_, M>,
        checkpoints: &mut CheckpointIndex,
        interval: usize,
        first: usize,
        last: usize,
    ) -> Option<WrappedLine> {
        if let LineCount::Exact(count) = self.count
            && first >= count
        {
            return None;
        }
        let last = last.max(first);
        let last_known = match self.count {
            LineCount::Exact(count) => last.min(count - 1),
            LineCount::Estimated(_) => last,
        };
        if self.lines.contains_key(&first) && self.lines.contains_key(&last_known) {
            return self.get(first);
        }

        let mut anchor = checkpoints.find_for_line(first);
        if let Some((&index, line)) = self.lines.range(..=first).next_back()
            && index > anchor.line
        {
            anchor = Checkpoint::new(index, line.start);
        }

        let trail = (last - first).saturating_add(1);
        self.walk(realizer, checkpoints, interval, anchor, trail, |index, _| index >= last);
        self.get(first)
    }

    /// Find the line containing `offset` (clamped to the buffer).
    ///
    /// Walks forward from the closest checkpoint at or before `offset`. At most `interval` of the
    /// walked lines stay cached.
    pub fn locate<M: GlyphMetrics + ?Sized>(
        &mut self,
        realizer: &LineRealizer<'_, M>,
        checkpoints: &mut CheckpointIndex,
        interval: usize,
        offset: usize,
    ) -> Option<(usize, WrappedLine)> {
        let text_len = realizer.snapshot().len();
        let offset = offset.min(text_len);
        let anchor = checkpoints.find_for_offset(offset);
        self.walk(realizer, checkpoints, interval, anchor, interval, |_, line| {
            line.contains_offset(offset, text_len)
        })
    }

    /// Drop every cached line with index `>= line`; the count becomes an estimate again.
    pub fn invalidate_from(&mut self, line: usize) {
        let _ = self.lines.split_off(&line);
        self.count = LineCount::Estimated(self.count.value().max(line + 1));
    }

    /// Shift the estimate by the lines `len_change` chars are expected to add or remove.
    pub fn adjust_estimate(&mut self, first_dirty: usize, len_change: isize) {
        let lines = len_change as f64 / self.chars_per_line.max(1.0);
        let estimate = (self.count.value() as f64 + lines).round().max(0.0) as usize;
        self.count = LineCount::Estimated(estimate.max(first_dirty + 1));
    }

    /// Drop cached lines outside `[keep_start, keep_end]`. Returns how many were removed.
    pub fn trim(&mut self, keep_start: usize, keep_end: usize) -> usize {
        let before = self.lines.len();
        let mut kept = self.lines.split_off(&keep_start);
        let _ = kept.split_off(&keep_end.saturating_add(1));
        self.lines = kept;
        let removed = before - self.lines.len();
        if removed > 0 {
            trace!(
                target: "textbox_layout::line_cache",
                removed,
                keep_start,
                keep_end,
                "trimmed line cache"
            );
        }
        removed
    }

    /// Realize forward from `anchor` until `done`. Only the last `trail` walked lines stay
    /// cached, so a deep first request never fills the map with every line before it.
    fn walk<M: GlyphMetrics + ?Sized>(
        &mut self,
        realizer: &LineRealizer<'_, M>,
        checkpoints: &mut CheckpointIndex,
        interval: usize,
        anchor: Checkpoint,
        trail: usize,
        mut done: impl FnMut(usize, &WrappedLine) -> bool,
    ) -> Option<(usize, WrappedLine)> {
        let text_len = realizer.snapshot().len();
        let interval = interval.max(1);
        let trail = trail.max(1);
        let mut index = anchor.line;
        let mut start = anchor.offset;

        let found = loop {
            let line = match self.lines.get(&index).copied() {
                Some(cached) if cached.start == start => cached,
                stale => {
                    if stale.is_some() {
                        let _ = self.lines.split_off(&index);
                    }
                    let Some(line) = realizer.realize(start) else {
                        break None;
                    };
                    self.lines.insert(index, line);
                    self.max_width = self.max_width.max(line.width);
                    line
                }
            };

            if index % interval == 0 {
                checkpoints.add(index, line.start);
            }
            if let Some(evicted) = index.checked_sub(trail)
                && evicted >= anchor.line
            {
                self.lines.remove(&evicted);
            }
            let last = line.is_last(text_len);
            if last {
                self.lock_count(index + 1, checkpoints);
            }
            if done(index, &line) {
                break Some((index, line));
            }
            if last {
                break None;
            }
            index += 1;
            start = line.next_start();
        };

        self.refresh_estimate(text_len);
        found
    }

    fn lock_count(&mut self, count: usize, checkpoints: &mut CheckpointIndex) {
        self.count = LineCount::Exact(count);
        let _ = self.lines.split_off(&count);
        checkpoints.invalidate_from(count);
    }

    fn refresh_estimate(&mut self, text_len: usize) {
        let Some((&index, line)) = self.lines.last_key_value() else {
            return;
        };
        let covered = line.next_start();
        if covered > 0 {
            self.chars_per_line = covered as f64 / (index + 1) as f64;
        }
        if !self.count.is_exact() {
            self.count = LineCount::Estimated(self.estimate_for(text_len).max(index + 2));
        }
    }

    fn estimate_for(&self, text_len: usize) -> usize {
        (text_len as f64 / self.chars_per_line.max(1.0)).ceil() as usize
    }
}

/// Materialized layout of every paragraph as one line (no-wrap mode).
#[derive(Debug, Clone, Default)]
pub struct FlatLayout {
    lines: Vec<WrappedLine>,
    has_tab: Vec<bool>,
    max_width: f32,
}

impl FlatLayout {
    /// Realize every line from offset 0.
    pub fn build<M: GlyphMetrics + ?Sized>(realizer: &LineRealizer<'_, M>) -> Self {
        let snapshot = realizer.snapshot();
        let mut layout = Self::default();
        for line in realizer.lines_from(0) {
            layout.max_width = layout.max_width.max(line.width);
            layout
                .has_tab
                .push(snapshot.chars_from(line.start).take(line.len).any(|ch| ch == '\t'));
            layout.lines.push(line);
        }
        layout
    }

    /// All lines, in order.
    pub fn lines(&self) -> &[WrappedLine] {
        &self.lines
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if the layout has no lines (never the case once built).
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line at `index`.
    pub fn get(&self, index: usize) -> Option<WrappedLine> {
        self.lines.get(index).copied()
    }

    /// Returns `true` if line `index` contains a tab.
    pub fn has_tab(&self, index: usize) -> bool {
        self.has_tab.get(index).copied().unwrap_or(false)
    }

    /// Widest line.
    pub fn max_width(&self) -> f32 {
        self.max_width
    }

    /// Index of the line containing `offset`.
    pub fn line_for_offset(&self, offset: usize) -> usize {
        self.lines
            .partition_point(|line| line.start <= offset)
            .saturating_sub(1)
    }

    /// Replace line `index`'s length and width, and shift every later line by `shift` chars.
    pub(crate) fn patch_line(
        &mut self,
        index: usize,
        len: usize,
        width: f32,
        has_tab: bool,
        shift: isize,
    ) {
        let Some(line) = self.lines.get_mut(index) else {
            return;
        };
        let old_width = line.width;
        line.len = len;
        line.width = width;
        if let Some(flag) = self.has_tab.get_mut(index) {
            *flag = has_tab;
        }

        if shift != 0 {
            for line in &mut self.lines[index + 1..] {
                line.start = line.start.saturating_add_signed(shift);
            }
        }

        if width >= self.max_width {
            self.max_width = width;
        } else if old_width >= self.max_width {
            self.max_width = self.lines.iter().map(|line| line.width).fold(0.0, f32::max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::WrapMode;
    use crate::metrics::MonospaceMetrics;
    use crate::storage::TextSnapshot;

    fn realizer<'a>(
        snapshot: &'a TextSnapshot,
        metrics: &'a MonospaceMetrics,
        width: f32,
    ) -> LineRealizer<'a, MonospaceMetrics> {
        LineRealizer::new(snapshot, metrics, width, WrapMode::Char, 4)
    }

    fn paragraphs(count: usize) -> String {
        (0..count)
            .map(|i| format!("line {i:04}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_ensure_range_caches_and_writes_checkpoints() {
        let snapshot = TextSnapshot::from_text("a\nb\nc\nd\ne");
        let metrics = MonospaceMetrics::cells();
        let realizer = realizer(&snapshot, &metrics, 10.0);
        let mut checkpoints = CheckpointIndex::new();
        let mut cache = LineCache::new(snapshot.len());

        let first = cache.ensure_range(&realizer, &mut checkpoints, 2, 0, 10);
        assert_eq!(first.map(|line| line.start), Some(0));
        assert_eq!(cache.line_count(), LineCount::Exact(5));
        assert_eq!(cache.len(), 5);
        let lines: Vec<usize> = checkpoints.entries().iter().map(|c| c.line).collect();
        assert_eq!(lines, vec![0, 2, 4]);

        assert!(cache.ensure_range(&realizer, &mut checkpoints, 2, 5, 6).is_none());
    }

    #[test]
    fn test_estimate_before_end_is_reached() {
        let text = paragraphs(1000);
        let snapshot = TextSnapshot::from_text(&text);
        let metrics = MonospaceMetrics::cells();
        let realizer = realizer(&snapshot, &metrics, 100.0);
        let mut checkpoints = CheckpointIndex::new();
        let mut cache = LineCache::new(snapshot.len());

        cache.ensure_range(&realizer, &mut checkpoints, 128, 0, 99);
        assert_eq!(cache.line_count(), LineCount::Estimated(1000));
        assert_eq!(cache.chars_per_line(), 10.0);
    }

    #[test]
    fn test_resumed_realization_matches_single_pass() {
        let text = paragraphs(300);
        let snapshot = TextSnapshot::from_text(&text);
        let metrics = MonospaceMetrics::cells();
        let realizer = realizer(&snapshot, &metrics, 4.0);
        let expected: Vec<WrappedLine> = realizer.lines_from(0).collect();

        let mut checkpoints = CheckpointIndex::new();
        let mut cache = LineCache::new(snapshot.len());
        cache.ensure_range(&realizer, &mut checkpoints, 16, 0, 200);
        cache.trim(150, 200);
        cache.ensure_range(&realizer, &mut checkpoints, 16, 500, 520);

        for (index, line) in cache.cached(0, usize::MAX) {
            assert_eq!(line, expected[index], "line {index}");
        }
        assert!(!cache.contains(0));
        assert!(cache.contains(510));
    }

    #[test]
    fn test_deep_request_caches_only_the_window() {
        let snapshot = TextSnapshot::from_text(&"0123456789\n".repeat(20_000));
        let metrics = MonospaceMetrics::cells();
        let realizer = realizer(&snapshot, &metrics, 100.0);
        let mut checkpoints = CheckpointIndex::new();
        let mut cache = LineCache::new(snapshot.len());

        let line = cache.ensure_range(&realizer, &mut checkpoints, 128, 19_000, 19_010);
        assert_eq!(line.map(|line| line.start), Some(19_000 * 11));
        assert_eq!(cache.len(), 11);
        assert!(cache.contains(19_000) && cache.contains(19_010));
        assert!(!cache.contains(18_999));
        // Checkpoints are still written along the way.
        assert_eq!(checkpoints.find_for_line(18_999).line, 18_944);

        let mut cache = LineCache::new(snapshot.len());
        let mut checkpoints = CheckpointIndex::new();
        let found = cache.locate(&realizer, &mut checkpoints, 128, 15_000 * 11 + 3);
        assert_eq!(found.map(|(index, _)| index), Some(15_000));
        assert!(cache.len() <= 128);
        assert!(cache.contains(15_000));
    }

    #[test]
    fn test_locate_uses_soft_wrap_boundaries() {
        let snapshot = TextSnapshot::from_text("abcdef\ngh");
        let metrics = MonospaceMetrics::cells();
        let realizer = realizer(&snapshot, &metrics, 3.0);
        let mut checkpoints = CheckpointIndex::new();
        let mut cache = LineCache::new(snapshot.len());

        let locate = |cache: &mut LineCache, checkpoints: &mut CheckpointIndex, offset| {
            cache
                .locate(&realizer, checkpoints, 128, offset)
                .map(|(index, _)| index)
        };
        assert_eq!(locate(&mut cache, &mut checkpoints, 2), Some(0));
        assert_eq!(locate(&mut cache, &mut checkpoints, 3), Some(1));
        assert_eq!(locate(&mut cache, &mut checkpoints, 6), Some(1));
        assert_eq!(locate(&mut cache, &mut checkpoints, 7), Some(2));
        assert_eq!(locate(&mut cache, &mut checkpoints, 9), Some(2));
        assert_eq!(locate(&mut cache, &mut checkpoints, 99), Some(2));
    }

    #[test]
    fn test_exact_count_drops_checkpoints_past_the_end() {
        let snapshot = TextSnapshot::from_text("a\nb\nc");
        let metrics = MonospaceMetrics::cells();
        let realizer = realizer(&snapshot, &metrics, 10.0);
        let mut checkpoints = CheckpointIndex::new();
        checkpoints.add(7, 100);
        let mut cache = LineCache::new(snapshot.len());

        cache.ensure_range(&realizer, &mut checkpoints, 128, 0, 0);
        cache.ensure_range(&realizer, &mut checkpoints, 128, 1, 10);
        assert_eq!(cache.line_count(), LineCount::Exact(3));
        assert!(checkpoints.entries().iter().all(|c| c.line < 3));
    }

    #[test]
    fn test_invalidate_and_adjust_estimate() {
        let snapshot = TextSnapshot::from_text(&paragraphs(10));
        let metrics = MonospaceMetrics::cells();
        let realizer = realizer(&snapshot, &metrics, 100.0);
        let mut checkpoints = CheckpointIndex::new();
        let mut cache = LineCache::new(snapshot.len());
        cache.ensure_range(&realizer, &mut checkpoints, 128, 0, 20);
        assert_eq!(cache.line_count(), LineCount::Exact(10));

        cache.invalidate_from(4);
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.line_count(), LineCount::Estimated(10));

        cache.adjust_estimate(4, 20);
        assert_eq!(cache.line_count(), LineCount::Estimated(12));
        cache.adjust_estimate(4, -200);
        assert_eq!(cache.line_count(), LineCount::Estimated(5));
    }

    #[test]
    fn test_trim_keeps_window() {
        let snapshot = TextSnapshot::from_text(&paragraphs(100));
        let metrics = MonospaceMetrics::cells();
        let realizer = realizer(&snapshot, &metrics, 100.0);
        let mut checkpoints = CheckpointIndex::new();
        let mut cache = LineCache::new(snapshot.len());
        cache.ensure_range(&realizer, &mut checkpoints, 128, 0, 99);

        assert_eq!(cache.trim(40, 59), 80);
        assert_eq!(cache.len(), 20);
        assert!(cache.contains(40) && cache.contains(59));
        assert!(!cache.contains(39) && !cache.contains(60));
        assert_eq!(cache.trim(0, usize::MAX), 0);
    }

    #[test]
    fn test_empty_buffer_has_one_exact_line() {
        let cache = LineCache::new(0);
        assert_eq!(cache.line_count(), LineCount::Exact(1));
    }

    #[test]
    fn test_flat_layout_patch_shifts_following_lines() {
        let snapshot = TextSnapshot::from_text("abc\nlonger line\nx\t");
        let metrics = MonospaceMetrics::cells();
        let realizer = LineRealizer::new(&snapshot, &metrics, 0.0, WrapMode::None, 4);
        let mut flat = FlatLayout::build(&realizer);

        assert_eq!(flat.len(), 3);
        assert_eq!(flat.max_width(), 11.0);
        assert!(flat.has_tab(2));
        assert_eq!(flat.line_for_offset(3), 0);
        assert_eq!(flat.line_for_offset(4), 1);

        flat.patch_line(1, 6, 6.0, false, -5);
        assert_eq!(flat.get(2).map(|line| line.start), Some(11));
        assert_eq!(flat.max_width(), 6.0);

        flat.patch_line(0, 20, 20.0, false, 17);
        assert_eq!(flat.get(1).map(|line| line.start), Some(21));
        assert_eq!(flat.max_width(), 20.0);
    }
}
