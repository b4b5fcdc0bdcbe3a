//! Layout engine facade.
//!
//! [`TextLayoutEngine`] owns the snapshot and every layout cache. Hosts feed it text
//! ([`set_text`](TextLayoutEngine::set_text), [`on_edit`](TextLayoutEngine::on_edit)) and query
//! it for layout passes, individual lines and hit-testing. All calls run to completion on the
//! caller's thread.

use tracing::debug;

use crate::checkpoint::CheckpointIndex;
use crate::config::LayoutConfig;
use crate::geometry::{GeometryCaches, measure_prefix_widths, nearest_boundary};
use crate::hint::CaretLineHint;
use crate::layout::{LineRealizer, WrapMode, WrappedLine};
use crate::line_cache::{FlatLayout, LineCache, LineCount};
use crate::metrics::{GlyphMetrics, MonospaceMetrics};
use crate::storage::TextSnapshot;

/// Result of a layout pass.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutResult {
    /// Every line, in order (no-wrap mode, or a small document).
    Materialized {
        /// All wrapped lines.
        lines: Vec<WrappedLine>,
        /// Width of the widest line.
        max_width: f32,
    },
    /// Only the line count; lines are fetched with [`TextLayoutEngine::get_line`].
    Virtualized {
        /// Total line count, exact once realization reached the end of the buffer.
        line_count: LineCount,
        /// Widest line realized so far.
        max_width: f32,
    },
}

impl LayoutResult {
    /// Number of lines (possibly estimated).
    pub fn line_count(&self) -> usize {
        match self {
            LayoutResult::Materialized { lines, .. } => lines.len(),
            LayoutResult::Virtualized { line_count, .. } => line_count.value(),
        }
    }

    /// Width of the widest known line.
    pub fn max_width(&self) -> f32 {
        match self {
            LayoutResult::Materialized { max_width, .. }
            | LayoutResult::Virtualized { max_width, .. } => *max_width,
        }
    }

    /// Returns `true` for [`LayoutResult::Virtualized`].
    pub fn is_virtualized(&self) -> bool {
        matches!(self, LayoutResult::Virtualized { .. })
    }
}

/// Engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutStats {
    /// Edits handled by the no-wrap fast path.
    pub no_wrap_fast: u64,
    /// Edits handled by the virtual incremental path.
    pub virtual_incremental: u64,
    /// Edits that forced a full rebuild.
    pub full_rebuilds: u64,
    /// Deltas the snapshot rejected (stale, malformed or out of range).
    pub rejected_deltas: u64,
    /// Offset lookups answered by the caret hint.
    pub hint_hits: u64,
    /// Offset lookups answered by probing next to the caret hint.
    pub hint_probe_hits: u64,
    /// Offset lookups that fell back to a checkpoint walk.
    pub hint_misses: u64,
    /// Line cache trims.
    pub cache_trims: u64,
}

/// Incremental, virtualized text layout over a piece-table snapshot.
#[derive(Debug)]
pub struct TextLayoutEngine<M = MonospaceMetrics> {
    pub(crate) snapshot: TextSnapshot,
    pub(crate) metrics: M,
    pub(crate) config: LayoutConfig,
    pub(crate) checkpoints: CheckpointIndex,
    pub(crate) lines: LineCache,
    pub(crate) geometry: GeometryCaches,
    pub(crate) flat: Option<FlatLayout>,
    pub(crate) hint: Option<CaretLineHint>,
    pub(crate) viewport_width: f32,
    pub(crate) version: u64,
    pub(crate) stats: LayoutStats,
    first_visible: usize,
}

impl Default for TextLayoutEngine<MonospaceMetrics> {
    fn default() -> Self {
        Self::new(MonospaceMetrics::default())
    }
}

impl<M: GlyphMetrics> TextLayoutEngine<M> {
    /// Create an empty engine with the default configuration.
    pub fn new(metrics: M) -> Self {
        Self::with_config(metrics, LayoutConfig::default())
    }

    /// Create an empty engine.
    pub fn with_config(metrics: M, config: LayoutConfig) -> Self {
        let mut snapshot = TextSnapshot::new();
        snapshot.set_compact_threshold(config.compact_threshold);
        Self {
            snapshot,
            metrics,
            config,
            checkpoints: CheckpointIndex::new(),
            lines: LineCache::new(0),
            geometry: GeometryCaches::new(),
            flat: None,
            hint: None,
            viewport_width: 0.0,
            version: 0,
            stats: LayoutStats::default(),
            first_visible: 0,
        }
    }

    /// Replace the whole text. Drops every layout cache.
    pub fn set_text(&mut self, text: &str) {
        self.snapshot.set_text(text);
        self.version += 1;
        self.reset_layout("set_text");
    }

    /// Full text.
    pub fn text(&self) -> String {
        self.snapshot.text()
    }

    /// Text length in characters.
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    /// Returns `true` if the text is empty.
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// The underlying snapshot.
    pub fn snapshot(&self) -> &TextSnapshot {
        &self.snapshot
    }

    /// Text in `[start, start + len)`, clamped to the buffer.
    pub fn build_range_text(&self, start: usize, len: usize) -> String {
        self.snapshot.build_range_text(start, len)
    }

    /// Incremented on every text change.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Current configuration.
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Replace the configuration. Layout caches are reset if the wrap mode or tab size changed.
    pub fn set_config(&mut self, config: LayoutConfig) {
        let relayout =
            config.wrap_mode != self.config.wrap_mode || config.tab_size != self.config.tab_size;
        self.snapshot.set_compact_threshold(config.compact_threshold);
        self.config = config;
        if relayout {
            self.reset_layout("config");
        }
    }

    /// Change the wrap mode.
    pub fn set_wrap_mode(&mut self, wrap_mode: WrapMode) {
        if self.config.wrap_mode != wrap_mode {
            self.config.wrap_mode = wrap_mode;
            self.reset_layout("wrap mode");
        }
    }

    /// Change the tab size (clamped to at least 1).
    pub fn set_tab_size(&mut self, tab_size: usize) {
        let tab_size = tab_size.max(1);
        if self.config.tab_size != tab_size {
            self.config.tab_size = tab_size;
            self.reset_layout("tab size");
        }
    }

    /// Glyph metrics in use.
    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Switch metrics (font change). Drops every layout cache.
    pub fn set_metrics(&mut self, metrics: M) {
        self.metrics = metrics;
        self.reset_layout("metrics");
    }

    /// Current viewport width.
    pub fn viewport_width(&self) -> f32 {
        self.viewport_width
    }

    /// Resize the viewport. Wrapped layouts are reset when the width changes.
    pub fn set_viewport_width(&mut self, width: f32) {
        if self.viewport_width == width {
            return;
        }
        self.viewport_width = width;
        if self.config.wraps() {
            self.reset_layout("viewport width");
        }
    }

    /// First line of the scroll window.
    pub fn first_visible_line(&self) -> usize {
        self.first_visible
    }

    /// Scroll so that `line` is the first visible line.
    pub fn scroll_to_line(&mut self, line: usize) {
        self.first_visible = match self.line_count() {
            LineCount::Exact(count) => line.min(count.saturating_sub(1)),
            LineCount::Estimated(_) => line,
        };
    }

    /// Engine counters.
    pub fn stats(&self) -> LayoutStats {
        self.stats
    }

    /// Checkpoint table.
    pub fn checkpoints(&self) -> &CheckpointIndex {
        &self.checkpoints
    }

    /// Number of lines held by the sparse line cache.
    pub fn cached_line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if line `index` is available without realization.
    pub fn is_line_cached(&self, index: usize) -> bool {
        match (&self.flat, self.config.wraps()) {
            (Some(flat), false) => index < flat.len(),
            _ => self.lines.contains(index),
        }
    }

    /// Total line count (exact or estimated).
    pub fn line_count(&self) -> LineCount {
        match (&self.flat, self.config.wraps()) {
            (Some(flat), false) => LineCount::Exact(flat.len()),
            _ => self.lines.line_count(),
        }
    }

    /// Run a layout pass for a `width` x `height` viewport.
    ///
    /// No-wrap mode and documents of at most `small_document_chars` chars are materialized.
    /// Larger wrapped documents realize the scroll window plus `realize_window` lines and report
    /// only the line count.
    pub fn layout(&mut self, width: f32, height: f32) -> LayoutResult {
        self.set_viewport_width(width);

        if !self.config.wraps() {
            let flat = self.flat_layout();
            return LayoutResult::Materialized {
                lines: flat.lines().to_vec(),
                max_width: flat.max_width(),
            };
        }

        if self.snapshot.len() <= self.config.small_document_chars {
            let realizer = self.realizer();
            let lines: Vec<WrappedLine> = realizer.lines_from(0).collect();
            let max_width = lines.iter().map(|line| line.width).fold(0.0, f32::max);
            return LayoutResult::Materialized { lines, max_width };
        }

        let line_height = self.metrics.line_height();
        let visible = if line_height > 0.0 && height > 0.0 {
            (height / line_height).ceil() as usize
        } else {
            1
        };
        let span = visible.saturating_add(self.config.realize_window);
        if self
            .ensure_lines(self.first_visible, self.first_visible.saturating_add(span))
            .is_none()
        {
            // Scrolled past the end; the count is exact now.
            self.first_visible = self.lines.line_count().value().saturating_sub(1);
            self.ensure_lines(self.first_visible, self.first_visible.saturating_add(span));
        }

        LayoutResult::Virtualized {
            line_count: self.lines.line_count(),
            max_width: self.lines.max_width(),
        }
    }

    /// Line `index`, realizing it (and `realize_window` lines after it) on a cache miss.
    ///
    /// Returns `None` past the last line.
    pub fn get_line(&mut self, index: usize) -> Option<WrappedLine> {
        if !self.config.wraps() {
            return self.flat_layout().get(index);
        }
        if let Some(line) = self.lines.get(index) {
            return Some(line);
        }
        self.ensure_lines(index, index.saturating_add(self.config.realize_window))
    }

    /// Index of the line containing `offset` (clamped to the buffer).
    ///
    /// Tries the caret hint, then a few neighbouring lines, then a checkpoint walk.
    pub fn find_line_for_offset(&mut self, offset: usize) -> usize {
        let text_len = self.snapshot.len();
        let offset = offset.min(text_len);

        if !self.config.wraps() {
            return self.flat_layout().line_for_offset(offset);
        }

        if let Some(hint) = self.hint {
            if hint.covers(offset)
                && let Some(line) = self.get_line(hint.line)
                && line.contains_offset(offset, text_len)
            {
                self.stats.hint_hits += 1;
                self.hint = Some(CaretLineHint::new(hint.line, &line, text_len));
                return hint.line;
            }
            for index in hint.probe_lines(offset, self.config.hint_probe_lines) {
                let Some(line) = self.get_line(index) else {
                    break;
                };
                if line.contains_offset(offset, text_len) {
                    self.stats.hint_probe_hits += 1;
                    self.hint = Some(CaretLineHint::new(index, &line, text_len));
                    return index;
                }
            }
        }

        self.stats.hint_misses += 1;
        let realizer = realizer_for(
            &self.snapshot,
            &self.metrics,
            &self.config,
            self.viewport_width,
        );
        let (index, line) = self
            .lines
            .locate(
                &realizer,
                &mut self.checkpoints,
                self.config.checkpoint_interval,
                offset,
            )
            .unwrap_or_default();
        self.trim_around(index, index.saturating_add(self.config.realize_window));
        self.hint = Some(CaretLineHint::new(index, &line, text_len));
        index
    }

    /// Text of line `index` (without its `'\n'`).
    pub fn line_text(&mut self, index: usize) -> Option<&str> {
        let line = self.get_line(index)?;
        self.bound_geometry(index);
        let snapshot = &self.snapshot;
        Some(
            self.geometry
                .line_text_with(index, || snapshot.build_range_text(line.start, line.len)),
        )
    }

    /// Caret x positions of line `index`; one more entry than the line has chars.
    pub fn prefix_widths(&mut self, index: usize) -> Option<&[f32]> {
        let line = self.get_line(index)?;
        self.bound_geometry(index);
        let snapshot = &self.snapshot;
        let metrics = &self.metrics;
        let tab_size = self.config.tab_size;
        Some(self.geometry.prefix_widths_with(index, || {
            measure_prefix_widths(
                metrics,
                snapshot.chars_from(line.start).take(line.len),
                tab_size,
            )
        }))
    }

    /// Caret offset nearest to `x` on line `index`. Past the last line, the end of the buffer.
    pub fn hit_test(&mut self, index: usize, x: f32) -> usize {
        let Some(line) = self.get_line(index) else {
            return self.snapshot.len();
        };
        let boundary = self
            .prefix_widths(index)
            .map_or(0, |widths| nearest_boundary(widths, x));
        line.start + boundary
    }

    /// Caret offset nearest to the point `(x, y)`, with `y` measured from the top of line 0.
    pub fn hit_test_point(&mut self, x: f32, y: f32) -> usize {
        let line_height = self.metrics.line_height();
        let mut index = if line_height > 0.0 && y > 0.0 {
            (y / line_height).floor() as usize
        } else {
            0
        };
        if self.get_line(index).is_none() {
            index = self.line_count().value().saturating_sub(1);
        }
        self.hit_test(index, x)
    }

    /// Line index and x position of a caret at `offset`.
    pub fn caret_position(&mut self, offset: usize) -> (usize, f32) {
        let offset = offset.min(self.snapshot.len());
        let index = self.find_line_for_offset(offset);
        let Some(line) = self.get_line(index) else {
            return (index, 0.0);
        };
        let column = offset.saturating_sub(line.start).min(line.len);
        let x = self
            .prefix_widths(index)
            .and_then(|widths| widths.get(column).copied())
            .unwrap_or(0.0);
        (index, x)
    }

    /// Drop every layout cache and checkpoint; the snapshot is kept.
    pub(crate) fn reset_layout(&mut self, reason: &'static str) {
        self.checkpoints.reset();
        self.lines.reset(self.snapshot.len());
        self.geometry.clear();
        self.flat = None;
        self.hint = None;
        debug!(
            target: "textbox_layout::engine",
            reason,
            len = self.snapshot.len(),
            "layout caches reset"
        );
    }

    pub(crate) fn realizer(&self) -> LineRealizer<'_, M> {
        realizer_for(
            &self.snapshot,
            &self.metrics,
            &self.config,
            self.viewport_width,
        )
    }

    fn flat_layout(&mut self) -> &FlatLayout {
        let snapshot = &self.snapshot;
        let metrics = &self.metrics;
        let config = &self.config;
        let width = self.viewport_width;
        self.flat.get_or_insert_with(|| {
            FlatLayout::build(&realizer_for(snapshot, metrics, config, width))
        })
    }

    fn ensure_lines(&mut self, first: usize, last: usize) -> Option<WrappedLine> {
        let realizer = realizer_for(
            &self.snapshot,
            &self.metrics,
            &self.config,
            self.viewport_width,
        );
        let line = self.lines.ensure_range(
            &realizer,
            &mut self.checkpoints,
            self.config.checkpoint_interval,
            first,
            last,
        );
        self.trim_around(first, last);
        line
    }

    // The flat no-wrap layout never trims, so geometry needs its own bound.
    fn bound_geometry(&mut self, index: usize) {
        let held = self.geometry.prefix_len().max(self.geometry.text_len());
        if held <= self.config.cache_trim_threshold || self.geometry.contains(index) {
            return;
        }
        let pad = self.config.cache_pad;
        self.geometry
            .retain_range(index.saturating_sub(pad), index.saturating_add(pad));
        self.stats.cache_trims += 1;
    }

    fn trim_around(&mut self, first: usize, last: usize) {
        if self.lines.len() <= self.config.cache_trim_threshold {
            return;
        }
        let keep_start = first.saturating_sub(self.config.cache_pad);
        let keep_end = last.saturating_add(self.config.cache_pad);
        if self.lines.trim(keep_start, keep_end) > 0 {
            self.geometry.retain_range(keep_start, keep_end);
            self.stats.cache_trims += 1;
        }
    }
}

pub(crate) fn realizer_for<'a, M: GlyphMetrics>(
    snapshot: &'a TextSnapshot,
    metrics: &'a M,
    config: &LayoutConfig,
    viewport_width: f32,
) -> LineRealizer<'a, M> {
    LineRealizer::new(
        snapshot,
        metrics,
        viewport_width,
        config.wrap_mode,
        config.tab_size,
    )
}
