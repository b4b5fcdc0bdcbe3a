//! Per-line geometry caches used by rendering and hit-testing.
//!
//! Both caches are keyed by wrapped-line index and filled on first access. They follow the line
//! cache: any line the [`crate::LineCache`] invalidates or trims is dropped here as well.

use std::collections::BTreeMap;

use crate::metrics::{GlyphMetrics, advance_at};

/// Prefix-width and line-text caches.
#[derive(Debug, Clone, Default)]
pub struct GeometryCaches {
    prefix_widths: BTreeMap<usize, Vec<f32>>,
    line_text: BTreeMap<usize, String>,
}

impl GeometryCaches {
    /// Create empty caches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix widths of `line`, computing them with `build` on a miss.
    pub fn prefix_widths_with(&mut self, line: usize, build: impl FnOnce() -> Vec<f32>) -> &[f32] {
        self.prefix_widths.entry(line).or_insert_with(build)
    }

    /// Text of `line`, computing it with `build` on a miss.
    pub fn line_text_with(&mut self, line: usize, build: impl FnOnce() -> String) -> &str {
        self.line_text.entry(line).or_insert_with(build)
    }

    /// Returns `true` if either cache holds `line`.
    pub fn contains(&self, line: usize) -> bool {
        self.prefix_widths.contains_key(&line) || self.line_text.contains_key(&line)
    }

    /// Number of lines with cached prefix widths.
    pub fn prefix_len(&self) -> usize {
        self.prefix_widths.len()
    }

    /// Number of lines with cached text.
    pub fn text_len(&self) -> usize {
        self.line_text.len()
    }

    /// Drop every entry with line index `>= line`.
    pub fn invalidate_from(&mut self, line: usize) {
        let _ = self.prefix_widths.split_off(&line);
        let _ = self.line_text.split_off(&line);
    }

    /// Keep only entries with line index in `[start, end]`.
    pub fn retain_range(&mut self, start: usize, end: usize) {
        self.prefix_widths.retain(|&line, _| (start..=end).contains(&line));
        self.line_text.retain(|&line, _| (start..=end).contains(&line));
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.prefix_widths.clear();
        self.line_text.clear();
    }
}

/// Caret x positions for a line: `widths[i]` is the advance before the line's `i`-th char, so
/// the result has one more entry than the line has chars.
pub fn measure_prefix_widths<M: GlyphMetrics + ?Sized>(
    metrics: &M,
    chars: impl IntoIterator<Item = char>,
    tab_size: usize,
) -> Vec<f32> {
    let chars = chars.into_iter();
    let mut widths = Vec::with_capacity(chars.size_hint().0 + 1);
    let mut x = 0.0f32;
    widths.push(x);
    for ch in chars {
        x += advance_at(metrics, ch, x, tab_size);
        widths.push(x);
    }
    widths
}

/// Index of the caret boundary nearest to `x` (ties go to the later boundary).
pub fn nearest_boundary(widths: &[f32], x: f32) -> usize {
    let chars = widths.len().saturating_sub(1);
    (0..chars)
        .find(|&i| x < (widths[i] + widths[i + 1]) / 2.0)
        .unwrap_or(chars)
}
