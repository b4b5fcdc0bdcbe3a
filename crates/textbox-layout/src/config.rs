//! Engine configuration.
//!
//! All knobs have defaults matching the reference text-edit control; hosts usually only touch
//! [`LayoutConfig::wrap_mode`] and [`LayoutConfig::tab_size`].

use crate::layout::WrapMode;

/// Default tab size, in multiples of the advance of `' '`.
pub const DEFAULT_TAB_SIZE: usize = 4;

/// A checkpoint is recorded every this many wrapped lines during forward realization.
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 128;

/// The line cache is trimmed once it holds more than this many lines.
pub const DEFAULT_CACHE_TRIM_THRESHOLD: usize = 4096;

/// Lines kept on each side of the requested window when trimming.
pub const DEFAULT_CACHE_PAD: usize = 256;

/// Extra lines realized past a requested line.
pub const DEFAULT_REALIZE_WINDOW: usize = 64;

/// Lines probed forward/backward from the caret hint before falling back to checkpoints.
pub const DEFAULT_HINT_PROBE_LINES: usize = 4;

/// Documents at or below this many characters produce a materialized layout even when wrapping.
pub const DEFAULT_SMALL_DOCUMENT_CHARS: usize = 4096;

/// Snapshot mutations between two compactions of the segment arena.
pub const DEFAULT_COMPACT_THRESHOLD: usize = 1000;

/// Layout engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Soft wrapping mode.
    pub wrap_mode: WrapMode,
    /// Tab stop spacing, in multiples of the advance of `' '`.
    pub tab_size: usize,
    /// Wrapped-line interval between automatic checkpoints.
    pub checkpoint_interval: usize,
    /// Line cache size that triggers a trim.
    pub cache_trim_threshold: usize,
    /// Lines kept around the requested window on trim.
    pub cache_pad: usize,
    /// Lines realized past each requested line.
    pub realize_window: usize,
    /// Caret-hint probe distance.
    pub hint_probe_lines: usize,
    /// Threshold for returning a materialized layout in wrap modes.
    pub small_document_chars: usize,
    /// Snapshot compaction cadence.
    pub compact_threshold: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            wrap_mode: WrapMode::default(),
            tab_size: DEFAULT_TAB_SIZE,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            cache_trim_threshold: DEFAULT_CACHE_TRIM_THRESHOLD,
            cache_pad: DEFAULT_CACHE_PAD,
            realize_window: DEFAULT_REALIZE_WINDOW,
            hint_probe_lines: DEFAULT_HINT_PROBE_LINES,
            small_document_chars: DEFAULT_SMALL_DOCUMENT_CHARS,
            compact_threshold: DEFAULT_COMPACT_THRESHOLD,
        }
    }
}

impl LayoutConfig {
    /// Set the wrap mode.
    pub fn with_wrap_mode(mut self, wrap_mode: WrapMode) -> Self {
        self.wrap_mode = wrap_mode;
        self
    }

    /// Set the tab size (clamped to at least 1).
    pub fn with_tab_size(mut self, tab_size: usize) -> Self {
        self.tab_size = tab_size.max(1);
        self
    }

    /// Set the checkpoint interval (clamped to at least 1).
    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval.max(1);
        self
    }

    /// Set the trim threshold and the pad kept around the requested window.
    pub fn with_cache_limits(mut self, trim_threshold: usize, pad: usize) -> Self {
        self.cache_trim_threshold = trim_threshold.max(1);
        self.cache_pad = pad;
        self
    }

    /// Set how many lines are realized past a requested line.
    pub fn with_realize_window(mut self, window: usize) -> Self {
        self.realize_window = window;
        self
    }

    /// Set the caret-hint probe distance.
    pub fn with_hint_probe_lines(mut self, lines: usize) -> Self {
        self.hint_probe_lines = lines;
        self
    }

    /// Set the materialization threshold for wrapped layouts. `0` always virtualizes.
    pub fn with_small_document_chars(mut self, chars: usize) -> Self {
        self.small_document_chars = chars;
        self
    }

    /// Set the snapshot compaction cadence (clamped to at least 1).
    pub fn with_compact_threshold(mut self, threshold: usize) -> Self {
        self.compact_threshold = threshold.max(1);
        self
    }

    /// Returns `true` if wrapping is enabled.
    pub fn wraps(&self) -> bool {
        self.wrap_mode != WrapMode::None
    }
}
