//! Edit dispatch.
//!
//! Every committed [`EditDelta`] is routed through exactly one path:
//!
//! - **NoWrapFast**: wrapping is off and a flat layout exists. The edited line's length and width
//!   are patched from the removed/inserted substrings and later lines are shifted.
//! - **VirtualIncremental**: the line containing the edit is located (on the pre-edit text),
//!   then earlier soft-wrapped lines whose break looked at the edited text are added. Every
//!   cache is invalidated from the first of them, the delta is applied, and a checkpoint is
//!   re-seeded at that line's start.
//! - **FullRebuild**: the fallback. Caches and checkpoints are reset; if the snapshot rejected
//!   the delta, the text is reloaded from the edit source.
//!
//! Invalidation is always "from the first affected line forward", except on the fallback.

use thiserror::Error;
use tracing::{debug, warn};

use crate::delta::EditDelta;
use crate::engine::{TextLayoutEngine, realizer_for};
use crate::error::DeltaError;
use crate::metrics::{GlyphMetrics, str_advance};

/// Path an edit took through the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPath {
    /// Flat no-wrap layout patched in place.
    NoWrapFast,
    /// Caches invalidated from the first affected line.
    VirtualIncremental,
    /// Every layout cache reset.
    FullRebuild,
}

/// Outcome of [`TextLayoutEngine::on_edit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditReport {
    /// Path taken.
    pub path: EditPath,
    /// First line whose geometry may have changed (`0` after a full rebuild).
    pub first_dirty_line: usize,
}

#[derive(Debug, Error)]
enum Fallback {
    #[error("no flat layout to patch")]
    NoFlatLayout,
    #[error("edit spans a line break")]
    SpansLineBreak,
    #[error("edit crosses the bounds of line {line}")]
    CrossesLine { line: usize },
    #[error("no line contains offset {offset}")]
    Unlocated { offset: usize },
    #[error(transparent)]
    Rejected(#[from] DeltaError),
}

impl<M: GlyphMetrics> TextLayoutEngine<M> {
    /// Apply one committed edit.
    ///
    /// `current_text` is only called when the delta does not match the snapshot; it must
    /// return the edit source's authoritative text after the edit.
    pub fn on_edit<F>(&mut self, delta: &EditDelta, current_text: F) -> EditReport
    where
        F: FnOnce() -> String,
    {
        self.version += 1;

        let attempt = if !self.config.wraps() && self.flat.is_some() {
            self.apply_no_wrap_fast(delta)
                .map(|line| (EditPath::NoWrapFast, line))
        } else {
            self.apply_virtual_incremental(delta)
                .map(|line| (EditPath::VirtualIncremental, line))
        };

        match attempt {
            Ok((path, first_dirty_line)) => {
                match path {
                    EditPath::NoWrapFast => self.stats.no_wrap_fast += 1,
                    _ => self.stats.virtual_incremental += 1,
                }
                debug!(
                    target: "textbox_layout::dispatch",
                    ?path,
                    first_dirty_line,
                    start = delta.start,
                    old_len = delta.old_len,
                    new_len = delta.new_len,
                    "edit applied"
                );
                EditReport {
                    path,
                    first_dirty_line,
                }
            }
            Err(fallback) => self.full_rebuild(delta, fallback, current_text),
        }
    }

    fn apply_no_wrap_fast(&mut self, delta: &EditDelta) -> Result<usize, Fallback> {
        if delta.touches_line_break() {
            return Err(Fallback::SpansLineBreak);
        }
        let flat = self.flat.as_ref().ok_or(Fallback::NoFlatLayout)?;
        let index = flat.line_for_offset(delta.start);
        let line = flat
            .get(index)
            .ok_or(Fallback::CrossesLine { line: index })?;
        if delta.start < line.start || delta.old_end() > line.end() {
            return Err(Fallback::CrossesLine { line: index });
        }
        let had_tab = flat.has_tab(index);

        self.snapshot.try_apply_delta(delta)?;

        let len = line.len - delta.old_len + delta.new_len;
        let tab_size = self.config.tab_size;
        let touches_tab = delta.removed_text.contains('\t') || delta.inserted_text.contains('\t');
        let (width, has_tab) = if had_tab || touches_tab {
            // Tab advances depend on position; measure the whole line.
            let text = self.snapshot.build_range_text(line.start, len);
            (str_advance(&self.metrics, &text, tab_size), text.contains('\t'))
        } else {
            let removed = str_advance(&self.metrics, &delta.removed_text, tab_size);
            let inserted = str_advance(&self.metrics, &delta.inserted_text, tab_size);
            ((line.width - removed + inserted).max(0.0), false)
        };

        if let Some(flat) = self.flat.as_mut() {
            flat.patch_line(index, len, width, has_tab, delta.len_change());
        }
        self.lines.invalidate_from(index);
        self.checkpoints.invalidate_from(index + 1);
        self.geometry.invalidate_from(index);
        self.hint = self.hint.filter(|hint| hint.line < index);
        Ok(index)
    }

    fn apply_virtual_incremental(&mut self, delta: &EditDelta) -> Result<usize, Fallback> {
        let text_len = self.snapshot.len();
        if delta.old_end() > text_len {
            return Err(DeltaError::OutOfRange {
                start: delta.start,
                end: delta.old_end(),
                len: text_len,
            }
            .into());
        }

        let interval = self.config.checkpoint_interval;
        let realizer = realizer_for(
            &self.snapshot,
            &self.metrics,
            &self.config,
            self.viewport_width,
        );
        let (mut index, mut line) = self
            .lines
            .locate(&realizer, &mut self.checkpoints, interval, delta.start)
            .ok_or(Fallback::Unlocated {
                offset: delta.start,
            })?;

        // A soft-wrapped line whose break decision looked at the edited text is dirty too.
        while index > 0 {
            let previous = self.lines.ensure_range(
                &realizer,
                &mut self.checkpoints,
                interval,
                index - 1,
                index - 1,
            );
            match previous {
                Some(previous)
                    if !previous.hard_break && realizer.scan_end(&previous) >= delta.start =>
                {
                    index -= 1;
                    line = previous;
                }
                _ => break,
            }
        }

        self.lines.invalidate_from(index);
        self.geometry.invalidate_from(index);
        self.checkpoints.invalidate_from(index);
        self.snapshot.try_apply_delta(delta)?;

        self.checkpoints.add(index, line.start);
        self.lines.adjust_estimate(index, delta.len_change());
        self.hint = self.hint.filter(|hint| hint.line < index);
        Ok(index)
    }

    fn full_rebuild<F>(
        &mut self,
        delta: &EditDelta,
        fallback: Fallback,
        current_text: F,
    ) -> EditReport
    where
        F: FnOnce() -> String,
    {
        debug!(
            target: "textbox_layout::dispatch",
            path = ?EditPath::FullRebuild,
            reason = %fallback,
            start = delta.start,
            "falling back to a full rebuild"
        );

        let applied = match fallback {
            Fallback::Rejected(error) => Err(error),
            _ => self.snapshot.try_apply_delta(delta),
        };
        if let Err(error) = applied {
            self.stats.rejected_deltas += 1;
            warn!(
                target: "textbox_layout::dispatch",
                start = delta.start,
                %error,
                "delta rejected; reloading text from the edit source"
            );
            let text = current_text();
            self.snapshot.set_text(&text);
        }

        self.reset_layout("full rebuild");
        self.stats.full_rebuilds += 1;
        EditReport {
            path: EditPath::FullRebuild,
            first_dirty_line: 0,
        }
    }
}
