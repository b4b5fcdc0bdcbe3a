//! Glyph metrics.
//!
//! The engine measures text through [`GlyphMetrics`], supplied by the host. [`MonospaceMetrics`]
//! is a ready-made provider for grid renderers: it computes character widths based on UAX #11
//! and scales them by a fixed cell width.

use unicode_width::UnicodeWidthChar;

/// Advance widths and line height of the current font.
///
/// Implementations are expected to be cheap (cached on their side). The engine never caches
/// results across a metrics change; see [`crate::TextLayoutEngine::set_metrics`].
pub trait GlyphMetrics {
    /// Rendered advance width of `ch`.
    fn advance(&self, ch: char) -> f32;

    /// Height of one line.
    fn line_height(&self) -> f32;
}

impl<M: GlyphMetrics + ?Sized> GlyphMetrics for &M {
    fn advance(&self, ch: char) -> f32 {
        (**self).advance(ch)
    }

    fn line_height(&self) -> f32 {
        (**self).line_height()
    }
}

impl<M: GlyphMetrics + ?Sized> GlyphMetrics for Box<M> {
    fn advance(&self, ch: char) -> f32 {
        (**self).advance(ch)
    }

    fn line_height(&self) -> f32 {
        (**self).line_height()
    }
}

/// Calculate the cell width of a character (based on UAX #11)
///
/// Return value:
/// - 1: Narrow character (ASCII, etc.)
/// - 2: Wide character (CJK, fullwidth, etc.)
/// - 0: Zero-width character (combining characters, etc.)
pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(1)
}

/// Advance of `ch` when it starts `x` pixels into its wrapped line.
///
/// `'\t'` advances to the next tab stop, placed every `tab_size` advances of `' '` from the
/// wrapped line's start; every other character uses [`GlyphMetrics::advance`].
pub fn advance_at<M: GlyphMetrics + ?Sized>(
    metrics: &M,
    ch: char,
    x: f32,
    tab_size: usize,
) -> f32 {
    if ch != '\t' {
        return metrics.advance(ch);
    }
    let stop = metrics.advance(' ') * tab_size.max(1) as f32;
    if stop <= 0.0 {
        return 0.0;
    }
    stop - x.rem_euclid(stop)
}

/// Total advance of `text` laid out from the start of a wrapped line.
pub fn str_advance<M: GlyphMetrics + ?Sized>(metrics: &M, text: &str, tab_size: usize) -> f32 {
    text.chars()
        .fold(0.0, |x, ch| x + advance_at(metrics, ch, x, tab_size))
}

/// Fixed-cell metrics: every character is `char_width(ch)` cells of `cell_width` pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMetrics {
    cell_width: f32,
    line_height: f32,
}

impl MonospaceMetrics {
    /// Create metrics for a grid of `cell_width` x `line_height` cells.
    pub fn new(cell_width: f32, line_height: f32) -> Self {
        Self {
            cell_width: cell_width.max(0.0),
            line_height: line_height.max(0.0),
        }
    }

    /// Metrics where widths are measured directly in cells (`1.0` per narrow char).
    pub fn cells() -> Self {
        Self::new(1.0, 1.0)
    }

    /// Width of one narrow cell.
    pub fn cell_width(&self) -> f32 {
        self.cell_width
    }
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self::cells()
    }
}

impl GlyphMetrics for MonospaceMetrics {
    fn advance(&self, ch: char) -> f32 {
        char_width(ch) as f32 * self.cell_width
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }
}
