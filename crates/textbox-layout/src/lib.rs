#![warn(missing_docs)]
//! Textbox Layout - Incremental, Virtualized Text Layout Engine
//!
//! # Overview
//!
//! `textbox-layout` turns a mutable text buffer into wrapped visual lines for a plain-text edit
//! control. It is headless: the host supplies glyph metrics and a viewport, pushes one
//! [`EditDelta`] per committed mutation, and queries lines, offsets and caret positions for
//! rendering and hit-testing.
//!
//! # Core Features
//!
//! - **Piece Table Snapshot**: edits split segments instead of copying the document
//! - **Sparse Checkpoints**: wrapped-line lookups resume from the nearest `(line, offset)` anchor
//! - **Virtualized Layout**: only the scroll window is realized for large documents
//! - **Incremental Relayout**: caches are invalidated from the first affected line forward
//! - **Caret Hint**: offset lookups near the last caret are O(1)
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  TextLayoutEngine + EditDispatcher          │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Caret Hint / Geometry Caches               │  ← Hit-testing
//! ├─────────────────────────────────────────────┤
//! │  LineCache / FlatLayout                     │  ← Realized lines
//! ├─────────────────────────────────────────────┤
//! │  LineRealizer + CheckpointIndex             │  ← Soft wrapping
//! ├─────────────────────────────────────────────┤
//! │  TextSnapshot (Piece Table)                 │  ← Text Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use textbox_layout::{
//!     EditDelta, EditPath, LayoutConfig, MonospaceMetrics, TextLayoutEngine, WrapMode,
//! };
//!
//! let config = LayoutConfig::default().with_wrap_mode(WrapMode::Word);
//! let mut engine = TextLayoutEngine::with_config(MonospaceMetrics::cells(), config);
//! engine.set_text("ab cd ef");
//!
//! // A viewport 4 cells wide.
//! let result = engine.layout(4.0, 10.0);
//! assert_eq!(result.line_count(), 3);
//! assert_eq!(engine.line_text(2), Some("ef"));
//!
//! // Push the edit the caret just committed.
//! let report = engine.on_edit(&EditDelta::insert(2, "X"), || String::from("abX cd ef"));
//! assert_eq!(report.path, EditPath::VirtualIncremental);
//! assert_eq!(engine.line_text(0), Some("abX "));
//! ```
//!
//! # Module Description
//!
//! - [`storage`] - Piece table snapshot
//! - [`checkpoint`] - Sparse `(line, offset)` checkpoints
//! - [`layout`] - Greedy line realization (char and word wrap)
//! - [`line_cache`] - Sparse line cache and flat no-wrap layout
//! - [`geometry`] - Prefix-width and line-text caches
//! - [`hint`] - Caret-adjacent lookup hint
//! - [`dispatch`] - Edit dispatch (fast, incremental, rebuild)
//! - [`engine`] - Engine facade
//!
//! # Offsets
//!
//! Every offset and length is counted in Unicode scalar values (`char`). Only `'\n'` is an
//! explicit line break.

pub mod checkpoint;
pub mod config;
pub mod delta;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod hint;
pub mod layout;
pub mod line_cache;
pub mod metrics;
pub mod storage;

pub use checkpoint::{Checkpoint, CheckpointIndex};
pub use config::LayoutConfig;
pub use delta::EditDelta;
pub use dispatch::{EditPath, EditReport};
pub use engine::{LayoutResult, LayoutStats, TextLayoutEngine};
pub use error::DeltaError;
pub use geometry::GeometryCaches;
pub use hint::CaretLineHint;
pub use layout::{LineRealizer, WrapMode, WrappedLine};
pub use line_cache::{FlatLayout, LineCache, LineCount};
pub use metrics::{GlyphMetrics, MonospaceMetrics};
pub use storage::TextSnapshot;
