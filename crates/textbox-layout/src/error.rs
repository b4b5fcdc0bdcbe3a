//! Error types.

use thiserror::Error;

/// Reasons a [`crate::EditDelta`] cannot be applied incrementally.
///
/// None of these are fatal: the dispatcher answers every one of them with a full rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeltaError {
    /// The declared lengths disagree with the carried texts.
    #[error("malformed delta: declared {old_len}/{new_len} chars do not match the carried text")]
    Malformed {
        /// Declared removed length.
        old_len: usize,
        /// Declared inserted length.
        new_len: usize,
    },

    /// The removed range falls outside the current buffer.
    #[error("delta range {start}..{end} is outside the buffer (len {len})")]
    OutOfRange {
        /// Start character offset.
        start: usize,
        /// Exclusive end character offset.
        end: usize,
        /// Current buffer length in characters.
        len: usize,
    },

    /// The text at the removed range differs from `removed_text`: the delta is out of order
    /// or was produced against another revision of the text.
    #[error("stale delta at offset {start}: removed text does not match the buffer")]
    Stale {
        /// Start character offset.
        start: usize,
    },
}
