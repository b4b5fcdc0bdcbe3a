//! Patchable text storage.
//!
//! [`TextSnapshot`] is a piece table: the document is an ordered list of [`Segment`]s, each
//! referencing a slice of an immutable chunk in a source arena. Applying an [`EditDelta`]
//! splits at most two segments, drops the ones covered by the removed range and inserts one
//! segment for the inserted text, so the cost of an edit is bounded by the edit size and the
//! segment count, never by the document length.

use crate::delta::EditDelta;
use crate::error::DeltaError;
use std::cell::Cell;

/// Capacity (in chars) of an append chunk before a new one is opened.
const APPEND_CHUNK_CAPACITY: usize = 64 * 1024;

/// Handle to a chunk of the source arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u32);

impl SourceId {
    /// The chunk holding the text passed to [`TextSnapshot::set_text`].
    pub const ORIGINAL: SourceId = SourceId(0);
}

/// A slice of a chunk: `len` chars starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Chunk the segment points into.
    pub source: SourceId,
    /// Start position inside the chunk (char index).
    pub start: usize,
    /// Length in chars (never zero for a stored segment).
    pub len: usize,
}

impl Segment {
    fn can_merge(&self, next: &Segment) -> bool {
        self.source == next.source && self.start + self.len == next.start
    }
}

/// Arena of backing texts.
///
/// Written chars are never modified. The open chunk only grows at its end, so segments keep
/// pointing at the same text for the lifetime of the arena.
#[derive(Debug, Clone)]
struct SourceArena {
    chunks: Vec<Vec<char>>,
    /// Chunk currently accepting appends. Never the original chunk.
    open: Option<usize>,
}

impl SourceArena {
    fn with_original(text: &str) -> Self {
        Self {
            chunks: vec![text.chars().collect()],
            open: None,
        }
    }

    fn original_len(&self) -> usize {
        self.chunks.first().map_or(0, Vec::len)
    }

    fn slice(&self, segment: &Segment) -> &[char] {
        match self.chunks.get(segment.source.0 as usize) {
            Some(chunk) => {
                let end = (segment.start + segment.len).min(chunk.len());
                &chunk[segment.start.min(end)..end]
            }
            None => &[],
        }
    }

    /// Append `text` and return the segment covering it (`None` for empty text).
    fn append(&mut self, text: &str) -> Option<Segment> {
        let len = text.chars().count();
        if len == 0 {
            return None;
        }

        let open = match self.open {
            Some(idx) if self.chunks[idx].len() + len <= APPEND_CHUNK_CAPACITY => idx,
            _ => {
                self.chunks
                    .push(Vec::with_capacity(APPEND_CHUNK_CAPACITY.max(len)));
                let idx = self.chunks.len() - 1;
                self.open = Some(idx);
                idx
            }
        };

        let chunk = &mut self.chunks[open];
        let start = chunk.len();
        chunk.extend(text.chars());
        Some(Segment {
            source: SourceId(open as u32),
            start,
            len,
        })
    }

    fn appended_chars(&self) -> usize {
        self.chunks.iter().skip(1).map(Vec::len).sum()
    }
}

/// Segment-based, patchable text buffer.
///
/// Offsets are character offsets. Reads go through a single "last accessed segment" cursor, so
/// scanning a line char by char is O(1) amortized; cursor misses fall back to a binary search
/// over segment start offsets.
#[derive(Debug, Clone)]
pub struct TextSnapshot {
    arena: SourceArena,
    segments: Vec<Segment>,
    /// `starts[i]` is the document offset of `segments[i]`.
    starts: Vec<usize>,
    len: usize,
    cursor: Cell<usize>,
    mutations: usize,
    compact_threshold: usize,
}

impl TextSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::from_text("")
    }

    /// Create a snapshot holding `text`.
    pub fn from_text(text: &str) -> Self {
        let mut snapshot = Self {
            arena: SourceArena::with_original(""),
            segments: Vec::new(),
            starts: Vec::new(),
            len: 0,
            cursor: Cell::new(0),
            mutations: 0,
            compact_threshold: crate::config::DEFAULT_COMPACT_THRESHOLD,
        };
        snapshot.set_text(text);
        snapshot
    }

    /// Replace the whole content with a single segment spanning `text`.
    pub fn set_text(&mut self, text: &str) {
        self.arena = SourceArena::with_original(text);
        self.len = self.arena.original_len();
        self.segments.clear();
        self.starts.clear();
        if self.len > 0 {
            self.segments.push(Segment {
                source: SourceId::ORIGINAL,
                start: 0,
                len: self.len,
            });
            self.starts.push(0);
        }
        self.cursor.set(0);
        self.mutations = 0;
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the snapshot holds no text.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of stored segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// The stored segments, in document order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Chars held by append chunks, referenced or not.
    pub fn appended_chars(&self) -> usize {
        self.arena.appended_chars()
    }

    /// Set how many mutations trigger an automatic [`compact`](Self::compact).
    pub fn set_compact_threshold(&mut self, threshold: usize) {
        self.compact_threshold = threshold.max(1);
    }

    /// Full text.
    pub fn text(&self) -> String {
        self.build_range_text(0, self.len)
    }

    /// Character at `index`, or `None` outside `[0, len)`.
    pub fn try_get_char(&self, index: usize) -> Option<char> {
        if index >= self.len {
            return None;
        }
        let segment_index = self.segment_for(index)?;
        let segment = &self.segments[segment_index];
        let local = index - self.starts[segment_index];
        self.arena.slice(segment).get(local).copied()
    }

    /// Text in `[start, start + len)`, clamped to the buffer.
    pub fn build_range_text(&self, start: usize, len: usize) -> String {
        let start = start.min(self.len);
        let len = len.min(self.len - start);
        if len == 0 {
            return String::new();
        }
        self.chars_from(start).take(len).collect()
    }

    /// Iterate characters from `offset` to the end of the buffer.
    pub fn chars_from(&self, offset: usize) -> Chars<'_> {
        if offset >= self.len {
            return Chars {
                snapshot: self,
                segment: self.segments.len(),
                offset_in_segment: 0,
            };
        }
        let segment = self.segment_for(offset).unwrap_or(self.segments.len());
        let offset_in_segment = self
            .starts
            .get(segment)
            .map_or(0, |start| offset - start);
        Chars {
            snapshot: self,
            segment,
            offset_in_segment,
        }
    }

    /// Apply `delta` in place.
    ///
    /// Fails without touching the buffer if the delta is malformed, out of range, or if the text
    /// at the removed range differs from `delta.removed_text`.
    pub fn try_apply_delta(&mut self, delta: &EditDelta) -> Result<(), DeltaError> {
        if !delta.lengths_match() {
            return Err(DeltaError::Malformed {
                old_len: delta.old_len,
                new_len: delta.new_len,
            });
        }

        let end = delta.old_end();
        if delta.start > self.len || end > self.len {
            return Err(DeltaError::OutOfRange {
                start: delta.start,
                end,
                len: self.len,
            });
        }

        if !self
            .chars_from(delta.start)
            .take(delta.old_len)
            .eq(delta.removed_text.chars())
        {
            return Err(DeltaError::Stale { start: delta.start });
        }

        if delta.is_noop() {
            return Ok(());
        }

        let first = self.split_at(delta.start);
        let last = self.split_at(end);
        self.segments.drain(first..last);
        self.starts.drain(first..last);

        if let Some(segment) = self.arena.append(&delta.inserted_text) {
            self.segments.insert(first, segment);
            self.starts.insert(first, delta.start);
            self.try_merge(first);
        }
        if first > 0 {
            self.try_merge(first - 1);
        }

        self.len = self.len - delta.old_len + delta.new_len;
        self.reindex_from(first.saturating_sub(1));
        self.cursor.set(0);

        self.mutations += 1;
        if self.mutations >= self.compact_threshold {
            self.compact();
        }
        Ok(())
    }

    /// Copy every appended slice still referenced into one fresh chunk, in document order,
    /// and drop the old append chunks.
    pub fn compact(&mut self) {
        let mut compacted: Vec<char> = Vec::new();
        let mut segments = Vec::with_capacity(self.segments.len());

        for segment in &self.segments {
            if segment.source == SourceId::ORIGINAL {
                segments.push(*segment);
                continue;
            }
            let start = compacted.len();
            compacted.extend_from_slice(self.arena.slice(segment));
            segments.push(Segment {
                source: SourceId(1),
                start,
                len: segment.len,
            });
        }

        let original = self.arena.chunks.swap_remove(0);
        let open =
            (!compacted.is_empty() && compacted.len() < APPEND_CHUNK_CAPACITY).then_some(1);
        self.arena = SourceArena {
            chunks: if compacted.is_empty() {
                vec![original]
            } else {
                vec![original, compacted]
            },
            open,
        };

        // Neighbouring appended segments are now contiguous.
        self.segments.clear();
        for segment in segments {
            match self.segments.last_mut() {
                Some(last) if last.can_merge(&segment) => last.len += segment.len,
                _ => self.segments.push(segment),
            }
        }
        self.starts.clear();
        self.starts.resize(self.segments.len(), 0);
        self.reindex_from(0);
        self.cursor.set(0);
        self.mutations = 0;
    }

    /// Index of the segment containing `offset` (`offset < len`), updating the cursor.
    fn segment_for(&self, offset: usize) -> Option<usize> {
        let contains = |idx: usize| {
            self.segments
                .get(idx)
                .is_some_and(|s| self.starts[idx] <= offset && offset < self.starts[idx] + s.len)
        };

        let cursor = self.cursor.get();
        let found = if contains(cursor) {
            Some(cursor)
        } else if contains(cursor + 1) {
            Some(cursor + 1)
        } else if cursor > 0 && contains(cursor - 1) {
            Some(cursor - 1)
        } else {
            let idx = self.starts.partition_point(|&start| start <= offset);
            idx.checked_sub(1).filter(|&idx| contains(idx))
        };

        if let Some(idx) = found {
            self.cursor.set(idx);
        }
        found
    }

    /// Ensure a segment boundary at `offset` and return the index of the segment starting there
    /// (`segments.len()` when `offset == len`).
    fn split_at(&mut self, offset: usize) -> usize {
        if offset >= self.len {
            return self.segments.len();
        }
        let idx = self.starts.partition_point(|&start| start <= offset) - 1;
        let local = offset - self.starts[idx];
        if local == 0 {
            return idx;
        }

        let segment = self.segments[idx];
        self.segments[idx].len = local;
        self.segments.insert(
            idx + 1,
            Segment {
                source: segment.source,
                start: segment.start + local,
                len: segment.len - local,
            },
        );
        self.starts.insert(idx + 1, offset);
        idx + 1
    }

    /// Merge `segments[idx]` and `segments[idx + 1]` if they are contiguous in one chunk.
    fn try_merge(&mut self, idx: usize) -> bool {
        if idx + 1 >= self.segments.len() || !self.segments[idx].can_merge(&self.segments[idx + 1])
        {
            return false;
        }
        self.segments[idx].len += self.segments[idx + 1].len;
        self.segments.remove(idx + 1);
        self.starts.remove(idx + 1);
        true
    }

    fn reindex_from(&mut self, idx: usize) {
        let mut offset = if idx == 0 {
            0
        } else {
            self.starts[idx - 1] + self.segments[idx - 1].len
        };
        for i in idx..self.segments.len() {
            self.starts[i] = offset;
            offset += self.segments[i].len;
        }
    }
}

impl Default for TextSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward character iterator over a [`TextSnapshot`].
#[derive(Debug, Clone)]
pub struct Chars<'a> {
    snapshot: &'a TextSnapshot,
    segment: usize,
    offset_in_segment: usize,
}

impl Iterator for Chars<'_> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        loop {
            let segment = self.snapshot.segments.get(self.segment)?;
            let slice = self.snapshot.arena.slice(segment);
            if let Some(&ch) = slice.get(self.offset_in_segment) {
                self.offset_in_segment += 1;
                return Some(ch);
            }
            self.segment += 1;
            self.offset_in_segment = 0;
        }
    }
}
