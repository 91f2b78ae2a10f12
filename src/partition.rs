//! Positional partitioning of the token stream into contiguous chunks.

use serde::Serialize;

/// Contiguous `[start, end)` range of the token stream handled by one worker.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// Position of the chunk among all chunks of the run.
    pub index: usize,
    /// Offset of the first token.
    pub start: usize,
    /// Offset one past the last token.
    pub end: usize,
}

impl Chunk {
    /// Number of tokens in the chunk.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` for a chunk without tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Borrows the chunk's tokens from the full stream.
    ///
    /// Returns `None` if the chunk does not fit inside `tokens`.
    #[must_use]
    pub fn slice<'a, T>(&self, tokens: &'a [T]) -> Option<&'a [T]> {
        tokens.get(self.start..self.end)
    }
}

/// Splits `len` tokens into at most `part_count` contiguous chunks.
///
/// Every chunk holds `ceil(len / part_count)` tokens except possibly the last one.  Ranges
/// that would be empty are dropped, so fewer than `part_count` chunks are returned when
/// `part_count` exceeds what `len` can fill.  Boundaries are purely positional: similar
/// tokens on either side of a boundary are never compared.
#[must_use]
pub fn partition(len: usize, part_count: usize) -> Vec<Chunk> {
    if len == 0 || part_count == 0 {
        return Vec::new();
    }
    let size = len.div_ceil(part_count);
    (0..part_count)
        .map(|i| (i * size, ((i + 1) * size).min(len)))
        .take_while(|&(start, _)| start < len)
        .enumerate()
        .map(|(index, (start, end))| Chunk { index, start, end })
        .collect()
}
