use crate::DEFAULT_CHUNK_SIZE;

/// A byte range of the logical file destined for one remote piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chunk {
    /// Byte offset within the logical file.
    pub offset: u64,
    /// Number of bytes in this chunk.
    pub length: u64,
    /// `true` to fill the next free piece slot, `false` to overwrite the
    /// piece that already covers `offset`.
    pub appending: bool,
}

impl Chunk {
    /// A chunk that goes to the next free piece slot.
    pub fn append(offset: u64, length: u64) -> Self {
        Self {
            offset,
            length,
            appending: true,
        }
    }

    /// A chunk that replaces the existing piece covering `offset`.
    pub fn overwrite(offset: u64, length: u64) -> Self {
        Self {
            offset,
            length,
            appending: false,
        }
    }

    /// One past the last byte of the chunk.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }
}

/// Lazy sequence of appending chunks covering `[start, total)`.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    next: u64,
    total: u64,
    chunk_size: u64,
}

/// Splits `total_len` bytes into appending chunks of `chunk_size` bytes.
///
/// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] (5 MiB) is used. The last
/// chunk carries the remainder.
pub fn plan_chunks(total_len: u64, chunk_size: u64) -> ChunkPlan {
    let chunk_size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };
    ChunkPlan {
        next: 0,
        total: total_len,
        chunk_size,
    }
}

impl ChunkPlan {
    /// Skips the bytes before `offset` (for resume).
    pub fn starting_at(mut self, offset: u64) -> Self {
        self.next = offset.min(self.total);
        self
    }

    /// Bytes not yet handed out.
    pub fn remaining(&self) -> u64 {
        self.total - self.next
    }

    /// Chunk size in bytes.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }
}

impl Iterator for ChunkPlan {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let remaining = self.remaining();
        if remaining == 0 {
            return None;
        }
        let length = remaining.min(self.chunk_size);
        let chunk = Chunk::append(self.next, length);
        self.next += length;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining().div_ceil(self.chunk_size);
        let n = usize::try_from(n).unwrap_or(usize::MAX);
        (n, Some(n))
    }
}
