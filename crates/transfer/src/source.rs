use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::TransferError;

/// Owned reader over one byte range, suitable for a streaming request body.
pub type RangeReader = Box<dyn Read + Send>;

/// Where upload bytes come from: an open file or an in-memory buffer.
///
/// A file source holds one handle for as long as the source lives; dropping
/// the source closes it. Range readers share that handle's cursor, so only
/// one of them may be read at a time.
#[derive(Debug)]
pub enum ChunkSource {
    File { file: File, len: u64, path: PathBuf },
    Buffer(Arc<[u8]>),
}

impl ChunkSource {
    /// Opens `path` for ranged reading.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self::File {
            file,
            len,
            path: path.to_path_buf(),
        })
    }

    /// Wraps an in-memory buffer.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Self {
        Self::Buffer(data.into())
    }

    /// Total size in bytes.
    pub fn len(&self) -> u64 {
        match self {
            Self::File { len, .. } => *len,
            Self::Buffer(data) => data.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// File path, for file sources.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path, .. } => Some(path),
            Self::Buffer(_) => None,
        }
    }

    /// Returns a reader yielding exactly `length` bytes starting at `offset`.
    pub fn open_range(&self, offset: u64, length: u64) -> Result<RangeReader, TransferError> {
        let len = self.len();
        if offset.checked_add(length).is_none_or(|end| end > len) {
            return Err(TransferError::OutOfRange {
                offset,
                length,
                len,
            });
        }

        match self {
            Self::File { file, .. } => {
                let mut handle = file.try_clone()?;
                handle.seek(SeekFrom::Start(offset))?;
                Ok(Box::new(handle.take(length)))
            }
            Self::Buffer(data) => {
                let mut cursor = Cursor::new(Arc::clone(data));
                cursor.set_position(offset);
                Ok(Box::new(cursor.take(length)))
            }
        }
    }

    /// Returns a reader over the whole source.
    pub fn open_all(&self) -> Result<RangeReader, TransferError> {
        self.open_range(0, self.len())
    }
}
