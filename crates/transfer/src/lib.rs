//! Byte plumbing for Agile Storage uploads.
//!
//! Describes which byte ranges go where ([`Chunk`], [`plan_chunks`]), opens
//! those ranges from a file or buffer ([`ChunkSource`]), hashes bytes while
//! they are streamed ([`DigestReader`]) and checks the server's
//! acknowledgment headers against what was sent ([`verify_acknowledgment`]).

mod chunk;
mod digest;
mod heartbeat;
mod integrity;
mod source;
mod validation;

pub use chunk::{Chunk, ChunkPlan, plan_chunks};
pub use digest::{Cancelled, Digest, DigestHandle, DigestReader, checksum_bytes, is_cancelled};
pub use heartbeat::{ActivityCallback, Heartbeat};
pub use integrity::{AckHeaders, IntegrityError, IntegrityExpectation, verify_acknowledgment};
pub use source::{ChunkSource, RangeReader};
pub use validation::{join_remote_path, validate_remote_name};

/// Default chunk size for planned multipart uploads: 5 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("range {offset}+{length} exceeds source of {len} bytes")]
    OutOfRange { offset: u64, length: u64, len: u64 },

    #[error("invalid remote name: {0}")]
    InvalidName(String),
}
