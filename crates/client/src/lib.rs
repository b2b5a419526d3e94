//! Blocking client for the Agile Storage HTTP API.
//!
//! The heart of the crate is the multipart upload engine:
//!
//! 1. **Start or resume**: [`Client::start_multipart`] allocates a remote
//!    multipart id; [`Client::resume_multipart`] re-validates an existing one.
//! 2. **Push chunks**: [`Client::upload_parts`] streams each [`Chunk`] to the
//!    piece endpoint, hashing it on the way out, and checks the server's
//!    acknowledgment headers. Overwriting chunks are first mapped to an
//!    existing piece by [`Client::resolve_offset`].
//! 3. **Complete or abort**: [`Client::complete_multipart`] checks the
//!    server's piece count against the local one; [`Client::abort_multipart`]
//!    discards the upload.
//!
//! All calls block the calling thread. A [`Client`] and its
//! [`MultipartSession`]s are meant for one caller at a time; parallel uploads
//! need independent clients and sessions.

mod auth;
mod channel;
mod client;
mod config;
mod directory;
mod error;
mod resolver;
mod session;
mod transport;
mod upload;

#[cfg(test)]
mod fake;

pub use agilestore_protocol::{FileEntry, MultipartState, Piece};
pub use agilestore_transfer::{
    ActivityCallback, Chunk, ChunkPlan, ChunkSource, DEFAULT_CHUNK_SIZE, Digest, IntegrityError,
    TransferError, plan_chunks,
};

pub use auth::{AuthToken, Authenticator, Credentials};
pub use channel::{Diagnostics, RpcChannel};
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, ErrorKind};
pub use resolver::{Resolution, resolve_offset};
pub use session::{MultipartSession, SessionState};
pub use transport::{HttpTransport, RawReply, Transport, UploadBody};
