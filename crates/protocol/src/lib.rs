//! Wire protocol types for the Agile Storage HTTP API.
//!
//! The storage service speaks JSON-RPC 2.0 over `POST /jsonrpc` for session
//! control and directory operations, and accepts raw bytes on two dedicated
//! upload endpoints. This crate only describes the shapes on the wire; it
//! performs no I/O.

pub mod constants;
pub mod envelope;
pub mod methods;
pub mod types;

// Re-export primary types for convenience.
pub use envelope::{RpcRequest, RpcResponse};
pub use methods::RpcMethod;
pub use types::{FileEntry, MultipartState, Piece, UnknownStateError};
