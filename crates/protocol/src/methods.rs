//! One request record per remote JSON-RPC method.
//!
//! Each record serializes to the method's parameter object and names the
//! shape of its `result` through [`RpcMethod::Output`]. Status fields the
//! service may omit are `Option`s so callers can tell "missing" from
//! "non-zero".

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::{FileEntry, Piece};

/// A remote method with typed parameters and result.
pub trait RpcMethod: Serialize {
    /// Method name on the wire.
    const NAME: &'static str;

    /// Shape of the envelope's `result` field.
    type Output: DeserializeOwned;
}

macro_rules! rpc_method {
    ($ty:ty, $name:literal, $out:ty) => {
        impl RpcMethod for $ty {
            const NAME: &'static str = $name;
            type Output = $out;
        }
    };
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// `login` answers with a one-element array holding the token.
#[derive(Debug, Clone, Serialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

rpc_method!(Login, "login", Vec<Option<String>>);

#[derive(Debug, Clone, Default, Serialize)]
pub struct Logout {}

rpc_method!(Logout, "logout", Option<i64>);

// ---------------------------------------------------------------------------
// Multipart session control
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CreateMultipart {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateMultipartResult {
    pub mpid: String,
}

rpc_method!(CreateMultipart, "createMultipart", CreateMultipartResult);

#[derive(Debug, Clone, Serialize)]
pub struct RestartMultipart {
    pub mpid: String,
}

/// Result carrying only a status code.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CodeResult {
    #[serde(default)]
    pub code: Option<i64>,
}

rpc_method!(RestartMultipart, "restartMultipart", CodeResult);

#[derive(Debug, Clone, Serialize)]
pub struct GetMultipartStatus {
    pub mpid: String,
}

/// `state` stays a raw integer so unknown values surface as a protocol error
/// upstream instead of a deserialization failure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MultipartStatusResult {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub state: Option<i64>,
}

rpc_method!(GetMultipartStatus, "getMultipartStatus", MultipartStatusResult);

#[derive(Debug, Clone, Serialize)]
pub struct CompleteMultipart {
    pub mpid: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompleteMultipartResult {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub numpieces: Option<u32>,
}

rpc_method!(CompleteMultipart, "completeMultipart", CompleteMultipartResult);

#[derive(Debug, Clone, Serialize)]
pub struct AbortMultipart {
    pub mpid: String,
}

rpc_method!(AbortMultipart, "abortMultipart", CodeResult);

/// Requests one page of the piece listing, starting at piece `cookie`.
#[derive(Debug, Clone, Serialize)]
pub struct ListMultipartPiece {
    pub mpid: String,
    pub cookie: u32,
    pub pagesize: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PieceListResult {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub pieces: Option<Vec<Piece>>,
}

rpc_method!(ListMultipartPiece, "listMultipartPiece", PieceListResult);

// ---------------------------------------------------------------------------
// Directory operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MakeDir2 {
    pub path: String,
}

rpc_method!(MakeDir2, "makeDir2", i64);

#[derive(Debug, Clone, Serialize)]
pub struct DeleteDir {
    pub path: String,
}

rpc_method!(DeleteDir, "deleteDir", i64);

#[derive(Debug, Clone, Serialize)]
pub struct DeleteFile {
    pub path: String,
}

rpc_method!(DeleteFile, "deleteFile", i64);

#[derive(Debug, Clone, Serialize)]
pub struct ListFile {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListFileResult {
    #[serde(default)]
    pub list: Option<Vec<FileEntry>>,
}

rpc_method!(ListFile, "listFile", ListFileResult);

#[derive(Debug, Clone, Serialize)]
pub struct Stat {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatResult {
    pub code: i64,
}

rpc_method!(Stat, "stat", StatResult);

/// Keep-alive call.
#[derive(Debug, Clone, Serialize)]
pub struct Noop {
    pub operation: String,
}

impl Default for Noop {
    fn default() -> Self {
        Self {
            operation: "lvp".into(),
        }
    }
}

rpc_method!(Noop, "noop", serde_json::Value);
