use std::fmt;

use serde::{Deserialize, Serialize};

/// Remote state of a multipart upload, as reported by `getMultipartStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum MultipartState {
    /// Created, no pieces received yet.
    New,
    /// Pieces are being received.
    Uploading,
    /// `completeMultipart` accepted; pieces are being joined.
    Joining,
    /// Pieces joined into the final file.
    Complete,
    /// Aborted by the client.
    Aborted,
    /// The service gave up on the upload.
    Failed,
}

/// Error for a state integer outside the known enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown multipart state: {0}")]
pub struct UnknownStateError(pub i64);

impl TryFrom<i64> for MultipartState {
    type Error = UnknownStateError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::New),
            1 => Ok(Self::Uploading),
            2 => Ok(Self::Joining),
            3 => Ok(Self::Complete),
            4 => Ok(Self::Aborted),
            5 => Ok(Self::Failed),
            other => Err(UnknownStateError(other)),
        }
    }
}

impl From<MultipartState> for i64 {
    fn from(state: MultipartState) -> Self {
        match state {
            MultipartState::New => 0,
            MultipartState::Uploading => 1,
            MultipartState::Joining => 2,
            MultipartState::Complete => 3,
            MultipartState::Aborted => 4,
            MultipartState::Failed => 5,
        }
    }
}

impl fmt::Display for MultipartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Uploading => "uploading",
            Self::Joining => "joining",
            Self::Complete => "complete",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One entry of the remote piece listing.
///
/// Pieces are returned ordered by index, contiguous from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    #[serde(default)]
    pub index: u32,
    pub size: u64,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: i64,
}
