//! Client error types.

use std::io;

use agilestore_transfer::{IntegrityError, TransferError, is_cancelled};

use crate::channel::Diagnostics;

/// What went wrong, independent of diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("invalid session state: {0}")]
    State(String),

    #[error("couldn't find chunk with offset {offset} among {pieces} uploaded pieces")]
    Resolution { offset: u64, pieces: u32 },

    #[error("{method} returned status {code}")]
    Rejected { method: &'static str, code: i64 },

    #[error("interrupted")]
    Interrupted,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),
}

impl ErrorKind {
    /// Classifies an I/O error raised while sourcing or sending bytes.
    pub(crate) fn from_io(err: io::Error) -> Self {
        if is_cancelled(&err) || err.kind() == io::ErrorKind::Interrupted {
            Self::Interrupted
        } else {
            Self::Transfer(TransferError::Io(err))
        }
    }
}

/// A failed client operation.
///
/// Carries the request that was last sent and the raw response that was last
/// received when the failure happened.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    kind: ErrorKind,
    last_query: Option<String>,
    last_response: Option<String>,
}

impl Error {
    pub(crate) fn with_diagnostics(kind: ErrorKind, diagnostics: &Diagnostics) -> Self {
        Self {
            kind,
            last_query: diagnostics.last_query.clone(),
            last_response: diagnostics.last_response.clone(),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// The last request sent before the failure.
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// The last raw response received before the failure.
    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self.kind, ErrorKind::Interrupted)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            last_query: None,
            last_response: None,
        }
    }
}
