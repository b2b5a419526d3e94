use std::io::{self, Read};
use std::sync::{Arc, Mutex, PoisonError};

use sha2::{Digest as _, Sha256};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::heartbeat::Heartbeat;

/// Computes SHA-256 of `data` and returns the lowercase hex digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Marker carried inside the `io::Error` a [`DigestReader`] returns once its
/// cancellation token trips.
#[derive(Debug, thiserror::Error)]
#[error("transfer cancelled")]
pub struct Cancelled;

/// Returns `true` if `err` was raised because a transfer was cancelled.
pub fn is_cancelled(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<Cancelled>())
}

/// SHA-256 and byte count of everything a [`DigestReader`] handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    /// Lowercase hex SHA-256.
    pub hex: String,
    /// Number of bytes hashed.
    pub length: u64,
}

#[derive(Default)]
struct DigestState {
    hasher: Sha256,
    length: u64,
}

/// Reader that hashes and counts bytes as they pass through.
///
/// The digest therefore reflects exactly the bytes the consumer (the HTTP
/// body) pulled, without rewinding the source. The state is shared with a
/// [`DigestHandle`] so the reader can be moved into a `'static` request body.
pub struct DigestReader<R> {
    inner: R,
    state: Arc<Mutex<DigestState>>,
    heartbeat: Option<Heartbeat>,
    cancel: Option<CancellationToken>,
}

/// Read side of a [`DigestReader`]'s running digest.
#[derive(Clone)]
pub struct DigestHandle {
    state: Arc<Mutex<DigestState>>,
}

impl<R: Read> DigestReader<R> {
    /// Wraps `inner`, returning the reader and a handle to its digest.
    pub fn new(inner: R) -> (Self, DigestHandle) {
        let state = Arc::new(Mutex::new(DigestState::default()));
        let reader = Self {
            inner,
            state: Arc::clone(&state),
            heartbeat: None,
            cancel: None,
        };
        (reader, DigestHandle { state })
    }

    /// Reports consumed bytes to `heartbeat` while reading.
    pub fn with_heartbeat(mut self, heartbeat: Option<Heartbeat>) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Fails the next read once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(token) = &self.cancel
            && token.is_cancelled()
        {
            let sent = self.state.lock().unwrap_or_else(PoisonError::into_inner).length;
            trace!(sent, "read cancelled");
            return Err(io::Error::other(Cancelled));
        }

        let n = self.inner.read(buf)?;
        let total = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.hasher.update(&buf[..n]);
            state.length += n as u64;
            state.length
        };

        if let Some(heartbeat) = &mut self.heartbeat {
            if n == 0 {
                heartbeat.finish(total);
            } else {
                heartbeat.tick(total);
            }
        }
        Ok(n)
    }
}

impl DigestHandle {
    /// Returns the digest of the bytes read so far.
    pub fn finish(&self) -> Digest {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        Digest {
            hex: hex::encode(state.hasher.clone().finalize()),
            length: state.length,
        }
    }
}
