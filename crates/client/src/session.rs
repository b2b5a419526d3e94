//! Multipart upload session state machine.
//!
//! ```text
//!   Idle ──start──► Started ──first piece──► Active ──► Completed
//!    │                 │                       ▲   └──► Aborted
//!    └──────resume─────┼───────────────────────┘
//!                      └──complete / abort──► Completed / Aborted
//! ```
//!
//! `Completed` and `Aborted` are terminal for the upload, but the record can
//! be reused for a new `start` or `resume`.

use agilestore_protocol::constants::STATUS_OK;
use agilestore_protocol::methods::{
    AbortMultipart, CompleteMultipart, CreateMultipart, GetMultipartStatus, ListMultipartPiece,
    RestartMultipart,
};
use agilestore_protocol::{MultipartState, Piece, RpcMethod};
use agilestore_transfer::{join_remote_path, validate_remote_name};
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::error::{Error, ErrorKind};
use crate::transport::Transport;

/// Where a [`MultipartSession`] is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No upload attached.
    #[default]
    Idle,
    /// Remote id allocated, no piece pushed yet.
    Started,
    /// Pieces are being pushed.
    Active,
    Completed,
    Aborted,
}

/// One multipart upload, owned by a single caller.
///
/// `chunk_count` is the next free 1-based piece slot, so `chunk_count - 1`
/// pieces are known to exist remotely. It is 0 while no upload is attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartSession {
    id: Option<String>,
    chunk_count: u32,
    state: SessionState,
}

impl MultipartSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The remote multipart id, once started or resumed.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    /// Number of pieces filled so far.
    pub fn pieces(&self) -> u32 {
        self.chunk_count.saturating_sub(1)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Id of an upload that still accepts pieces.
    pub(crate) fn active_id(&self, operation: &str) -> Result<&str, ErrorKind> {
        match (self.state, self.id.as_deref()) {
            (SessionState::Started | SessionState::Active, Some(id)) => Ok(id),
            (state, _) => Err(ErrorKind::State(format!(
                "cannot {operation} in state {state:?}; call start or resume first"
            ))),
        }
    }

    /// Id of an upload the server still knows about.
    fn known_id(&self, operation: &str) -> Result<&str, ErrorKind> {
        match (self.state, self.id.as_deref()) {
            (
                SessionState::Started | SessionState::Active | SessionState::Completed,
                Some(id),
            ) => Ok(id),
            (state, _) => Err(ErrorKind::State(format!(
                "cannot {operation} in state {state:?}; no multipart upload attached"
            ))),
        }
    }

    fn ensure_detached(&self, operation: &str) -> Result<(), ErrorKind> {
        match self.state {
            SessionState::Started | SessionState::Active => Err(ErrorKind::State(format!(
                "cannot {operation}: upload {} is still in progress",
                self.id.as_deref().unwrap_or("?")
            ))),
            _ => Ok(()),
        }
    }

    fn begin(&mut self, id: String) {
        self.id = Some(id);
        self.chunk_count = 1;
        self.state = SessionState::Started;
    }

    fn adopt(&mut self, id: String, pieces: u32) {
        self.id = Some(id);
        self.chunk_count = pieces.saturating_add(1);
        self.state = SessionState::Active;
    }

    /// An appended piece was acknowledged.
    pub(crate) fn record_append(&mut self) {
        self.chunk_count += 1;
        self.state = SessionState::Active;
    }

    /// A piece was overwritten.
    pub(crate) fn mark_active(&mut self) {
        self.state = SessionState::Active;
    }

    fn mark_completed(&mut self) {
        self.state = SessionState::Completed;
    }

    fn mark_aborted(&mut self) {
        self.id = None;
        self.chunk_count = 0;
        self.state = SessionState::Aborted;
    }
}

/// Fails unless `code` is present and 0.
fn require_ok(method: &'static str, code: Option<i64>) -> Result<(), ErrorKind> {
    match code {
        Some(STATUS_OK) => Ok(()),
        Some(code) => Err(ErrorKind::Rejected { method, code }),
        None => Err(ErrorKind::Protocol(format!("{method} returned no status code"))),
    }
}

impl<T: Transport> Client<T> {
    /// Allocates a multipart upload for `directory/name` and attaches it to
    /// `session`. Returns the new multipart id.
    pub fn start_multipart(
        &mut self,
        session: &mut MultipartSession,
        directory: &str,
        name: &str,
    ) -> Result<String, Error> {
        self.run(|client| {
            session.ensure_detached("start")?;
            validate_remote_name(name)?;
            let path = join_remote_path(directory, name);

            let created = client.rpc(&CreateMultipart { path: path.clone() })?;
            if created.mpid.is_empty() {
                return Err(ErrorKind::Protocol(format!(
                    "{} returned an empty id",
                    CreateMultipart::NAME
                )));
            }

            info!(mpid = %created.mpid, path = %path, "multipart upload started");
            session.begin(created.mpid.clone());
            Ok(created.mpid)
        })
    }

    /// Re-attaches `session` to the existing upload `mpid`.
    ///
    /// The server must confirm the id; the uploaded pieces are then counted
    /// so appends continue after the last one.
    pub fn resume_multipart(
        &mut self,
        session: &mut MultipartSession,
        mpid: &str,
    ) -> Result<(), Error> {
        self.run(|client| {
            session.ensure_detached("resume")?;
            if mpid.is_empty() {
                return Err(ErrorKind::State("cannot resume an empty multipart id".into()));
            }

            let restarted = client.rpc(&RestartMultipart { mpid: mpid.into() })?;
            require_ok(RestartMultipart::NAME, restarted.code)?;

            let pieces = client.count_pieces(mpid)?;
            info!(mpid, pieces, "multipart upload resumed");
            session.adopt(mpid.to_string(), pieces);
            Ok(())
        })
    }

    /// Queries the server-side state of the attached upload.
    pub fn multipart_status(
        &mut self,
        session: &MultipartSession,
    ) -> Result<MultipartState, Error> {
        self.run(|client| {
            let mpid = session.known_id("query status")?;
            client.query_status(mpid)
        })
    }

    /// Queries the server-side state of upload `mpid` without attaching to it.
    pub fn status_of(&mut self, mpid: &str) -> Result<MultipartState, Error> {
        self.run(|client| client.query_status(mpid))
    }

    fn query_status(&mut self, mpid: &str) -> Result<MultipartState, ErrorKind> {
        let status = self.rpc(&GetMultipartStatus { mpid: mpid.into() })?;
        require_ok(GetMultipartStatus::NAME, status.code)?;

        let raw = status.state.ok_or_else(|| {
            ErrorKind::Protocol(format!("{} returned no state", GetMultipartStatus::NAME))
        })?;
        let state = MultipartState::try_from(raw).map_err(|e| ErrorKind::Protocol(e.to_string()))?;
        debug!(mpid, %state, "multipart status");
        Ok(state)
    }

    /// Fetches one page of the attached upload's piece listing, starting at
    /// piece `cursor`.
    pub fn list_multipart_pieces(
        &mut self,
        session: &MultipartSession,
        cursor: u32,
        page_size: u32,
    ) -> Result<Vec<Piece>, Error> {
        self.run(|client| {
            let mpid = session.known_id("list pieces")?;
            client.fetch_pieces(mpid, cursor, page_size)
        })
    }

    /// Finalizes the attached upload.
    ///
    /// The server must report as many pieces as were pushed. On any failure
    /// the session stays attached so the caller can abort it.
    pub fn complete_multipart(&mut self, session: &mut MultipartSession) -> Result<(), Error> {
        self.run(|client| {
            let mpid = session.active_id("complete")?.to_string();
            let completed = client.rpc(&CompleteMultipart { mpid: mpid.clone() })?;
            require_ok(CompleteMultipart::NAME, completed.code)?;

            let reported = completed.numpieces.ok_or_else(|| {
                ErrorKind::Protocol(format!(
                    "{} returned no piece count",
                    CompleteMultipart::NAME
                ))
            })?;
            let expected = session.pieces();
            if reported != expected {
                warn!(mpid = %mpid, reported, expected, "piece count mismatch on completion");
                return Err(ErrorKind::State(format!(
                    "server reports {reported} pieces for {mpid}, {expected} were uploaded"
                )));
            }

            info!(mpid = %mpid, pieces = reported, "multipart upload completed");
            session.mark_completed();
            Ok(())
        })
    }

    /// Discards the attached upload and detaches `session` from it.
    pub fn abort_multipart(&mut self, session: &mut MultipartSession) -> Result<(), Error> {
        self.run(|client| {
            let mpid = session.active_id("abort")?.to_string();
            let aborted = client.rpc(&AbortMultipart { mpid: mpid.clone() })?;
            require_ok(AbortMultipart::NAME, aborted.code)?;

            info!(mpid = %mpid, "multipart upload aborted");
            session.mark_aborted();
            Ok(())
        })
    }

    pub(crate) fn fetch_pieces(
        &mut self,
        mpid: &str,
        cursor: u32,
        page_size: u32,
    ) -> Result<Vec<Piece>, ErrorKind> {
        let listed = self.rpc(&ListMultipartPiece {
            mpid: mpid.into(),
            cookie: cursor,
            pagesize: page_size,
        })?;
        require_ok(ListMultipartPiece::NAME, listed.code)?;

        let mut pieces = listed.pieces.ok_or_else(|| {
            ErrorKind::Protocol(format!("{} returned no pieces", ListMultipartPiece::NAME))
        })?;
        // Older servers omit the index; pieces are contiguous from the cursor.
        for (slot, piece) in (cursor..).zip(pieces.iter_mut()) {
            if piece.index == 0 {
                piece.index = slot;
            }
        }
        Ok(pieces)
    }

    /// Pages through the listing until a short page and counts the pieces.
    fn count_pieces(&mut self, mpid: &str) -> Result<u32, ErrorKind> {
        let page_size = self.page_size();
        let mut cursor = 1u32;
        let mut total = 0u32;
        loop {
            let page = self.fetch_pieces(mpid, cursor, page_size)?;
            let len = u32::try_from(page.len()).unwrap_or(u32::MAX);
            total = total.saturating_add(len);
            if len < page_size {
                return Ok(total);
            }
            cursor = cursor.saturating_add(page_size);
        }
    }
}
