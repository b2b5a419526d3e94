//! Piece and whole-file transfers.
//!
//! Bytes are hashed by a [`DigestReader`] while the transport pulls them into
//! the request body, and the server's acknowledgment headers are checked
//! against that digest before a piece counts as uploaded.

use std::path::Path;

use agilestore_transfer::{
    ActivityCallback, Chunk, ChunkSource, Digest, DigestReader, Heartbeat, IntegrityExpectation,
    TransferError, validate_remote_name, verify_acknowledgment,
};
use tracing::{debug, info};

use crate::client::Client;
use crate::error::{Error, ErrorKind};
use crate::resolver::{Resolution, resolve_offset};
use crate::session::MultipartSession;
use crate::transport::Transport;

impl<T: Transport> Client<T> {
    /// Pushes `chunks`, read from `source`, into the session's upload.
    ///
    /// Chunks are sent one at a time in the order given. An appending chunk
    /// takes the next free slot and advances the chunk count once its
    /// acknowledgment checks out; an overwriting chunk replaces the piece
    /// that covers its offset. The first failure stops the upload and leaves
    /// the count at the last verified piece.
    ///
    /// `activity` is called with the bytes sent so far for the current piece,
    /// at most every 500 ms and once when the piece has been read.
    pub fn upload_parts(
        &mut self,
        session: &mut MultipartSession,
        source: &ChunkSource,
        chunks: impl IntoIterator<Item = Chunk>,
        activity: Option<ActivityCallback>,
    ) -> Result<(), Error> {
        self.run(|client| client.push_parts(session, source, chunks, activity))
    }

    /// Opens `path` and pushes `chunks` of it. The file is closed on return.
    pub fn upload_parts_from_path(
        &mut self,
        session: &mut MultipartSession,
        path: &Path,
        chunks: impl IntoIterator<Item = Chunk>,
        activity: Option<ActivityCallback>,
    ) -> Result<(), Error> {
        self.run(|client| {
            let source = ChunkSource::open(path)?;
            client.push_parts(session, &source, chunks, activity)
        })
    }

    /// Sums the sizes of the pieces the session has uploaded.
    pub fn uploaded_bytes(&mut self, session: &MultipartSession) -> Result<u64, Error> {
        self.run(|client| {
            let mpid = session.active_id("count uploaded bytes")?;
            let page_size = client.page_size();
            let mut cursor = 1u32;
            let mut total = 0u64;
            while cursor < session.chunk_count() {
                let page = client.fetch_pieces(mpid, cursor, page_size)?;
                if page.is_empty() {
                    break;
                }
                total += (cursor..session.chunk_count())
                    .zip(&page)
                    .map(|(_, piece)| piece.size)
                    .sum::<u64>();
                cursor = cursor.saturating_add(page_size);
            }
            Ok(total)
        })
    }

    /// Uploads all of `source` as `directory/name` in one request and returns
    /// the digest of the bytes sent.
    pub fn upload(
        &mut self,
        source: &ChunkSource,
        directory: &str,
        name: &str,
        activity: Option<ActivityCallback>,
    ) -> Result<Digest, Error> {
        self.run(|client| client.push_file(source, directory, name, activity))
    }

    /// Uploads the file at `path` into `directory`, named after the file.
    pub fn upload_path(
        &mut self,
        path: &Path,
        directory: &str,
        activity: Option<ActivityCallback>,
    ) -> Result<Digest, Error> {
        self.run(|client| {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    TransferError::InvalidName(format!(
                        "no usable file name in {}",
                        path.display()
                    ))
                })?;
            let source = ChunkSource::open(path)?;
            client.push_file(&source, directory, name, activity)
        })
    }

    fn push_parts(
        &mut self,
        session: &mut MultipartSession,
        source: &ChunkSource,
        chunks: impl IntoIterator<Item = Chunk>,
        activity: Option<ActivityCallback>,
    ) -> Result<(), ErrorKind> {
        let mpid = session.active_id("upload parts")?.to_string();
        for chunk in chunks {
            self.check_cancelled()?;
            let index = if chunk.appending {
                session.chunk_count()
            } else {
                self.locate_piece(session, &mpid, chunk)?
            };

            self.transfer_piece(&mpid, index, source, chunk, activity.clone())?;

            if chunk.appending {
                session.record_append();
            } else {
                session.mark_active();
            }
        }
        Ok(())
    }

    fn push_file(
        &mut self,
        source: &ChunkSource,
        directory: &str,
        name: &str,
        activity: Option<ActivityCallback>,
    ) -> Result<Digest, ErrorKind> {
        validate_remote_name(name)?;
        self.check_cancelled()?;
        let token = self.token()?;

        let (reader, digest) = DigestReader::new(source.open_all()?);
        let reader = reader
            .with_heartbeat(activity.map(Heartbeat::new))
            .with_cancel(self.cancel_token());

        info!(directory, name, bytes = source.len(), "uploading file");
        let reply = self
            .channel_mut()
            .upload_file(&token, directory, name, Box::new(reader))?;

        let sent = digest.finish();
        verify_acknowledgment(&reply.headers, &IntegrityExpectation::from_digest(&sent))?;
        info!(directory, name, bytes = sent.length, checksum = %sent.hex, "file uploaded");
        Ok(sent)
    }

    /// Maps an overwriting chunk to the piece that covers its offset.
    ///
    /// Only the offset is matched; the existing piece's size is not compared
    /// with the chunk's length.
    fn locate_piece(
        &mut self,
        session: &MultipartSession,
        mpid: &str,
        chunk: Chunk,
    ) -> Result<u32, ErrorKind> {
        let page_size = self.page_size();
        let resolution = resolve_offset(chunk.offset, session.chunk_count(), page_size, |cursor, size| {
            self.fetch_pieces(mpid, cursor, size)
        })?;
        match resolution {
            Resolution::Resolved(index) => {
                debug!(
                    mpid,
                    offset = chunk.offset,
                    part = index.get(),
                    length = chunk.length,
                    "overwriting piece, existing size not checked"
                );
                Ok(index.get())
            }
            Resolution::NotFound => Err(ErrorKind::Resolution {
                offset: chunk.offset,
                pieces: session.pieces(),
            }),
        }
    }

    /// Streams one chunk as piece `index` and verifies the acknowledgment.
    fn transfer_piece(
        &mut self,
        mpid: &str,
        index: u32,
        source: &ChunkSource,
        chunk: Chunk,
        activity: Option<ActivityCallback>,
    ) -> Result<Digest, ErrorKind> {
        let token = self.token()?;
        let (reader, digest) = DigestReader::new(source.open_range(chunk.offset, chunk.length)?);
        let reader = reader
            .with_heartbeat(activity.map(Heartbeat::new))
            .with_cancel(self.cancel_token());

        debug!(mpid, part = index, offset = chunk.offset, length = chunk.length, "uploading piece");
        let reply = self
            .channel_mut()
            .upload_piece(&token, mpid, index, Box::new(reader), chunk.length)?;

        let sent = digest.finish();
        let expectation = IntegrityExpectation::for_chunk(&sent, chunk.length)?;
        verify_acknowledgment(&reply.headers, &expectation)?;
        debug!(mpid, part = index, checksum = %sent.hex, "piece acknowledged");
        Ok(sent)
    }
}
