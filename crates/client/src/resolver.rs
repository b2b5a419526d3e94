//! Maps a byte offset to the uploaded piece that covers it.

use std::num::NonZeroU32;

use agilestore_protocol::Piece;
use tracing::debug;

use crate::client::Client;
use crate::error::Error;
use crate::session::MultipartSession;
use crate::transport::Transport;

/// Outcome of an offset lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// 1-based index of the piece whose byte range contains the offset.
    Resolved(NonZeroU32),
    /// No piece below the session's chunk count covers the offset.
    NotFound,
}

/// Finds the piece covering byte `target`.
///
/// Pieces are summed from piece 1; the first one whose running total is
/// strictly greater than `target` wins, so an offset on a piece boundary
/// belongs to the following piece. Only pieces `1..chunk_count` are
/// considered. `fetch_page(cursor, page_size)` returns the listing page that
/// starts at piece `cursor`; pages are requested in order and the scan stops
/// at the first match.
pub fn resolve_offset<E>(
    target: u64,
    chunk_count: u32,
    page_size: u32,
    mut fetch_page: impl FnMut(u32, u32) -> Result<Vec<Piece>, E>,
) -> Result<Resolution, E> {
    let page_size = page_size.max(1);
    let mut start = 1u32;
    let mut covered = 0u64;

    while start < chunk_count {
        let page = fetch_page(start, page_size)?;
        if page.is_empty() {
            break;
        }
        for (index, piece) in (start..).zip(&page) {
            if index >= chunk_count {
                return Ok(Resolution::NotFound);
            }
            covered = covered.saturating_add(piece.size);
            if covered > target {
                return Ok(NonZeroU32::new(index).map_or(Resolution::NotFound, Resolution::Resolved));
            }
        }
        start = start.saturating_add(page_size);
    }
    Ok(Resolution::NotFound)
}

impl<T: Transport> Client<T> {
    /// Finds the uploaded piece of `session` that covers byte `offset`.
    pub fn resolve_offset(
        &mut self,
        session: &MultipartSession,
        offset: u64,
    ) -> Result<Resolution, Error> {
        self.run(|client| {
            let mpid = session.active_id("resolve an offset")?;
            let page_size = client.page_size();
            let resolution = resolve_offset(offset, session.chunk_count(), page_size, |cursor, size| {
                client.fetch_pieces(mpid, cursor, size)
            })?;
            debug!(mpid, offset, ?resolution, "offset resolved");
            Ok(resolution)
        })
    }
}
