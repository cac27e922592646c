//! Member-Header Scanner
//!
//! Finds member starts by searching for [`HEADER_SIGNATURE`] in fixed-size
//! chunks. Consecutive chunks overlap by `signature length - 1` bytes so a
//! signature straddling a chunk boundary is still seen.

use std::io::{Read, Seek, SeekFrom};

use crate::config::DEFAULT_BUFFER_SIZE;
use crate::error::Result;
use crate::source::read_fully;

use super::member::HEADER_SIGNATURE;

/// Chunked signature search over a seekable source
#[derive(Debug, Clone)]
pub struct HeaderScanner {
    chunk_size: usize,
}

impl Default for HeaderScanner {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl HeaderScanner {
    /// Chunks smaller than two signatures are rounded up.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(2 * HEADER_SIGNATURE.len()),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Offset of the first signature at or after `search_start`.
    ///
    /// Searches until the source reports end-of-stream. `None` means no
    /// further member starts; callers treat the source end as the boundary.
    pub fn find_header<R: Read + Seek>(
        &self,
        source: &mut R,
        search_start: u64,
    ) -> Result<Option<u64>> {
        let sig_len = HEADER_SIGNATURE.len();
        let mut buf = vec![0u8; self.chunk_size];
        let mut position = search_start;

        loop {
            source.seek(SeekFrom::Start(position))?;
            let filled = read_fully(source, &mut buf)?;
            if filled < sig_len {
                return Ok(None);
            }

            if let Some(index) = find_signature(&buf[..filled]) {
                let found = position + index as u64;
                tracing::trace!(search_start, found, "member header found");
                return Ok(Some(found));
            }

            if filled < buf.len() {
                return Ok(None);
            }
            // Re-anchor so a straddling signature lands whole in the next chunk
            position += (filled - (sig_len - 1)) as u64;
        }
    }

    /// Offset of the last signature starting in `[lower, upper)` that fits
    /// entirely before `limit`.
    ///
    /// Walks backwards chunk by chunk; used to find the trailer member from
    /// the end of a stream.
    pub fn find_last_header<R: Read + Seek>(
        &self,
        source: &mut R,
        lower: u64,
        upper: u64,
        limit: u64,
    ) -> Result<Option<u64>> {
        let sig_len = HEADER_SIGNATURE.len() as u64;
        let step = self.chunk_size as u64 - (sig_len - 1);
        let mut buf = vec![0u8; self.chunk_size];
        let mut hi = upper;

        while hi > lower {
            let lo = hi.saturating_sub(step).max(lower);
            let read_end = (hi + sig_len - 1).min(limit);
            if read_end <= lo {
                hi = lo;
                continue;
            }

            let want = (read_end - lo) as usize;
            source.seek(SeekFrom::Start(lo))?;
            let filled = read_fully(source, &mut buf[..want])?;

            let candidates = (hi - lo) as usize;
            if let Some(index) = rfind_signature(&buf[..filled], candidates) {
                return Ok(Some(lo + index as u64));
            }
            hi = lo;
        }
        Ok(None)
    }
}

/// First index in `haystack` where the signature starts
pub(crate) fn find_signature(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(HEADER_SIGNATURE.len())
        .position(|w| w == HEADER_SIGNATURE)
}

/// Last index below `max_start` in `haystack` where the signature starts
fn rfind_signature(haystack: &[u8], max_start: usize) -> Option<usize> {
    haystack
        .windows(HEADER_SIGNATURE.len())
        .take(max_start)
        .rposition(|w| w == HEADER_SIGNATURE)
}
