//! Split Boundary Locator
//!
//! Snaps approximate split offsets to real member starts so each parallel
//! consumer starts decoding exactly at a header. Deflate has no other restart
//! point. On an indexed stream the offset map lists every member start; a
//! stream without one is scanned for the header signature instead, since
//! member lengths are not known in advance.
//!
//! ## Split Read Session
//! ```text
//! Unopened ──locate──▶ HeaderLocated ──read──▶ Streaming ──eof──▶ Exhausted
//! ```
//! A split covers the members whose headers lie in
//! `[aligned_start, aligned_end)`; it never decodes a member starting at or
//! after `aligned_end`.

use std::io::{self, Read, Seek};

use crate::config::Config;
use crate::error::Result;
use crate::format::{locate_trailer, HeaderScanner, IndexedReader, OffsetMap, TrailerLookup};
use crate::source::ByteWindow;

/// Split boundaries after alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedRange {
    /// Member start at or after the requested start
    pub start: u64,
    /// Member start at or after the requested end, or the stream end
    pub end: u64,
}

impl AlignedRange {
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Align a requested `[start, end)` within `source`'s window.
///
/// Each boundary moves forward to the next member start; with none left it
/// becomes the window end. The aligned end is never before the aligned start.
///
/// On an indexed stream the member starts come from the offset map, so a
/// signature inside member data is never mistaken for a header. Streams
/// without a trailer member fall back to scanning for the signature. A
/// trailer member with a malformed map fails with `CorruptIndex`.
pub fn align<R: Read + Seek>(
    source: &mut ByteWindow<R>,
    scanner: &HeaderScanner,
    requested_start: u64,
    requested_end: u64,
) -> Result<AlignedRange> {
    let starts = match locate_trailer(source, scanner)? {
        TrailerLookup::Found { offset, map } => Some(member_starts(source.start(), &map, offset)),
        TrailerLookup::Absent => None,
    };
    align_within(source, scanner, starts.as_deref(), requested_start, requested_end)
}

/// Absolute member starts of an indexed stream, trailer included
fn member_starts(base: u64, map: &OffsetMap, trailer_offset: u64) -> Vec<u64> {
    let mut starts: Vec<u64> = std::iter::once(base)
        .chain(map.iter().map(|entry| base + entry.offset))
        .chain(std::iter::once(trailer_offset))
        .collect();
    starts.sort_unstable();
    starts.dedup();
    starts
}

/// Snap both boundaries to `starts` when known, else to scanned headers
fn align_within<R: Read + Seek>(
    source: &mut ByteWindow<R>,
    scanner: &HeaderScanner,
    starts: Option<&[u64]>,
    requested_start: u64,
    requested_end: u64,
) -> Result<AlignedRange> {
    let limit = source.end();
    let snap = |source: &mut ByteWindow<R>, requested: u64| -> Result<u64> {
        if requested >= limit {
            return Ok(limit);
        }
        let requested = requested.max(source.start());
        let found = match starts {
            Some(starts) => starts
                .get(starts.partition_point(|&s| s < requested))
                .copied(),
            None => scanner.find_header(source, requested)?,
        };
        Ok(found.map_or(limit, |offset| offset.min(limit)))
    };

    let start = snap(source, requested_start)?;
    let end = snap(source, requested_end.max(start))?;

    tracing::debug!(requested_start, requested_end, start, end, indexed = starts.is_some(), "split aligned");
    Ok(AlignedRange { start, end })
}

/// Lifecycle of a split read session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitState {
    /// Boundaries not aligned yet
    Unopened,
    /// Aligned start found; nothing decoded yet
    HeaderLocated,
    /// Decoding members inside the aligned range
    Streaming,
    /// All members of the split decoded
    Exhausted,
}

/// Reader for one split of an indexed (or plain multi-member) gzip stream
pub struct SplitReader<R> {
    state: SplitState,
    requested_start: u64,
    requested_end: u64,
    config: Config,
    /// Source waiting for alignment
    pending: Option<ByteWindow<R>>,
    /// Decoder over the aligned window
    reader: Option<IndexedReader<R>>,
    range: Option<AlignedRange>,
}

impl<R: Read + Seek> SplitReader<R> {
    /// New split over `source` for the requested byte range.
    ///
    /// `source` should cover the whole stream so the trailer member can be
    /// recognised; nothing is read until [`locate`](Self::locate) or the
    /// first read.
    pub fn new(source: ByteWindow<R>, requested_start: u64, requested_end: u64, config: &Config) -> Self {
        Self {
            state: SplitState::Unopened,
            requested_start,
            requested_end,
            config: config.clone(),
            pending: Some(source),
            reader: None,
            range: None,
        }
    }

    /// Align the split and position the decoder at the aligned start.
    ///
    /// When the stream carries a trailer member, boundaries are clamped to it
    /// so the offset map is never read as split data. A malformed trailer or
    /// an I/O failure is returned as is; the split can be located again.
    pub fn locate(&mut self) -> Result<AlignedRange> {
        if let Some(range) = self.range {
            return Ok(range);
        }
        let mut source = match self.pending.take() {
            Some(source) => source,
            None => return Err(io::Error::new(io::ErrorKind::Other, "split source missing").into()),
        };

        let (stream_start, stream_end) = (source.start(), source.end());
        let range = match self.align_source(&mut source) {
            Ok(range) => range,
            Err(e) => {
                // Hand the source back untouched for another attempt
                if let Err(restore) = source.set_range(stream_start, stream_end) {
                    tracing::warn!(error = %restore, "split source could not be restored");
                }
                self.pending = Some(source);
                return Err(e);
            }
        };

        self.reader = Some(IndexedReader::from_window(source, &self.config));
        self.range = Some(range);
        self.state = SplitState::HeaderLocated;
        Ok(range)
    }

    /// Find the trailer, align, and narrow `source` to the aligned range
    fn align_source(&self, source: &mut ByteWindow<R>) -> Result<AlignedRange> {
        let scanner = HeaderScanner::new(self.config.buffer_size);
        let stream_start = source.start();

        let starts = match locate_trailer(source, &scanner)? {
            TrailerLookup::Found { offset, map } => {
                source.set_range(stream_start, offset)?;
                Some(member_starts(stream_start, &map, offset))
            }
            TrailerLookup::Absent => None,
        };

        let range = align_within(
            source,
            &scanner,
            starts.as_deref(),
            self.requested_start,
            self.requested_end,
        )?;
        source.set_range(range.start, range.end)?;
        Ok(range)
    }

    /// Restart the split from its aligned start.
    ///
    /// This resets the whole decoder, not only the inflate state.
    pub fn reset(&mut self) -> Result<()> {
        let range = self.locate()?;
        if let Some(reader) = self.reader.as_mut() {
            reader.seek_absolute(range.start)?;
        }
        self.state = SplitState::HeaderLocated;
        Ok(())
    }
}

impl<R> SplitReader<R> {
    pub fn state(&self) -> SplitState {
        self.state
    }

    /// Aligned range, once located
    pub fn range(&self) -> Option<AlignedRange> {
        self.range
    }

    pub fn requested_start(&self) -> u64 {
        self.requested_start
    }

    pub fn requested_end(&self) -> u64 {
        self.requested_end
    }

    /// Compressed offset the last read started from; the requested start
    /// before anything was read.
    pub fn position(&self) -> u64 {
        match (&self.reader, self.range) {
            (Some(reader), _) => reader.position(),
            (None, Some(range)) => range.start,
            (None, None) => self.requested_start,
        }
    }

    /// Uncompressed bytes returned so far
    pub fn uncompressed_position(&self) -> u64 {
        self.reader
            .as_ref()
            .map(|r| r.uncompressed_position())
            .unwrap_or_default()
    }
}

impl<R: Read + Seek> Read for SplitReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.state {
            SplitState::Exhausted => return Ok(0),
            SplitState::Unopened => {
                self.locate().map_err(crate::format::into_io)?;
            }
            SplitState::HeaderLocated | SplitState::Streaming => {}
        }

        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(0),
        };
        let n = reader.read(buf)?;

        if n == 0 && !buf.is_empty() {
            tracing::trace!(uncompressed = reader.uncompressed_position(), "split exhausted");
            self.state = SplitState::Exhausted;
        } else {
            self.state = SplitState::Streaming;
        }
        Ok(n)
    }
}
