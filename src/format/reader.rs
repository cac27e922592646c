//! Indexed Reader
//!
//! Loads the offset map from the trailer member and decompresses member by
//! member, jumping straight to the member for a logical key when asked.

use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::mem;

use flate2::bufread::GzDecoder;

use crate::config::Config;
use crate::error::{GzIndexError, Result};
use crate::source::ByteWindow;

use super::index::{has_index_magic, plausible_payload_len};
use super::member::{max_member_len, HEADER_SIGNATURE, MEMBER_TRAILER_SIZE};
use super::{HeaderScanner, IndexEntry, OffsetMap};

type Input<R> = BufReader<ByteWindow<R>>;

/// Decoder position within the member sequence
enum Stage<R> {
    /// Between members: the next byte is a member header or end-of-stream
    Boundary(Input<R>),
    /// Inside a member
    Member(GzDecoder<Input<R>>),
    /// Transient while the input moves between stages
    Broken,
}

/// Outcome of looking for a trailer member
pub(crate) enum TrailerLookup {
    Found { offset: u64, map: OffsetMap },
    Absent,
}

/// Random-access reader over an indexed gzip stream
pub struct IndexedReader<R> {
    stage: Stage<R>,
    /// Offset map; `None` for readers opened without one
    index: Option<OffsetMap>,
    /// Absolute offset of the trailer member
    trailer_offset: Option<u64>,
    /// Absolute offset that map offsets are relative to
    base: u64,
    /// Compressed position before the last read call
    last_read: u64,
    /// Uncompressed bytes returned since open or the last jump
    uncompressed: u64,
}

impl<R: Read + Seek> IndexedReader<R> {
    /// Whether `source` ends with a trailer member carrying an offset map.
    ///
    /// Never fails: foreign, truncated or damaged input is reported as
    /// `false`. The source position is restored afterwards.
    pub fn detect(source: &mut ByteWindow<R>) -> bool {
        let position = source.position();
        let found = matches!(
            locate_trailer(source, &HeaderScanner::default()),
            Ok(TrailerLookup::Found { .. })
        );
        let _ = source.seek(SeekFrom::Start(position));
        found
    }

    /// Open an indexed stream with default configuration
    pub fn open(source: ByteWindow<R>) -> Result<Self> {
        Self::open_with_config(source, &Config::default())
    }

    /// Open an indexed stream and load its offset map.
    ///
    /// Fails with `NotIndexed` when there is no trailer member and with
    /// `CorruptIndex` when there is one but its map cannot be parsed.
    pub fn open_with_config(mut source: ByteWindow<R>, config: &Config) -> Result<Self> {
        let scanner = HeaderScanner::new(config.buffer_size);
        match locate_trailer(&mut source, &scanner)? {
            TrailerLookup::Found { offset, map } => {
                tracing::debug!(entries = map.len(), trailer_offset = offset, "offset map loaded");
                let base = source.start();
                // The trailer is never surfaced as data
                source.set_range(base, offset)?;
                let mut reader = Self::from_window(source, config);
                reader.index = Some(map);
                reader.trailer_offset = Some(offset);
                Ok(reader)
            }
            TrailerLookup::Absent => Err(GzIndexError::NotIndexed),
        }
    }

    /// Sequential reader over whatever members the window holds, without
    /// looking for an offset map. Reading starts at the window start.
    pub fn open_unindexed(mut source: ByteWindow<R>, config: &Config) -> Result<Self> {
        let start = source.start();
        source.seek(SeekFrom::Start(start))?;
        Ok(Self::from_window(source, config))
    }

    pub(crate) fn from_window(source: ByteWindow<R>, config: &Config) -> Self {
        let base = source.start();
        Self {
            stage: Stage::Boundary(BufReader::with_capacity(config.buffer_size, source)),
            index: None,
            trailer_offset: None,
            base,
            last_read: base,
            uncompressed: 0,
        }
    }

    /// Jump to the member recorded for the greatest key ≤ `key`.
    ///
    /// Subsequent reads start at that member's first byte, not at `key`.
    pub fn jump_to(&mut self, key: u64) -> Result<IndexEntry> {
        let index = self.index.as_ref().ok_or(GzIndexError::NotIndexed)?;
        let entry = index.floor(key).ok_or(GzIndexError::KeyBeforeRange {
            key,
            first: index.first_key(),
        })?;

        tracing::debug!(key, found = entry.key, offset = entry.offset, "jump");
        self.seek_to_offset(entry.offset)?;
        Ok(entry)
    }

    /// Restart decoding at a member start given relative to the stream start
    pub fn seek_to_offset(&mut self, offset: u64) -> Result<()> {
        self.seek_absolute(self.base + offset)
    }

    pub(crate) fn seek_absolute(&mut self, absolute: u64) -> Result<()> {
        let mut input = match mem::replace(&mut self.stage, Stage::Broken) {
            Stage::Boundary(input) => input,
            Stage::Member(decoder) => decoder.into_inner(),
            Stage::Broken => {
                return Err(GzIndexError::Io(broken()));
            }
        };

        let result = input.seek(SeekFrom::Start(absolute));
        self.stage = Stage::Boundary(input);
        result?;

        self.last_read = absolute;
        self.uncompressed = 0;
        Ok(())
    }

    fn begin_member(&mut self) {
        self.stage = match mem::replace(&mut self.stage, Stage::Broken) {
            Stage::Boundary(input) => {
                tracing::trace!(offset = input_position(&input), "member start");
                Stage::Member(GzDecoder::new(input))
            }
            other => other,
        };
    }

    fn end_member(&mut self) {
        self.stage = match mem::replace(&mut self.stage, Stage::Broken) {
            Stage::Member(decoder) => Stage::Boundary(decoder.into_inner()),
            other => other,
        };
    }
}

impl<R> IndexedReader<R> {
    /// Offset map, if this reader was opened on an indexed stream
    pub fn offset_map(&self) -> Option<&OffsetMap> {
        self.index.as_ref()
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    /// Absolute offset of the trailer member
    pub fn trailer_offset(&self) -> Option<u64> {
        self.trailer_offset
    }

    /// Compressed (byte-source) offset the last read started from
    pub fn position(&self) -> u64 {
        self.last_read
    }

    /// Compressed offset of the next unconsumed byte
    pub fn compressed_position(&self) -> u64 {
        match &self.stage {
            Stage::Boundary(input) => input_position(input),
            Stage::Member(decoder) => input_position(decoder.get_ref()),
            Stage::Broken => self.last_read,
        }
    }

    /// Uncompressed bytes returned since open or the last jump
    pub fn uncompressed_position(&self) -> u64 {
        self.uncompressed
    }
}

impl<R: Read + Seek> Read for IndexedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.last_read = self.compressed_position();

        loop {
            match &mut self.stage {
                Stage::Member(decoder) => {
                    let n = decoder.read(buf)?;
                    if n > 0 {
                        self.uncompressed += n as u64;
                        return Ok(n);
                    }
                    self.end_member();
                }
                Stage::Boundary(input) => {
                    if input.fill_buf()?.is_empty() {
                        return Ok(0);
                    }
                    self.begin_member();
                }
                Stage::Broken => return Err(broken()),
            }
        }
    }
}

fn input_position<R>(input: &Input<R>) -> u64 {
    input.get_ref().position() - input.buffer().len() as u64
}

fn broken() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "reader lost its input after a failed seek")
}

// =============================================================================
// Trailer Detection
// =============================================================================

/// Find the trailer member at the end of `source`.
///
/// The last four bytes of a gzip stream are the final member's ISIZE. Unless
/// that is a plausible offset-map length the stream is not indexed. Otherwise
/// the trailer must start within `max_member_len(isize)` of the end; header
/// candidates in that tail are tried last to first, and the first one that
/// decodes as a single complete member ending exactly at end-of-stream
/// decides the outcome.
pub(crate) fn locate_trailer<R: Read + Seek>(
    source: &mut ByteWindow<R>,
    scanner: &HeaderScanner,
) -> Result<TrailerLookup> {
    let (start, end) = (source.start(), source.end());
    // Header + empty deflate block (2) + trailer
    let min_member = HEADER_SIGNATURE.len() as u64 + 2 + MEMBER_TRAILER_SIZE;
    if end - start < min_member {
        return Ok(TrailerLookup::Absent);
    }

    source.seek(SeekFrom::Start(end - 4))?;
    let mut isize_bytes = [0u8; 4];
    source.read_exact(&mut isize_bytes)?;
    let isize = u32::from_le_bytes(isize_bytes) as u64;

    if !plausible_payload_len(isize) {
        tracing::trace!(isize, "last member length is not an offset map");
        return Ok(TrailerLookup::Absent);
    }

    let lower = end.saturating_sub(max_member_len(isize)).max(start);
    let mut upper = end - min_member + 1;

    while let Some(candidate) = scanner.find_last_header(source, lower, upper, end)? {
        if let Some(payload) = decode_member_at(source, candidate, isize, end, scanner.chunk_size())? {
            if !has_index_magic(&payload) {
                return Ok(TrailerLookup::Absent);
            }
            let map = OffsetMap::decode(&payload)?;
            return Ok(TrailerLookup::Found {
                offset: candidate,
                map,
            });
        }
        upper = candidate;
    }

    Ok(TrailerLookup::Absent)
}

/// Decode one member at `offset`; `Some(payload)` only if it holds exactly
/// `isize` bytes and its trailer ends exactly at `end`.
fn decode_member_at<R: Read + Seek>(
    source: &mut ByteWindow<R>,
    offset: u64,
    isize: u64,
    end: u64,
    buffer_size: usize,
) -> Result<Option<Vec<u8>>> {
    source.seek(SeekFrom::Start(offset))?;
    let mut decoder = GzDecoder::new(BufReader::with_capacity(buffer_size, &mut *source));

    let mut payload = Vec::new();
    match (&mut decoder).take(isize + 1).read_to_end(&mut payload) {
        Ok(_) => {}
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof
            ) =>
        {
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }
    if payload.len() as u64 != isize {
        return Ok(None);
    }

    let input = decoder.into_inner();
    let consumed = input.get_ref().position() - input.buffer().len() as u64;
    Ok((consumed == end).then_some(payload))
}
