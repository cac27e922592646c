//! Indexed Writer
//!
//! Compresses a byte stream into independent gzip members, starting a new
//! member on every `mark`, and appends the offset map as a trailer member on
//! `finish`.

use std::io::{self, Write};

use crate::config::Config;
use crate::error::{GzIndexError, Result};
use crate::keys::next_synthetic_key;

use super::member::{write_member, CountingSink, MemberEncoder};
use super::{OffsetMap, MAX_INDEX_ENTRIES};

/// Summary returned by [`IndexedWriter::finish`]
#[derive(Debug, Clone)]
pub struct IndexedFile {
    /// Number of entries in the offset map
    pub entry_count: usize,
    /// Number of data members (the trailer member is not counted)
    pub member_count: u64,
    /// Offset of the trailer member's header
    pub trailer_offset: u64,
    /// Total compressed length, trailer included
    pub compressed_len: u64,
    /// Total uncompressed data length
    pub uncompressed_len: u64,
}

/// Single-writer, sequential gzip member writer with an offset index
///
/// Offsets are relative to the first byte this writer emits, which matches
/// file offsets when writing a fresh file.
pub struct IndexedWriter<W: Write> {
    /// Open member; `None` once finished
    member: Option<MemberEncoder<W>>,
    /// Key → member start offset
    index: OffsetMap,
    /// Last key recorded, for ordering checks
    last_key: Option<u64>,
    /// Uncompressed bytes across all members
    uncompressed: u64,
    /// Data members started so far
    member_count: u64,
    compression_level: u32,
    member_size_target: Option<u64>,
    /// Entries allowed in the offset map
    entry_limit: u64,
}

impl<W: Write> IndexedWriter<W> {
    /// Create a writer with default configuration
    pub fn new(sink: W) -> Result<Self> {
        Self::with_config(sink, &Config::default())
    }

    /// Create a writer
    ///
    /// Writes the first member header immediately.
    pub fn with_config(sink: W, config: &Config) -> Result<Self> {
        config.validate()?;
        let sink = CountingSink::new(sink, config.buffer_size);
        let member = MemberEncoder::begin(sink, config.compression_level)?;

        Ok(Self {
            member: Some(member),
            index: OffsetMap::new(),
            last_key: None,
            uncompressed: 0,
            member_count: 1,
            compression_level: config.compression_level,
            member_size_target: config.member_size_target,
            entry_limit: MAX_INDEX_ENTRIES,
        })
    }

    /// Append uncompressed bytes to the current member.
    ///
    /// With a member size target configured, a member that reaches the
    /// target after this call is closed and a new one is started, keyed by
    /// the total uncompressed length written so far. Once the offset map is
    /// full the current member just keeps growing.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        let member = self.member.as_mut().ok_or(GzIndexError::Finished)?;
        member.write_all(buf)?;
        self.uncompressed += buf.len() as u64;

        if let Some(target) = self.member_size_target {
            if member.len() >= target && (self.index.len() as u64) < self.entry_limit {
                let key = self.bumped(self.uncompressed);
                self.mark(key)?;
            }
        }
        Ok(())
    }

    /// Close the current member, start a new one and record
    /// `key → offset of the new member`.
    ///
    /// `key` must be strictly greater than every key recorded before.
    ///
    /// One stream holds at most [`MAX_INDEX_ENTRIES`] marks, the largest map
    /// a reader accepts; marks past that fail with `IndexFull` and leave the
    /// writer usable.
    pub fn mark(&mut self, key: u64) -> Result<()> {
        if let Some(previous) = self.last_key {
            if key <= previous {
                return Err(GzIndexError::OrderingViolation { previous, key });
            }
        }
        if self.index.len() as u64 >= self.entry_limit {
            return Err(GzIndexError::IndexFull {
                limit: self.entry_limit,
            });
        }

        let member = self.member.take().ok_or(GzIndexError::Finished)?;
        let closed_len = member.len();
        let sink = member.end()?;
        let next = MemberEncoder::begin(sink, self.compression_level)?;
        let offset = next.start();

        tracing::debug!(key, offset, closed_len, "new member");

        self.index.insert(key, offset);
        self.last_key = Some(key);
        self.member_count += 1;
        self.member = Some(next);
        Ok(())
    }

    /// Mark with a key synthesized from the clock.
    ///
    /// For hosts that ask for a fresh member without supplying a key. The key
    /// comes from [`next_synthetic_key`] and is raised above the previous key
    /// if needed. Returns the key used.
    ///
    /// Synthetic keys live in the upper half of the key space, so a caller
    /// key passed to [`mark`](Self::mark) afterwards fails ordering.
    pub fn mark_synthetic(&mut self) -> Result<u64> {
        let key = self.bumped(next_synthetic_key());
        self.mark(key)?;
        Ok(key)
    }

    /// `candidate`, or the smallest key that keeps ordering if it is too small
    fn bumped(&self, candidate: u64) -> u64 {
        match self.last_key {
            Some(previous) if candidate <= previous => previous.saturating_add(1),
            _ => candidate,
        }
    }

    /// Close the last member, append the trailer member, and flush the sink.
    ///
    /// Consumes the writer; the sink is handed back with the summary.
    pub fn finish(mut self) -> Result<(IndexedFile, W)> {
        let member = self.member.take().ok_or(GzIndexError::Finished)?;
        let sink = member.end()?;

        let trailer_offset = sink.written();
        let payload = self.index.encode()?;
        let sink = write_member(sink, &payload, self.compression_level)?;
        let compressed_len = sink.written();
        let inner = sink.into_inner()?;

        let summary = IndexedFile {
            entry_count: self.index.len(),
            member_count: self.member_count,
            trailer_offset,
            compressed_len,
            uncompressed_len: self.uncompressed,
        };

        tracing::info!(
            entries = summary.entry_count,
            members = summary.member_count,
            compressed_len,
            uncompressed_len = summary.uncompressed_len,
            "indexed stream finished"
        );

        Ok((summary, inner))
    }

    /// Offset map recorded so far
    pub fn offset_map(&self) -> &OffsetMap {
        &self.index
    }

    /// Compressed bytes emitted so far (buffered bytes included)
    pub fn bytes_written(&self) -> u64 {
        self.member
            .as_ref()
            .map(|m| m.emitted())
            .unwrap_or_default()
    }

    /// Uncompressed bytes accepted so far
    pub fn uncompressed_bytes(&self) -> u64 {
        self.uncompressed
    }

    /// Data members started so far, the open one included
    pub fn member_count(&self) -> u64 {
        self.member_count
    }

    /// Last key recorded
    pub fn last_key(&self) -> Option<u64> {
        self.last_key
    }
}

impl<W: Write> Write for IndexedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(into_io)?;
        Ok(buf.len())
    }

    /// Sync-flushes the open member; the stream stays valid gzip.
    fn flush(&mut self) -> io::Result<()> {
        match self.member.as_mut() {
            Some(member) => member.flush(),
            None => Ok(()),
        }
    }
}

pub(crate) fn into_io(e: GzIndexError) -> io::Error {
    match e {
        GzIndexError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}
