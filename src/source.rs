//! Seekable Byte Source
//!
//! A `Read + Seek` view over a random-access byte stream limited to a window
//! `[start, end)`. Positions are absolute offsets in the underlying stream;
//! the window only limits what can be read.
//!
//! Reads stop at `end` even when the medium continues past it, which is how a
//! split consumer is kept from decoding into its neighbour's range.

use std::io::{self, Read, Seek, SeekFrom};

/// Bounded random-access view over `R`
#[derive(Debug)]
pub struct ByteWindow<R> {
    inner: R,
    /// First readable offset (inclusive)
    start: u64,
    /// Read limit (exclusive)
    end: u64,
    /// Current absolute offset
    pos: u64,
}

impl<R: Read + Seek> ByteWindow<R> {
    /// Window over the whole stream, `[0, len)`
    pub fn new(mut inner: R) -> io::Result<Self> {
        let end = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner,
            start: 0,
            end,
            pos: 0,
        })
    }

    /// Window over `[start, end)`, positioned at `start`.
    ///
    /// `end` is clamped to the stream length; `start` is clamped to `end`.
    pub fn with_range(mut inner: R, start: u64, end: u64) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        let end = end.min(len);
        let start = start.min(end);
        inner.seek(SeekFrom::Start(start))?;
        Ok(Self {
            inner,
            start,
            end,
            pos: start,
        })
    }

    /// Narrow or move the window. The position is moved to the new start.
    pub fn set_range(&mut self, start: u64, end: u64) -> io::Result<()> {
        let len = self.inner.seek(SeekFrom::End(0))?;
        self.end = end.min(len);
        self.start = start.min(self.end);
        self.pos = self.inner.seek(SeekFrom::Start(self.start))?;
        Ok(())
    }
}

impl<R> ByteWindow<R> {
    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Current absolute offset
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Bytes left before `end`
    pub fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.pos)
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for ByteWindow<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = (buf.len() as u64).min(remaining) as usize;
        let n = self.inner.read(&mut buf[..want])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Seek> Seek for ByteWindow<R> {
    /// Seeks in absolute stream offsets; `End` is relative to the window end.
    ///
    /// Targets before the window start are rejected; targets past the end are
    /// allowed and simply read as end-of-stream.
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let target = match target {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.end.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };

        match target {
            Some(offset) if offset >= self.start => {
                self.pos = self.inner.seek(SeekFrom::Start(offset))?;
                Ok(self.pos)
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("seek before window start {}", self.start),
            )),
        }
    }
}

/// Read until `buf` is full or the source is exhausted.
///
/// Unlike `read_exact`, a short read at end-of-stream is not an error.
pub(crate) fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
