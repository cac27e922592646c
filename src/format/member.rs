//! Gzip member framing
//!
//! Writes one RFC 1952 member at a time: fixed header, raw deflate payload,
//! then CRC32 + ISIZE. Headers are written by hand so every member starts
//! with exactly [`HEADER_SIGNATURE`], which is what the scanner looks for.

use std::io::{self, BufWriter, Write};

use flate2::write::DeflateEncoder;
use flate2::Compression;

/// Fixed 10-byte header opening every member this crate writes
pub const HEADER_SIGNATURE: [u8; 10] = [
    0x1f, 0x8b, // magic
    0x08, // CM = deflate
    0x00, // FLG: no optional fields
    0x00, 0x00, 0x00, 0x00, // MTIME
    0x00, // XFL
    0xff, // OS = unknown
];

/// Member trailer: CRC32 (4) + ISIZE (4)
pub(crate) const MEMBER_TRAILER_SIZE: u64 = 8;

/// Upper bound on the encoded size of a member holding `isize` bytes.
///
/// Deflate never expands input by more than its stored-block framing
/// (5 bytes per 16 KiB block in the worst case); the slack covers the final
/// block and encoder bookkeeping.
pub(crate) fn max_member_len(isize: u64) -> u64 {
    HEADER_SIGNATURE.len() as u64 + isize + 5 * (isize / 16_383 + 1) + 64 + MEMBER_TRAILER_SIZE
}

// =============================================================================
// Counting Sink
// =============================================================================

/// Buffered sink that tracks how many bytes have been emitted
pub(crate) struct CountingSink<W: Write> {
    inner: BufWriter<W>,
    written: u64,
}

impl<W: Write> CountingSink<W> {
    pub(crate) fn new(inner: W, buffer_size: usize) -> Self {
        Self {
            inner: BufWriter::with_capacity(buffer_size, inner),
            written: 0,
        }
    }

    /// Bytes emitted so far (buffered bytes included)
    pub(crate) fn written(&self) -> u64 {
        self.written
    }

    /// Flush and hand back the underlying sink
    pub(crate) fn into_inner(self) -> io::Result<W> {
        let mut inner = self.inner.into_inner().map_err(|e| e.into_error())?;
        inner.flush()?;
        Ok(inner)
    }
}

impl<W: Write> Write for CountingSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// =============================================================================
// Member Encoder
// =============================================================================

/// One open gzip member
pub(crate) struct MemberEncoder<W: Write> {
    encoder: DeflateEncoder<CountingSink<W>>,
    crc: crc32fast::Hasher,
    /// Uncompressed bytes in this member
    len: u64,
    /// Offset of this member's header in the sink
    start: u64,
}

impl<W: Write> MemberEncoder<W> {
    /// Write the member header and open a deflate stream behind it
    pub(crate) fn begin(mut sink: CountingSink<W>, level: u32) -> io::Result<Self> {
        let start = sink.written();
        sink.write_all(&HEADER_SIGNATURE)?;

        Ok(Self {
            encoder: DeflateEncoder::new(sink, Compression::new(level)),
            crc: crc32fast::Hasher::new(),
            len: 0,
            start,
        })
    }

    pub(crate) fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.encoder.write_all(buf)?;
        self.crc.update(buf);
        self.len += buf.len() as u64;
        Ok(())
    }

    /// Sync-flush the deflate stream so everything so far reaches the sink
    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }

    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    pub(crate) fn start(&self) -> u64 {
        self.start
    }

    /// Bytes that have left the deflate encoder so far
    pub(crate) fn emitted(&self) -> u64 {
        self.encoder.get_ref().written()
    }

    /// Close the deflate stream and append CRC32 + ISIZE
    pub(crate) fn end(self) -> io::Result<CountingSink<W>> {
        let mut sink = self.encoder.finish()?;
        sink.write_all(&self.crc.finalize().to_le_bytes())?;
        // ISIZE is the length modulo 2^32
        sink.write_all(&(self.len as u32).to_le_bytes())?;
        Ok(sink)
    }
}

/// Encode `payload` as one complete member into `sink`
pub(crate) fn write_member<W: Write>(
    sink: CountingSink<W>,
    payload: &[u8],
    level: u32,
) -> io::Result<CountingSink<W>> {
    let mut member = MemberEncoder::begin(sink, level)?;
    member.write_all(payload)?;
    member.end()
}
