//! Host Codec Adapter
//!
//! Thin binding of the writer, reader and boundary locator into the shapes a
//! batch-processing host expects from a splittable compression codec. Every
//! call is delegated straight through; no format logic lives here.
//!
//! ## Host Contract
//! - `create_output_stream(sink)`: compressed output; the host's "reset
//!   compressor state" signal starts a new member under a synthetic key.
//! - `create_input_stream(source, split_start, split_end)`: aligned split
//!   input reporting its compressed position for progress.

use std::io::{self, Read, Seek, Write};

use crate::config::Config;
use crate::error::{GzIndexError, Result};
use crate::format::{into_io, IndexedFile, IndexedWriter};
use crate::source::ByteWindow;
use crate::split::SplitReader;

/// Default file extension for codec output
pub const DEFAULT_EXTENSION: &str = ".gz";

/// Compressed output as a host sees it
pub trait CompressionOutput: Write {
    /// Finish the stream without closing the host's sink
    fn finish(&mut self) -> Result<()>;

    /// Start an independent unit of output
    fn reset_state(&mut self) -> Result<()>;
}

/// Split-aware compressed input as a host sees it
pub trait SplitCompressionInput: Read {
    /// Compressed offset the last read started from
    fn position(&self) -> u64;

    /// Split start after alignment
    fn adjusted_start(&self) -> u64;

    /// Split end after alignment
    fn adjusted_end(&self) -> u64;

    fn reset_state(&mut self) -> Result<()>;
}

/// Splittable gzip codec
#[derive(Debug, Clone, Default)]
pub struct SplittableGzipCodec {
    config: Config,
}

impl SplittableGzipCodec {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Codec configured from host properties (see [`Config::from_properties`])
    pub fn from_properties<I, K, V>(props: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Ok(Self::new(Config::from_properties(props)?))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn default_extension(&self) -> &'static str {
        DEFAULT_EXTENSION
    }

    /// Aligned split input over `raw` for `[split_start, split_end)`
    pub fn create_input_stream<R: Read + Seek>(
        &self,
        raw: R,
        split_start: u64,
        split_end: u64,
    ) -> Result<SplitGzipInput<R>> {
        let mut split = SplitReader::new(ByteWindow::new(raw)?, split_start, split_end, &self.config);
        split.locate()?;
        Ok(SplitGzipInput { split })
    }

    /// Indexed output over `raw`
    pub fn create_output_stream<W: Write>(&self, raw: W) -> Result<SplitGzipOutput<W>> {
        Ok(SplitGzipOutput {
            writer: Some(IndexedWriter::with_config(raw, &self.config)?),
            finished: None,
        })
    }
}

// =============================================================================
// Output
// =============================================================================

/// Codec output stream
pub struct SplitGzipOutput<W: Write> {
    writer: Option<IndexedWriter<W>>,
    finished: Option<(IndexedFile, W)>,
}

impl<W: Write> SplitGzipOutput<W> {
    /// Summary of the finished stream
    pub fn summary(&self) -> Option<&IndexedFile> {
        self.finished.as_ref().map(|(summary, _)| summary)
    }

    /// Finish if needed and hand back the sink
    pub fn into_inner(mut self) -> Result<W> {
        CompressionOutput::finish(&mut self)?;
        self.finished
            .take()
            .map(|(_, sink)| sink)
            .ok_or(GzIndexError::Finished)
    }

    fn writer(&mut self) -> Result<&mut IndexedWriter<W>> {
        self.writer.as_mut().ok_or(GzIndexError::Finished)
    }
}

impl<W: Write> Write for SplitGzipOutput<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer().map_err(into_io)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> CompressionOutput for SplitGzipOutput<W> {
    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            self.finished = Some(writer.finish()?);
        }
        Ok(())
    }

    /// Starts a new member under a clock-derived key. This closes the member
    /// rather than only resetting deflate state.
    fn reset_state(&mut self) -> Result<()> {
        self.writer()?.mark_synthetic()?;
        Ok(())
    }
}

// =============================================================================
// Input
// =============================================================================

/// Codec split input stream
pub struct SplitGzipInput<R> {
    split: SplitReader<R>,
}

impl<R> SplitGzipInput<R> {
    /// Uncompressed bytes returned so far
    pub fn uncompressed_position(&self) -> u64 {
        self.split.uncompressed_position()
    }

    pub fn split(&self) -> &SplitReader<R> {
        &self.split
    }
}

impl<R: Read + Seek> Read for SplitGzipInput<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.split.read(buf)
    }
}

impl<R: Read + Seek> SplitCompressionInput for SplitGzipInput<R> {
    fn position(&self) -> u64 {
        self.split.position()
    }

    fn adjusted_start(&self) -> u64 {
        self.split.range().map(|r| r.start).unwrap_or(self.split.requested_start())
    }

    fn adjusted_end(&self) -> u64 {
        self.split.range().map(|r| r.end).unwrap_or(self.split.requested_end())
    }

    /// Restarts the whole split from its aligned start.
    fn reset_state(&mut self) -> Result<()> {
        self.split.reset()
    }
}
