//! Configuration for gzindex
//!
//! Centralized configuration with sensible defaults.

use crate::error::{GzIndexError, Result};

/// Default buffer size for header scanning and compressed output (32 KiB)
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Default uncompressed bytes per member when auto-marking (32 MiB)
pub const DEFAULT_BYTES_PER_SPLIT: u64 = 32 * 1024 * 1024;

/// Default deflate level
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Host option: target uncompressed bytes per member
pub const OPT_BYTES_PER_SPLIT: &str = "output-bytes-per-split";

/// Host option: scan / flush buffer size in bytes
pub const OPT_BUFFER_SIZE: &str = "buffer-size";

/// Host option: deflate level 0-9
pub const OPT_COMPRESSION_LEVEL: &str = "compression-level";

/// Main configuration for readers, writers and the boundary locator
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Scanning / Buffering
    // -------------------------------------------------------------------------
    /// Chunk size used by the header scanner and the writer's output buffer
    pub buffer_size: usize,

    // -------------------------------------------------------------------------
    // Writer Configuration
    // -------------------------------------------------------------------------
    /// Deflate level (0 = stored, 9 = best)
    pub compression_level: u32,

    /// Start a new member automatically once the current one holds this many
    /// uncompressed bytes. `None` means members only end on explicit marks.
    pub member_size_target: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            member_size_target: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Build a config from host-style `key = value` properties.
    ///
    /// Unknown keys are ignored so a host can pass its whole configuration.
    /// `output-bytes-per-split` always enables auto-marking, defaulting to
    /// [`DEFAULT_BYTES_PER_SPLIT`].
    pub fn from_properties<I, K, V>(props: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut builder = Config::builder().member_size_target(Some(DEFAULT_BYTES_PER_SPLIT));

        for (key, value) in props {
            let (key, value) = (key.as_ref(), value.as_ref().trim());
            match key {
                OPT_BYTES_PER_SPLIT => {
                    builder = builder.member_size_target(Some(parse_number(key, value)?));
                }
                OPT_BUFFER_SIZE => {
                    builder = builder.buffer_size(parse_number(key, value)? as usize);
                }
                OPT_COMPRESSION_LEVEL => {
                    builder = builder.compression_level(parse_number(key, value)? as u32);
                }
                _ => {}
            }
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        // The scanner re-anchors chunks by the signature length, so a chunk
        // must be able to hold more than one signature.
        if self.buffer_size < 2 * crate::format::HEADER_SIGNATURE.len() {
            return Err(GzIndexError::Config(format!(
                "{} must be at least {} bytes, got {}",
                OPT_BUFFER_SIZE,
                2 * crate::format::HEADER_SIGNATURE.len(),
                self.buffer_size
            )));
        }
        if self.compression_level > 9 {
            return Err(GzIndexError::Config(format!(
                "{} must be in 0..=9, got {}",
                OPT_COMPRESSION_LEVEL, self.compression_level
            )));
        }
        if self.member_size_target == Some(0) {
            return Err(GzIndexError::Config(format!(
                "{} must be greater than zero",
                OPT_BYTES_PER_SPLIT
            )));
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value.parse::<u64>().map_err(|e| {
        GzIndexError::Config(format!("invalid value {:?} for {}: {}", value, key, e))
    })
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the scan / output buffer size (in bytes)
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// Set the deflate level
    pub fn compression_level(mut self, level: u32) -> Self {
        self.config.compression_level = level;
        self
    }

    /// Set the auto-mark member size (in uncompressed bytes)
    pub fn member_size_target(mut self, target: Option<u64>) -> Self {
        self.config.member_size_target = target;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
