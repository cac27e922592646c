//! # gzindex
//!
//! Random-access, splittable gzip:
//! - Independent gzip members, one started per logical key
//! - An offset index stored as the final gzip member
//! - Jump-to-key reads without decompressing from the start
//! - Split alignment by header-signature scanning for parallel readers
//!
//! Output stays a valid multi-member gzip stream for any standard decoder.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────┐        ┌──────────────────────────┐
//! │      IndexedWriter       │        │       Host Codec         │
//! │  write / mark / finish   │◀───────│  (thin adapter, codec)   │
//! └────────────┬─────────────┘        └────────────┬─────────────┘
//!              │ members + trailer                 │ split ranges
//!              ▼                                   ▼
//! ┌──────────────────────────┐        ┌──────────────────────────┐
//! │      IndexedReader       │        │   Split Boundary Locator │
//! │  detect / open / jump_to │        │   align / SplitReader    │
//! └────────────┬─────────────┘        └────────────┬─────────────┘
//!              │                                   │
//!              └───────────────┬───────────────────┘
//!                              ▼
//!              ┌──────────────────────────────┐
//!              │ HeaderScanner · ByteWindow   │
//!              └──────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod source;
pub mod format;
pub mod keys;
pub mod split;
pub mod codec;
pub mod parallel;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{GzIndexError, Result};
pub use config::Config;
pub use source::ByteWindow;
pub use format::{HeaderScanner, IndexEntry, IndexedFile, IndexedReader, IndexedWriter, OffsetMap};
pub use split::{align, AlignedRange, SplitReader, SplitState};
pub use codec::SplittableGzipCodec;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of gzindex
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
