//! Indexed gzip format
//!
//! A stream of independent gzip members followed by one trailer member whose
//! payload is the offset index. Any gzip decoder reads it as N+1 concatenated
//! members.
//!
//! ## Stream Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Member 1                                                │
//! │   Header (10) | Deflate payload | CRC32 (4) | ISIZE (4) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Member 2 ... Member N  (one per mark)                   │
//! ├─────────────────────────────────────────────────────────┤
//! │ Trailer member                                          │
//! │   Header (10) | Deflate(offset map) | CRC32 | ISIZE     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Member Header (fixed, also the scan signature)
//! ```text
//! 1f 8b | 08 | 00  | 00 00 00 00 | 00  | ff
//! magic | CM | FLG | MTIME       | XFL | OS
//! ```
//!
//! ## Offset Map Payload (uncompressed, little-endian)
//! ```text
//! Magic: "GZIX" (4) | Version: u16 (2) | Count: u64 (8)
//! [Key: u64 (8) | Offset: u64 (8)] × Count
//! ```

mod index;
mod member;
mod reader;
mod scanner;
mod writer;

pub use index::{IndexEntry, OffsetMap};
pub use member::HEADER_SIGNATURE;
pub use reader::IndexedReader;
pub use scanner::HeaderScanner;
pub use writer::{IndexedFile, IndexedWriter};

pub(crate) use reader::{locate_trailer, TrailerLookup};
pub(crate) use writer::into_io;

// =============================================================================
// Shared Constants (used by writer, reader, scanner)
// =============================================================================

/// Magic bytes opening the offset-map payload
pub(crate) const INDEX_MAGIC: &[u8; 4] = b"GZIX";

/// Current offset-map payload version
pub(crate) const INDEX_VERSION: u16 = 1;

/// Payload prefix: Magic (4) + Version (2) + Count (8) = 14 bytes
pub(crate) const INDEX_PREFIX_SIZE: u64 = 14;

/// Serialized size of one (key, offset) pair
pub(crate) const INDEX_ENTRY_SIZE: u64 = 16;

/// Most entries one offset map may hold (16M)
pub const MAX_INDEX_ENTRIES: u64 = 1 << 24;

/// Largest offset-map payload a reader will consider
pub(crate) const MAX_INDEX_PAYLOAD: u64 = INDEX_PREFIX_SIZE + INDEX_ENTRY_SIZE * MAX_INDEX_ENTRIES;
