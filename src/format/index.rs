//! Offset Map
//!
//! Logical key → byte offset of the member that starts at that key. Built by
//! the writer, stored once in the trailer member, loaded once by the reader.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GzIndexError, Result};

use super::{INDEX_ENTRY_SIZE, INDEX_MAGIC, INDEX_PREFIX_SIZE, INDEX_VERSION, MAX_INDEX_PAYLOAD};

/// One (key, offset) pair as stored in the trailer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Caller-supplied logical key
    pub key: u64,
    /// Byte offset of the member header, relative to the stream start
    pub offset: u64,
}

/// On-disk payload of the trailer member. bincode's fixed-int little-endian
/// encoding gives `magic | version | count | (key, offset)*` byte for byte.
#[derive(Serialize, Deserialize)]
struct IndexPayload {
    magic: [u8; 4],
    version: u16,
    entries: Vec<IndexEntry>,
}

/// Ordered logical key → member offset map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetMap {
    entries: BTreeMap<u64, u64>,
}

impl OffsetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, key: u64, offset: u64) {
        self.entries.insert(key, offset);
    }

    /// Offset recorded for exactly `key`
    pub fn get(&self, key: u64) -> Option<u64> {
        self.entries.get(&key).copied()
    }

    pub fn contains_key(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first_key(&self) -> Option<u64> {
        self.entries.keys().next().copied()
    }

    pub fn last_key(&self) -> Option<u64> {
        self.entries.keys().next_back().copied()
    }

    /// Greatest entry with key ≤ `key`
    pub fn floor(&self, key: u64) -> Option<IndexEntry> {
        self.entries
            .range(..=key)
            .next_back()
            .map(|(&key, &offset)| IndexEntry { key, offset })
    }

    /// Entries in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = IndexEntry> + '_ {
        self.entries
            .iter()
            .map(|(&key, &offset)| IndexEntry { key, offset })
    }

    /// Serialize as a trailer payload
    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        let payload = IndexPayload {
            magic: *INDEX_MAGIC,
            version: INDEX_VERSION,
            entries: self.iter().collect(),
        };
        Ok(bincode::serialize(&payload)?)
    }

    /// Parse a trailer payload.
    ///
    /// Fails with `CorruptIndex` unless the payload has the magic, a known
    /// version, exactly `count` entries, strictly increasing keys and
    /// non-decreasing offsets.
    pub(crate) fn decode(bytes: &[u8]) -> Result<Self> {
        if !has_index_magic(bytes) {
            return Err(GzIndexError::CorruptIndex("missing index magic".into()));
        }
        if (bytes.len() as u64) < INDEX_PREFIX_SIZE {
            return Err(GzIndexError::CorruptIndex(format!(
                "payload too short: {} bytes",
                bytes.len()
            )));
        }

        // Check the declared count against the actual length before letting
        // bincode allocate anything.
        let count = u64::from_le_bytes(bytes[6..14].try_into().unwrap_or_default());
        let expected = count
            .checked_mul(INDEX_ENTRY_SIZE)
            .and_then(|n| n.checked_add(INDEX_PREFIX_SIZE));
        if expected != Some(bytes.len() as u64) {
            return Err(GzIndexError::CorruptIndex(format!(
                "entry count {} does not match payload length {}",
                count,
                bytes.len()
            )));
        }

        let payload: IndexPayload = bincode::deserialize(bytes)
            .map_err(|e| GzIndexError::CorruptIndex(e.to_string()))?;

        if payload.version != INDEX_VERSION {
            return Err(GzIndexError::CorruptIndex(format!(
                "unsupported index version: {}",
                payload.version
            )));
        }

        let mut map = OffsetMap::new();
        let mut previous: Option<IndexEntry> = None;
        for entry in payload.entries {
            if let Some(prev) = previous {
                if entry.key <= prev.key || entry.offset < prev.offset {
                    return Err(GzIndexError::CorruptIndex(format!(
                        "entries out of order at key {}",
                        entry.key
                    )));
                }
            }
            map.insert(entry.key, entry.offset);
            previous = Some(entry);
        }
        Ok(map)
    }
}

/// Whether a payload starts like an offset map
pub(crate) fn has_index_magic(bytes: &[u8]) -> bool {
    bytes.len() >= INDEX_MAGIC.len() && &bytes[..INDEX_MAGIC.len()] == INDEX_MAGIC
}

/// Whether an uncompressed length could be an offset-map payload
pub(crate) fn plausible_payload_len(len: u64) -> bool {
    len >= INDEX_PREFIX_SIZE
        && len <= MAX_INDEX_PAYLOAD
        && (len - INDEX_PREFIX_SIZE) % INDEX_ENTRY_SIZE == 0
}
