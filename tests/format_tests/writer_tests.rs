//! Tests for IndexedWriter
//!
//! These tests verify:
//! - Output is a valid multi-member gzip stream for standard decoders
//! - One index entry per mark, at the offset recorded at mark time
//! - Strict key ordering
//! - Automatic marks by member size
//! - Synthetic keys

use std::io::{Read, Write};

use flate2::read::MultiGzDecoder;
use gzindex::config::Config;
use gzindex::format::HEADER_SIGNATURE;
use gzindex::keys::{is_synthetic, SYNTHETIC_KEY_BASE};
use gzindex::{GzIndexError, IndexedWriter};

// =============================================================================
// Helper Functions
// =============================================================================

const LINE: &[u8] = b"This is line\n";

fn decode_all(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    MultiGzDecoder::new(bytes).read_to_end(&mut out).unwrap();
    out
}

// =============================================================================
// Basic Writing Tests
// =============================================================================

#[test]
fn test_empty_writer_produces_valid_gzip() {
    let writer = IndexedWriter::new(Vec::new()).unwrap();
    let (summary, bytes) = writer.finish().unwrap();

    assert_eq!(summary.entry_count, 0);
    assert_eq!(summary.member_count, 1);
    assert_eq!(summary.uncompressed_len, 0);
    assert_eq!(summary.compressed_len, bytes.len() as u64);

    // A standard decoder sees the empty member plus the index payload
    let decoded = decode_all(&bytes);
    assert!(decoded.starts_with(b"GZIX"));
}

#[test]
fn test_standard_decoder_reads_data_then_index() {
    let mut writer = IndexedWriter::new(Vec::new()).unwrap();
    let mut expected = Vec::new();
    for i in 1..=1000u64 {
        writer.write_bytes(LINE).unwrap();
        expected.extend_from_slice(LINE);
        if i % 100 == 0 {
            writer.mark(i / 100).unwrap();
        }
    }
    let (summary, bytes) = writer.finish().unwrap();

    let decoded = decode_all(&bytes);
    assert_eq!(&decoded[..expected.len()], expected.as_slice());
    assert_eq!(&decoded[expected.len()..expected.len() + 4], b"GZIX");
    assert_eq!(summary.uncompressed_len, expected.len() as u64);
}

#[test]
fn test_io_write_trait() {
    let mut writer = IndexedWriter::new(Vec::new()).unwrap();
    write!(writer, "hello {}", 42).unwrap();
    writer.flush().unwrap();
    assert_eq!(writer.uncompressed_bytes(), 8);
    assert!(writer.bytes_written() > HEADER_SIGNATURE.len() as u64);

    let (_, bytes) = writer.finish().unwrap();
    assert!(decode_all(&bytes).starts_with(b"hello 42"));
}

// =============================================================================
// Index Tests
// =============================================================================

#[test]
fn test_one_entry_per_mark() {
    let mut writer = IndexedWriter::new(Vec::new()).unwrap();
    let mut recorded = Vec::new();
    for i in 1..=10000u64 {
        if i % 100 == 0 {
            writer.mark(i / 100).unwrap();
            recorded.push((i / 100, writer.offset_map().get(i / 100).unwrap()));
        }
        writer.write_bytes(LINE).unwrap();
    }

    assert_eq!(writer.offset_map().len(), 100);
    assert_eq!(writer.member_count(), 101);
    assert_eq!(writer.last_key(), Some(100));

    let map = writer.offset_map().clone();
    let (summary, bytes) = writer.finish().unwrap();
    assert_eq!(summary.entry_count, 100);

    for (key, offset) in recorded {
        assert_eq!(map.get(key), Some(offset));
        let at = offset as usize;
        assert_eq!(&bytes[at..at + HEADER_SIGNATURE.len()], &HEADER_SIGNATURE);
    }
    let trailer = summary.trailer_offset as usize;
    assert_eq!(&bytes[trailer..trailer + HEADER_SIGNATURE.len()], &HEADER_SIGNATURE);
}

#[test]
fn test_offsets_increase_with_keys() {
    let mut writer = IndexedWriter::new(Vec::new()).unwrap();
    for key in [3u64, 9, 27, 81] {
        writer.write_bytes(&vec![b'x'; 500]).unwrap();
        writer.mark(key).unwrap();
    }
    let offsets: Vec<u64> = writer.offset_map().iter().map(|e| e.offset).collect();
    assert!(offsets.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_mark_rejects_non_increasing_keys() {
    let mut writer = IndexedWriter::new(Vec::new()).unwrap();
    writer.mark(5).unwrap();

    match writer.mark(5) {
        Err(GzIndexError::OrderingViolation { previous, key }) => {
            assert_eq!(previous, 5);
            assert_eq!(key, 5);
        }
        other => panic!("Expected OrderingViolation, got {:?}", other.map(|_| ())),
    }
    assert!(matches!(writer.mark(4), Err(GzIndexError::OrderingViolation { .. })));

    // The writer is still usable after a rejected mark
    writer.mark(6).unwrap();
    assert_eq!(writer.offset_map().len(), 2);
    writer.finish().unwrap();
}

// =============================================================================
// Automatic and Synthetic Marks
// =============================================================================

#[test]
fn test_auto_mark_by_member_size() {
    let config = Config::builder().member_size_target(Some(8)).build();
    let mut writer = IndexedWriter::with_config(Vec::new(), &config).unwrap();

    writer.write_bytes(b"This\t10000\n").unwrap();
    writer.write_bytes(b"is\t10000\n").unwrap();
    writer.write_bytes(b"line\t10000\n").unwrap();

    // Each write fills a member past the target; keys are uncompressed offsets
    let keys: Vec<u64> = writer.offset_map().iter().map(|e| e.key).collect();
    assert_eq!(keys, vec![11, 20, 31]);
}

#[test]
fn test_auto_mark_stays_ordered_after_larger_caller_key() {
    let config = Config::builder().member_size_target(Some(100)).build();
    let mut writer = IndexedWriter::with_config(Vec::new(), &config).unwrap();

    writer.mark(1_000_000).unwrap();
    writer.write_bytes(&[b'a'; 150]).unwrap();

    assert_eq!(writer.last_key(), Some(1_000_001));
}

#[test]
fn test_small_writes_do_not_auto_mark_early() {
    let config = Config::builder().member_size_target(Some(1024)).build();
    let mut writer = IndexedWriter::with_config(Vec::new(), &config).unwrap();
    for _ in 0..78 {
        writer.write_bytes(LINE).unwrap(); // 78 * 13 = 1014 bytes
    }
    assert!(writer.offset_map().is_empty());

    writer.write_bytes(LINE).unwrap();
    assert_eq!(writer.offset_map().len(), 1);
    assert_eq!(writer.offset_map().first_key(), Some(79 * 13));
}

#[test]
fn test_synthetic_marks() {
    let mut writer = IndexedWriter::new(Vec::new()).unwrap();
    writer.mark(7).unwrap();
    writer.write_bytes(LINE).unwrap();
    let first = writer.mark_synthetic().unwrap();
    writer.write_bytes(LINE).unwrap();
    let second = writer.mark_synthetic().unwrap();

    assert!(first >= SYNTHETIC_KEY_BASE);
    assert!(is_synthetic(second));
    assert!(second > first);
    assert_eq!(writer.offset_map().len(), 3);

    // Caller keys cannot go back below synthetic ones
    assert!(matches!(writer.mark(8), Err(GzIndexError::OrderingViolation { .. })));
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = Config::builder().compression_level(11).build();
    assert!(matches!(
        IndexedWriter::with_config(Vec::new(), &config),
        Err(GzIndexError::Config(_))
    ));
}
