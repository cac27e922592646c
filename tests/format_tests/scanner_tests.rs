//! Tests for HeaderScanner
//!
//! These tests verify:
//! - Every member offset the writer records is found by a forward scan
//! - Scans from inside a member land on the next member
//! - Small chunk sizes still find headers across chunk boundaries

use std::io::Cursor;
use gzindex::format::HEADER_SIGNATURE;
use gzindex::{HeaderScanner, IndexedWriter};

// =============================================================================
// Helper Functions
// =============================================================================

/// Indexed stream with a member every 50 lines; returns bytes and member starts
fn stream_with_members(lines: u64) -> (Vec<u8>, Vec<u64>) {
    let mut writer = IndexedWriter::new(Vec::new()).unwrap();
    for i in 1..=lines {
        writer.write_bytes(format!("record number {}\n", i).as_bytes()).unwrap();
        if i % 50 == 0 {
            writer.mark(i).unwrap();
        }
    }
    let mut starts = vec![0];
    starts.extend(writer.offset_map().iter().map(|e| e.offset));
    let (summary, bytes) = writer.finish().unwrap();
    starts.push(summary.trailer_offset);
    (bytes, starts)
}

// =============================================================================
// Forward Scan Tests
// =============================================================================

#[test]
fn test_stream_starts_with_signature() {
    let (bytes, _) = stream_with_members(10);
    assert_eq!(&bytes[..HEADER_SIGNATURE.len()], &HEADER_SIGNATURE);
}

#[test]
fn test_scan_finds_each_member_start() {
    let (bytes, starts) = stream_with_members(500);
    let scanner = HeaderScanner::default();
    let mut cursor = Cursor::new(&bytes);

    for &start in &starts {
        assert_eq!(scanner.find_header(&mut cursor, start).unwrap(), Some(start));
    }
}

#[test]
fn test_scan_from_inside_member_finds_next() {
    let (bytes, starts) = stream_with_members(500);
    let scanner = HeaderScanner::new(32);
    let mut cursor = Cursor::new(&bytes);

    for pair in starts.windows(2) {
        let found = scanner.find_header(&mut cursor, pair[0] + 1).unwrap();
        assert_eq!(found, Some(pair[1]));
    }

    // Past the trailer header there is nothing left
    let last = *starts.last().unwrap();
    assert_eq!(scanner.find_header(&mut cursor, last + 1).unwrap(), None);
}

#[test]
fn test_chunk_size_does_not_change_results() {
    let (bytes, _) = stream_with_members(300);
    let small = HeaderScanner::new(20);
    let large = HeaderScanner::new(64 * 1024);

    for offset in (0..bytes.len() as u64).step_by(7) {
        let a = small.find_header(&mut Cursor::new(&bytes), offset).unwrap();
        let b = large.find_header(&mut Cursor::new(&bytes), offset).unwrap();
        assert_eq!(a, b, "mismatch scanning from {}", offset);
    }
}

#[test]
fn test_scan_beyond_end_finds_nothing() {
    let (bytes, _) = stream_with_members(10);
    let scanner = HeaderScanner::default();
    let len = bytes.len() as u64;
    assert_eq!(scanner.find_header(&mut Cursor::new(&bytes), len + 100).unwrap(), None);
}
