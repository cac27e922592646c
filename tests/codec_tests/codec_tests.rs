//! Tests for SplittableGzipCodec
//!
//! These tests verify:
//! - Output configured from host properties auto-marks members
//! - The host reset signal starts members under synthetic keys
//! - Split input reports aligned boundaries and progress
//! - Output is unusable after finish

use std::io::{Cursor, Read, Write};

use gzindex::codec::{CompressionOutput, SplitCompressionInput, DEFAULT_EXTENSION};
use gzindex::config::{Config, DEFAULT_BYTES_PER_SPLIT};
use gzindex::keys::is_synthetic;
use gzindex::{ByteWindow, GzIndexError, IndexedReader, SplittableGzipCodec};

// =============================================================================
// Helper Functions
// =============================================================================

fn open(bytes: &[u8]) -> IndexedReader<Cursor<&[u8]>> {
    IndexedReader::open(ByteWindow::new(Cursor::new(bytes)).unwrap()).unwrap()
}

fn read_all<R: Read>(reader: &mut R) -> Vec<u8> {
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    out
}

/// 2000 lines written through the codec with auto-marking every 1000 bytes
fn codec_stream() -> (SplittableGzipCodec, Vec<u8>, Vec<u8>) {
    let codec = SplittableGzipCodec::from_properties([("output-bytes-per-split", "1000")]).unwrap();
    let mut output = codec.create_output_stream(Vec::new()).unwrap();
    let mut expected = Vec::new();
    for i in 0..2000 {
        let line = format!("line {:05} of the codec stream\n", i);
        output.write_all(line.as_bytes()).unwrap();
        expected.extend_from_slice(line.as_bytes());
    }
    (codec, output.into_inner().unwrap(), expected)
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_default_extension() {
    let codec = SplittableGzipCodec::default();
    assert_eq!(codec.default_extension(), DEFAULT_EXTENSION);
    assert_eq!(codec.default_extension(), ".gz");
}

#[test]
fn test_properties_enable_auto_marking() {
    let codec = SplittableGzipCodec::from_properties(Vec::<(String, String)>::new()).unwrap();
    assert_eq!(codec.config().member_size_target, Some(DEFAULT_BYTES_PER_SPLIT));

    let codec = SplittableGzipCodec::new(Config::default());
    assert_eq!(codec.config().member_size_target, None);
}

#[test]
fn test_bad_properties_rejected() {
    let result = SplittableGzipCodec::from_properties([("output-bytes-per-split", "lots")]);
    assert!(matches!(result, Err(GzIndexError::Config(_))));
}

// =============================================================================
// Output Tests
// =============================================================================

#[test]
fn test_output_marks_by_size() {
    let codec = SplittableGzipCodec::from_properties([("output-bytes-per-split", "8")]).unwrap();
    let mut output = codec.create_output_stream(Vec::new()).unwrap();

    let lines: [&[u8]; 3] = [b"first line\n", b"second line\n", b"third line\n"];
    for line in lines {
        output.write_all(line).unwrap();
    }
    output.finish().unwrap();
    assert_eq!(output.summary().unwrap().entry_count, 3);

    let bytes = output.into_inner().unwrap();
    let mut reader = open(&bytes);
    assert_eq!(reader.offset_map().unwrap().len(), 3);
    assert_eq!(read_all(&mut reader), lines.concat());
}

#[test]
fn test_reset_state_uses_synthetic_keys() {
    let codec = SplittableGzipCodec::default();
    let mut output = codec.create_output_stream(Vec::new()).unwrap();

    output.write_all(b"before reset\n").unwrap();
    output.reset_state().unwrap();
    output.write_all(b"between resets\n").unwrap();
    output.reset_state().unwrap();
    output.write_all(b"after reset\n").unwrap();

    let bytes = output.into_inner().unwrap();
    let mut reader = open(&bytes);
    let keys: Vec<u64> = reader.offset_map().unwrap().iter().map(|e| e.key).collect();
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().all(|&k| is_synthetic(k)));
    assert!(keys[0] < keys[1]);

    reader.jump_to(keys[1]).unwrap();
    assert_eq!(read_all(&mut reader), b"after reset\n");
}

#[test]
fn test_write_after_finish_fails() {
    let codec = SplittableGzipCodec::default();
    let mut output = codec.create_output_stream(Vec::new()).unwrap();
    output.write_all(b"data").unwrap();
    output.finish().unwrap();

    assert!(output.write_all(b"more").is_err());
    assert!(matches!(output.reset_state(), Err(GzIndexError::Finished)));
    // Finishing twice is harmless
    output.finish().unwrap();
    assert!(output.into_inner().is_ok());
}

// =============================================================================
// Input Tests
// =============================================================================

#[test]
fn test_input_reports_aligned_range() {
    let (codec, bytes, _) = codec_stream();
    let reader = open(&bytes);
    let offsets: Vec<u64> = reader.offset_map().unwrap().iter().map(|e| e.offset).collect();
    assert!(offsets.len() > 10);

    let input = codec
        .create_input_stream(Cursor::new(bytes.as_slice()), offsets[2] - 5, offsets[6] + 5)
        .unwrap();
    assert_eq!(input.adjusted_start(), offsets[2]);
    assert_eq!(input.adjusted_end(), offsets[7]);
    assert_eq!(input.position(), offsets[2]);
}

#[test]
fn test_input_splits_cover_stream() {
    let (codec, bytes, expected) = codec_stream();
    let len = bytes.len() as u64;

    let mut joined = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + 700).min(len);
        let mut input = codec
            .create_input_stream(Cursor::new(bytes.as_slice()), start, end)
            .unwrap();
        assert!(input.adjusted_end() >= input.adjusted_start());
        joined.extend(read_all(&mut input));
        start = end;
    }
    assert_eq!(joined, expected);
}

#[test]
fn test_input_progress_and_reset() {
    let (codec, bytes, _) = codec_stream();
    let len = bytes.len() as u64;
    let mut input = codec
        .create_input_stream(Cursor::new(bytes.as_slice()), 0, len)
        .unwrap();

    let mut buf = [0u8; 100];
    input.read_exact(&mut buf).unwrap();
    assert_eq!(input.uncompressed_position(), 100);
    let first = buf;

    let rest = read_all(&mut input);
    assert!(input.position() > 0);
    assert!(input.position() <= len);

    input.reset_state().unwrap();
    assert_eq!(input.uncompressed_position(), 0);
    let again = read_all(&mut input);
    assert_eq!(&again[..100], &first[..]);
    assert_eq!(again.len(), 100 + rest.len());
}
