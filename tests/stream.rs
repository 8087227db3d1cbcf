//! Chunk stream parse / repair / serialize tests.

use proptest::prelude::*;
use stegsift::chunk::chunk_crc;
use stegsift::stream::{repair_bytes, PNG_SIGNATURE};
use stegsift::{ChunkStream, ChunkType, StreamEnd, StreamError};

fn chunk_bytes(tag: &[u8; 4], data: &[u8], crc: u32) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(data.len() as u32).to_be_bytes());
    v.extend_from_slice(tag);
    v.extend_from_slice(data);
    v.extend_from_slice(&crc.to_be_bytes());
    v
}

fn good_chunk(tag: &[u8; 4], data: &[u8]) -> Vec<u8> {
    chunk_bytes(tag, data, chunk_crc(ChunkType(*tag), data))
}

fn ihdr_data() -> Vec<u8> {
    let mut d = Vec::new();
    d.extend_from_slice(&1u32.to_be_bytes());
    d.extend_from_slice(&1u32.to_be_bytes());
    d.extend_from_slice(&[8, 6, 0, 0, 0]);
    d
}

fn well_formed() -> Vec<u8> {
    let mut v = PNG_SIGNATURE.to_vec();
    v.extend(good_chunk(b"IHDR", &ihdr_data()));
    v.extend(good_chunk(b"tEXt", b"Comment\0hello"));
    v.extend(good_chunk(b"IDAT", &[0x78, 0x9c, 0x63, 0x60, 0x00, 0x00]));
    v.extend(good_chunk(b"IEND", &[]));
    v
}

#[test]
fn missing_signature_is_not_container() {
    assert!(matches!(ChunkStream::parse(b"GIF89a"), Err(StreamError::NotContainer)));
    assert!(matches!(ChunkStream::parse(b""), Err(StreamError::NotContainer)));
    assert!(matches!(repair_bytes(b"\x89PNX\r\n\x1a\n"), Err(StreamError::NotContainer)));
}

#[test]
fn parses_well_formed_stream() {
    let bytes = well_formed();
    let s = ChunkStream::parse(&bytes).unwrap();
    let kinds: Vec<ChunkType> = s.chunks().iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![ChunkType::IHDR, ChunkType::TEXT, ChunkType::IDAT, ChunkType::IEND]);
    assert_eq!(s.end(), StreamEnd::Terminal);
    assert_eq!(s.trailing_len(), 0);
    assert_eq!(s.get(0).unwrap().offset, 8);
    assert_eq!(s.get(0).unwrap().length, 13);
    assert!(s.chunks().iter().all(|c| c.crc_matches()));
}

#[test]
fn bad_ihdr_crc_is_repaired() {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend(chunk_bytes(b"IHDR", &ihdr_data(), 0xDEAD_BEEF));
    bytes.extend(good_chunk(b"IEND", &[]));

    let s = ChunkStream::parse(&bytes).unwrap();
    assert_eq!(s.mismatched().count(), 1);

    let repair = s.repair();
    assert!(repair.changed);
    assert_eq!(repair.fixed, vec![0]);

    let mut expected = b"IHDR".to_vec();
    expected.extend(ihdr_data());
    let expected_crc = crc32fast::hash(&expected);
    assert_eq!(repair.stream.get(0).unwrap().crc, expected_crc);

    let out = repair.stream.serialize();
    assert_eq!(&out[8 + 8 + 13..8 + 8 + 13 + 4], &expected_crc.to_be_bytes());
}

#[test]
fn repair_of_valid_stream_changes_nothing() {
    let bytes = well_formed();
    let (out, changed) = repair_bytes(&bytes).unwrap();
    assert!(!changed);
    assert_eq!(out, bytes);
}

#[test]
fn repair_twice_is_stable() {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend(chunk_bytes(b"IDAT", b"xyz", 1));
    bytes.extend(chunk_bytes(b"IEND", &[], 2));

    let first = ChunkStream::parse(&bytes).unwrap().repair();
    assert!(first.changed);
    let once = first.stream.serialize();

    let second = first.stream.repair();
    assert!(!second.changed);
    assert_eq!(second.stream.serialize(), once);

    let (again, changed) = repair_bytes(&once).unwrap();
    assert!(!changed);
    assert_eq!(again, once);
}

#[test]
fn serialize_agrees_with_write_to() {
    let mut bytes = well_formed();
    let ihdr_crc = 8 + 8 + 13;
    bytes[ihdr_crc] ^= 0xFF;
    let repaired = ChunkStream::parse(&bytes).unwrap().repair().stream;

    let serialized = repaired.serialize();
    assert_eq!(serialized.len(), repaired.encoded_len());

    let mut written = Vec::new();
    repaired.write_to(&mut written).unwrap();
    assert_eq!(serialized, written);
    assert_eq!(serialized, well_formed());
}

#[test]
fn stops_after_iend() {
    let mut bytes = well_formed();
    bytes.extend(good_chunk(b"tEXt", b"hidden\0after"));
    bytes.extend_from_slice(b"PK\x03\x04");

    let s = ChunkStream::parse(&bytes).unwrap();
    assert_eq!(s.len(), 4);
    assert_eq!(s.end(), StreamEnd::Terminal);
    assert_eq!(s.trailing_len(), bytes.len() - well_formed().len());
    assert_eq!(s.serialize(), well_formed());
}

#[test]
fn missing_iend_is_exhausted() {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend(good_chunk(b"IHDR", &ihdr_data()));
    let s = ChunkStream::parse(&bytes).unwrap();
    assert_eq!(s.len(), 1);
    assert_eq!(s.end(), StreamEnd::Exhausted);
    assert_eq!(s.serialize(), bytes);
}

#[test]
fn truncated_payload_keeps_prefix() {
    let bytes = well_formed();
    // Cut inside the IDAT payload.
    let idat_offset = 8 + (8 + 13 + 4) + (8 + 13 + 4);
    let cut = &bytes[..idat_offset + 10];

    let s = ChunkStream::parse(cut).unwrap();
    assert_eq!(s.len(), 2);
    assert_eq!(s.end(), StreamEnd::Truncated { offset: idat_offset });
    assert!(s.is_truncated());
    assert_eq!(s.serialize(), bytes[..idat_offset].to_vec());
}

#[test]
fn truncated_header_keeps_prefix() {
    let bytes = well_formed();
    let cut = &bytes[..8 + 25 + 5];
    let s = ChunkStream::parse(cut).unwrap();
    assert_eq!(s.len(), 1);
    assert_eq!(s.end(), StreamEnd::Truncated { offset: 8 + 25 });
}

#[test]
fn every_cut_point_parses() {
    let bytes = well_formed();
    let full = ChunkStream::parse(&bytes).unwrap();
    for cut in 8..=bytes.len() {
        let s = ChunkStream::parse(&bytes[..cut]).unwrap();
        assert!(s.len() <= full.len());
        assert_eq!(s.chunks(), &full.chunks()[..s.len()]);
    }
}

fn chunk_list() -> impl Strategy<Value = Vec<([u8; 4], Vec<u8>)>> {
    prop::collection::vec(
        (prop::array::uniform4(b'a'..=b'z'), prop::collection::vec(any::<u8>(), 0..48)),
        0..6,
    )
}

fn build(chunks: &[([u8; 4], Vec<u8>)], with_iend: bool) -> Vec<u8> {
    let mut v = PNG_SIGNATURE.to_vec();
    for (tag, data) in chunks {
        v.extend(good_chunk(tag, data));
    }
    if with_iend {
        v.extend(good_chunk(b"IEND", &[]));
    }
    v
}

proptest! {
    #[test]
    fn round_trip(chunks in chunk_list(), with_iend in any::<bool>()) {
        let bytes = build(&chunks, with_iend);
        let once = ChunkStream::parse(&bytes).unwrap().serialize();
        prop_assert_eq!(&once, &bytes);
        let twice = ChunkStream::parse(&once).unwrap().serialize();
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn repaired_checksums_are_correct(
        chunks in chunk_list(),
        corrupt in prop::collection::vec(any::<u32>(), 6),
    ) {
        let mut bytes = PNG_SIGNATURE.to_vec();
        for ((tag, data), crc) in chunks.iter().zip(&corrupt) {
            bytes.extend(chunk_bytes(tag, data, *crc));
        }
        let repair = ChunkStream::parse(&bytes).unwrap().repair();
        for chunk in repair.stream.chunks() {
            prop_assert_eq!(chunk.crc, chunk_crc(chunk.kind, chunk.data));
        }
        let again = repair.stream.repair();
        prop_assert!(!again.changed);
        prop_assert_eq!(again.stream.serialize(), repair.stream.serialize());
    }

    #[test]
    fn truncation_never_fails(chunks in chunk_list(), cut in any::<prop::sample::Index>()) {
        let bytes = build(&chunks, true);
        let full = ChunkStream::parse(&bytes).unwrap();
        let at = 8 + cut.index(bytes.len() - 7);
        let partial = ChunkStream::parse(&bytes[..at]).unwrap();
        prop_assert_eq!(partial.chunks(), &full.chunks()[..partial.len()]);
        if at < bytes.len() {
            prop_assert!(partial.len() < full.len());
        }
    }
}
