use fountain::fec::{encode_blocks, Codec, Decoder, Producer, Redundancy};
use fountain::wire::{decode_batches, message_digest, BlockBatch, WireFormat};
use fountain::FountainError;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;

const M1: &[u8] = br#"[{"name":"alice","account":"10010"},{"name":"bobb","account":"20020"}]"#;
const M2: &[u8] = br#"[{"name":"carol","account":"30030"},{"name":"dann","account":"40040"}]"#;

static CODEC: Lazy<Codec> = Lazy::new(|| Codec::new(7, Redundancy::new(4)).unwrap());

fn batch(seed: u64, message: &[u8], count: usize) -> BlockBatch {
    let ids = Producer::new(seed).ids(count);
    BlockBatch::new(&CODEC, message, encode_blocks(message, &ids, &CODEC).unwrap())
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("fountain-{}-{}", std::process::id(), name))
}

#[test]
fn digest_matches_sha256() {
    let b = batch(8923483, M1, 3);
    assert_eq!(b.digest, hex::encode(Sha256::digest(M1)));
    assert_eq!(b.digest, message_digest(M1));
    assert_eq!(b.digest.len(), 64);
    assert!(b.matches(M1));
    assert!(!b.matches(M2));
    assert_ne!(b.digest, batch(8923486, M2, 3).digest);
}

#[test]
fn batches_survive_both_formats() {
    let original = batch(8923483, M1, 12);
    for format in [WireFormat::Json, WireFormat::Bincode] {
        let bytes = original.to_bytes(format).unwrap();
        let back = BlockBatch::from_bytes(&bytes, format).unwrap();
        assert_eq!(back, original);
    }
}

#[test]
fn json_is_readable() {
    let b = batch(8923483, M1, 1);
    let text = String::from_utf8(b.to_bytes(WireFormat::Json).unwrap()).unwrap();
    assert!(text.contains(r#""kind": "raptor""#));
    assert!(text.contains(r#""source_symbols": 7"#));
    assert!(text.contains(r#""id": 35122"#));
}

#[test]
fn files_decode_end_to_end() {
    let paths = [temp_path("p1.json"), temp_path("p2.bin"), temp_path("p3.bin")];
    let seeds = [8923483u64, 8923484, 9234855];
    for (path, seed) in paths.iter().zip(seeds) {
        batch(seed, M1, 3).write_to(path).unwrap();
    }

    let first = BlockBatch::read_from(&paths[0]).unwrap();
    let codec = Arc::new(first.codec().unwrap());
    let mut dec = Decoder::new(codec, first.message_size).unwrap();
    let mut determined = dec.add_blocks(&first.blocks).unwrap();
    for path in &paths[1..] {
        let next = BlockBatch::read_from(path).unwrap();
        first.ensure_compatible(&next).unwrap();
        determined = dec.add_blocks(&next.blocks).unwrap();
    }
    for path in &paths {
        let _ = std::fs::remove_file(path);
    }

    assert!(determined);
    let out = dec.decode().unwrap();
    assert!(first.matches(&out));
    assert_eq!(out, M1);
}

#[test]
fn incompatible_batches_are_reported() {
    let a = batch(1, M1, 2);
    let lt = Codec::lt(7, Redundancy::new(4)).unwrap();
    let b = BlockBatch::new(&lt, M1, encode_blocks(M1, &[1], &lt).unwrap());
    assert!(matches!(
        a.ensure_compatible(&b),
        Err(FountainError::BatchMismatch(_))
    ));

    let c = batch(2, &M1[..60], 2);
    assert!(matches!(
        a.ensure_compatible(&c),
        Err(FountainError::BatchMismatch(_))
    ));

    // Different message, same shape: compatible, the digest tells them apart.
    let d = batch(3, M2, 2);
    assert!(a.ensure_compatible(&d).is_ok());
    assert_ne!(a.digest, d.digest);
}

#[test]
fn garbage_is_an_error() {
    assert!(matches!(
        BlockBatch::from_bytes(b"{not json", WireFormat::Json),
        Err(FountainError::Json(_))
    ));
    assert!(matches!(
        BlockBatch::from_bytes(&[1, 2, 3], WireFormat::Bincode),
        Err(FountainError::Bincode(_))
    ));
    assert!(matches!(
        BlockBatch::read_from(&temp_path("missing.bin")),
        Err(FountainError::Io(_))
    ));
}

fn lt_batch(message: &[u8]) -> BlockBatch {
    let lt = Codec::lt(7, Redundancy::new(4)).unwrap();
    BlockBatch::new(&lt, message, encode_blocks(message, &[1, 2], &lt).unwrap())
}

#[test]
fn batches_decode_until_determined() {
    let clean = [batch(8923483, M1, 3), batch(8923484, M1, 3), batch(9234855, M1, 3)];
    let decoded = decode_batches(&clean, true).unwrap();
    assert_eq!(decoded.message, M1);
    assert!(decoded.matches);
    assert_eq!(decoded.batches_used, 3);
    assert_eq!((decoded.accepted, decoded.dependent), (7, 2));

    // Determined inside the second batch: the rest is never looked at, not
    // even an incompatible codec or a foreign digest.
    let batches = [
        batch(8923483, M1, 5),
        batch(8923484, M1, 5),
        lt_batch(M1),
        batch(8923486, M2, 5),
    ];
    let decoded = decode_batches(&batches, true).unwrap();
    assert_eq!(decoded.message, M1);
    assert_eq!(decoded.batches_used, 2);
    assert_eq!((decoded.accepted, decoded.dependent), (7, 2));
}

#[test]
fn strict_refuses_a_foreign_digest() {
    let batches = [batch(8923483, M1, 3), batch(8923486, M2, 3)];
    match decode_batches(&batches, true) {
        Err(FountainError::BatchMismatch(reason)) => assert!(reason.contains("digest")),
        other => panic!("expected a digest mismatch, got {:?}", other),
    }
}

#[test]
fn lenient_decode_flags_a_mixture() {
    let batches = [batch(8923484, M1, 3), batch(9234855, M1, 3), batch(8923486, M2, 3)];
    let decoded = decode_batches(&batches, false).unwrap();
    assert!(!decoded.matches);
    assert_ne!(decoded.message, M1);
    assert_ne!(decoded.message, M2);
    assert_eq!(decoded.message.len(), M1.len());
    assert_eq!(decoded.batches_used, 3);
    assert_eq!(decoded.accepted, 7);

    assert!(matches!(
        decode_batches(&batches, true),
        Err(FountainError::BatchMismatch(_))
    ));
}

#[test]
fn incompatible_codec_stops_the_decode() {
    let batches = [batch(1, M1, 3), lt_batch(M1)];
    for strict in [false, true] {
        assert!(matches!(
            decode_batches(&batches, strict),
            Err(FountainError::BatchMismatch(_))
        ));
    }
    let batches = [batch(1, M1, 3), batch(2, &M1[..60], 3)];
    assert!(matches!(
        decode_batches(&batches, false),
        Err(FountainError::BatchMismatch(_))
    ));
}

#[test]
fn no_batches_is_a_configuration_error() {
    assert!(matches!(
        decode_batches(&[], false),
        Err(FountainError::InvalidConfiguration(_))
    ));
}

#[test]
fn oversized_codec_in_a_batch_is_rejected() {
    let json = br#"{"kind":"raptor","source_symbols":4000000000,"redundancy":4000000000,
        "message_size":70,"digest":"00","blocks":[]}"#;
    let b = BlockBatch::from_bytes(json, WireFormat::Json).unwrap();
    assert!(matches!(b.codec(), Err(FountainError::InvalidConfiguration(_))));
    assert!(matches!(
        decode_batches(&[b], false),
        Err(FountainError::InvalidConfiguration(_))
    ));

    let mut lt = lt_batch(M1);
    lt.source_symbols = 70_000;
    assert!(matches!(lt.codec(), Err(FountainError::InvalidConfiguration(_))));
}

#[test]
fn header_must_agree_with_its_blocks() {
    let mut inflated = batch(8923483, M1, 3);
    inflated.message_size = 1 << 40;
    assert!(matches!(
        decode_batches(&[inflated], false),
        Err(FountainError::PayloadSize { got: 10, .. })
    ));

    let mut empty = batch(8923483, M1, 3);
    empty.blocks.clear();
    assert!(matches!(
        decode_batches(&[empty], false),
        Err(FountainError::BatchMismatch(_))
    ));
}
