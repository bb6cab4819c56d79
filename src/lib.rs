// Fountain Core Library
//
// This library contains the rateless erasure code engine (symbol
// arithmetic, neighbor selection, encoding and incremental decoding)
// together with its configuration, wire representation and telemetry,
// consolidated into a single crate.

pub mod app_config;
pub mod error;
pub mod fec;
pub mod logger;
pub mod telemetry;
pub mod wire;

pub use error::{FountainError, Result};
pub use fec::{
    encode_blocks, Codec, CodecKind, DecodeState, Decoder, EncodedBlock, Encoder, Producer,
    Redundancy, SharedDecoder,
};
pub use wire::{decode_batches, BatchDecode, BlockBatch, WireFormat};
