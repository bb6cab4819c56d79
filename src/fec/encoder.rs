use crate::error::{FountainError, Result};
use crate::fec::codec::Codec;
use crate::fec::symbol::{self, Symbol};
use crate::telemetry;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One encoded block: the identifier it was derived from and the XOR of the
/// intermediate symbols that identifier selects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedBlock {
    pub id: u64,
    #[serde(with = "crate::wire::payload")]
    pub payload: Vec<u8>,
}

impl EncodedBlock {
    pub fn new(id: u64, payload: Vec<u8>) -> Self {
        Self { id, payload }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Stateless after construction; share it across threads freely.
#[derive(Clone, Debug)]
pub struct Encoder {
    codec: Arc<Codec>,
}

impl Encoder {
    pub fn new(codec: Arc<Codec>) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Produces one block per identifier, in the order given.
    ///
    /// Empty messages are rejected: a zero-length message has no symbol size
    /// and nothing a decoder could recover.
    pub fn encode_blocks(&self, message: &[u8], ids: &[u64]) -> Result<Vec<EncodedBlock>> {
        encode_blocks(message, ids, &self.codec)
    }
}

pub fn encode_blocks(message: &[u8], ids: &[u64], codec: &Codec) -> Result<Vec<EncodedBlock>> {
    if message.is_empty() {
        return Err(FountainError::config("cannot encode an empty message"));
    }
    let k = codec.source_symbols();
    let size = codec.symbol_size(message.len());
    let intermediate = codec.precode(symbol::partition(message, k));
    debug!(
        "encoding {} blocks: {} bytes, {}x{} byte symbols, {} intermediates",
        ids.len(),
        message.len(),
        k,
        size,
        intermediate.len()
    );

    let blocks: Vec<EncodedBlock> = ids
        .par_iter()
        .map(|&id| {
            let mut acc = Symbol::zero(size);
            for &i in codec.select(id).iter() {
                acc.xor_assign(&intermediate[i]);
            }
            EncodedBlock::new(id, acc.into_bytes())
        })
        .collect();
    telemetry::BLOCKS_ENCODED.inc_by(blocks.len() as u64);
    Ok(blocks)
}
