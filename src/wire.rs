// Copyright (c) 2024, The QuicFuscate Project Authors.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright
//       notice, this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above
//       copyright notice, this list of conditions and the following disclaimer
//       in the documentation and/or other materials provided with the
//       distribution.
//
//     * Neither the name of the copyright holder nor the names of its
//       contributors may be used to endorse or promote products derived from
//       this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// OWNER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! External representation of encoded blocks.
//!
//! Blocks travel in batches that name the codec they were produced with and
//! the SHA-256 digest of the source message. The decoder never looks at the
//! digest; callers use it to keep blocks of different messages apart.

use crate::error::{FountainError, Result};
use crate::fec::{Codec, CodecKind, Decoder, EncodedBlock, Redundancy};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

/// Serde helpers for `Vec<u8>` payloads: standard base64 in human-readable
/// formats, raw bytes otherwise.
pub mod payload {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&STANDARD.encode(bytes))
        } else {
            serializer.serialize_bytes(bytes)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            STANDARD.decode(s).map_err(serde::de::Error::custom)
        } else {
            struct BytesVisitor;

            impl<'de> serde::de::Visitor<'de> for BytesVisitor {
                type Value = Vec<u8>;

                fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                    write!(formatter, "a byte array")
                }

                fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
                where
                    E: serde::de::Error,
                {
                    Ok(v.to_vec())
                }

                fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Self::Value, E>
                where
                    E: serde::de::Error,
                {
                    Ok(v)
                }

                fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
                where
                    A: serde::de::SeqAccess<'de>,
                {
                    let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                    while let Some(byte) = seq.next_element()? {
                        vec.push(byte);
                    }
                    Ok(vec)
                }
            }

            deserializer.deserialize_byte_buf(BytesVisitor)
        }
    }
}

/// Lowercase hex SHA-256 of `message`.
pub fn message_digest(message: &[u8]) -> String {
    hex::encode(Sha256::digest(message))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireFormat {
    Json,
    Bincode,
}

impl WireFormat {
    /// `.json` files are JSON, everything else is bincode.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => WireFormat::Json,
            _ => WireFormat::Bincode,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBatch {
    pub kind: CodecKind,
    pub source_symbols: usize,
    pub redundancy: Redundancy,
    pub message_size: usize,
    pub digest: String,
    pub blocks: Vec<EncodedBlock>,
}

impl BlockBatch {
    pub fn new(codec: &Codec, message: &[u8], blocks: Vec<EncodedBlock>) -> Self {
        Self {
            kind: codec.kind(),
            source_symbols: codec.source_symbols(),
            redundancy: codec.redundancy(),
            message_size: message.len(),
            digest: message_digest(message),
            blocks,
        }
    }

    /// Rebuilds the codec the blocks were produced with.
    pub fn codec(&self) -> Result<Codec> {
        Codec::with_kind(self.kind, self.source_symbols, self.redundancy)
    }

    pub fn matches(&self, message: &[u8]) -> bool {
        message.len() == self.message_size && message_digest(message) == self.digest
    }

    /// Checks that both batches can feed one decoder. The digests are not
    /// compared here; mixing messages is legal, if rarely useful.
    pub fn ensure_compatible(&self, other: &BlockBatch) -> Result<()> {
        if self.kind != other.kind
            || self.source_symbols != other.source_symbols
            || self.redundancy != other.redundancy
        {
            return Err(FountainError::BatchMismatch(format!(
                "codec {}/{}/{} vs {}/{}/{}",
                self.kind,
                self.source_symbols,
                self.redundancy.get(),
                other.kind,
                other.source_symbols,
                other.redundancy.get()
            )));
        }
        if self.message_size != other.message_size {
            return Err(FountainError::BatchMismatch(format!(
                "message size {} vs {}",
                self.message_size, other.message_size
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self, format: WireFormat) -> Result<Vec<u8>> {
        Ok(match format {
            WireFormat::Json => serde_json::to_vec_pretty(self)?,
            WireFormat::Bincode => bincode::serialize(self)?,
        })
    }

    pub fn from_bytes(bytes: &[u8], format: WireFormat) -> Result<Self> {
        Ok(match format {
            WireFormat::Json => serde_json::from_slice(bytes)?,
            WireFormat::Bincode => bincode::deserialize(bytes)?,
        })
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes(WireFormat::from_path(path))?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, WireFormat::from_path(path))
    }
}

/// What [`decode_batches`] recovered and how much input it took.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchDecode {
    pub message: Vec<u8>,
    /// Whether `message` hashes to the digest of the first batch.
    pub matches: bool,
    /// Batches read before the system was determined.
    pub batches_used: usize,
    pub accepted: usize,
    pub dependent: usize,
    pub conflicting: usize,
}

/// Feeds `batches` in order into one decoder until it is determined, then
/// decodes.
///
/// The first batch fixes the codec, the message size and the reference
/// digest. Every later batch must be compatible with it; under `strict` it
/// must also carry the same digest. Batches after the determining one are
/// not inspected. A recovered message that misses the reference digest is
/// returned with `matches == false` and logged at `warn`.
pub fn decode_batches(batches: &[BlockBatch], strict: bool) -> Result<BatchDecode> {
    let (reference, rest) = batches
        .split_first()
        .ok_or_else(|| FountainError::config("no batches given"))?;
    let codec = Arc::new(reference.codec()?);

    // Size the session from the blocks, not only from the header.
    let expected = codec.symbol_size(reference.message_size);
    if reference.blocks.is_empty() {
        return Err(FountainError::BatchMismatch("first batch carries no blocks".into()));
    }
    if let Some(block) = reference.blocks.iter().find(|b| b.len() != expected) {
        return Err(FountainError::PayloadSize {
            expected,
            got: block.len(),
        });
    }

    let mut decoder = Decoder::new(codec, reference.message_size)?;
    let mut determined = decoder.add_blocks(&reference.blocks)?;
    let mut batches_used = 1;
    debug!("batch 0: rank {}/{}", decoder.rank(), decoder.required());

    for (index, batch) in rest.iter().enumerate().map(|(i, b)| (i + 1, b)) {
        if determined {
            break;
        }
        reference.ensure_compatible(batch)?;
        if strict && reference.digest != batch.digest {
            return Err(FountainError::BatchMismatch(format!(
                "batch {} carries digest {}, expected {}",
                index, batch.digest, reference.digest
            )));
        }
        determined = decoder.add_blocks(&batch.blocks)?;
        batches_used += 1;
        debug!("batch {}: rank {}/{}", index, decoder.rank(), decoder.required());
    }

    let message = decoder.decode()?;
    let matches = reference.matches(&message);
    if !matches {
        warn!(
            "recovered message does not match digest {} ({} conflicting blocks seen)",
            reference.digest,
            decoder.conflicting_blocks()
        );
    }
    Ok(BatchDecode {
        message,
        matches,
        batches_used,
        accepted: decoder.accepted_blocks(),
        dependent: decoder.dependent_blocks(),
        conflicting: decoder.conflicting_blocks(),
    })
}
