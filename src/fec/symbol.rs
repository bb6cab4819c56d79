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

//! Fixed-size byte symbols and message partitioning.
//!
//! Arithmetic is over GF(2): addition is XOR, so a symbol is its own
//! additive inverse and the zero symbol is all zero bytes.

use rayon::prelude::*;

/// Symbols at least this large are combined with a parallel zip.
const PAR_XOR_THRESHOLD: usize = 64 * 1024;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Symbol(Vec<u8>);

impl Symbol {
    pub fn zero(size: usize) -> Self {
        Symbol(vec![0u8; size])
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Symbol(bytes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// `self ^= other`. Both symbols must have the same length.
    pub fn xor_assign(&mut self, other: &Symbol) {
        debug_assert_eq!(self.0.len(), other.0.len(), "symbol size mismatch");
        if self.0.len() >= PAR_XOR_THRESHOLD {
            self.0
                .par_iter_mut()
                .zip(other.0.par_iter())
                .for_each(|(d, &s)| *d ^= s);
        } else {
            for (d, &s) in self.0.iter_mut().zip(other.0.iter()) {
                *d ^= s;
            }
        }
    }
}

impl From<Vec<u8>> for Symbol {
    fn from(bytes: Vec<u8>) -> Self {
        Symbol(bytes)
    }
}

impl AsRef<[u8]> for Symbol {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Bytes per symbol when `message_size` bytes are split into `count` symbols.
pub fn symbol_size(message_size: usize, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    message_size.div_ceil(count)
}

/// Copies `message`, zero-pads it to `count * symbol_size` bytes and splits it
/// into `count` contiguous symbols.
pub fn partition(message: &[u8], count: usize) -> Vec<Symbol> {
    let size = symbol_size(message.len(), count);
    (0..count)
        .map(|i| {
            let mut sym = vec![0u8; size];
            let start = (i * size).min(message.len());
            let end = (start + size).min(message.len());
            sym[..end - start].copy_from_slice(&message[start..end]);
            Symbol(sym)
        })
        .collect()
}
