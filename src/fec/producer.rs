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

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEFAULT_ID_SPACE: u64 = 60_000;

/// Seeded source of block identifiers for one producer.
///
/// Producers never coordinate; two of them may draw the same identifier, in
/// which case the second block is simply dependent at the decoder.
#[derive(Clone, Debug)]
pub struct Producer {
    rng: StdRng,
    id_space: u64,
}

impl Producer {
    pub fn new(seed: u64) -> Self {
        Self::with_id_space(seed, DEFAULT_ID_SPACE)
    }

    /// `id_space` of zero is treated as one.
    pub fn with_id_space(seed: u64, id_space: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            id_space: id_space.max(1),
        }
    }

    pub fn id_space(&self) -> u64 {
        self.id_space
    }

    pub fn next_id(&mut self) -> u64 {
        self.rng.gen_range(0..self.id_space)
    }

    pub fn ids(&mut self, count: usize) -> Vec<u64> {
        (0..count).map(|_| self.next_id()).collect()
    }
}
