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

//! Degree and neighbor selection.
//!
//! Encoder and decoder never exchange neighbor sets. Both sides re-derive the
//! set for a block from its identifier, so selection must be a pure function
//! of `(id, distribution, columns)`: every call seeds a fresh `StdRng` from the
//! identifier and nothing else.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Degree samples are drawn uniformly from `[0, DEGREE_SCALE)`.
pub const DEGREE_SCALE: u32 = 1 << 20;

/// RFC 5053 section 5.4.4.2 degree generator.
const RFC5053_DEGREES: [(u32, usize); 7] = [
    (10_241, 1),
    (491_582, 2),
    (712_794, 3),
    (831_695, 4),
    (948_446, 10),
    (1_032_189, 11),
    (DEGREE_SCALE, 40),
];

/// Sorted, distinct column indices combined into one block.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Neighbors(Vec<usize>);

impl Neighbors {
    pub fn new(mut indices: Vec<usize>) -> Self {
        indices.sort_unstable();
        indices.dedup();
        Neighbors(indices)
    }

    pub fn degree(&self) -> usize {
        self.0.len()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &usize> + '_ {
        self.0.iter()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.binary_search(&index).is_ok()
    }
}

/// Cumulative degree distribution quantised to `DEGREE_SCALE`.
///
/// Entry `(t, d)` selects degree `d` for samples below `t` that were not
/// claimed by an earlier entry. The last threshold is always `DEGREE_SCALE`.
#[derive(Clone, Debug, PartialEq)]
pub struct DegreeDistribution {
    thresholds: Vec<(u32, usize)>,
}

impl DegreeDistribution {
    /// Raptor degree table, independent of the block size.
    pub fn raptor() -> Self {
        Self {
            thresholds: RFC5053_DEGREES.to_vec(),
        }
    }

    /// Robust soliton over `1..=k` with expected ripple size `ripple`.
    ///
    /// The spike sits at `max(1, k / ripple)` with weight `ripple / k`. Only
    /// IEEE basic arithmetic is used so the table is bit-identical everywhere.
    pub fn robust_soliton(k: usize, ripple: usize) -> Self {
        let k = k.max(1);
        let ripple = ripple.max(1);
        let mut weights = vec![0.0f64; k + 1];
        weights[1] = 1.0 / k as f64;
        for d in 2..=k {
            weights[d] = 1.0 / (d * (d - 1)) as f64;
        }
        let spike = (k / ripple).max(1);
        for d in 1..spike {
            weights[d] += ripple as f64 / (d * k) as f64;
        }
        weights[spike] += ripple as f64 / k as f64;

        let total: f64 = weights[1..].iter().sum();
        let mut cumulative = 0.0f64;
        let thresholds = (1..=k)
            .map(|d| {
                cumulative += weights[d];
                let t = if d == k {
                    DEGREE_SCALE
                } else {
                    ((cumulative / total * DEGREE_SCALE as f64) as u32).min(DEGREE_SCALE)
                };
                (t, d)
            })
            .collect();
        Self { thresholds }
    }

    pub fn max_degree(&self) -> usize {
        self.thresholds.last().map(|&(_, d)| d).unwrap_or(1)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let v = rng.gen_range(0..DEGREE_SCALE);
        self.thresholds
            .iter()
            .find(|&&(t, _)| v < t)
            .map(|&(_, d)| d)
            .unwrap_or_else(|| self.max_degree())
    }
}

/// Derives neighbor sets over `columns` intermediate symbols.
#[derive(Clone, Debug, PartialEq)]
pub struct NeighborSelector {
    distribution: DegreeDistribution,
    columns: usize,
}

impl NeighborSelector {
    pub fn new(distribution: DegreeDistribution, columns: usize) -> Self {
        Self {
            distribution,
            columns,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn distribution(&self) -> &DegreeDistribution {
        &self.distribution
    }

    /// Degree in `[1, columns]` and that many distinct indices, both seeded
    /// from `id` alone.
    pub fn select(&self, id: u64) -> Neighbors {
        let mut rng = StdRng::seed_from_u64(id);
        let degree = self.distribution.sample(&mut rng).clamp(1, self.columns.max(1));
        let mut pool: Vec<usize> = (0..self.columns).collect();
        let (chosen, _) = pool.partial_shuffle(&mut rng, degree);
        Neighbors::new(chosen.to_vec())
    }
}
