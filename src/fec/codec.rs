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

//! Codec variants.
//!
//! A codec fixes everything both ends of a session must agree on: how many
//! source symbols a message is split into, how many intermediate symbols
//! blocks are drawn from, how a block identifier maps to neighbors, and which
//! precode constraints tie the intermediate symbols together.

use crate::error::{FountainError, Result};
use crate::fec::neighbors::{DegreeDistribution, NeighborSelector, Neighbors};
use crate::fec::symbol::{self, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Largest accepted source symbol count, the RFC 5053 limit on `K`.
pub const MAX_SOURCE_SYMBOLS: usize = 65_536;

/// Largest accepted redundancy. Raptor caps its parity count at `K - 1`
/// anyway; the bound keeps untrusted batch headers from sizing tables.
pub const MAX_REDUNDANCY: u32 = 65_536;

/// Redundancy tunable.
///
/// Raptor: number of LDPC precode parity symbols (capped at `K - 1`).
/// LT: expected ripple size of the robust soliton degree distribution; larger
/// values move weight to low degrees and pull the spike towards degree one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Redundancy(u32);

impl Redundancy {
    pub const DEFAULT: Redundancy = Redundancy(4);

    pub const fn new(value: u32) -> Self {
        Redundancy(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for Redundancy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u32> for Redundancy {
    fn from(value: u32) -> Self {
        Redundancy(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Raptor,
    Lt,
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecKind::Raptor => write!(f, "raptor"),
            CodecKind::Lt => write!(f, "lt"),
        }
    }
}

impl FromStr for CodecKind {
    type Err = FountainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "raptor" => Ok(CodecKind::Raptor),
            "lt" => Ok(CodecKind::Lt),
            other => Err(FountainError::config(format!("unknown codec kind: {other}"))),
        }
    }
}

/// Plain LT code: blocks combine source symbols directly.
#[derive(Clone, Debug, PartialEq)]
pub struct LtCodec {
    source_symbols: usize,
    redundancy: Redundancy,
    selector: NeighborSelector,
}

impl LtCodec {
    fn new(source_symbols: usize, redundancy: Redundancy) -> Self {
        let dist = DegreeDistribution::robust_soliton(source_symbols, redundancy.get() as usize);
        Self {
            source_symbols,
            redundancy,
            selector: NeighborSelector::new(dist, source_symbols),
        }
    }
}

/// Raptor code: an LDPC precode extends the `K` source symbols with `S`
/// parity symbols and blocks combine any of the `K + S` intermediates.
#[derive(Clone, Debug, PartialEq)]
pub struct RaptorCodec {
    source_symbols: usize,
    redundancy: Redundancy,
    parity_symbols: usize,
    selector: NeighborSelector,
    /// Source indices feeding each parity symbol.
    parity_sets: Vec<Neighbors>,
    /// Parity sets plus the parity column itself; every row XORs to zero.
    constraints: Vec<Neighbors>,
}

impl RaptorCodec {
    fn new(source_symbols: usize, redundancy: Redundancy) -> Self {
        let parity_symbols = (redundancy.get() as usize).min(source_symbols - 1);
        let parity_sets = ldpc_parity_sets(source_symbols, parity_symbols);
        let constraints = parity_sets
            .iter()
            .enumerate()
            .map(|(j, set)| {
                let mut row = set.indices().to_vec();
                row.push(source_symbols + j);
                Neighbors::new(row)
            })
            .collect();
        Self {
            source_symbols,
            redundancy,
            parity_symbols,
            selector: NeighborSelector::new(
                DegreeDistribution::raptor(),
                source_symbols + parity_symbols,
            ),
            parity_sets,
            constraints,
        }
    }

    pub fn parity_symbols(&self) -> usize {
        self.parity_symbols
    }
}

/// Systematic LDPC layout: source symbol `i` feeds parities `b`, `b + a` and
/// `b + 2a` (mod `S`) with `b = i mod S`, `a = 1 + (i / S) mod max(S - 1, 1)`.
fn ldpc_parity_sets(source_symbols: usize, parity_symbols: usize) -> Vec<Neighbors> {
    let s = parity_symbols;
    let mut sets = vec![BTreeSet::new(); s];
    if s == 0 {
        return Vec::new();
    }
    for i in 0..source_symbols {
        let a = 1 + (i / s) % (s - 1).max(1);
        let b = i % s;
        sets[b].insert(i);
        sets[(b + a) % s].insert(i);
        sets[(b + 2 * a) % s].insert(i);
    }
    sets.into_iter()
        .map(|set| Neighbors::new(set.into_iter().collect()))
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub enum Codec {
    Lt(LtCodec),
    Raptor(RaptorCodec),
}

impl Codec {
    /// Default codec: Raptor with a precode of `redundancy` parity symbols.
    pub fn new(source_symbols: usize, redundancy: Redundancy) -> Result<Self> {
        Self::with_kind(CodecKind::Raptor, source_symbols, redundancy)
    }

    pub fn raptor(source_symbols: usize, redundancy: Redundancy) -> Result<Self> {
        Self::with_kind(CodecKind::Raptor, source_symbols, redundancy)
    }

    pub fn lt(source_symbols: usize, redundancy: Redundancy) -> Result<Self> {
        Self::with_kind(CodecKind::Lt, source_symbols, redundancy)
    }

    /// Builds a codec of the given kind.
    ///
    /// `source_symbols` must lie in `1..=MAX_SOURCE_SYMBOLS` and `redundancy`
    /// in `1..=MAX_REDUNDANCY`; anything else is `InvalidConfiguration`.
    pub fn with_kind(kind: CodecKind, source_symbols: usize, redundancy: Redundancy) -> Result<Self> {
        if source_symbols < 1 {
            return Err(FountainError::config("source_symbols must be at least 1"));
        }
        if source_symbols > MAX_SOURCE_SYMBOLS {
            return Err(FountainError::config(format!(
                "source_symbols {} exceeds the maximum of {}",
                source_symbols, MAX_SOURCE_SYMBOLS
            )));
        }
        if redundancy.get() < 1 {
            return Err(FountainError::config("redundancy must be at least 1"));
        }
        if redundancy.get() > MAX_REDUNDANCY {
            return Err(FountainError::config(format!(
                "redundancy {} exceeds the maximum of {}",
                redundancy.get(),
                MAX_REDUNDANCY
            )));
        }
        Ok(match kind {
            CodecKind::Lt => Codec::Lt(LtCodec::new(source_symbols, redundancy)),
            CodecKind::Raptor => Codec::Raptor(RaptorCodec::new(source_symbols, redundancy)),
        })
    }

    pub fn kind(&self) -> CodecKind {
        match self {
            Codec::Lt(_) => CodecKind::Lt,
            Codec::Raptor(_) => CodecKind::Raptor,
        }
    }

    /// `K`: symbols the message is split into.
    pub fn source_symbols(&self) -> usize {
        match self {
            Codec::Lt(c) => c.source_symbols,
            Codec::Raptor(c) => c.source_symbols,
        }
    }

    /// `L`: symbols blocks are drawn from and the decoder solves for.
    pub fn intermediate_symbols(&self) -> usize {
        match self {
            Codec::Lt(c) => c.source_symbols,
            Codec::Raptor(c) => c.source_symbols + c.parity_symbols,
        }
    }

    pub fn redundancy(&self) -> Redundancy {
        match self {
            Codec::Lt(c) => c.redundancy,
            Codec::Raptor(c) => c.redundancy,
        }
    }

    pub fn symbol_size(&self, message_size: usize) -> usize {
        symbol::symbol_size(message_size, self.source_symbols())
    }

    pub fn select(&self, id: u64) -> Neighbors {
        match self {
            Codec::Lt(c) => c.selector.select(id),
            Codec::Raptor(c) => c.selector.select(id),
        }
    }

    /// Rows over the intermediate symbols that always XOR to zero.
    pub fn constraints(&self) -> &[Neighbors] {
        match self {
            Codec::Lt(_) => &[],
            Codec::Raptor(c) => &c.constraints,
        }
    }

    /// Extends `K` source symbols to the `L` intermediate symbols.
    pub fn precode(&self, mut source: Vec<Symbol>) -> Vec<Symbol> {
        debug_assert_eq!(source.len(), self.source_symbols());
        if let Codec::Raptor(c) = self {
            let size = source.first().map(Symbol::len).unwrap_or(0);
            let parities: Vec<Symbol> = c
                .parity_sets
                .iter()
                .map(|set| {
                    let mut acc = Symbol::zero(size);
                    for &i in set.iter() {
                        acc.xor_assign(&source[i]);
                    }
                    acc
                })
                .collect();
            source.extend(parities);
        }
        source
    }
}
