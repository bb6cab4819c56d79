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

//! Incremental GF(2) elimination.
//!
//! The matrix is kept in reduced row echelon form after every insertion:
//! each stored row owns one pivot column and no other stored row has that
//! column set. Once every column has a pivot the rows are unit vectors and
//! their values are the solution, so no back-substitution pass exists.

use crate::error::{FountainError, Result};
use crate::fec::neighbors::Neighbors;
use crate::fec::symbol::Symbol;
use log::{trace, warn};

/// Dense coefficient bitmap, one bit per column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitRow {
    words: Vec<u64>,
}

impl BitRow {
    pub fn zero(columns: usize) -> Self {
        Self {
            words: vec![0; columns.div_ceil(64)],
        }
    }

    /// Indices at or past `columns` are ignored; [`DecodeMatrix::add_row`]
    /// refuses such rows before they get here.
    pub fn from_indices(columns: usize, indices: &[usize]) -> Self {
        let mut row = Self::zero(columns);
        for &i in indices.iter().filter(|&&i| i < columns) {
            row.set(i);
        }
        row
    }

    #[inline]
    pub fn get(&self, column: usize) -> bool {
        self.words[column / 64] >> (column % 64) & 1 == 1
    }

    #[inline]
    pub fn set(&mut self, column: usize) {
        self.words[column / 64] |= 1 << (column % 64);
    }

    pub fn xor_assign(&mut self, other: &BitRow) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a ^= *b;
        }
    }

    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn lowest_set(&self) -> Option<usize> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i * 64 + w.trailing_zeros() as usize)
    }

    /// Set columns in ascending order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &w)| {
            let mut rest = w;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(i * 64 + bit)
            })
        })
    }
}

#[derive(Clone, Debug)]
struct Row {
    coefficients: BitRow,
    value: Symbol,
}

#[derive(Clone, Debug)]
pub struct DecodeMatrix {
    columns: usize,
    /// Slot `c` holds the row pivoted on column `c`.
    rows: Vec<Option<Row>>,
    rank: usize,
    dependent: usize,
    conflicting: usize,
}

impl DecodeMatrix {
    pub fn new(columns: usize) -> Self {
        Self {
            columns,
            rows: vec![None; columns],
            rank: 0,
            dependent: 0,
            conflicting: 0,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn dependent_rows(&self) -> usize {
        self.dependent
    }

    /// Dependent rows whose value did not cancel. Any such row proves the
    /// accepted equations are mutually inconsistent.
    pub fn conflicting_rows(&self) -> usize {
        self.conflicting
    }

    /// Adds the equation `XOR(symbols at indices) == value`.
    ///
    /// Returns `false` when the row is linearly dependent on the rows already
    /// held; the matrix is left untouched apart from the counters.
    ///
    /// A row naming a column at or past [`columns`](Self::columns) is refused
    /// outright: it returns `false`, is logged at `warn` and counts as neither
    /// dependent nor conflicting.
    pub fn add_row(&mut self, indices: &Neighbors, mut value: Symbol) -> bool {
        if let Some(&last) = indices.indices().last() {
            if last >= self.columns {
                warn!(
                    "row {:?} names column {} of a {} column system",
                    indices.indices(),
                    last,
                    self.columns
                );
                return false;
            }
        }
        let mut coefficients = BitRow::from_indices(self.columns, indices.indices());

        for column in 0..self.columns {
            if !coefficients.get(column) {
                continue;
            }
            if let Some(pivot) = &self.rows[column] {
                coefficients.xor_assign(&pivot.coefficients);
                value.xor_assign(&pivot.value);
            }
        }

        let Some(pivot) = coefficients.lowest_set() else {
            self.dependent += 1;
            if value.is_zero() {
                trace!("dependent row {:?} at rank {}", indices.indices(), self.rank);
            } else {
                self.conflicting += 1;
                warn!(
                    "dependent row {:?} contradicts accepted rows (rank {})",
                    indices.indices(),
                    self.rank
                );
            }
            return false;
        };

        for row in self.rows.iter_mut().flatten() {
            if row.coefficients.get(pivot) {
                row.coefficients.xor_assign(&coefficients);
                row.value.xor_assign(&value);
            }
        }
        self.rows[pivot] = Some(Row {
            coefficients,
            value,
        });
        self.rank += 1;
        true
    }

    pub fn determined(&self) -> bool {
        self.rank == self.columns
            && self
                .rows
                .iter()
                .all(|r| matches!(r, Some(row) if row.coefficients.count_ones() == 1))
    }

    /// Solved symbols ordered by column.
    pub fn solution(&self) -> Result<Vec<Symbol>> {
        if !self.determined() {
            return Err(FountainError::NotDetermined {
                rank: self.rank,
                required: self.columns,
            });
        }
        Ok(self
            .rows
            .iter()
            .flatten()
            .map(|row| row.value.clone())
            .collect())
    }

    /// Coefficients of the row pivoted on `column`, if any.
    pub fn pivot_row(&self, column: usize) -> Option<Vec<usize>> {
        self.rows
            .get(column)?
            .as_ref()
            .map(|row| row.coefficients.ones().collect())
    }
}
