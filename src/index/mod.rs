// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
// This file is part of the Sparsity project.

//! Sparse indexes: which logical positions of an array are materialized.
//!
//! Main components:
//! - `SparseIndex`: the index itself, a sum type over its two encodings.
//! - `BlockIndex`: runs of contiguous positions, compact when non-fill values cluster.
//! - `IntIndex`: the explicit sorted list of positions, compact when they are scattered.
//! - `IndexAlignment`: the merge of two indexes that drives binary operations.
use crate::errors::SparseError;
use serde::{Deserialize, Serialize};
use std::{iter::Copied, slice};

mod align;
mod block;
mod int;

pub use align::IndexAlignment;
pub use block::{BlockIndex, BlockPositions};
pub use int::IntIndex;

/// Selects the physical encoding of a [`SparseIndex`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
  /// Runs of `(start, length)`
  #[default]
  Block,
  /// One entry per materialized position
  Integer,
}

/// Maps a logical length and a set of materialized positions to a compact
/// physical representation.
///
/// A `SparseIndex` is immutable; every transformation returns a new index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SparseIndex {
  /// Block encoding
  Block(BlockIndex),
  /// Integer encoding
  Int(IntIndex),
}

impl SparseIndex {
  /// Builds a block index from positions in any order. Duplicates are ignored.
  pub fn build_block<I>(positions: I, length: usize) -> Result<Self, SparseError>
  where
    I: IntoIterator<Item = usize>,
  {
    Self::build(IndexKind::Block, positions, length)
  }

  /// Builds an integer index from positions in any order. Duplicates are ignored.
  pub fn build_integer<I>(positions: I, length: usize) -> Result<Self, SparseError>
  where
    I: IntoIterator<Item = usize>,
  {
    Self::build(IndexKind::Integer, positions, length)
  }

  /// Builds an index of the requested kind from positions in any order.
  pub fn build<I>(kind: IndexKind, positions: I, length: usize) -> Result<Self, SparseError>
  where
    I: IntoIterator<Item = usize>,
  {
    let mut positions: Vec<usize> = positions.into_iter().collect();
    if !positions.is_sorted() {
      positions.sort_unstable();
    }
    positions.dedup();

    if let Some(&last) = positions.last() {
      if last >= length {
        return Err(SparseError::IndexOutOfRange {
          index: last,
          length,
        });
      }
    }

    Ok(Self::from_sorted(kind, positions, length))
  }

  /// Builds an index from positions already known to be sorted, unique and in bounds.
  pub(crate) fn from_sorted(kind: IndexKind, positions: Vec<usize>, length: usize) -> Self {
    match kind {
      IndexKind::Block => SparseIndex::Block(BlockIndex::from_sorted_positions(length, positions)),
      IndexKind::Integer => SparseIndex::Int(IntIndex::from_sorted_positions(length, positions)),
    }
  }

  /// The encoding of this index.
  pub fn kind(&self) -> IndexKind {
    match self {
      SparseIndex::Block(_) => IndexKind::Block,
      SparseIndex::Int(_) => IndexKind::Integer,
    }
  }

  /// Logical length of the array this index describes.
  pub fn length(&self) -> usize {
    match self {
      SparseIndex::Block(b) => b.length(),
      SparseIndex::Int(i) => i.length(),
    }
  }

  /// Number of materialized positions.
  pub fn npoints(&self) -> usize {
    match self {
      SparseIndex::Block(b) => b.npoints(),
      SparseIndex::Int(i) => i.npoints(),
    }
  }

  /// Number of positions that hold the fill value.
  pub fn ngaps(&self) -> usize {
    self.length() - self.npoints()
  }

  /// Returns true if every logical position is materialized.
  pub fn is_dense(&self) -> bool {
    self.npoints() == self.length()
  }

  /// Lazily walks the materialized positions in increasing order.
  pub fn positions(&self) -> Positions<'_> {
    match self {
      SparseIndex::Block(b) => Positions(PositionsInner::Block(b.positions())),
      SparseIndex::Int(i) => Positions(PositionsInner::Int(i.indices().iter().copied())),
    }
  }

  /// Materializes all covered positions in increasing order.
  pub fn to_int_index(&self) -> Vec<usize> {
    match self {
      SparseIndex::Block(b) => b.positions().collect(),
      SparseIndex::Int(i) => i.indices().to_vec(),
    }
  }

  /// Physical offset of the value stored for `pos`, `None` if `pos` holds the fill value.
  pub fn lookup(&self, pos: usize) -> Result<Option<usize>, SparseError> {
    if pos >= self.length() {
      return Err(SparseError::IndexOutOfRange {
        index: pos,
        length: self.length(),
      });
    }
    Ok(match self {
      SparseIndex::Block(b) => b.lookup(pos),
      SparseIndex::Int(i) => i.lookup(pos),
    })
  }

  /// Re-encodes this index with the requested kind.
  pub fn to_kind(&self, kind: IndexKind) -> SparseIndex {
    if self.kind() == kind {
      return self.clone();
    }
    match kind {
      IndexKind::Block => {
        SparseIndex::Block(BlockIndex::from_sorted_positions(self.length(), self.positions()))
      }
      IndexKind::Integer => SparseIndex::Int(IntIndex::from_sorted_positions(
        self.length(),
        self.to_int_index(),
      )),
    }
  }

  /// Re-encodes this index as blocks.
  pub fn to_block(&self) -> SparseIndex {
    self.to_kind(IndexKind::Block)
  }

  /// Re-encodes this index as explicit positions.
  pub fn to_int(&self) -> SparseIndex {
    self.to_kind(IndexKind::Integer)
  }

  /// Returns true if both indexes cover the same positions of the same length,
  /// whatever their encodings.
  pub fn same_positions(&self, other: &SparseIndex) -> bool {
    if self.length() != other.length() || self.npoints() != other.npoints() {
      return false;
    }
    match (self, other) {
      (SparseIndex::Block(a), SparseIndex::Block(b)) => a == b,
      (SparseIndex::Int(a), SparseIndex::Int(b)) => a == b,
      _ => self.positions().eq(other.positions()),
    }
  }
}

/// Iterator over the materialized positions of a [`SparseIndex`].
#[derive(Clone, Debug)]
pub struct Positions<'a>(PositionsInner<'a>);

#[derive(Clone, Debug)]
enum PositionsInner<'a> {
  Block(BlockPositions<'a>),
  Int(Copied<slice::Iter<'a, usize>>),
}

impl Iterator for Positions<'_> {
  type Item = usize;

  #[inline]
  fn next(&mut self) -> Option<usize> {
    match &mut self.0 {
      PositionsInner::Block(it) => it.next(),
      PositionsInner::Int(it) => it.next(),
    }
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    match &self.0 {
      PositionsInner::Block(it) => it.size_hint(),
      PositionsInner::Int(it) => it.size_hint(),
    }
  }
}

impl ExactSizeIterator for Positions<'_> {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_block_and_integer_agree() {
    let positions = vec![9, 2, 3, 6, 3];
    let block = SparseIndex::build_block(positions.clone(), 10).unwrap();
    let int = SparseIndex::build_integer(positions, 10).unwrap();

    assert_eq!(block.to_int_index(), vec![2, 3, 6, 9]);
    assert_eq!(int.to_int_index(), vec![2, 3, 6, 9]);
    assert_eq!(block.npoints(), 4);
    assert_eq!(int.npoints(), 4);
    assert_eq!(block.ngaps(), 6);
    assert!(block.same_positions(&int));

    for pos in 0..10 {
      assert_eq!(block.lookup(pos).unwrap(), int.lookup(pos).unwrap());
    }
  }

  #[test]
  fn test_build_block_runs() {
    let idx = SparseIndex::build_block([2, 3, 6], 10).unwrap();
    match &idx {
      SparseIndex::Block(b) => {
        assert_eq!(b.locations(), &[2, 6]);
        assert_eq!(b.lengths(), &[2, 1]);
      }
      SparseIndex::Int(_) => panic!("expected a block index"),
    }
  }

  #[test]
  fn test_build_rejects_out_of_range() {
    assert_eq!(
      SparseIndex::build_block([1, 10], 10),
      Err(SparseError::IndexOutOfRange {
        index: 10,
        length: 10
      })
    );
  }

  #[test]
  fn test_lookup_out_of_range() {
    let idx = SparseIndex::build_integer([0], 3).unwrap();
    assert_eq!(
      idx.lookup(3),
      Err(SparseError::IndexOutOfRange {
        index: 3,
        length: 3
      })
    );
  }

  #[test]
  fn test_kind_conversion() {
    let block = SparseIndex::build_block([0, 1, 2, 7], 8).unwrap();
    let int = block.to_int();
    assert_eq!(int.kind(), IndexKind::Integer);
    assert_eq!(int.to_block(), block);
    assert_eq!(block.to_kind(IndexKind::Block), block);
  }

  #[test]
  fn test_empty_and_dense() {
    let empty = SparseIndex::build_block([], 0).unwrap();
    assert_eq!(empty.npoints(), 0);
    assert!(empty.is_dense());
    assert!(empty.to_int_index().is_empty());

    let dense = SparseIndex::build_integer(0..5, 5).unwrap();
    assert!(dense.is_dense());
    assert_eq!(dense.ngaps(), 0);
  }
}
