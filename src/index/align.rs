// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
// This file is part of the Sparsity project.

//! Pairwise alignment of two sparse indexes.
use super::SparseIndex;
use crate::errors::SparseError;
use itertools::{EitherOrBoth, Itertools};
use tracing::debug;

/// The sorted union of the positions covered by two indexes, with, for every
/// merged position, the physical offset to read on each side (`None` where
/// that side holds its fill value).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexAlignment {
  /// Union of covered positions, strictly increasing
  pub positions: Vec<usize>,
  /// Physical offset into the left operand's values
  pub left: Vec<Option<usize>>,
  /// Physical offset into the right operand's values
  pub right: Vec<Option<usize>>,
}

impl IndexAlignment {
  /// Number of merged positions.
  pub fn len(&self) -> usize {
    self.positions.len()
  }

  /// Returns true if neither index covers any position.
  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  fn identity(index: &SparseIndex) -> Self {
    let positions = index.to_int_index();
    let offsets: Vec<Option<usize>> = (0..positions.len()).map(Some).collect();
    IndexAlignment {
      positions,
      left: offsets.clone(),
      right: offsets,
    }
  }
}

impl SparseIndex {
  fn check_same_length(&self, other: &SparseIndex) -> Result<(), SparseError> {
    if self.length() != other.length() {
      return Err(SparseError::ShapeMismatch {
        expected: self.length(),
        actual: other.length(),
      });
    }
    Ok(())
  }

  /// Aligns two indexes of equal length for a binary operation.
  ///
  /// A single merge walk over both position streams; the cost is
  /// `O(npoints(self) + npoints(other))` and neither index is materialized.
  pub fn intersect(&self, other: &SparseIndex) -> Result<IndexAlignment, SparseError> {
    self.check_same_length(other)?;

    if (self.is_dense() && other.is_dense()) || self.same_positions(other) {
      debug!(npoints = self.npoints(), "identical indexes, identity alignment");
      return Ok(IndexAlignment::identity(self));
    }

    let capacity = self.npoints().max(other.npoints());
    let mut aligned = IndexAlignment {
      positions: Vec::with_capacity(capacity),
      left: Vec::with_capacity(capacity),
      right: Vec::with_capacity(capacity),
    };

    let merged = self
      .positions()
      .enumerate()
      .merge_join_by(other.positions().enumerate(), |(_, a), (_, b)| a.cmp(b));

    for step in merged {
      let (pos, left, right) = match step {
        EitherOrBoth::Both((l, pos), (r, _)) => (pos, Some(l), Some(r)),
        EitherOrBoth::Left((l, pos)) => (pos, Some(l), None),
        EitherOrBoth::Right((r, pos)) => (pos, None, Some(r)),
      };
      aligned.positions.push(pos);
      aligned.left.push(left);
      aligned.right.push(right);
    }

    Ok(aligned)
  }

  /// Index covering every position covered by either index, encoded like `self`.
  pub fn make_union(&self, other: &SparseIndex) -> Result<SparseIndex, SparseError> {
    self.check_same_length(other)?;
    let positions = self.positions().merge(other.positions()).dedup().collect();
    Ok(SparseIndex::from_sorted(self.kind(), positions, self.length()))
  }

  /// Index covering only the positions covered by both indexes, encoded like `self`.
  pub fn make_intersection(&self, other: &SparseIndex) -> Result<SparseIndex, SparseError> {
    self.check_same_length(other)?;
    let positions = self
      .positions()
      .merge_join_by(other.positions(), |a, b| a.cmp(b))
      .filter_map(|step| match step {
        EitherOrBoth::Both(pos, _) => Some(pos),
        _ => None,
      })
      .collect();
    Ok(SparseIndex::from_sorted(self.kind(), positions, self.length()))
  }
}
