// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
// This file is part of the Sparsity project.

//! Explicit-integer encoding of a sparse index.
use crate::errors::SparseError;
use serde::{Deserialize, Serialize};

/// A sparse index stored as the sorted list of materialized positions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IntIndexParts")]
pub struct IntIndex {
  length: usize,
  indices: Vec<usize>,
}

#[derive(Deserialize)]
struct IntIndexParts {
  length: usize,
  indices: Vec<usize>,
}

impl TryFrom<IntIndexParts> for IntIndex {
  type Error = SparseError;

  fn try_from(parts: IntIndexParts) -> Result<Self, Self::Error> {
    IntIndex::new(parts.length, parts.indices)
  }
}

impl IntIndex {
  /// Creates an integer index from explicit positions, checking that they are
  /// strictly increasing and below `length`.
  pub fn new(length: usize, indices: Vec<usize>) -> Result<Self, SparseError> {
    if let Some(w) = indices.windows(2).find(|w| w[0] >= w[1]) {
      return Err(SparseError::InvalidIndex {
        reason: format!("positions {} and {} are not strictly increasing", w[0], w[1]),
      });
    }
    if let Some(&last) = indices.last() {
      if last >= length {
        return Err(SparseError::InvalidIndex {
          reason: format!("position {last} is past length {length}"),
        });
      }
    }
    Ok(Self { length, indices })
  }

  pub(crate) fn from_sorted_positions(length: usize, indices: Vec<usize>) -> Self {
    Self { length, indices }
  }

  /// Logical length of the array this index describes.
  pub fn length(&self) -> usize {
    self.length
  }

  /// The materialized positions.
  pub fn indices(&self) -> &[usize] {
    &self.indices
  }

  /// Number of materialized positions.
  pub fn npoints(&self) -> usize {
    self.indices.len()
  }

  pub(crate) fn lookup(&self, pos: usize) -> Option<usize> {
    self.indices.binary_search(&pos).ok()
  }
}
