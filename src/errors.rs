// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
// This file is part of the Sparsity project.

//! This module defines errors returned by the library.
use thiserror::Error;

/// Errors returned by Sparsity
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SparseError {
  /// returned if two operands (or an index and its values) do not have compatible lengths
  #[error("ShapeMismatch: expected {expected}, got {actual}")]
  ShapeMismatch {
    /// The length required by the operation
    expected: usize,
    /// The length that was supplied
    actual: usize,
  },
  /// returned if a sparse chunk appended to a list carries a different fill value
  #[error("FillValueMismatch")]
  FillValueMismatch,
  /// returned if a coordinate conversion cannot split positions into rows and columns
  #[error("UnsupportedShape: {reason}")]
  UnsupportedShape {
    /// The reason the shape is not supported
    reason: String,
  },
  /// returned if a logical position lies outside `[0, length)`
  #[error("IndexOutOfRange: {index} not in [0, {length})")]
  IndexOutOfRange {
    /// The offending position
    index: usize,
    /// The logical length that was exceeded
    length: usize,
  },
  /// returned if raw index parts violate the ordering or bound invariants
  #[error("InvalidIndex: {reason}")]
  InvalidIndex {
    /// The invariant that was violated
    reason: String,
  },
  /// returned if two materialized entries map to the same (row, col) coordinate
  #[error("DuplicateCoordinate: ({row}, {col})")]
  DuplicateCoordinate {
    /// The row of the repeated coordinate
    row: usize,
    /// The column of the repeated coordinate
    col: usize,
  },
}
