// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
// This file is part of the Sparsity project.

//! This module defines `SparseList`, an append-only accumulator of sparse chunks.
use crate::{
  array::SparseArray,
  errors::SparseError,
  index::{IndexKind, SparseIndex},
  start_span,
  traits::SparseValue,
};
use std::time::Instant;
use tracing::{debug, info, info_span};

/// Anything that can be appended to a [`SparseList`].
#[derive(Clone, Debug)]
pub enum ListItem<T> {
  /// A single value
  Scalar(T),
  /// A dense run of values
  Dense(Vec<T>),
  /// A ready-made sparse chunk, which must share the list's fill value
  Sparse(SparseArray<T>),
}

impl<T> From<T> for ListItem<T> {
  fn from(value: T) -> Self {
    ListItem::Scalar(value)
  }
}

impl<T> From<Vec<T>> for ListItem<T> {
  fn from(values: Vec<T>) -> Self {
    ListItem::Dense(values)
  }
}

impl<T: Clone> From<&[T]> for ListItem<T> {
  fn from(values: &[T]) -> Self {
    ListItem::Dense(values.to_vec())
  }
}

impl<T> From<SparseArray<T>> for ListItem<T> {
  fn from(array: SparseArray<T>) -> Self {
    ListItem::Sparse(array)
  }
}

/// A growable sequence of sparse chunks sharing one fill value.
///
/// Appending never touches earlier chunks; the single index over all appended
/// data is only built by [`SparseList::to_array`].
///
/// A `SparseList` is not meant for concurrent appends: shard into several
/// lists, or guard one with a lock.
#[derive(Clone, Debug)]
pub struct SparseList<T> {
  chunks: Vec<SparseArray<T>>,
  fill_value: T,
  kind: IndexKind,
}

impl<T: SparseValue> SparseList<T> {
  /// Creates an empty list that consolidates into block-indexed arrays.
  pub fn new(fill_value: T) -> Self {
    Self::with_kind(fill_value, IndexKind::default())
  }

  /// Creates an empty list that consolidates into arrays of the given encoding.
  pub fn with_kind(fill_value: T, kind: IndexKind) -> Self {
    Self {
      chunks: Vec::new(),
      fill_value,
      kind,
    }
  }

  /// Total logical length of all chunks.
  pub fn len(&self) -> usize {
    self.chunks.iter().map(SparseArray::len).sum()
  }

  /// Returns true if no value has been appended.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Number of chunks appended so far.
  pub fn nchunks(&self) -> usize {
    self.chunks.len()
  }

  /// The fill value shared by every chunk.
  pub fn fill_value(&self) -> &T {
    &self.fill_value
  }

  /// The chunks in append order.
  pub fn chunks(&self) -> &[SparseArray<T>] {
    &self.chunks
  }

  /// Appends a scalar, a dense sequence or a sparse chunk.
  ///
  /// Scalars and dense sequences are compacted under the list's fill value. A
  /// sparse chunk with a different fill value is rejected with
  /// [`SparseError::FillValueMismatch`] and the list is left unchanged.
  pub fn append<I>(&mut self, item: I) -> Result<(), SparseError>
  where
    I: Into<ListItem<T>>,
  {
    let chunk = match item.into() {
      ListItem::Scalar(value) => {
        SparseArray::from_dense_with_kind(&[value], self.fill_value.clone(), self.kind)
      }
      ListItem::Dense(values) => {
        SparseArray::from_dense_with_kind(&values, self.fill_value.clone(), self.kind)
      }
      ListItem::Sparse(array) => {
        if !array.fill_value().fill_eq(&self.fill_value) {
          return Err(SparseError::FillValueMismatch);
        }
        array
      }
    };
    self.chunks.push(chunk);
    Ok(())
  }

  /// Consolidates every chunk, in append order, into one new array.
  ///
  /// Chunk `i` occupies `[offset_i, offset_i + len_i)` of the result, where
  /// offsets accumulate in append order. The list itself is not modified.
  pub fn to_array(&self) -> SparseArray<T> {
    let (_consolidate_span, consolidate_t) = start_span!("consolidate", chunks = self.chunks.len());

    let npoints: usize = self.chunks.iter().map(SparseArray::npoints).sum();
    let mut positions = Vec::with_capacity(npoints);
    let mut values = Vec::with_capacity(npoints);
    let mut offset = 0;
    for chunk in &self.chunks {
      for (pos, v) in chunk.nonfill_entries() {
        positions.push(offset + pos);
        values.push(v.clone());
      }
      offset += chunk.len();
    }

    let index = SparseIndex::from_sorted(self.kind, positions, offset);
    info!(
      elapsed_ms = %consolidate_t.elapsed().as_millis(),
      length = offset,
      npoints,
      "consolidate"
    );
    SparseArray::from_parts_unchecked(index, values, self.fill_value.clone())
  }

  /// Replaces the chunks with their consolidation.
  pub fn consolidate(&mut self) {
    if self.chunks.len() > 1 {
      let merged = self.to_array();
      debug!(chunks = self.chunks.len(), "replacing chunks with one array");
      self.chunks = vec![merged];
    }
  }
}
