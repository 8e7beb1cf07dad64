// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
// This file is part of the Sparsity project.

//! This module defines `SparseArray`, a one-dimensional array that stores only
//! the entries differing from its fill value.
use crate::{
  errors::SparseError,
  index::{IndexKind, SparseIndex},
  traits::SparseValue,
};
use serde::{Deserialize, Serialize};

mod ops;

pub use ops::{BinaryOp, CmpOp, CombinePolicy};

/// A dense logical sequence stored as its non-fill values plus a [`SparseIndex`].
///
/// `values[k]` is the logical value at the `k`-th materialized position; every
/// other position holds `fill_value`.
///
/// A `SparseArray` has no `set`: it is immutable once built, and an update is
/// expressed by building a new array (for example with [`SparseArray::map`] or
/// a binary operation).
///
/// Deserialization goes through [`SparseArray::from_parts`], so a payload whose
/// values do not match its index is rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
  try_from = "SparseArrayParts<T>",
  bound(deserialize = "T: SparseValue + Deserialize<'de>")
)]
pub struct SparseArray<T> {
  index: SparseIndex,
  values: Vec<T>,
  fill_value: T,
}

#[derive(Deserialize)]
struct SparseArrayParts<T> {
  index: SparseIndex,
  values: Vec<T>,
  fill_value: T,
}

impl<T: SparseValue> TryFrom<SparseArrayParts<T>> for SparseArray<T> {
  type Error = SparseError;

  fn try_from(parts: SparseArrayParts<T>) -> Result<Self, Self::Error> {
    SparseArray::from_parts(parts.index, parts.values, parts.fill_value)
  }
}

impl<T: SparseValue> SparseArray<T> {
  /// Compacts a dense buffer into a block-indexed sparse array.
  pub fn from_dense(values: &[T], fill_value: T) -> Self {
    Self::from_dense_with_kind(values, fill_value, IndexKind::default())
  }

  /// Compacts a dense buffer, keeping every value that is not [`SparseValue::fill_eq`]
  /// to `fill_value`, and indexes it with the requested encoding.
  pub fn from_dense_with_kind(values: &[T], fill_value: T, kind: IndexKind) -> Self {
    let (positions, kept): (Vec<usize>, Vec<T>) = values
      .iter()
      .enumerate()
      .filter(|(_, v)| !v.fill_eq(&fill_value))
      .map(|(pos, v)| (pos, v.clone()))
      .unzip();

    Self {
      index: SparseIndex::from_sorted(kind, positions, values.len()),
      values: kept,
      fill_value,
    }
  }

  /// Creates an array from an index and the values at its positions.
  ///
  /// Values are taken verbatim, even if some of them equal the fill value.
  pub fn from_parts(index: SparseIndex, values: Vec<T>, fill_value: T) -> Result<Self, SparseError> {
    if index.npoints() != values.len() {
      return Err(SparseError::ShapeMismatch {
        expected: index.npoints(),
        actual: values.len(),
      });
    }
    Ok(Self {
      index,
      values,
      fill_value,
    })
  }

  pub(crate) fn from_parts_unchecked(index: SparseIndex, values: Vec<T>, fill_value: T) -> Self {
    debug_assert_eq!(index.npoints(), values.len());
    Self {
      index,
      values,
      fill_value,
    }
  }

  /// Logical length.
  pub fn len(&self) -> usize {
    self.index.length()
  }

  /// Returns true if the logical length is zero.
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Number of materialized values.
  pub fn npoints(&self) -> usize {
    self.values.len()
  }

  /// Fraction of logical positions that are materialized; `0.0` for an empty array.
  pub fn density(&self) -> f64 {
    if self.is_empty() {
      0.0
    } else {
      self.npoints() as f64 / self.len() as f64
    }
  }

  /// Encoding of the underlying index.
  pub fn kind(&self) -> IndexKind {
    self.index.kind()
  }

  /// The underlying index.
  pub fn sp_index(&self) -> &SparseIndex {
    &self.index
  }

  /// The materialized values, in position order.
  pub fn sp_values(&self) -> &[T] {
    &self.values
  }

  /// The value of every non-materialized position.
  pub fn fill_value(&self) -> &T {
    &self.fill_value
  }

  /// Value at logical position `pos`.
  pub fn get(&self, pos: usize) -> Result<T, SparseError> {
    Ok(match self.index.lookup(pos)? {
      Some(offset) => self.values[offset].clone(),
      None => self.fill_value.clone(),
    })
  }

  /// Materialized `(position, value)` pairs in increasing position order.
  pub fn nonfill_entries(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
    self.index.positions().zip(self.values.iter())
  }

  /// Every logical value in order, fill values included.
  pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
    let mut entries = self.nonfill_entries().peekable();
    (0..self.len()).map(move |pos| match entries.next_if(|(p, _)| *p == pos) {
      Some((_, v)) => v.clone(),
      None => self.fill_value.clone(),
    })
  }

  /// Expands into a newly allocated dense buffer.
  pub fn to_dense(&self) -> Vec<T> {
    let mut dense = vec![self.fill_value.clone(); self.len()];
    for (pos, v) in self.nonfill_entries() {
      dense[pos] = v.clone();
    }
    dense
  }

  /// Same values, re-indexed with the requested encoding.
  pub fn with_kind(&self, kind: IndexKind) -> Self {
    Self {
      index: self.index.to_kind(kind),
      values: self.values.clone(),
      fill_value: self.fill_value.clone(),
    }
  }

  /// Applies `f` to every logical value.
  ///
  /// `f` runs once per materialized value and once on the fill value, whose
  /// image becomes the new fill. Images equal to the new fill are dropped from
  /// the index.
  pub fn map<U, F>(&self, f: F) -> SparseArray<U>
  where
    U: SparseValue,
    F: Fn(&T) -> U,
  {
    let fill_value = f(&self.fill_value);
    let (positions, values): (Vec<usize>, Vec<U>) = self
      .nonfill_entries()
      .map(|(pos, v)| (pos, f(v)))
      .filter(|(_, u)| !u.fill_eq(&fill_value))
      .unzip();

    SparseArray {
      index: SparseIndex::from_sorted(self.kind(), positions, self.len()),
      values,
      fill_value,
    }
  }
}
