// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
// This file is part of the Sparsity project.

//! Conversion between sparse arrays and coordinate (row, col, value) triples.
//!
//! The logical positions of a `SparseArray` carry no row/column structure of
//! their own; `to_coo` receives it from the caller as one label per position
//! per level, and splits the levels into a row key and a column key.
use crate::{
  array::SparseArray,
  errors::SparseError,
  index::{IndexKind, SparseIndex},
  traits::SparseValue,
};
use serde::{Deserialize, Serialize};
use std::{
  collections::{HashMap, HashSet},
  hash::Hash,
};
use tracing::debug;

/// A sparse matrix in coordinate format: entry `k` is `values[k]` at `(rows[k], cols[k])`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CooMatrix<T> {
  /// Row of every entry
  pub rows: Vec<usize>,
  /// Column of every entry
  pub cols: Vec<usize>,
  /// Value of every entry
  pub values: Vec<T>,
  /// `(nrows, ncols)`
  pub shape: (usize, usize),
}

impl<T> CooMatrix<T> {
  /// Creates a coordinate matrix, checking lengths, bounds and uniqueness of coordinates.
  pub fn new(
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<T>,
    shape: (usize, usize),
  ) -> Result<Self, SparseError> {
    let m = CooMatrix {
      rows,
      cols,
      values,
      shape,
    };
    m.validate()?;
    Ok(m)
  }

  /// Creates a coordinate matrix from `(row, col, value)` triples.
  pub fn from_triples<I>(triples: I, shape: (usize, usize)) -> Result<Self, SparseError>
  where
    I: IntoIterator<Item = (usize, usize, T)>,
  {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut values = Vec::new();
    for (r, c, v) in triples {
      rows.push(r);
      cols.push(c);
      values.push(v);
    }
    Self::new(rows, cols, values, shape)
  }

  /// Number of stored entries.
  pub fn nnz(&self) -> usize {
    self.values.len()
  }

  fn validate(&self) -> Result<(), SparseError> {
    for len in [self.rows.len(), self.cols.len()] {
      if len != self.values.len() {
        return Err(SparseError::ShapeMismatch {
          expected: self.values.len(),
          actual: len,
        });
      }
    }

    let (nrows, ncols) = self.shape;
    let mut seen = HashSet::with_capacity(self.nnz());
    for (&row, &col) in self.rows.iter().zip(self.cols.iter()) {
      if row >= nrows {
        return Err(SparseError::IndexOutOfRange {
          index: row,
          length: nrows,
        });
      }
      if col >= ncols {
        return Err(SparseError::IndexOutOfRange {
          index: col,
          length: ncols,
        });
      }
      if !seen.insert((row, col)) {
        return Err(SparseError::DuplicateCoordinate { row, col });
      }
    }
    Ok(())
  }
}

/// The result of [`to_coo`]: the matrix plus the label keys of its rows and columns.
///
/// Row `i` of the matrix corresponds to `row_labels[i]`, one label per row level;
/// likewise for columns.
#[derive(Clone, Debug, PartialEq)]
pub struct CooOutput<T, L> {
  /// The coordinate matrix
  pub matrix: CooMatrix<T>,
  /// Key of every matrix row
  pub row_labels: Vec<Vec<L>>,
  /// Key of every matrix column
  pub col_labels: Vec<Vec<L>>,
}

/// The result of [`from_coo`]: a sparse array and the `(row, col)` coordinate of
/// each of its logical positions.
#[derive(Clone, Debug, PartialEq)]
pub struct CooSeries<T> {
  /// The flattened values
  pub array: SparseArray<T>,
  /// Coordinate of every logical position of `array`
  pub coords: Vec<(usize, usize)>,
}

// assigns dense codes to keys in first-seen order
struct Vocabulary<L> {
  labels: Vec<Vec<L>>,
  codes: HashMap<Vec<L>, usize>,
}

impl<L: Clone + Eq + Hash + Ord> Vocabulary<L> {
  fn new() -> Self {
    Vocabulary {
      labels: Vec::new(),
      codes: HashMap::new(),
    }
  }

  fn code(&mut self, key: Vec<L>) -> usize {
    if let Some(&code) = self.codes.get(&key) {
      return code;
    }
    let code = self.labels.len();
    self.labels.push(key.clone());
    self.codes.insert(key, code);
    code
  }

  // sorts the labels; remap[old] is the new code of an old one
  fn into_sorted(self) -> (Vec<Vec<L>>, Vec<usize>) {
    let mut order: Vec<usize> = (0..self.labels.len()).collect();
    order.sort_by(|&a, &b| self.labels[a].cmp(&self.labels[b]));

    let mut remap = vec![0; order.len()];
    for (new, &old) in order.iter().enumerate() {
      remap[old] = new;
    }
    let mut labels = self.labels;
    labels.sort();
    (labels, remap)
  }
}

fn check_levels<L>(
  len: usize,
  levels: &[Vec<L>],
  row_levels: &[usize],
  column_levels: &[usize],
) -> Result<(), SparseError> {
  let nlevels = levels.len();
  if nlevels < 2 {
    return Err(SparseError::UnsupportedShape {
      reason: format!("to_coo requires at least 2 label levels, got {nlevels}"),
    });
  }
  if row_levels.is_empty() || column_levels.is_empty() {
    return Err(SparseError::UnsupportedShape {
      reason: "row and column levels must both be non-empty".to_string(),
    });
  }

  let mut used = vec![false; nlevels];
  for &level in row_levels.iter().chain(column_levels.iter()) {
    if level >= nlevels {
      return Err(SparseError::UnsupportedShape {
        reason: format!("level {level} does not exist, there are {nlevels}"),
      });
    }
    if used[level] {
      return Err(SparseError::UnsupportedShape {
        reason: format!("level {level} is used more than once"),
      });
    }
    used[level] = true;
  }
  if used.iter().any(|u| !u) {
    return Err(SparseError::UnsupportedShape {
      reason: "row and column levels must cover every label level".to_string(),
    });
  }

  for labels in levels {
    if labels.len() != len {
      return Err(SparseError::ShapeMismatch {
        expected: len,
        actual: labels.len(),
      });
    }
  }
  Ok(())
}

/// Reshapes the materialized entries of `array` into a coordinate matrix.
///
/// `levels[l][p]` is the level-`l` label of logical position `p`. The labels
/// at `row_levels` form the row key of a position, those at `column_levels`
/// its column key; together they must use every level exactly once. Row and
/// column vocabularies contain only keys of materialized entries, sorted when
/// `sort_labels` is set and in first-seen order otherwise.
pub fn to_coo<T, L>(
  array: &SparseArray<T>,
  levels: &[Vec<L>],
  row_levels: &[usize],
  column_levels: &[usize],
  sort_labels: bool,
) -> Result<CooOutput<T, L>, SparseError>
where
  T: SparseValue,
  L: Clone + Eq + Hash + Ord,
{
  check_levels(array.len(), levels, row_levels, column_levels)?;

  let key = |pos: usize, which: &[usize]| -> Vec<L> {
    which.iter().map(|&level| levels[level][pos].clone()).collect()
  };

  let mut row_vocab = Vocabulary::new();
  let mut col_vocab = Vocabulary::new();
  let mut rows = Vec::with_capacity(array.npoints());
  let mut cols = Vec::with_capacity(array.npoints());
  let mut values = Vec::with_capacity(array.npoints());
  for (pos, v) in array.nonfill_entries() {
    rows.push(row_vocab.code(key(pos, row_levels)));
    cols.push(col_vocab.code(key(pos, column_levels)));
    values.push(v.clone());
  }

  let (row_labels, col_labels) = if sort_labels {
    let (row_labels, row_remap) = row_vocab.into_sorted();
    let (col_labels, col_remap) = col_vocab.into_sorted();
    rows.iter_mut().for_each(|r| *r = row_remap[*r]);
    cols.iter_mut().for_each(|c| *c = col_remap[*c]);
    (row_labels, col_labels)
  } else {
    (row_vocab.labels, col_vocab.labels)
  };

  let shape = (row_labels.len(), col_labels.len());
  debug!(nnz = values.len(), nrows = shape.0, ncols = shape.1, "to_coo");
  let matrix = CooMatrix::new(rows, cols, values, shape)?;

  Ok(CooOutput {
    matrix,
    row_labels,
    col_labels,
  })
}

/// Flattens a coordinate matrix into a sparse array, entries ordered by `row * ncols + col`.
///
/// With `dense_index` the result spans the full `nrows * ncols` grid and every
/// unlisted coordinate holds `fill_value`; this allocates a coordinate per
/// grid cell, so it is only affordable for small shapes. Without it the
/// result has exactly one logical position per listed entry.
pub fn from_coo<T: SparseValue>(
  matrix: &CooMatrix<T>,
  fill_value: T,
  dense_index: bool,
) -> Result<CooSeries<T>, SparseError> {
  matrix.validate()?;
  let (nrows, ncols) = matrix.shape;

  let mut order: Vec<usize> = (0..matrix.nnz()).collect();
  order.sort_unstable_by_key(|&k| (matrix.rows[k], matrix.cols[k]));

  let series = if dense_index {
    let length = nrows
      .checked_mul(ncols)
      .ok_or_else(|| SparseError::UnsupportedShape {
        reason: format!("{nrows} x {ncols} grid overflows the logical length"),
      })?;

    let (positions, values): (Vec<usize>, Vec<T>) = order
      .iter()
      .filter(|&&k| !matrix.values[k].fill_eq(&fill_value))
      .map(|&k| (matrix.rows[k] * ncols + matrix.cols[k], matrix.values[k].clone()))
      .unzip();

    let index = SparseIndex::from_sorted(IndexKind::default(), positions, length);
    CooSeries {
      array: SparseArray::from_parts_unchecked(index, values, fill_value),
      coords: (0..nrows)
        .flat_map(|r| (0..ncols).map(move |c| (r, c)))
        .collect(),
    }
  } else {
    let values: Vec<T> = order.iter().map(|&k| matrix.values[k].clone()).collect();
    CooSeries {
      array: SparseArray::from_dense(&values, fill_value),
      coords: order
        .iter()
        .map(|&k| (matrix.rows[k], matrix.cols[k]))
        .collect(),
    }
  };

  debug!(
    nnz = matrix.nnz(),
    length = series.array.len(),
    dense_index,
    "from_coo"
  );
  Ok(series)
}
