// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
// This file is part of the Sparsity project.

//! Elementwise binary operations between sparse arrays.
//!
//! Two strategies are implemented:
//! - fill-aware: align the two indexes and evaluate the operator only at
//!   positions materialized on at least one side. Every other position holds
//!   `op(fill_left, fill_right)`, which becomes the output fill value.
//! - dense: expand both operands, apply the operator to every position, and
//!   recompact the result. Costs `O(len)` memory and time.
use super::SparseArray;
use crate::{errors::SparseError, index::SparseIndex, start_span, traits::SparseValue};
use itertools::Itertools;
use num_traits::Num;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, info_span};

/// Arithmetic operators understood by [`SparseArray::combine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
  /// `a + b`
  Add,
  /// `a - b`
  Sub,
  /// `a * b`
  Mul,
  /// `a / b`
  Div,
  /// `a % b`
  Rem,
  /// the smaller of `a` and `b`, `a` when they are unordered
  Min,
  /// the larger of `a` and `b`, `a` when they are unordered
  Max,
}

impl BinaryOp {
  /// Evaluates the operator on two scalars.
  ///
  /// # Panics
  /// Integer `Div` and `Rem` panic on a zero divisor, like the underlying operators.
  pub fn apply<T: Num + PartialOrd>(self, a: T, b: T) -> T {
    match self {
      BinaryOp::Add => a + b,
      BinaryOp::Sub => a - b,
      BinaryOp::Mul => a * b,
      BinaryOp::Div => a / b,
      BinaryOp::Rem => a % b,
      BinaryOp::Min => {
        if b < a {
          b
        } else {
          a
        }
      }
      BinaryOp::Max => {
        if b > a {
          b
        } else {
          a
        }
      }
    }
  }
}

/// Comparison operators understood by [`SparseArray::compare`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
  /// `a == b`
  Eq,
  /// `a != b`
  Ne,
  /// `a < b`
  Lt,
  /// `a <= b`
  Le,
  /// `a > b`
  Gt,
  /// `a >= b`
  Ge,
}

impl CmpOp {
  /// Evaluates the comparison on two scalars.
  pub fn apply<T: PartialOrd>(self, a: &T, b: &T) -> bool {
    match self {
      CmpOp::Eq => a == b,
      CmpOp::Ne => a != b,
      CmpOp::Lt => a < b,
      CmpOp::Le => a <= b,
      CmpOp::Gt => a > b,
      CmpOp::Ge => a >= b,
    }
  }
}

/// Selects how a binary operation treats positions that hold fill values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CombinePolicy<U> {
  /// Fill-aware when both fill values match, dense otherwise
  #[default]
  Auto,
  /// Always align the indexes; never densify
  FillAware,
  /// Always densify, recompacting with `fill` or with `op(fill_left, fill_right)` when `None`
  Dense {
    /// Fill value of the result
    fill: Option<U>,
  },
}

impl<T: SparseValue> SparseArray<T> {
  /// Applies `op` at every logical position of `self` and `other`.
  ///
  /// Every position `p` of the result holds `op(self[p], other[p])` whichever
  /// policy runs. The result is indexed with the encoding of `self`.
  ///
  /// `op(fill_left, fill_right)` is only evaluated when some position holds the
  /// fill value on both sides; it then becomes the output fill. Otherwise the
  /// output fill is the value computed at position 0.
  pub fn combine_with<U, F>(
    &self,
    other: &SparseArray<T>,
    op: F,
    policy: CombinePolicy<U>,
  ) -> Result<SparseArray<U>, SparseError>
  where
    U: SparseValue,
    F: Fn(&T, &T) -> U,
  {
    self.combine_inner(other, &op, policy, || op(&self.fill_value, &other.fill_value))
  }

  // `empty_fill` supplies the output fill when both operands are empty
  fn combine_inner<U, F, G>(
    &self,
    other: &SparseArray<T>,
    op: F,
    policy: CombinePolicy<U>,
    empty_fill: G,
  ) -> Result<SparseArray<U>, SparseError>
  where
    U: SparseValue,
    F: Fn(&T, &T) -> U,
    G: FnOnce() -> U,
  {
    if self.len() != other.len() {
      return Err(SparseError::ShapeMismatch {
        expected: self.len(),
        actual: other.len(),
      });
    }

    let (_combine_span, combine_t) = start_span!("combine", len = self.len());
    let policy = match policy {
      CombinePolicy::Auto if self.fill_value.fill_eq(&other.fill_value) => CombinePolicy::FillAware,
      CombinePolicy::Auto => CombinePolicy::Dense { fill: None },
      explicit => explicit,
    };

    let combined = match policy {
      CombinePolicy::Dense { fill } => {
        debug!(len = self.len(), "combining densely");
        self.combine_dense(other, op, fill, empty_fill)
      }
      _ => {
        debug!(
          left = self.npoints(),
          right = other.npoints(),
          "combining fill-aware"
        );
        self.combine_fill_aware(other, op, empty_fill)?
      }
    };
    info!(
      elapsed_ms = %combine_t.elapsed().as_millis(),
      npoints = combined.npoints(),
      "combine"
    );
    Ok(combined)
  }

  fn combine_fill_aware<U, F, G>(
    &self,
    other: &SparseArray<T>,
    op: F,
    empty_fill: G,
  ) -> Result<SparseArray<U>, SparseError>
  where
    U: SparseValue,
    F: Fn(&T, &T) -> U,
    G: FnOnce() -> U,
  {
    let aligned = self.index.intersect(&other.index)?;
    let computed: Vec<U> = aligned
      .left
      .iter()
      .zip(aligned.right.iter())
      .map(|(left, right)| {
        let a = left.map_or(&self.fill_value, |k| &self.values[k]);
        let b = right.map_or(&other.fill_value, |k| &other.values[k]);
        op(a, b)
      })
      .collect();

    // the alignment covers every position exactly when no position is fill on both sides
    let fill_value = if aligned.len() < self.len() {
      op(&self.fill_value, &other.fill_value)
    } else {
      computed.first().cloned().unwrap_or_else(empty_fill)
    };

    let (positions, values): (Vec<usize>, Vec<U>) = aligned
      .positions
      .into_iter()
      .zip(computed)
      .filter(|(_, v)| !v.fill_eq(&fill_value))
      .unzip();

    let index = SparseIndex::from_sorted(self.kind(), positions, self.len());
    Ok(SparseArray::from_parts_unchecked(index, values, fill_value))
  }

  fn combine_dense<U, F, G>(
    &self,
    other: &SparseArray<T>,
    op: F,
    fill: Option<U>,
    empty_fill: G,
  ) -> SparseArray<U>
  where
    U: SparseValue,
    F: Fn(&T, &T) -> U,
    G: FnOnce() -> U,
  {
    let dense: Vec<U> = self
      .to_dense()
      .iter()
      .zip(other.to_dense().iter())
      .map(|(a, b)| op(a, b))
      .collect();

    let covered = self
      .index
      .positions()
      .merge(other.index.positions())
      .dedup()
      .count();
    let fill_value = match fill {
      Some(fill) => fill,
      None if covered < self.len() => op(&self.fill_value, &other.fill_value),
      None => dense.first().cloned().unwrap_or_else(empty_fill),
    };
    SparseArray::from_dense_with_kind(&dense, fill_value, self.kind())
  }

  /// Elementwise comparison producing a boolean sparse array.
  pub fn compare(&self, other: &SparseArray<T>, op: CmpOp) -> Result<SparseArray<bool>, SparseError>
  where
    T: PartialOrd,
  {
    self.combine_with(other, |a, b| op.apply(a, b), CombinePolicy::Auto)
  }
}

impl<T> SparseArray<T>
where
  T: SparseValue + Num + PartialOrd,
{
  /// Elementwise arithmetic, choosing the policy automatically.
  pub fn combine(&self, other: &SparseArray<T>, op: BinaryOp) -> Result<SparseArray<T>, SparseError> {
    self.combine_with_policy(other, op, CombinePolicy::Auto)
  }

  /// Elementwise arithmetic under an explicit policy.
  ///
  /// Integer `Div` and `Rem` only divide at positions that actually hold a
  /// zero divisor, so `[2, 4] / [1, 2]` with fill `0` never evaluates `0 / 0`.
  pub fn combine_with_policy(
    &self,
    other: &SparseArray<T>,
    op: BinaryOp,
    policy: CombinePolicy<T>,
  ) -> Result<SparseArray<T>, SparseError> {
    self.combine_inner(
      other,
      |a: &T, b: &T| op.apply(a.clone(), b.clone()),
      policy,
      || self.fill_value.clone(),
    )
  }

  /// Applies `op` between every logical value and `scalar`.
  pub fn apply_scalar(&self, op: BinaryOp, scalar: T) -> SparseArray<T> {
    self.map(|v| op.apply(v.clone(), scalar.clone()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::index::IndexKind;

  const NAN: f64 = f64::NAN;

  fn check_pointwise<F>(a: &SparseArray<f64>, b: &SparseArray<f64>, out: &SparseArray<f64>, op: F)
  where
    F: Fn(f64, f64) -> f64,
  {
    for p in 0..a.len() {
      let expected = op(a.get(p).unwrap(), b.get(p).unwrap());
      let actual = out.get(p).unwrap();
      assert!(expected.fill_eq(&actual), "position {p}: {expected} vs {actual}");
    }
  }

  #[test]
  fn test_fill_aware_add_with_zero_fill() {
    let a = SparseArray::from_dense(&[0.0, 1.0, 2.0, 0.0, 0.0, 5.0], 0.0);
    let b = SparseArray::from_dense_with_kind(&[0.0, 0.0, 3.0, 4.0, 0.0, -5.0], 0.0, IndexKind::Integer);

    let sum = a.combine(&b, BinaryOp::Add).unwrap();
    assert_eq!(sum.to_dense(), vec![0.0, 1.0, 5.0, 4.0, 0.0, 0.0]);
    assert_eq!(*sum.fill_value(), 0.0);
    // 5 + -5 lands on the fill value and is not materialized
    assert_eq!(sum.npoints(), 3);
    assert_eq!(sum.kind(), IndexKind::Block);
  }

  #[test]
  fn test_both_policies_agree_with_nan_fill() {
    let a = SparseArray::from_dense(&[NAN, 1.0, NAN, 2.0, 3.0, NAN], NAN);
    let b = SparseArray::from_dense(&[4.0, NAN, NAN, 1.0, NAN, NAN], NAN);

    for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul, BinaryOp::Div] {
      let fill_aware = a.combine_with_policy(&b, op, CombinePolicy::FillAware).unwrap();
      let dense = a.combine_with_policy(&b, op, CombinePolicy::Dense { fill: None }).unwrap();
      check_pointwise(&a, &b, &fill_aware, |x, y| op.apply(x, y));
      check_pointwise(&a, &b, &dense, |x, y| op.apply(x, y));
      assert!(fill_aware.fill_value().is_nan());
    }
  }

  #[test]
  fn test_mismatched_fills_fall_back_to_dense() {
    let a = SparseArray::from_dense(&[0.0, 1.0, 0.0, 2.0], 0.0);
    let b = SparseArray::from_dense(&[1.0, 1.0, 7.0, 1.0], 1.0);

    let product = a.combine(&b, BinaryOp::Mul).unwrap();
    check_pointwise(&a, &b, &product, |x, y| x * y);
    assert_eq!(*product.fill_value(), 0.0);

    // forcing the fill-aware path with unequal fills is still correct
    let forced = a.combine_with_policy(&b, BinaryOp::Mul, CombinePolicy::FillAware).unwrap();
    check_pointwise(&a, &b, &forced, |x, y| x * y);
  }

  #[test]
  fn test_dense_policy_with_explicit_fill() {
    let a = SparseArray::from_dense(&[0, 3, 0, 3], 0);
    let b = SparseArray::from_dense(&[0, 0, 3, 3], 0);

    let sum = a
      .combine_with_policy(&b, BinaryOp::Add, CombinePolicy::Dense { fill: Some(3) })
      .unwrap();
    assert_eq!(*sum.fill_value(), 3);
    assert_eq!(sum.to_dense(), vec![0, 3, 3, 6]);
    assert_eq!(sum.npoints(), 2);
  }

  #[test]
  fn test_integer_division_with_zero_fill() {
    let a = SparseArray::from_dense(&[2i64, 4], 0);
    let b = SparseArray::from_dense(&[1i64, 2], 0);

    let policies = [
      CombinePolicy::Auto,
      CombinePolicy::FillAware,
      CombinePolicy::Dense { fill: None },
    ];
    for policy in policies {
      let quotient = a.combine_with_policy(&b, BinaryOp::Div, policy.clone()).unwrap();
      assert_eq!(quotient.to_dense(), vec![2, 2]);
      let remainder = a.combine_with_policy(&b, BinaryOp::Rem, policy).unwrap();
      assert_eq!(remainder.to_dense(), vec![0, 0]);
    }

    // a left gap divided by a materialized divisor
    let a = SparseArray::from_dense_with_kind(&[0i64, 6, 3], 0, IndexKind::Integer);
    let b = SparseArray::from_dense(&[3i64, 2, 1], 0);
    assert_eq!(a.combine(&b, BinaryOp::Div).unwrap().to_dense(), vec![0, 3, 3]);

    let empty = SparseArray::<i64>::from_dense(&[], 0);
    let quotient = empty.combine(&empty, BinaryOp::Div).unwrap();
    assert!(quotient.is_empty());
    assert_eq!(*quotient.fill_value(), 0);
  }

  #[test]
  fn test_length_mismatch() {
    let a = SparseArray::from_dense(&[1, 0, 2], 0);
    let b = SparseArray::from_dense(&[1, 0], 0);
    assert_eq!(
      a.combine(&b, BinaryOp::Add),
      Err(SparseError::ShapeMismatch {
        expected: 3,
        actual: 2
      })
    );
  }

  #[test]
  fn test_compare() {
    let a = SparseArray::from_dense(&[0, 5, 0, 2], 0);
    let b = SparseArray::from_dense(&[0, 1, 4, 2], 0);

    let gt = a.compare(&b, CmpOp::Gt).unwrap();
    assert!(!*gt.fill_value());
    assert_eq!(gt.to_dense(), vec![false, true, false, false]);

    let eq = a.compare(&b, CmpOp::Eq).unwrap();
    assert!(*eq.fill_value());
    assert_eq!(eq.to_dense(), vec![true, false, false, true]);
  }

  #[test]
  fn test_min_max_and_scalar() {
    let a = SparseArray::from_dense(&[0, 5, -2, 0], 0);
    let b = SparseArray::from_dense(&[1, 0, 0, 0], 0);

    assert_eq!(a.combine(&b, BinaryOp::Max).unwrap().to_dense(), vec![1, 5, 0, 0]);
    assert_eq!(a.combine(&b, BinaryOp::Min).unwrap().to_dense(), vec![0, 0, -2, 0]);

    let scaled = a.apply_scalar(BinaryOp::Mul, 2);
    assert_eq!(scaled.to_dense(), vec![0, 10, -4, 0]);
    assert_eq!(scaled.npoints(), 2);
  }
}
