// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
// This file is part of the Sparsity project.

//! This module defines the traits a value type implements to be stored sparsely.
use core::fmt::Debug;
use num_traits::Float;

/// A scalar that can be stored in a sparse array.
///
/// The only thing a sparse structure needs beyond cloning is a way to decide
/// whether a value is "the fill value". Ordinary `==` is not enough: a NaN
/// fill must match NaN entries even though `NaN != NaN`, so each value kind
/// picks its own predicate:
///
/// * `f32`/`f64`: NaN matches NaN, everything else uses `==`.
/// * integers, `bool` and `char`: plain `==`.
/// * `Option<T>`: `None` matches `None`, `Some` defers to `T`.
pub trait SparseValue: Clone + Debug {
  /// Returns true if `self` is indistinguishable from `fill` for compaction purposes.
  fn fill_eq(&self, fill: &Self) -> bool;
}

#[inline]
fn float_fill_eq<F: Float>(a: F, b: F) -> bool {
  (a.is_nan() && b.is_nan()) || a == b
}

macro_rules! impl_sparse_value_for_float {
  ($($float:ty),* $(,)?) => {
    $(
      impl SparseValue for $float {
        #[inline]
        fn fill_eq(&self, fill: &Self) -> bool {
          float_fill_eq(*self, *fill)
        }
      }
    )*
  };
}

macro_rules! impl_sparse_value_for_eq {
  ($($ty:ty),* $(,)?) => {
    $(
      impl SparseValue for $ty {
        #[inline]
        fn fill_eq(&self, fill: &Self) -> bool {
          self == fill
        }
      }
    )*
  };
}

impl_sparse_value_for_float!(f32, f64);
impl_sparse_value_for_eq!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char);

impl<T: SparseValue> SparseValue for Option<T> {
  fn fill_eq(&self, fill: &Self) -> bool {
    match (self, fill) {
      (None, None) => true,
      (Some(a), Some(b)) => a.fill_eq(b),
      _ => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_nan_matches_nan() {
    assert!(f64::NAN.fill_eq(&f64::NAN));
    assert!(f32::NAN.fill_eq(&f32::NAN));
    assert!(!1.0f64.fill_eq(&f64::NAN));
    assert!(!f64::NAN.fill_eq(&0.0));
  }

  #[test]
  fn test_ordinary_floats_use_numeric_equality() {
    assert!(0.0f64.fill_eq(&0.0));
    assert!((-0.0f64).fill_eq(&0.0));
    assert!(!1.5f64.fill_eq(&1.25));
  }

  #[test]
  fn test_integers_and_options() {
    assert!(3i64.fill_eq(&3));
    assert!(!3u8.fill_eq(&4));
    assert!(None::<i32>.fill_eq(&None));
    assert!(!Some(0i32).fill_eq(&None));
    assert!(Some(f64::NAN).fill_eq(&Some(f64::NAN)));
  }
}
