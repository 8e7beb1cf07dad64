// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
// This file is part of the Sparsity project.

//! This library implements fill-value compressed one-dimensional arrays.
//!
//! A `SparseArray` stores only the entries that differ from its fill value
//! (often NaN, but any scalar works) together with a `SparseIndex` recording
//! which logical positions they occupy. Indexes come in two encodings, runs of
//! positions (`Block`) and explicit positions (`Integer`). Binary operations
//! align two indexes with a linear merge instead of densifying, and a
//! `SparseList` accumulates chunks cheaply before consolidating them into one
//! array. The `coo` module converts to and from coordinate triples.
#![deny(
  future_incompatible,
  nonstandard_style,
  rust_2018_idioms,
  missing_docs
)]
#![forbid(unsafe_code)]

// public modules
pub mod array;
pub mod coo;
pub mod errors;
pub mod index;
pub mod list;
pub mod traits;

/// Start a span + timer, return `(Span, Instant)`.
macro_rules! start_span {
    ($name:expr $(, $($fmt:tt)+)?) => {{
        let span       = info_span!($name $(, $($fmt)+)?);
        let span_clone = span.clone();    // lives as long as the guard
        let _guard      = span_clone.enter();
        (span, Instant::now())
    }};
}
pub(crate) use start_span;

pub use array::{BinaryOp, CmpOp, CombinePolicy, SparseArray};
pub use coo::{CooMatrix, CooOutput, CooSeries, from_coo, to_coo};
pub use errors::SparseError;
pub use index::{IndexAlignment, IndexKind, SparseIndex};
pub use list::{ListItem, SparseList};
pub use traits::SparseValue;
