// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
// This file is part of the Sparsity project.

//! Block (run-length) encoding of a sparse index.
use crate::errors::SparseError;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// A sparse index stored as runs of contiguous materialized positions.
///
/// Run `i` covers `locations[i]..locations[i] + lengths[i]`. Runs are strictly
/// ordered and never overlap. Every block index is canonical: touching runs are
/// merged on construction and on deserialization, so two block indexes over
/// the same positions compare equal.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "BlockIndexParts")]
pub struct BlockIndex {
  length: usize,
  locations: Vec<usize>,
  lengths: Vec<usize>,
  // physical offset of the first value of each block
  #[serde(skip, default = "OnceCell::new")]
  offsets: OnceCell<Vec<usize>>,
}

// serialized state, checked by `BlockIndex::new` on the way in
#[derive(Deserialize)]
struct BlockIndexParts {
  length: usize,
  locations: Vec<usize>,
  lengths: Vec<usize>,
}

impl TryFrom<BlockIndexParts> for BlockIndex {
  type Error = SparseError;

  fn try_from(parts: BlockIndexParts) -> Result<Self, Self::Error> {
    BlockIndex::new(parts.length, parts.locations, parts.lengths)
  }
}

impl PartialEq for BlockIndex {
  fn eq(&self, other: &Self) -> bool {
    self.length == other.length && self.locations == other.locations && self.lengths == other.lengths
  }
}

impl Eq for BlockIndex {}

impl BlockIndex {
  /// Creates a block index from explicit runs, checking every invariant.
  ///
  /// Touching runs (`locations[i] + lengths[i] == locations[i + 1]`) are
  /// accepted and merged into one.
  pub fn new(length: usize, locations: Vec<usize>, lengths: Vec<usize>) -> Result<Self, SparseError> {
    if locations.len() != lengths.len() {
      return Err(SparseError::InvalidIndex {
        reason: format!(
          "{} block locations but {} block lengths",
          locations.len(),
          lengths.len()
        ),
      });
    }

    let mut merged_locations: Vec<usize> = Vec::with_capacity(locations.len());
    let mut merged_lengths: Vec<usize> = Vec::with_capacity(lengths.len());
    let mut next_free = 0;
    for (i, (&loc, &len)) in locations.iter().zip(lengths.iter()).enumerate() {
      if len == 0 {
        return Err(SparseError::InvalidIndex {
          reason: format!("block {i} has zero length"),
        });
      }
      if i > 0 && loc < next_free {
        return Err(SparseError::InvalidIndex {
          reason: format!("block {i} at {loc} overlaps or precedes the previous block"),
        });
      }
      let end = loc.checked_add(len).ok_or_else(|| SparseError::InvalidIndex {
        reason: format!("block {i} at {loc} with length {len} overflows"),
      })?;
      if end > length {
        return Err(SparseError::InvalidIndex {
          reason: format!("block {i} ends at {end}, past length {length}"),
        });
      }

      if i > 0 && loc == next_free {
        if let Some(prev) = merged_lengths.last_mut() {
          *prev += len;
        }
      } else {
        merged_locations.push(loc);
        merged_lengths.push(len);
      }
      next_free = end;
    }

    Ok(Self {
      length,
      locations: merged_locations,
      lengths: merged_lengths,
      offsets: OnceCell::new(),
    })
  }

  /// Builds the canonical run encoding of already sorted, deduplicated positions.
  pub(crate) fn from_sorted_positions<I>(length: usize, positions: I) -> Self
  where
    I: IntoIterator<Item = usize>,
  {
    let mut locations: Vec<usize> = Vec::new();
    let mut lengths: Vec<usize> = Vec::new();

    // one past the last position seen
    let mut run_end = None;
    for pos in positions {
      match lengths.last_mut() {
        Some(len) if run_end == Some(pos) => *len += 1,
        _ => locations.push(pos),
      }
      if locations.len() > lengths.len() {
        lengths.push(1);
      }
      run_end = Some(pos + 1);
    }

    Self {
      length,
      locations,
      lengths,
      offsets: OnceCell::new(),
    }
  }

  /// Logical length of the array this index describes.
  pub fn length(&self) -> usize {
    self.length
  }

  /// Start position of every block.
  pub fn locations(&self) -> &[usize] {
    &self.locations
  }

  /// Length of every block.
  pub fn lengths(&self) -> &[usize] {
    &self.lengths
  }

  /// Number of blocks.
  pub fn nblocks(&self) -> usize {
    self.locations.len()
  }

  /// Number of materialized positions.
  pub fn npoints(&self) -> usize {
    self.physical_offsets().last().copied().unwrap_or(0)
  }

  // offsets[i] is the physical offset of block i; offsets[nblocks] is npoints
  fn physical_offsets(&self) -> &[usize] {
    self.offsets.get_or_init(|| {
      let mut acc = 0;
      let mut offsets = Vec::with_capacity(self.lengths.len() + 1);
      offsets.push(0);
      for len in &self.lengths {
        acc += len;
        offsets.push(acc);
      }
      offsets
    })
  }

  /// Physical offset of `pos`, or `None` if `pos` lies in a gap.
  ///
  /// The caller is responsible for checking `pos < length`.
  pub(crate) fn lookup(&self, pos: usize) -> Option<usize> {
    // number of blocks starting at or before pos
    let starts = self.locations.partition_point(|&loc| loc <= pos);
    if starts == 0 {
      return None;
    }
    let block = starts - 1;
    let within = pos - self.locations[block];
    if within < self.lengths[block] {
      Some(self.physical_offsets()[block] + within)
    } else {
      None
    }
  }

  /// Lazily walks the covered positions in increasing order.
  pub fn positions(&self) -> BlockPositions<'_> {
    BlockPositions {
      locations: &self.locations,
      lengths: &self.lengths,
      block: 0,
      within: 0,
      remaining: self.npoints(),
    }
  }
}

/// Iterator over the positions covered by a [`BlockIndex`].
#[derive(Clone, Debug)]
pub struct BlockPositions<'a> {
  locations: &'a [usize],
  lengths: &'a [usize],
  block: usize,
  within: usize,
  remaining: usize,
}

impl Iterator for BlockPositions<'_> {
  type Item = usize;

  fn next(&mut self) -> Option<usize> {
    if self.remaining == 0 {
      return None;
    }
    // canonical blocks are never empty, so a single step suffices
    if self.within == self.lengths[self.block] {
      self.block += 1;
      self.within = 0;
    }
    let pos = self.locations[self.block] + self.within;
    self.within += 1;
    self.remaining -= 1;
    Some(pos)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.remaining, Some(self.remaining))
  }
}

impl ExactSizeIterator for BlockPositions<'_> {}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_runs_are_merged() {
    let idx = BlockIndex::from_sorted_positions(10, [2, 3, 6]);
    assert_eq!(idx.locations(), &[2, 6]);
    assert_eq!(idx.lengths(), &[2, 1]);
    assert_eq!(idx.npoints(), 3);
    assert_eq!(idx.positions().collect::<Vec<_>>(), vec![2, 3, 6]);
  }

  #[test]
  fn test_lookup() {
    let idx = BlockIndex::new(20, vec![1, 5, 12], vec![2, 4, 3]).unwrap();
    assert_eq!(idx.lookup(0), None);
    assert_eq!(idx.lookup(1), Some(0));
    assert_eq!(idx.lookup(2), Some(1));
    assert_eq!(idx.lookup(3), None);
    assert_eq!(idx.lookup(5), Some(2));
    assert_eq!(idx.lookup(8), Some(5));
    assert_eq!(idx.lookup(9), None);
    assert_eq!(idx.lookup(14), Some(8));
    assert_eq!(idx.lookup(19), None);
  }

  #[test]
  fn test_new_rejects_bad_runs() {
    assert!(BlockIndex::new(10, vec![0, 1], vec![2, 1]).is_err());
    assert!(BlockIndex::new(10, vec![0], vec![0]).is_err());
    assert!(BlockIndex::new(10, vec![8], vec![3]).is_err());
    assert!(BlockIndex::new(10, vec![0, 2], vec![1]).is_err());
    assert!(matches!(
      BlockIndex::new(10, vec![usize::MAX], vec![2]),
      Err(SparseError::InvalidIndex { .. })
    ));
    assert!(matches!(
      BlockIndex::new(usize::MAX, vec![0, usize::MAX - 1], vec![1, 2]),
      Err(SparseError::InvalidIndex { .. })
    ));
  }

  #[test]
  fn test_new_merges_touching_runs() {
    let idx = BlockIndex::new(10, vec![0, 2, 5], vec![2, 1, 1]).unwrap();
    assert_eq!(idx.locations(), &[0, 5]);
    assert_eq!(idx.lengths(), &[3, 1]);
    assert_eq!(idx, BlockIndex::from_sorted_positions(10, [0, 1, 2, 5]));
    assert_eq!(idx.lookup(2), Some(2));
    assert_eq!(idx.lookup(5), Some(3));
  }

  #[test]
  fn test_empty() {
    let idx = BlockIndex::from_sorted_positions(0, []);
    assert_eq!(idx.npoints(), 0);
    assert_eq!(idx.nblocks(), 0);
    assert_eq!(idx.positions().count(), 0);
  }

  #[test]
  fn test_offsets_cache_not_serialized() {
    let idx = BlockIndex::new(10, vec![2, 6], vec![2, 1]).unwrap();
    assert_eq!(idx.lookup(6), Some(2));

    let bytes = bincode::serialize(&idx).unwrap();
    let restored: BlockIndex = bincode::deserialize(&bytes).unwrap();
    assert_eq!(restored, idx);
    assert_eq!(restored.lookup(6), Some(2));
  }

  #[test]
  fn test_deserialize_rejects_bad_runs() {
    // length, locations, lengths with one location too many
    let bytes = bincode::serialize(&(10usize, vec![1usize, 4], vec![2usize])).unwrap();
    assert!(bincode::deserialize::<BlockIndex>(&bytes).is_err());

    let bytes = bincode::serialize(&(10usize, vec![8usize], vec![5usize])).unwrap();
    assert!(bincode::deserialize::<BlockIndex>(&bytes).is_err());

    // touching runs come back merged
    let bytes = bincode::serialize(&(10usize, vec![0usize, 2], vec![2usize, 1])).unwrap();
    let restored: BlockIndex = bincode::deserialize(&bytes).unwrap();
    assert_eq!(restored.locations(), &[0]);
    assert_eq!(restored.lengths(), &[3]);
  }
}
