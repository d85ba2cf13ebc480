//! Combined range-reader fan-out
//!
//! Grounded on Weaviate's `roaringsetrange` reader combine logic
//! (`reader.go:100-104`): layers are read newest-first, and the
//! accumulator narrows as each older layer is folded in — an addition
//! only survives if the older layer also has it, and only if a newer
//! layer hasn't deleted it first; deletions simply accumulate. No
//! roaring-bitmap crate exists anywhere in this workspace's dependency
//! pack, so layers are represented with plain doc-id sets instead of a
//! compressed bitmap.
//!
//! The fan-out itself mirrors the teacher's bounded-parallelism shape
//! (`rayon`'s data-parallel iterators, used the same way in
//! `dispatch::bm25f`'s term-build fan-out): collect all readers into a
//! `par_iter`, map each to its layer, and propagate the first error.

use rustc_hash::FxHashSet;

use rayon::prelude::*;

use bm25f_core::Result;

/// One layer's contribution to a combined doc-id set: what it added and
/// what it removed, relative to the layer below it.
#[derive(Debug, Clone, Default)]
pub struct BitmapLayer {
    pub additions: FxHashSet<u64>,
    pub deletions: FxHashSet<u64>,
}

impl BitmapLayer {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One range partition's reader. Implementations typically wrap a
/// single LSM segment or the active memtable.
pub trait RangeLayerReader: Send + Sync {
    /// Read the additions/deletions contributed by this layer for the
    /// queried range value.
    fn read_range(&self, value: &[u8]) -> Result<BitmapLayer>;
}

/// Fold layers ordered newest-first (`layers[0]` is newest) into one
/// combined layer, matching `reader.go:100-104`: start from the newest
/// layer, then for each older layer in turn, `AndNot` its deletions out
/// of the accumulated additions and `And` the result against its own
/// additions — an id only survives if every older layer re-affirms it —
/// while deletions simply `Or` together across all layers.
pub fn merge_layers(layers: &[BitmapLayer]) -> BitmapLayer {
    let mut iter = layers.iter();
    let Some(first) = iter.next() else {
        return BitmapLayer::new();
    };

    let mut additions = first.additions.clone();
    let mut deletions = first.deletions.clone();

    for layer in iter {
        additions.retain(|id| !layer.deletions.contains(id) && layer.additions.contains(id));
        deletions.extend(layer.deletions.iter().copied());
    }

    BitmapLayer {
        additions,
        deletions,
    }
}

/// Fans a single range query out across a list of layer readers
/// (newest-first), runs all but the last concurrently, and folds the
/// results into one combined layer.
pub struct CombinedReader {
    readers: Vec<Box<dyn RangeLayerReader>>,
}

impl CombinedReader {
    pub fn new(readers: Vec<Box<dyn RangeLayerReader>>) -> Self {
        CombinedReader { readers }
    }

    pub fn read(&self, value: &[u8]) -> Result<BitmapLayer> {
        if self.readers.is_empty() {
            return Ok(BitmapLayer::new());
        }

        let layers = self
            .readers
            .par_iter()
            .map(|r| r.read_range(value))
            .collect::<Result<Vec<_>>>()?;

        Ok(merge_layers(&layers))
    }
}
