//! WAND (Weak AND) top-K engine
//!
//! Grounded on `getTopKHeap`/`Terms` (bm25_searcher.go): pivot selection
//! via a running idf sum, skip-advancement to the pivot's doc-id, and a
//! bounded min-heap gated on whether the heap is full. The sentinel
//! `-10_000` matches the source exactly — scores can go negative when
//! idf goes negative under pathological `n`, so the sentinel must never
//! be clamped to zero.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use bm25f_core::{Error, Result};

use crate::term::Term;

/// `Terms.list` sorted ascending by live `id_pointer` is the loop
/// invariant; construction and every mutating step re-establish it.
pub struct Terms {
    pub list: Vec<Term>,
}

impl Terms {
    pub fn new(mut list: Vec<Term>) -> Self {
        list.sort_by_key(|t| t.id_pointer);
        Terms { list }
    }

    fn completely_exhausted(&self) -> bool {
        self.list.iter().all(|t| t.exhausted)
    }

    fn resort(&mut self) {
        self.list.sort_by_key(|t| t.id_pointer);
    }

    fn find_min_id(&self, min_score: f64) -> Option<(u64, usize)> {
        let mut cum_score = 0.0;
        for (i, term) in self.list.iter().enumerate() {
            if term.exhausted {
                continue;
            }
            cum_score += term.idf;
            if cum_score >= min_score {
                return Some((term.id_pointer, i));
            }
        }
        None
    }

    fn advance_all_at_least(&mut self, min_id: u64) {
        for term in &mut self.list {
            term.advance_at_least(min_id);
        }
    }

    /// Returns `true` when no pivot meets `min_score` and the search is
    /// complete.
    fn pivot(&mut self, min_score: f64) -> bool {
        let Some((min_id, pivot_point)) = self.find_min_id(min_score) else {
            return true;
        };
        if pivot_point == 0 {
            return false;
        }
        self.advance_all_at_least(min_id);
        self.resort();
        false
    }

    fn find_first_non_exhausted(&self) -> Option<usize> {
        self.list.iter().position(|t| !t.exhausted)
    }

    fn score_next(&mut self, avg_prop_length: f64, k1: f64, b: f64) -> (u64, f64) {
        let Some(pos) = self.find_first_non_exhausted() else {
            return (0, 0.0);
        };
        let id = self.list[pos].id_pointer;
        let mut cum_score = 0.0;
        for i in pos..self.list.len() {
            if self.list[i].id_pointer != id || self.list[i].exhausted {
                continue;
            }
            let (_, score) = self.list[i].score_and_advance(avg_prop_length, k1, b);
            cum_score += score;
        }
        self.resort();
        (id, cum_score)
    }
}

/// Scores can go negative when idf goes negative under pathological
/// `n`; the sentinel must stay far below any real score, never zero.
const WORST_DIST_SENTINEL: f64 = -10_000.0;

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    id: u64,
    score: f64,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.score == other.score
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Deterministic tie-break by doc-id (spec §4.8's merge tie-break,
        // applied here too so heap order never depends on insertion order).
        self.score
            .partial_cmp(&other.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Run WAND to completion, returning up to `limit` (id, score) pairs in
/// descending-score order. `limit == 0` means "as many as exist"
/// (spec §4.5: the sum of posting-list sizes across terms). `deadline`
/// is checked once per iteration; once it passes, the scan aborts with
/// `Error::Cancelled` instead of running to completion.
pub fn top_k(
    mut terms: Terms,
    limit: usize,
    avg_prop_length: f64,
    k1: f64,
    b: f64,
    deadline: Option<Instant>,
) -> Result<Vec<(u64, f64)>> {
    let effective_limit = if limit == 0 {
        terms.list.iter().map(|t| t.data.len()).sum()
    } else {
        limit
    };

    terms.resort();

    // Min-heap via Reverse: peek/pop always surface the current worst
    // (lowest-score) kept entry, which is exactly what bounding needs.
    let mut heap: BinaryHeap<std::cmp::Reverse<HeapEntry>> = BinaryHeap::new();
    let mut worst_dist = WORST_DIST_SENTINEL;

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Error::Cancelled);
        }

        if terms.completely_exhausted() || terms.pivot(worst_dist) {
            break;
        }

        let (id, score) = terms.score_next(avg_prop_length, k1, b);

        let should_insert = heap.len() < effective_limit
            || heap
                .peek()
                .map(|std::cmp::Reverse(top)| top.score < score)
                .unwrap_or(false);

        if should_insert {
            heap.push(std::cmp::Reverse(HeapEntry { id, score }));
            while heap.len() > effective_limit {
                heap.pop();
            }
            // Only update worst_dist once the heap is full; otherwise an
            // early high-scoring first insertion would prematurely prune
            // later, equally valid candidates.
            if heap.len() >= effective_limit && effective_limit > 0 {
                if let Some(std::cmp::Reverse(top)) = heap.peek() {
                    worst_dist = top.score;
                }
            }
        }
    }

    let mut out = Vec::with_capacity(heap.len());
    while let Some(std::cmp::Reverse(entry)) = heap.pop() {
        out.push((entry.id, entry.score));
    }
    out.reverse();
    Ok(out)
}
