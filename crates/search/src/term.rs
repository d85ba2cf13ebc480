//! Term builder
//!
//! Builds one [`Term`] (a single query term's merged, per-doc posting
//! list across a tokenization's properties) ready to participate in
//! WAND. Grounded on `createTerm` (bm25_searcher.go): ascending
//! posting-length ordering with a second-largest-first reorder, allow-
//! list partitioning that still feeds the IDF denominator, frequency
//! summation across properties, and stale-index guards on merge.

use std::collections::HashMap;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use bm25f_core::{DocId, Error, Result};
use bm25f_storage::PostingsBucket;

/// Set of doc-ids a query is restricted to (spec glossary: allow-list).
pub type AllowList = FxHashSet<u64>;

/// One posting contributing to a term's score for a single document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocPointerWithScore {
    pub id: DocId,
    /// Term frequency within the matched properties, pre-multiplied by
    /// each contributing property's boost.
    pub frequency: f32,
    /// Summed token length of the matched property instance(s).
    pub prop_length: f32,
}

/// One query term's merged posting list plus WAND scan state.
#[derive(Debug, Clone)]
pub struct Term {
    pub query_term: String,
    /// Precomputed IDF; doubles as the term's max per-doc impact bound
    /// since `tf <= 1`.
    pub idf: f64,
    pub data: Vec<DocPointerWithScore>,
    pub pos_pointer: usize,
    pub id_pointer: u64,
    pub exhausted: bool,
}

impl Term {
    /// Score the doc at `id_pointer` and advance to the next live entry.
    pub fn score_and_advance(&mut self, avg_prop_length: f64, k1: f64, b: f64) -> (u64, f64) {
        let id = self.id_pointer;
        let pair = self.data[self.pos_pointer];
        let freq = pair.frequency as f64;
        let tf = freq / (freq + k1 * (1.0 - b + b * pair.prop_length as f64 / avg_prop_length));

        self.pos_pointer += 1;
        if self.pos_pointer >= self.data.len() {
            self.exhausted = true;
        } else {
            self.id_pointer = self.data[self.pos_pointer].id.0;
        }

        (id, tf * self.idf)
    }

    /// Advance the head until `id_pointer >= min_id`, or exhaust.
    pub fn advance_at_least(&mut self, min_id: u64) {
        while self.id_pointer < min_id {
            self.pos_pointer += 1;
            if self.pos_pointer >= self.data.len() {
                self.exhausted = true;
                return;
            }
            self.id_pointer = self.data[self.pos_pointer].id.0;
        }
    }
}

/// Result of building a term: the term itself, plus (when requested,
/// or always for non-final properties) a doc-id -> position map used
/// later to attach per-term explanations.
pub struct TermBuild {
    pub term: Term,
    pub indices: FxHashMap<u64, usize>,
}

/// Build the merged [`Term`] for `query_term` across `property_names`.
///
/// `n` is the class's total object count. `buckets` maps property name
/// to its searchable posting store.
#[allow(clippy::too_many_arguments)]
pub fn create_term(
    n: f64,
    allow_list: Option<&AllowList>,
    query_term: &str,
    property_names: &[String],
    property_boosts: &HashMap<String, f32>,
    duplicate_boost: i32,
    additional_explanations: bool,
    buckets: &HashMap<String, Arc<dyn PostingsBucket>>,
) -> Result<TermBuild> {
    let mut filtered_doc_ids: FxHashSet<u64> = FxHashSet::default();
    let mut ms_and_props = Vec::with_capacity(property_names.len());

    for prop_name in property_names {
        let bucket = buckets
            .get(prop_name)
            .ok_or_else(|| Error::BucketMissing(prop_name.clone()))?;
        let pre_m = bucket.map_list(query_term)?;

        let m = match allow_list {
            Some(allow) => {
                let mut kept = Vec::with_capacity(pre_m.len());
                for pair in pre_m {
                    let doc_id = pair.doc_id().0;
                    if allow.contains(&doc_id) {
                        kept.push(pair);
                    } else {
                        filtered_doc_ids.insert(doc_id);
                    }
                }
                kept
            }
            None => pre_m,
        };

        if m.is_empty() {
            continue;
        }
        ms_and_props.push((prop_name.clone(), m));
    }

    // Ascending by posting-list length, then move the second-largest to
    // the front: the smallest-first order limits map growth during the
    // merge below, and starting from the second-largest means the very
    // first property sizes the map allocation close to its final size.
    ms_and_props.sort_by_key(|(_, m)| m.len());
    if ms_and_props.len() > 2 {
        let last = ms_and_props.len() - 1;
        ms_and_props.swap(last - 1, 0);
    }

    let mut doc_map_pairs: Vec<DocPointerWithScore> = Vec::new();
    let mut doc_map_pairs_indices: FxHashMap<u64, usize> = FxHashMap::default();

    let num_props = ms_and_props.len();
    for (i, (prop_name, pairs)) in ms_and_props.into_iter().enumerate() {
        let include_indices = additional_explanations || i < num_props - 1;
        let boost = *property_boosts.get(&prop_name).unwrap_or(&1.0);

        if doc_map_pairs.is_empty() && doc_map_pairs_indices.is_empty() {
            doc_map_pairs.reserve(pairs.len());
        }

        for pair in pairs {
            let Some((freq, prop_length)) = pair.decode_frequency_prop_length() else {
                tracing::warn!(
                    target: "bm25f_search::term",
                    property = %prop_name,
                    "skipping pair: value shorter than 8 bytes"
                );
                continue;
            };
            let doc_id = pair.doc_id().0;

            match doc_map_pairs_indices.get(&doc_id).copied() {
                Some(ind) => {
                    if ind >= doc_map_pairs.len() || doc_map_pairs[ind].id.0 != doc_id {
                        tracing::warn!(
                            target: "bm25f_search::term",
                            doc_id,
                            index = ind,
                            "skipping pair: stale index for doc-id"
                        );
                        continue;
                    }
                    doc_map_pairs[ind].prop_length += prop_length;
                    doc_map_pairs[ind].frequency += freq * boost;
                }
                None => {
                    doc_map_pairs.push(DocPointerWithScore {
                        id: DocId(doc_id),
                        frequency: freq * boost,
                        prop_length,
                    });
                    if include_indices {
                        doc_map_pairs_indices.insert(doc_id, doc_map_pairs.len() - 1);
                    }
                }
            }
        }
    }

    if doc_map_pairs.is_empty() {
        return Ok(TermBuild {
            term: Term {
                query_term: query_term.to_string(),
                idf: 0.0,
                data: Vec::new(),
                pos_pointer: 0,
                id_pointer: 0,
                exhausted: true,
            },
            indices: doc_map_pairs_indices,
        });
    }

    // Spec's data-model invariant requires ascending id order; the merge
    // above appends newly-seen ids in arrival order across properties,
    // which need not already be sorted once more than one property
    // contributes, so sort once here and re-point the index map.
    doc_map_pairs.sort_by_key(|p| p.id.0);
    doc_map_pairs_indices.clear();
    for (pos, pair) in doc_map_pairs.iter().enumerate() {
        doc_map_pairs_indices.insert(pair.id.0, pos);
    }

    let mut n_local = doc_map_pairs.len() as f64;
    if allow_list.is_some() {
        n_local += filtered_doc_ids.len() as f64;
    }
    let idf = (1.0 + (n - n_local + 0.5) / (n_local + 0.5)).ln() * duplicate_boost as f64;

    let id_pointer = doc_map_pairs[0].id.0;
    Ok(TermBuild {
        term: Term {
            query_term: query_term.to_string(),
            idf,
            data: doc_map_pairs,
            pos_pointer: 0,
            id_pointer,
            exhausted: false,
        },
        indices: doc_map_pairs_indices,
    })
}
