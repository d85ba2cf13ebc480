//! Result hydration
//!
//! Turns WAND's (doc-id, score) pairs into full objects plus optional
//! per-term score explanations. Grounded on `getTopKObjects`'s
//! hydration loop (bm25_searcher.go): pop in descending-score order,
//! fetch via the secondary index, silently drop misses (stale index
//! entries happen during concurrent writes), and attach
//! `BM25F_<term>_frequency` / `BM25F_<term>_propLength` explanations
//! only when the caller asked for them.

use std::collections::HashMap;

use bm25f_core::{DocId, Result};
use bm25f_storage::ObjectsBucket;

use crate::term::TermBuild;

/// One hydrated result: the raw object bytes plus its BM25F score and,
/// when requested, a breakdown of each term's contribution.
#[derive(Debug, Clone)]
pub struct HydratedResult {
    pub doc_id: u64,
    pub score: f64,
    pub object: Vec<u8>,
    /// `"BM25F_<term>_frequency"` / `"BM25F_<term>_propLength"` ->
    /// value, present only when explanations were requested and the
    /// term actually matched this document.
    pub explanations: HashMap<String, f32>,
}

/// Hydrate `results` (descending-score (doc-id, score) pairs from
/// [`crate::wand::top_k`]) against `objects`. Entries whose doc-id no
/// longer resolves (a stale secondary-index entry from a concurrent
/// delete) are dropped, logged at most once for the whole query.
pub fn hydrate(
    results: &[(u64, f64)],
    objects: &dyn ObjectsBucket,
    term_builds: &[TermBuild],
    additional_explanations: bool,
) -> Result<Vec<HydratedResult>> {
    let mut out = Vec::with_capacity(results.len());
    let mut warned_missing = false;

    for &(id, score) in results {
        let doc_id = DocId(id);
        let object = match objects.get_by_secondary(0, doc_id)? {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => {
                if !warned_missing {
                    tracing::warn!(
                        target: "bm25f_search::hydrate",
                        doc_id = id,
                        "dropping result: object missing from secondary index"
                    );
                    warned_missing = true;
                }
                continue;
            }
        };

        let mut explanations = HashMap::new();
        if additional_explanations {
            for build in term_builds {
                if let Some(&pos) = build.indices.get(&id) {
                    if let Some(pair) = build.term.data.get(pos) {
                        if pair.id.0 == id {
                            explanations.insert(
                                format!("BM25F_{}_frequency", build.term.query_term),
                                pair.frequency,
                            );
                            explanations.insert(
                                format!("BM25F_{}_propLength", build.term.query_term),
                                pair.prop_length,
                            );
                        }
                    }
                }
            }
        }

        out.push(HydratedResult {
            doc_id: id,
            score,
            object,
            explanations,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{DocPointerWithScore, Term};
    use rustc_hash::FxHashMap;
    use std::sync::Mutex;

    struct FakeObjects {
        objects: Mutex<HashMap<u64, Vec<u8>>>,
    }

    impl ObjectsBucket for FakeObjects {
        fn count(&self) -> Result<u64> {
            Ok(self.objects.lock().unwrap().len() as u64)
        }
        fn get_by_secondary(&self, _index: usize, doc_id: DocId) -> Result<Option<Vec<u8>>> {
            Ok(self.objects.lock().unwrap().get(&doc_id.0).cloned())
        }
    }

    fn build_for(query_term: &str, id: u64, frequency: f32, prop_length: f32) -> TermBuild {
        let mut indices = FxHashMap::default();
        indices.insert(id, 0);
        TermBuild {
            term: Term {
                query_term: query_term.to_string(),
                idf: 1.0,
                data: vec![DocPointerWithScore {
                    id: DocId(id),
                    frequency,
                    prop_length,
                }],
                pos_pointer: 0,
                id_pointer: id,
                exhausted: false,
            },
            indices,
        }
    }

    #[test]
    fn hydrates_in_given_order() {
        let objects = FakeObjects {
            objects: Mutex::new(HashMap::from([
                (1u64, b"one".to_vec()),
                (2u64, b"two".to_vec()),
            ])),
        };
        let results = vec![(2, 0.9), (1, 0.5)];
        let out = hydrate(&results, &objects, &[], false).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].doc_id, 2);
        assert_eq!(out[0].object, b"two");
        assert_eq!(out[1].doc_id, 1);
    }

    #[test]
    fn missing_object_is_silently_dropped() {
        let objects = FakeObjects {
            objects: Mutex::new(HashMap::from([(1u64, b"one".to_vec())])),
        };
        let results = vec![(1, 0.9), (99, 0.5)];
        let out = hydrate(&results, &objects, &[], false).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].doc_id, 1);
    }

    #[test]
    fn explanations_attached_when_requested() {
        let objects = FakeObjects {
            objects: Mutex::new(HashMap::from([(1u64, b"one".to_vec())])),
        };
        let build = build_for("fox", 1, 2.0, 5.0);
        let results = vec![(1, 0.9)];
        let out = hydrate(&results, &objects, std::slice::from_ref(&build), true).unwrap();
        assert_eq!(out[0].explanations["BM25F_fox_frequency"], 2.0);
        assert_eq!(out[0].explanations["BM25F_fox_propLength"], 5.0);
    }

    #[test]
    fn explanations_absent_when_not_requested() {
        let objects = FakeObjects {
            objects: Mutex::new(HashMap::from([(1u64, b"one".to_vec())])),
        };
        let build = build_for("fox", 1, 2.0, 5.0);
        let results = vec![(1, 0.9)];
        let out = hydrate(&results, &objects, std::slice::from_ref(&build), false).unwrap();
        assert!(out[0].explanations.is_empty());
    }
}
