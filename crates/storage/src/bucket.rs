//! Bucket contracts consumed by the search engine
//!
//! Mirrors spec §6's consumed interfaces: property postings and the
//! object store are owned by the embedding engine; this crate only
//! defines the shape those collaborators must satisfy, plus the on-disk
//! segment format one concrete implementation of `PostingsBucket` could
//! use.

use bm25f_core::{DocId, Result};

/// One posting entry: an 8-byte big-endian doc-id key plus an encoded
/// value (frequency ‖ propLength as little-endian float32 bit patterns).
#[derive(Debug, Clone, PartialEq)]
pub struct MapPair {
    pub key: [u8; 8],
    pub value: Vec<u8>,
}

impl MapPair {
    /// Decode the doc-id carried by this pair's key.
    pub fn doc_id(&self) -> DocId {
        DocId::from_be_bytes(self.key)
    }

    /// Decode (frequency, propLength) from the value bytes.
    ///
    /// Returns `None` if the value is shorter than 8 bytes; spec §4.3
    /// treats this as a skip-with-warning, not a hard error, so the
    /// caller is expected to log and continue rather than propagate.
    pub fn decode_frequency_prop_length(&self) -> Option<(f32, f32)> {
        if self.value.len() < 8 {
            return None;
        }
        let frequency = f32::from_le_bytes(self.value[0..4].try_into().unwrap());
        let prop_length = f32::from_le_bytes(self.value[4..8].try_into().unwrap());
        Some((frequency, prop_length))
    }

    /// Build a pair from a doc-id and decoded frequency/propLength.
    pub fn encode(doc_id: DocId, frequency: f32, prop_length: f32) -> Self {
        let mut value = Vec::with_capacity(8);
        value.extend_from_slice(&frequency.to_le_bytes());
        value.extend_from_slice(&prop_length.to_le_bytes());
        MapPair {
            key: doc_id.to_be_bytes(),
            value,
        }
    }
}

/// A per-property searchable posting store.
///
/// Grounded on the Go `Bucket.MapList` contract used throughout
/// `bm25_searcher.go`; the term builder calls this once per
/// (property, term) pair and expects doc-id-ascending order.
pub trait PostingsBucket: Send + Sync {
    /// Return the ordered (ascending doc-id) posting list for `term`.
    /// Empty if the term is absent from this property's index.
    fn map_list(&self, term: &str) -> Result<Vec<MapPair>>;
}

/// The class's object store, keyed by a secondary index over doc-ids.
pub trait ObjectsBucket: Send + Sync {
    /// Total number of live objects in the class (used as corpus size N).
    fn count(&self) -> Result<u64>;

    /// Fetch an object's bytes by doc-id via secondary index `index`.
    /// Returns `None` if absent (spec §4.6: silently dropped, logged at
    /// most once per query).
    fn get_by_secondary(&self, index: usize, doc_id: DocId) -> Result<Option<Vec<u8>>>;
}
