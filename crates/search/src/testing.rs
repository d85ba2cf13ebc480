//! In-memory collaborator stubs
//!
//! Minimal [`SchemaProvider`]/[`PropertyLengthTracker`]/[`PostingsBucket`]/
//! [`ObjectsBucket`] implementations backed by plain maps, for tests and
//! examples that need a full pipeline without a real storage engine.

use std::collections::HashMap;

use parking_lot::Mutex;

use bm25f_core::{DocId, Result};
use bm25f_storage::{MapPair, ObjectsBucket, PostingsBucket};

use crate::schema::{PropertyLengthTracker, PropertySchema, SchemaProvider};

/// A schema backed by a fixed map of property name to schema entry.
#[derive(Default)]
pub struct InMemorySchema {
    properties: HashMap<String, PropertySchema>,
    searchable: std::collections::HashSet<String>,
}

impl InMemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a searchable text property.
    pub fn with_property(mut self, schema: PropertySchema) -> Self {
        self.searchable.insert(schema.name.clone());
        self.properties.insert(schema.name.clone(), schema);
        self
    }
}

impl SchemaProvider for InMemorySchema {
    fn get_property(&self, name: &str) -> Option<PropertySchema> {
        self.properties.get(name).cloned()
    }

    fn has_searchable_index(&self, name: &str) -> bool {
        self.searchable.contains(name)
    }
}

/// Per-property mean token length backed by a fixed map.
#[derive(Default)]
pub struct StaticPropertyLengths {
    means: HashMap<String, f32>,
}

impl StaticPropertyLengths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mean(mut self, property: &str, mean: f32) -> Self {
        self.means.insert(property.to_string(), mean);
        self
    }
}

impl PropertyLengthTracker for StaticPropertyLengths {
    fn property_mean(&self, property: &str) -> Result<f32> {
        Ok(*self.means.get(property).unwrap_or(&0.0))
    }
}

/// A single property's postings store backed by a plain map from term
/// to its (already doc-id-ascending) posting list.
#[derive(Default)]
pub struct InMemoryBucket {
    postings: HashMap<String, Vec<MapPair>>,
}

impl InMemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one (doc-id, frequency, propLength) posting under `term`,
    /// keeping the term's list sorted ascending by doc-id.
    pub fn insert(&mut self, term: &str, doc_id: u64, frequency: f32, prop_length: f32) {
        let list = self.postings.entry(term.to_string()).or_default();
        list.push(MapPair::encode(DocId(doc_id), frequency, prop_length));
        list.sort_by_key(|p| p.doc_id().0);
    }
}

impl PostingsBucket for InMemoryBucket {
    fn map_list(&self, term: &str) -> Result<Vec<MapPair>> {
        Ok(self.postings.get(term).cloned().unwrap_or_default())
    }
}

/// An object store backed by a doc-id -> bytes map.
#[derive(Default)]
pub struct InMemoryObjects {
    objects: Mutex<HashMap<u64, Vec<u8>>>,
}

impl InMemoryObjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, doc_id: u64, object: Vec<u8>) {
        self.objects.lock().insert(doc_id, object);
    }
}

impl ObjectsBucket for InMemoryObjects {
    fn count(&self) -> Result<u64> {
        Ok(self.objects.lock().len() as u64)
    }

    fn get_by_secondary(&self, _index: usize, doc_id: DocId) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.lock().get(&doc_id.0).cloned())
    }
}
