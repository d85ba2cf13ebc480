//! End-to-end scenarios over the full `bm25f` pipeline, using the
//! in-memory collaborator stubs instead of a real storage engine.

use std::collections::HashMap;
use std::sync::Arc;

use bm25f_search::testing::{InMemoryBucket, InMemoryObjects, InMemorySchema, StaticPropertyLengths};
use bm25f_search::{bm25f, Collaborators, DataTypeKind, PropertySchema, Query};
use bm25f_storage::PostingsBucket;

fn word_schema(properties: &[&str]) -> InMemorySchema {
    let mut schema = InMemorySchema::new();
    for prop in properties {
        schema = schema.with_property(PropertySchema {
            name: prop.to_string(),
            data_type: DataTypeKind::Text,
            tokenization: "word".to_string(),
        });
    }
    schema
}

#[test]
fn single_property_boosted_ranking_orders_by_term_frequency() {
    let schema = word_schema(&["title"]);
    let lengths = StaticPropertyLengths::new().with_mean("title", 5.0);

    let mut title = InMemoryBucket::new();
    title.insert("fox", 1, 1.0, 5.0);
    title.insert("fox", 2, 4.0, 5.0);
    title.insert("fox", 3, 2.0, 5.0);

    let mut buckets: HashMap<String, Arc<dyn PostingsBucket>> = HashMap::new();
    buckets.insert("title".to_string(), Arc::new(title));

    let objects = InMemoryObjects::new();
    objects.insert(1, b"doc 1".to_vec());
    objects.insert(2, b"doc 2".to_vec());
    objects.insert(3, b"doc 3".to_vec());

    let collab = Collaborators {
        schema: &schema,
        lengths: &lengths,
        objects: &objects,
        buckets: &buckets,
        stopwords: None,
    };

    let query = Query::new("fox", vec!["title^2".to_string()], 10);
    let results = bm25f(&query, &collab).unwrap();

    let ids: Vec<u64> = results.iter().map(|r| r.doc_id).collect();
    assert_eq!(ids, vec![2, 3, 1]);
}

#[test]
fn multi_property_search_sums_matching_frequency() {
    let schema = word_schema(&["title", "body"]);
    let lengths = StaticPropertyLengths::new()
        .with_mean("title", 3.0)
        .with_mean("body", 20.0);

    let mut title = InMemoryBucket::new();
    title.insert("fox", 1, 1.0, 2.0);
    let mut body = InMemoryBucket::new();
    body.insert("fox", 1, 3.0, 20.0);
    body.insert("fox", 2, 1.0, 20.0);

    let mut buckets: HashMap<String, Arc<dyn PostingsBucket>> = HashMap::new();
    buckets.insert("title".to_string(), Arc::new(title));
    buckets.insert("body".to_string(), Arc::new(body));

    let objects = InMemoryObjects::new();
    objects.insert(1, b"doc 1".to_vec());
    objects.insert(2, b"doc 2".to_vec());

    let collab = Collaborators {
        schema: &schema,
        lengths: &lengths,
        objects: &objects,
        buckets: &buckets,
        stopwords: None,
    };

    let query = Query::new("fox", vec!["title".to_string(), "body".to_string()], 10);
    let results = bm25f(&query, &collab).unwrap();

    // Doc 1 matches both properties (frequency 1+3=4); doc 2 matches only body (1).
    assert_eq!(results[0].doc_id, 1);
    assert_eq!(results[1].doc_id, 2);
}

#[test]
fn allow_list_restricts_results_but_preserves_relative_order() {
    let schema = word_schema(&["title"]);
    let lengths = StaticPropertyLengths::new().with_mean("title", 5.0);

    let mut title = InMemoryBucket::new();
    title.insert("fox", 1, 1.0, 5.0);
    title.insert("fox", 2, 4.0, 5.0);
    title.insert("fox", 3, 2.0, 5.0);

    let mut buckets: HashMap<String, Arc<dyn PostingsBucket>> = HashMap::new();
    buckets.insert("title".to_string(), Arc::new(title));

    let objects = InMemoryObjects::new();
    objects.insert(1, b"doc 1".to_vec());
    objects.insert(2, b"doc 2".to_vec());
    objects.insert(3, b"doc 3".to_vec());

    let collab = Collaborators {
        schema: &schema,
        lengths: &lengths,
        objects: &objects,
        buckets: &buckets,
        stopwords: None,
    };

    let allow: bm25f_search::AllowList = [1u64, 3u64].into_iter().collect();
    let mut query = Query::new("fox", vec!["title".to_string()], 10);
    query.allow_list = Some(allow);
    let results = bm25f(&query, &collab).unwrap();

    let ids: Vec<u64> = results.iter().map(|r| r.doc_id).collect();
    assert_eq!(ids, vec![3, 1]);
}

#[test]
fn stopwords_do_not_change_ranking_of_content_terms() {
    let schema = word_schema(&["title"]);
    let lengths = StaticPropertyLengths::new().with_mean("title", 5.0);

    let mut title = InMemoryBucket::new();
    title.insert("fox", 1, 1.0, 5.0);
    title.insert("fox", 2, 4.0, 5.0);

    let mut buckets: HashMap<String, Arc<dyn PostingsBucket>> = HashMap::new();
    buckets.insert("title".to_string(), Arc::new(title));

    let objects = InMemoryObjects::new();
    objects.insert(1, b"doc 1".to_vec());
    objects.insert(2, b"doc 2".to_vec());

    let collab = Collaborators {
        schema: &schema,
        lengths: &lengths,
        objects: &objects,
        buckets: &buckets,
        stopwords: Some(&bm25f_search::DefaultStopwords),
    };

    let plain = Query::new("fox", vec!["title".to_string()], 10);
    let with_stopwords = Query::new("the fox", vec!["title".to_string()], 10);

    let plain_results = bm25f(&plain, &collab).unwrap();
    let stop_results = bm25f(&with_stopwords, &collab).unwrap();

    let plain_ids: Vec<u64> = plain_results.iter().map(|r| r.doc_id).collect();
    let stop_ids: Vec<u64> = stop_results.iter().map(|r| r.doc_id).collect();
    assert_eq!(plain_ids, stop_ids);
    assert!((plain_results[0].score - stop_results[0].score).abs() < 1e-9);
}

#[test]
fn duplicate_query_terms_boost_their_idf_contribution() {
    let schema = word_schema(&["title"]);
    let lengths = StaticPropertyLengths::new().with_mean("title", 5.0);

    let mut title = InMemoryBucket::new();
    title.insert("fox", 1, 1.0, 5.0);
    title.insert("quick", 1, 1.0, 5.0);
    title.insert("quick", 2, 1.0, 5.0);

    let mut buckets: HashMap<String, Arc<dyn PostingsBucket>> = HashMap::new();
    buckets.insert("title".to_string(), Arc::new(title));

    let objects = InMemoryObjects::new();
    objects.insert(1, b"doc 1".to_vec());
    objects.insert(2, b"doc 2".to_vec());

    let collab = Collaborators {
        schema: &schema,
        lengths: &lengths,
        objects: &objects,
        buckets: &buckets,
        stopwords: None,
    };

    let single = Query::new("fox quick", vec!["title".to_string()], 10);
    let doubled = Query::new("fox fox quick", vec!["title".to_string()], 10);

    let single_results = bm25f(&single, &collab).unwrap();
    let doubled_results = bm25f(&doubled, &collab).unwrap();

    let single_doc1 = single_results.iter().find(|r| r.doc_id == 1).unwrap();
    let doubled_doc1 = doubled_results.iter().find(|r| r.doc_id == 1).unwrap();
    // Doc 1 matches "fox"; doubling "fox" in the query doubles fox's idf
    // contribution to doc 1's score. Doc 2 only matches "quick" and is
    // unaffected, so doc 1 must overtake it once "fox" is doubled.
    assert!(doubled_doc1.score > single_doc1.score);
}

#[test]
fn missing_searchable_index_is_rejected_before_scoring() {
    let schema = InMemorySchema::new();
    let lengths = StaticPropertyLengths::new();
    let buckets: HashMap<String, Arc<dyn PostingsBucket>> = HashMap::new();
    let objects = InMemoryObjects::new();

    let collab = Collaborators {
        schema: &schema,
        lengths: &lengths,
        objects: &objects,
        buckets: &buckets,
        stopwords: None,
    };

    let query = Query::new("fox", vec!["title".to_string()], 10);
    let err = bm25f(&query, &collab).unwrap_err();
    assert!(matches!(err, bm25f_core::Error::MissingSearchableIndex(_)));
}
