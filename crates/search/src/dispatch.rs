//! Public entry point
//!
//! Composes the pipeline: tokenize the query per tokenization kind ->
//! resolve properties against the schema -> build one [`Term`] per
//! query term in parallel -> run WAND -> hydrate the winners. Grounded
//! on `Searcher.wand` / `BM25FWithName` (bm25_searcher.go), which wires
//! these same stages together.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use bm25f_core::{BM25Config, Error, Result};
use bm25f_storage::{ObjectsBucket, PostingsBucket};

use crate::hydrate::{hydrate, HydratedResult};
use crate::schema::{check_searchable, resolve_properties, PropertyLengthTracker, SchemaProvider};
use crate::term::{create_term, AllowList, TermBuild};
use crate::tokenizer::{remove_stopwords, tokenize_and_count_duplicates, StopwordDetector, Tokenization};
use crate::wand::{top_k, Terms};

/// Per-query knobs beyond the search text itself: result cap,
/// explanation verbosity, and a cooperative wall-clock deadline.
/// Modeled after the teacher's `SearchBudget`, minus the candidate caps
/// this crate has no use for — WAND's own pivoting already bounds work.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub limit: usize,
    pub additional_explanations: bool,
    /// When set, `bm25f` checks this before and during the WAND scan
    /// and returns `Error::Cancelled` as soon as it has passed, rather
    /// than running the query to completion.
    pub deadline: Option<Instant>,
}

impl QueryOptions {
    pub fn new(limit: usize) -> Self {
        QueryOptions {
            limit,
            additional_explanations: false,
            deadline: None,
        }
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// One keyword-search request.
pub struct Query<'a> {
    pub text: &'a str,
    /// Requested `prop^boost` strings; empty means "every searchable
    /// text property known to the schema" is the caller's
    /// responsibility to supply (this crate does not enumerate a
    /// schema's properties on the caller's behalf).
    pub properties: Vec<String>,
    pub allow_list: Option<AllowList>,
    pub config: BM25Config,
    pub options: QueryOptions,
}

impl<'a> Query<'a> {
    /// A query with BM25's standard `k1`/`b` ([`BM25Config::default`])
    /// and no allow-list.
    pub fn new(text: &'a str, properties: Vec<String>, limit: usize) -> Self {
        Query {
            text,
            properties,
            allow_list: None,
            config: BM25Config::default(),
            options: QueryOptions::new(limit),
        }
    }
}

/// Everything `bm25f` needs from the surrounding engine: schema, corpus
/// size, per-property mean lengths, the postings stores, and the
/// object store to hydrate winners from.
pub struct Collaborators<'a> {
    pub schema: &'a dyn SchemaProvider,
    pub lengths: &'a dyn PropertyLengthTracker,
    pub objects: &'a dyn ObjectsBucket,
    pub buckets: &'a HashMap<String, Arc<dyn PostingsBucket>>,
    pub stopwords: Option<&'a dyn StopwordDetector>,
}

struct WorkItem {
    query_term: String,
    property_names: Vec<String>,
    duplicate_boost: i32,
}

/// Run a BM25F keyword search and return hydrated, descending-score
/// results.
pub fn bm25f(query: &Query<'_>, collab: &Collaborators<'_>) -> Result<Vec<HydratedResult>> {
    if query.options.expired() {
        return Err(Error::Cancelled);
    }

    if !query.properties.is_empty() {
        check_searchable(collab.schema, &query.properties)?;
    }

    let resolved = resolve_properties(collab.schema, collab.lengths, &query.properties)?;
    let n = collab.objects.count()? as f64;

    let mut work = Vec::new();
    for kind in [
        Tokenization::Word,
        Tokenization::Field,
        Tokenization::Whitespace,
        Tokenization::Lowercase,
    ] {
        let props = &resolved.prop_names_by_tokenization[&kind];
        if props.is_empty() {
            continue;
        }
        let (terms, boosts) = tokenize_and_count_duplicates(kind, query.text);
        let (terms, boosts) = if kind == Tokenization::Word {
            remove_stopwords(terms, boosts, collab.stopwords)
        } else {
            (terms, boosts)
        };
        for (term, boost) in terms.into_iter().zip(boosts) {
            work.push(WorkItem {
                query_term: term,
                property_names: props.clone(),
                duplicate_boost: boost,
            });
        }
    }

    if work.is_empty() {
        return Ok(Vec::new());
    }

    if query.options.expired() {
        return Err(Error::Cancelled);
    }

    let term_builds: Vec<TermBuild> = work
        .into_par_iter()
        .map(|item| {
            create_term(
                n,
                query.allow_list.as_ref(),
                &item.query_term,
                &item.property_names,
                &resolved.property_boosts,
                item.duplicate_boost,
                query.options.additional_explanations,
                collab.buckets,
            )
        })
        .collect::<Result<Vec<_>>>()?;

    if query.options.expired() {
        return Err(Error::Cancelled);
    }

    let terms = Terms::new(term_builds.iter().map(|b| b.term.clone()).collect());
    let results = top_k(
        terms,
        query.options.limit,
        resolved.average_prop_length,
        query.config.k1,
        query.config.b,
        query.options.deadline,
    )?;

    hydrate(
        &results,
        collab.objects,
        &term_builds,
        query.options.additional_explanations,
    )
}
