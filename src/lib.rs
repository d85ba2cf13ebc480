//! BM25F keyword ranking core
//!
//! Thin facade over the workspace's three crates:
//! - [`bm25f_core`] — shared value types (`DocId`, `BM25Config`, `Error`).
//! - [`bm25f_storage`] — the on-disk inverted segment format and compactor.
//! - [`bm25f_search`] — the tokenizer, term builder, WAND engine, and
//!   the public [`bm25f`] entry point.
//!
//! Most callers only need this crate's re-exports; reach into the
//! individual crates directly when building a custom `PostingsBucket`
//! or `ObjectsBucket`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use bm25f_core::{BM25Config, DocId, Error, Result};
pub use bm25f_search::{
    bm25f, AllowList, Collaborators, DataTypeKind, DefaultStopwords, DocPointerWithScore,
    HydratedResult, PropertyLengthTracker, PropertySchema, Query, QueryOptions, SchemaProvider,
    StopwordDetector, Term, Tokenization,
};
pub use bm25f_storage::{InvertedCompactor, InvertedSegment, MapPair, ObjectsBucket, PostingsBucket};
