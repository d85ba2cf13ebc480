//! BM25F keyword ranking: tokenization, property resolution, term
//! building, and the WAND top-K engine, composed behind [`dispatch::bm25f`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatch;
pub mod hydrate;
pub mod range_reader;
pub mod schema;
pub mod term;
#[cfg(feature = "testing")]
pub mod testing;
pub mod tokenizer;
pub mod wand;

pub use bm25f_core::BM25Config;
pub use dispatch::{bm25f, Collaborators, Query, QueryOptions};
pub use hydrate::HydratedResult;
pub use range_reader::{BitmapLayer, CombinedReader, RangeLayerReader};
pub use schema::{DataTypeKind, PropertyLengthTracker, PropertySchema, SchemaProvider};
pub use term::{create_term, AllowList, DocPointerWithScore, Term, TermBuild};
pub use tokenizer::{
    remove_stopwords, tokenize_and_count_duplicates, DefaultStopwords, StopwordDetector,
    Tokenization,
};
pub use wand::{top_k, Terms};
