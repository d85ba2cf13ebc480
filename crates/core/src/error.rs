//! Error types for the BM25F core
//!
//! Mirrors spec §7: schema/config anomalies are request-level and returned
//! to the caller; decode-level anomalies (`PostingDecode`, `HydrationMiss`)
//! are recoverable and therefore never constructed here — they are logged
//! via `tracing::warn!` at their call sites instead (see `bm25f-search`).

use std::io;
use thiserror::Error;

/// Result type alias used throughout the BM25F core.
pub type Result<T> = std::result::Result<T, Error>;

/// Request-level and internal error kinds produced by the BM25F core.
#[derive(Debug, Error)]
pub enum Error {
    /// A queried property has no searchable inverted index.
    #[error("property '{0}' has no searchable index")]
    MissingSearchableIndex(String),

    /// A queried property could not be resolved against the class schema.
    #[error("property '{0}' not found in class schema")]
    SchemaLookup(String),

    /// A property declares a tokenization this core does not implement.
    #[error("cannot handle tokenization '{kind}' of property '{property}'")]
    UnsupportedTokenization {
        /// Offending property name.
        property: String,
        /// The unrecognized tokenization kind.
        kind: String,
    },

    /// A property's data type is not text / text-array.
    #[error("cannot handle data type '{data_type}' of property '{property}'")]
    UnsupportedDataType {
        /// Offending property name.
        property: String,
        /// The unsupported data type.
        data_type: String,
    },

    /// A named bucket (property index or objects store) does not exist.
    #[error("bucket '{0}' not found")]
    BucketMissing(String),

    /// The request's cancellation token fired before completion.
    #[error("request cancelled")]
    Cancelled,

    /// Compaction aborted due to an I/O failure; partial output must be
    /// discarded by the caller (spec §4.8's failure semantics).
    #[error("compaction step '{step}' failed: {source}")]
    CompactionIo {
        /// Which compaction step failed (e.g. "write keys", "write header").
        step: &'static str,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure (segment read, bucket access).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
