//! Core types shared across the BM25F workspace
//!
//! This crate defines the foundational, collaborator-agnostic types used by
//! `bm25f-storage` and `bm25f-search`:
//! - `DocId`: newtype for the 64-bit document identifier
//! - `BM25Config`: the k1/b tuning parameters
//! - `Error`: the unified error type for request-level failures

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod ids;

pub use config::BM25Config;
pub use error::{Error, Result};
pub use ids::DocId;
