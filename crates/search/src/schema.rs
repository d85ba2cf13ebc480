//! Property resolution against the class schema
//!
//! Grounded on `extractTermInformation`'s property loop (bm25_searcher.go):
//! parse `prop^boost` suffixes, reject non-text properties, group
//! properties by tokenization, and average their mean lengths.

use std::collections::HashMap;

use bm25f_core::Error;
use bm25f_core::Result;

use crate::tokenizer::Tokenization;

/// The primitive shape of a property's declared data type, after
/// collapsing away whatever richer type system the embedding engine has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataTypeKind {
    Text,
    TextArray,
    Other,
}

/// A property's schema entry, as far as BM25F needs to know about it.
///
/// `tokenization` is carried as the schema's raw string (`"word"`,
/// `"field"`, ... or some other scheme this crate doesn't implement)
/// rather than the closed [`Tokenization`] enum, so an unrecognized
/// value can actually reach [`resolve_properties`] and produce
/// [`Error::UnsupportedTokenization`] instead of being unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    pub name: String,
    pub data_type: DataTypeKind,
    pub tokenization: String,
}

/// Consumed interface: resolves property names to their schema entry
/// and reports whether a property carries a searchable inverted index.
pub trait SchemaProvider: Send + Sync {
    /// Look up `name` in the class schema. `None` means "not found".
    fn get_property(&self, name: &str) -> Option<PropertySchema>;

    /// Whether `name` has a searchable (inverted-indexed) property.
    fn has_searchable_index(&self, name: &str) -> bool;
}

/// Consumed interface: per-property mean token length, used to compute
/// the corpus-wide `averagePropLength` for BM25 length normalization.
pub trait PropertyLengthTracker: Send + Sync {
    /// Mean length (in tokens) of `property` across the corpus.
    fn property_mean(&self, property: &str) -> Result<f32>;
}

/// Split `prop^boost` into (property name, boost), defaulting to 1.
fn split_boost(raw: &str) -> (&str, f32) {
    match raw.split_once('^') {
        Some((name, boost_str)) => {
            let boost = boost_str.parse::<f32>().unwrap_or(1.0);
            (name, boost)
        }
        None => (raw, 1.0),
    }
}

/// Output of resolving the caller's requested properties against the
/// class schema: per-tokenization property groups, per-property
/// boosts, and the corpus's average property length.
pub struct ResolvedProperties {
    pub prop_names_by_tokenization: HashMap<Tokenization, Vec<String>>,
    pub property_boosts: HashMap<String, f32>,
    pub average_prop_length: f64,
}

/// Resolve `requested` (each possibly suffixed with `^boost`) against
/// `schema`, grouping by tokenization and averaging mean lengths via
/// `lengths`. Mirrors `extractTermInformation`'s property loop exactly,
/// including its error conditions (spec §4.2).
pub fn resolve_properties(
    schema: &dyn SchemaProvider,
    lengths: &dyn PropertyLengthTracker,
    requested: &[String],
) -> Result<ResolvedProperties> {
    let mut prop_names_by_tokenization: HashMap<Tokenization, Vec<String>> = HashMap::new();
    for kind in [
        Tokenization::Word,
        Tokenization::Field,
        Tokenization::Whitespace,
        Tokenization::Lowercase,
    ] {
        prop_names_by_tokenization.insert(kind, Vec::new());
    }

    let mut property_boosts = HashMap::with_capacity(requested.len());
    let mut average_prop_length = 0.0f64;

    for raw in requested {
        let (name, boost) = split_boost(raw);
        property_boosts.insert(name.to_string(), boost);

        let mean = lengths.property_mean(name)?;
        average_prop_length += mean as f64;

        let prop = schema
            .get_property(name)
            .ok_or_else(|| Error::SchemaLookup(name.to_string()))?;

        match prop.data_type {
            DataTypeKind::Text | DataTypeKind::TextArray => {
                let kind = Tokenization::parse(&prop.tokenization).ok_or_else(|| {
                    Error::UnsupportedTokenization {
                        property: name.to_string(),
                        kind: prop.tokenization.clone(),
                    }
                })?;
                prop_names_by_tokenization
                    .get_mut(&kind)
                    .expect("all tokenization kinds pre-populated")
                    .push(name.to_string());
            }
            DataTypeKind::Other => {
                return Err(Error::UnsupportedDataType {
                    property: name.to_string(),
                    data_type: format!("{:?}", prop.data_type),
                });
            }
        }
    }

    if !requested.is_empty() {
        average_prop_length /= requested.len() as f64;
    }

    Ok(ResolvedProperties {
        prop_names_by_tokenization,
        property_boosts,
        average_prop_length,
    })
}

/// Validate that every requested property (stripped of its `^boost`
/// suffix) carries a searchable index, per spec §4.2 / the
/// "missing searchable index" error.
pub fn check_searchable(schema: &dyn SchemaProvider, requested: &[String]) -> Result<()> {
    for raw in requested {
        let (name, _) = split_boost(raw);
        if !schema.has_searchable_index(name) {
            return Err(Error::MissingSearchableIndex(name.to_string()));
        }
    }
    Ok(())
}
