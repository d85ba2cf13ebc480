//! Query tokenizer and stopword filter
//!
//! Pipeline per tokenization kind, then collapse repeated terms into a
//! duplicate-count boost (spec §4.1). Grounded on the teacher's
//! `tokenizer.rs` (UAX#29 word boundaries, possessive stripping,
//! lowercase-then-filter shape), generalized to the four tokenization
//! kinds this crate must support and without the teacher's Porter
//! stemmer: postings are indexed under exactly the bytes the original
//! Weaviate tokenizer produces, and stemming would break the duplicate-
//! boost correspondence between a query term and the posting key it is
//! meant to match.

use unicode_segmentation::UnicodeSegmentation;

/// A named scheme that splits a property value (or query string) into
/// searchable terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tokenization {
    /// UAX#29 word boundaries, possessive-stripped, lowercased.
    Word,
    /// The entire value is a single term, unmodified.
    Field,
    /// Split on ASCII whitespace only; case preserved.
    Whitespace,
    /// The entire value is a single term, lowercased.
    Lowercase,
}

impl Tokenization {
    /// Parse a schema's raw tokenization string into a known kind.
    /// `None` for anything this crate does not implement (e.g. `"ngram"`
    /// or `"keyword"`), matching `bm25_searcher.go`'s validation against
    /// a known-kinds map rather than accepting anything at all.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "word" => Some(Tokenization::Word),
            "field" => Some(Tokenization::Field),
            "whitespace" => Some(Tokenization::Whitespace),
            "lowercase" => Some(Tokenization::Lowercase),
            _ => None,
        }
    }
}

/// Membership test for stopwords, configured per class.
pub trait StopwordDetector: Send + Sync {
    /// Returns true if `term` should be dropped from word-tokenized text.
    fn is_stopword(&self, term: &str) -> bool;
}

/// The default English stopword set, used when a class configures no
/// custom list but still wants word-tokenization filtering.
const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// A [`StopwordDetector`] backed by the default English list.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStopwords;

impl StopwordDetector for DefaultStopwords {
    fn is_stopword(&self, term: &str) -> bool {
        DEFAULT_STOPWORDS.contains(&term)
    }
}

#[inline]
fn strip_possessive(word: &str) -> &str {
    word.strip_suffix("'s")
        .or_else(|| word.strip_suffix("\u{2019}s"))
        .unwrap_or(word)
}

fn word_tokens(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(strip_possessive)
        .map(|w| w.to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn whitespace_tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

fn raw_tokens(kind: Tokenization, text: &str) -> Vec<String> {
    match kind {
        Tokenization::Word => word_tokens(text),
        Tokenization::Field => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_string()]
            }
        }
        Tokenization::Lowercase => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_lowercase()]
            }
        }
        Tokenization::Whitespace => whitespace_tokens(text),
    }
}

/// Tokenize `text` under `kind`, collapsing repeats into (unique terms,
/// duplicate-count boosts) with `terms.len() == boosts.len()`.
///
/// Order of first appearance is preserved.
pub fn tokenize_and_count_duplicates(kind: Tokenization, text: &str) -> (Vec<String>, Vec<i32>) {
    let tokens = raw_tokens(kind, text);
    let mut terms: Vec<String> = Vec::new();
    let mut boosts: Vec<i32> = Vec::new();
    let mut index = rustc_hash::FxHashMap::default();
    for tok in tokens {
        match index.get(&tok) {
            Some(&i) => {
                let i: usize = i;
                boosts[i] += 1;
            }
            None => {
                index.insert(tok.clone(), terms.len());
                terms.push(tok);
                boosts.push(1);
            }
        }
    }
    (terms, boosts)
}

/// Remove stopwords from a (terms, boosts) pair produced by word
/// tokenization, preserving the term/boost correspondence via
/// swap-with-last-then-truncate (spec §4.1). A no-op when `detector`
/// is `None`.
pub fn remove_stopwords(
    mut terms: Vec<String>,
    mut boosts: Vec<i32>,
    detector: Option<&dyn StopwordDetector>,
) -> (Vec<String>, Vec<i32>) {
    let Some(detector) = detector else {
        return (terms, boosts);
    };
    if terms.is_empty() {
        return (terms, boosts);
    }
    let mut i = 0;
    while i < terms.len() {
        if detector.is_stopword(&terms[i]) {
            let last = terms.len() - 1;
            terms.swap(i, last);
            terms.pop();
            boosts.swap(i, last);
            boosts.pop();
            continue;
        }
        i += 1;
    }
    (terms, boosts)
}
