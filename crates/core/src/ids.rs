//! Document identifiers
//!
//! `DocId` wraps the 64-bit document identifier used throughout the core.
//! Posting keys are stored on disk as big-endian 8-byte values (spec §6);
//! `DocId` centralizes that encode/decode so callers never hand-roll it.
//! Secondary-index keys are an opaque concern of whatever `ObjectsBucket`
//! implementation backs them and are not encoded here.

use std::fmt;

/// 64-bit document identifier, stable for the lifetime of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocId(pub u64);

impl DocId {
    /// Decode a big-endian 8-byte posting key into a `DocId`.
    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        DocId(u64::from_be_bytes(bytes))
    }

    /// Encode this `DocId` as a big-endian 8-byte posting key.
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DocId {
    fn from(v: u64) -> Self {
        DocId(v)
    }
}
