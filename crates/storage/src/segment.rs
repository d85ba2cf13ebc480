//! On-disk inverted segment format
//!
//! A segment is a sealed, read-only file produced by the compactor
//! (spec §4.8) or by sealing an in-memory term -> postings map. Each
//! segment is keyed by term bytes; each term maps to an ordered list of
//! `MapPair` entries, mirroring a single property's searchable posting
//! bucket.
//!
//! ```text
//! HEADER (16 bytes, rewritten last):
//!   level                  u16 LE
//!   version                u16 LE   (= 0)
//!   secondary_index_count  u16 LE
//!   strategy               u16 LE   (= STRATEGY_INVERTED)
//!   index_start            u64 LE
//!
//! KEY/VALUE LENGTH (describes the inner MapPair shape, not the node's
//! own term key, which is length-prefixed below):
//!   key_len                u16 LE   (= 8, MapPair doc-id width)
//!   value_len              u16 LE   (= 8, MapPair value width)
//!
//! TOMBSTONE BLOCK:
//!   count                  u64 LE
//!   tombstones             count x u64 LE
//!
//! DATA NODES (one per surviving term, sorted ascending by term bytes):
//!   term_len               u16 LE
//!   term_bytes             [u8; term_len]
//!   pair_count             u32 LE
//!   per pair:
//!     tombstone            u8 (0/1)
//!     doc_id               [u8; 8]  (big-endian)
//!     value                [u8; 8]  (float32 frequency || float32 propLength, LE)
//!
//! PRIMARY INDEX (one entry per data node, in node order):
//!   term_len               u16 LE
//!   term_bytes             [u8; term_len]
//!   node_offset            u64 LE
//!   value_end              u64 LE
//! ```
//!
//! This mirrors the shape of Weaviate's `lsmkv` "replace"-strategy
//! segment (header rewritten last, buffered writer, explicit key copy
//! before cursor advance) without byte-for-byte compatibility — the
//! primary index here is a flat sorted table rather than the original's
//! on-disk diskhash, since nothing downstream needs binary interop with
//! a real Weaviate store.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;

use bm25f_core::{Error, Result};

use crate::bucket::MapPair;

/// Backing storage for a sealed segment's bytes: either owned (built
/// in memory or read fully into a `Vec`) or memory-mapped from disk.
enum Backing {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl Backing {
    fn as_slice(&self) -> &[u8] {
        match self {
            Backing::Owned(v) => v,
            Backing::Mapped(m) => m,
        }
    }
}

/// Segment strategy tag; only the inverted strategy is implemented here.
pub const STRATEGY_INVERTED: u16 = 4;

/// Fixed header size in bytes.
pub const HEADER_SIZE: u64 = 16;

/// Declared MapPair doc-id width (informational; pairs are always 8 bytes).
pub const KEY_LEN: u16 = 8;

/// Declared MapPair value width (informational; values are always 8 bytes).
pub const VALUE_LEN: u16 = 8;

/// Fixed-size segment header, rewritten in place once the body is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    pub level: u16,
    pub version: u16,
    pub secondary_index_count: u16,
    pub strategy: u16,
    pub index_start: u64,
}

impl SegmentHeader {
    pub(crate) fn write_to<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u16::<LittleEndian>(self.level)?;
        w.write_u16::<LittleEndian>(self.version)?;
        w.write_u16::<LittleEndian>(self.secondary_index_count)?;
        w.write_u16::<LittleEndian>(self.strategy)?;
        w.write_u64::<LittleEndian>(self.index_start)?;
        Ok(())
    }

    fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let level = r.read_u16::<LittleEndian>()?;
        let version = r.read_u16::<LittleEndian>()?;
        let secondary_index_count = r.read_u16::<LittleEndian>()?;
        let strategy = r.read_u16::<LittleEndian>()?;
        let index_start = r.read_u64::<LittleEndian>()?;
        Ok(SegmentHeader {
            level,
            version,
            secondary_index_count,
            strategy,
            index_start,
        })
    }
}

/// One posting entry plus its tombstone bit, as stored in a data node.
#[derive(Debug, Clone, PartialEq)]
pub struct TombstonedPair {
    pub tombstone: bool,
    pub pair: MapPair,
}

/// One data node as stored on disk: a term and its value list.
#[derive(Debug, Clone, PartialEq)]
pub struct InvertedNode {
    pub term: Vec<u8>,
    pub pairs: Vec<TombstonedPair>,
}

/// An index entry pointing at one data node, recorded as each node is
/// written during compaction and used for the in-memory primary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyIndex {
    pub term: Vec<u8>,
    pub node_offset: u64,
    pub value_end: u64,
}

/// An immutable, sealed inverted segment backed by owned bytes.
///
/// Produced by the compactor or by sealing an in-memory posting map;
/// never mutated in place once the header has been rewritten.
pub struct InvertedSegment {
    data: Backing,
    header: SegmentHeader,
    index: Vec<KeyIndex>,
}

impl InvertedSegment {
    /// Parse a sealed segment from its raw bytes, validating the header
    /// and loading the primary index for binary search.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::from_backing(Backing::Owned(data))
    }

    /// Open a sealed segment file by memory-mapping it, avoiding a full
    /// read into owned memory for large segments.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(Error::Io)?;
        // SAFETY: the segment file is sealed and never mutated in place
        // once written; no other writer can invalidate the mapping.
        let mmap = unsafe { Mmap::map(&file) }.map_err(Error::Io)?;
        Self::from_backing(Backing::Mapped(mmap))
    }

    fn from_backing(data: Backing) -> Result<Self> {
        let bytes = data.as_slice();
        if (bytes.len() as u64) < HEADER_SIZE {
            return Err(invalid_data("segment shorter than header"));
        }
        let mut cursor = io::Cursor::new(&bytes[..HEADER_SIZE as usize]);
        let header = SegmentHeader::read_from(&mut cursor).map_err(Error::Io)?;
        if header.strategy != STRATEGY_INVERTED {
            return Err(invalid_data(format!(
                "unsupported segment strategy {}",
                header.strategy
            )));
        }
        let index = read_index(bytes, header.index_start as usize)?;
        Ok(InvertedSegment { data, header, index })
    }

    pub fn header(&self) -> &SegmentHeader {
        &self.header
    }

    /// Binary-search the primary index for `term` and decode its
    /// surviving (non-tombstoned) posting list in doc-id-ascending order.
    pub fn map_list(&self, term: &str) -> Result<Vec<MapPair>> {
        let term_bytes = term.as_bytes();
        let found = self
            .index
            .binary_search_by(|ki| ki.term.as_slice().cmp(term_bytes));
        let idx = match found {
            Ok(i) => i,
            Err(_) => return Ok(Vec::new()),
        };
        let node = read_node(self.data.as_slice(), self.index[idx].node_offset as usize)?;
        let mut pairs: Vec<MapPair> = node
            .pairs
            .into_iter()
            .filter(|p| !p.tombstone)
            .map(|p| p.pair)
            .collect();
        // Guarantee ascending doc-id order (spec §4.3) regardless of the
        // write-time order of upstream appends.
        pairs.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(pairs)
    }

    /// Iterate all surviving data nodes in ascending term order, each
    /// carrying its full (tombstone-inclusive) pair list — used by the
    /// compactor's merge-walk.
    pub fn iter_nodes(&self) -> impl Iterator<Item = Result<InvertedNode>> + '_ {
        self.index
            .iter()
            .map(move |ki| read_node(self.data.as_slice(), ki.node_offset as usize))
    }

    /// Number of distinct terms held by this segment.
    pub fn term_count(&self) -> usize {
        self.index.len()
    }
}

fn invalid_data(msg: impl Into<String>) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::InvalidData, msg.into()))
}

fn read_node(data: &[u8], offset: usize) -> Result<InvertedNode> {
    let mut cursor = io::Cursor::new(&data[offset..]);
    let term_len = cursor.read_u16::<LittleEndian>().map_err(Error::Io)? as usize;
    let mut term = vec![0u8; term_len];
    cursor.read_exact(&mut term).map_err(Error::Io)?;
    let pair_count = cursor.read_u32::<LittleEndian>().map_err(Error::Io)?;
    let mut pairs = Vec::with_capacity(pair_count as usize);
    for _ in 0..pair_count {
        let tombstone = cursor.read_u8().map_err(Error::Io)? != 0;
        let mut key = [0u8; 8];
        cursor.read_exact(&mut key).map_err(Error::Io)?;
        let mut value = vec![0u8; VALUE_LEN as usize];
        cursor.read_exact(&mut value).map_err(Error::Io)?;
        pairs.push(TombstonedPair {
            tombstone,
            pair: MapPair { key, value },
        });
    }
    Ok(InvertedNode { term, pairs })
}

fn read_index(data: &[u8], offset: usize) -> Result<Vec<KeyIndex>> {
    let mut cursor = io::Cursor::new(&data[offset..]);
    let mut out = Vec::new();
    loop {
        let term_len = match cursor.read_u16::<LittleEndian>() {
            Ok(v) => v as usize,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(Error::Io(e)),
        };
        let mut term = vec![0u8; term_len];
        cursor.read_exact(&mut term).map_err(Error::Io)?;
        let node_offset = cursor.read_u64::<LittleEndian>().map_err(Error::Io)?;
        let value_end = cursor.read_u64::<LittleEndian>().map_err(Error::Io)?;
        out.push(KeyIndex {
            term,
            node_offset,
            value_end,
        });
    }
    Ok(out)
}
