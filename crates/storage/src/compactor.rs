//! Inverted segment compactor
//!
//! Merges two sorted segments into one, with the newer segment's terms
//! winning wherever a term collides (spec §4.8, "replace" semantics).
//! Grounded on Weaviate's `compactorInverted`: merge-walk over two
//! cursors, swap-based tombstone cleanup, explicit key copy before the
//! cursor advances, buffered writer, header rewritten last.

use std::io::{self, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use bm25f_core::{Error, Result};

use crate::segment::{
    InvertedSegment, KeyIndex, SegmentHeader, TombstonedPair, HEADER_SIZE, KEY_LEN,
    STRATEGY_INVERTED, VALUE_LEN,
};

/// Buffer size for the compactor's output writer (spec §5).
const WRITE_BUFFER_SIZE: usize = 256 * 1024;

/// Drives a two-way merge of `c1` (older) and `c2` (newer) into `writer`.
///
/// `c2` wins on term collisions. When `cleanup_tombstones` is set,
/// tombstoned pairs are dropped from the merged term; a term with no
/// surviving pairs is omitted from the output entirely.
pub struct InvertedCompactor<'a, W: Write + Seek> {
    c1: &'a InvertedSegment,
    c2: &'a InvertedSegment,
    level: u16,
    secondary_index_count: u16,
    cleanup_tombstones: bool,
    writer: io::BufWriter<W>,
    offset: u64,
}

impl<'a, W: Write + Seek> InvertedCompactor<'a, W> {
    pub fn new(
        writer: W,
        c1: &'a InvertedSegment,
        c2: &'a InvertedSegment,
        level: u16,
        secondary_index_count: u16,
        cleanup_tombstones: bool,
    ) -> Self {
        InvertedCompactor {
            c1,
            c2,
            level,
            secondary_index_count,
            cleanup_tombstones,
            writer: io::BufWriter::with_capacity(WRITE_BUFFER_SIZE, writer),
            offset: 0,
        }
    }

    /// Run the compaction to completion. Any I/O error aborts partway
    /// through; per spec §4.8 the caller is responsible for discarding
    /// the partial output, this method does not attempt cleanup.
    pub fn run(mut self) -> Result<()> {
        self.write_dummy_header()?;
        self.offset = HEADER_SIZE;

        self.write_key_value_len()?;
        self.offset += 4;

        let tomb_count = self.write_tombstones()?;
        self.offset += (tomb_count + 1) * 8;

        let kis = self.write_keys()?;

        self.write_indices(&kis)?;

        self.writer
            .flush()
            .map_err(|e| compaction_io("flush", e))?;

        let index_start = kis.last().map(|k| k.value_end).unwrap_or(self.offset);
        self.write_header(index_start)?;

        Ok(())
    }

    fn write_dummy_header(&mut self) -> Result<()> {
        self.writer
            .write_all(&[0u8; HEADER_SIZE as usize])
            .map_err(|e| compaction_io("init", e))
    }

    fn write_key_value_len(&mut self) -> Result<()> {
        self.writer
            .write_u16::<LittleEndian>(KEY_LEN)
            .map_err(|e| compaction_io("write key/value length", e))?;
        self.writer
            .write_u16::<LittleEndian>(VALUE_LEN)
            .map_err(|e| compaction_io("write key/value length", e))?;
        Ok(())
    }

    /// Compaction itself never manufactures tombstones; they live in the
    /// in-memory sealed-segment tombstone set, not the compacted byte
    /// stream — a single zero count keeps the format self-describing.
    fn write_tombstones(&mut self) -> Result<u64> {
        self.writer
            .write_u64::<LittleEndian>(0)
            .map_err(|e| compaction_io("write tombstones", e))?;
        Ok(0)
    }

    fn write_keys(&mut self) -> Result<Vec<KeyIndex>> {
        let mut nodes1 = self.c1.iter_nodes();
        let mut nodes2 = self.c2.iter_nodes();

        let mut cur1 = nodes1.next().transpose()?;
        let mut cur2 = nodes2.next().transpose()?;

        let mut kis = Vec::new();

        loop {
            let take = match (&cur1, &cur2) {
                (None, None) => break,
                (Some(n1), Some(n2)) if n1.term == n2.term => 2u8,
                (Some(n1), Some(n2)) if n1.term < n2.term => 0u8,
                (Some(_), Some(_)) => 1u8,
                (Some(_), None) => 0u8,
                (None, Some(_)) => 1u8,
            };

            match take {
                2 => {
                    let n1 = cur1.take().unwrap();
                    let n2 = cur2.take().unwrap();
                    let merged = merge_pairs(n1.pairs, n2.pairs);
                    if let Some(pairs) = self.cleanup(merged) {
                        // c2 wins on conflicting terms; its bytes are
                        // what downstream readers should see for lookups
                        // keyed purely by term, there being only one key.
                        let term_copy = n2.term.clone();
                        let ki = self.write_node(term_copy, pairs)?;
                        kis.push(ki);
                    }
                    cur1 = nodes1.next().transpose()?;
                    cur2 = nodes2.next().transpose()?;
                }
                0 => {
                    let n1 = cur1.take().unwrap();
                    if let Some(pairs) = self.cleanup(n1.pairs) {
                        let term_copy = n1.term.clone();
                        let ki = self.write_node(term_copy, pairs)?;
                        kis.push(ki);
                    }
                    cur1 = nodes1.next().transpose()?;
                }
                _ => {
                    let n2 = cur2.take().unwrap();
                    if let Some(pairs) = self.cleanup(n2.pairs) {
                        let term_copy = n2.term.clone();
                        let ki = self.write_node(term_copy, pairs)?;
                        kis.push(ki);
                    }
                    cur2 = nodes2.next().transpose()?;
                }
            }
        }

        Ok(kis)
    }

    /// Removes tombstoned pairs by swapping survivors to the front and
    /// truncating. The original swaps rather than overwrites to avoid
    /// aliasing a reused cursor buffer (weaviate/weaviate#3517); our
    /// pairs are already owned copies, but the shape is kept so the
    /// logic reads the same as its source. Returns `None` when nothing
    /// survives and the term should be omitted entirely.
    fn cleanup(&self, mut pairs: Vec<TombstonedPair>) -> Option<Vec<TombstonedPair>> {
        if !self.cleanup_tombstones {
            return Some(pairs);
        }
        let mut last = 0;
        for i in 0..pairs.len() {
            if !pairs[i].tombstone {
                pairs.swap(last, i);
                last += 1;
            }
        }
        if last == 0 {
            return None;
        }
        pairs.truncate(last);
        Some(pairs)
    }

    fn write_node(&mut self, term: Vec<u8>, pairs: Vec<TombstonedPair>) -> Result<KeyIndex> {
        let node_offset = self.offset;
        self.writer
            .write_u16::<LittleEndian>(term.len() as u16)
            .map_err(|e| compaction_io("write keys", e))?;
        self.writer
            .write_all(&term)
            .map_err(|e| compaction_io("write keys", e))?;
        self.writer
            .write_u32::<LittleEndian>(pairs.len() as u32)
            .map_err(|e| compaction_io("write keys", e))?;
        for p in &pairs {
            self.writer
                .write_u8(p.tombstone as u8)
                .map_err(|e| compaction_io("write keys", e))?;
            self.writer
                .write_all(&p.pair.key)
                .map_err(|e| compaction_io("write keys", e))?;
            self.writer
                .write_all(&p.pair.value)
                .map_err(|e| compaction_io("write keys", e))?;
        }
        let node_len = 2 + term.len() as u64 + 4 + pairs.len() as u64 * 17;
        self.offset += node_len;
        Ok(KeyIndex {
            term,
            node_offset,
            value_end: self.offset,
        })
    }

    fn write_indices(&mut self, kis: &[KeyIndex]) -> Result<()> {
        for ki in kis {
            self.writer
                .write_u16::<LittleEndian>(ki.term.len() as u16)
                .map_err(|e| compaction_io("write index", e))?;
            self.writer
                .write_all(&ki.term)
                .map_err(|e| compaction_io("write index", e))?;
            self.writer
                .write_u64::<LittleEndian>(ki.node_offset)
                .map_err(|e| compaction_io("write index", e))?;
            self.writer
                .write_u64::<LittleEndian>(ki.value_end)
                .map_err(|e| compaction_io("write index", e))?;
        }
        Ok(())
    }

    fn write_header(&mut self, index_start: u64) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| compaction_io("write header", e))?;
        let inner = self.writer.get_mut();
        inner
            .seek(SeekFrom::Start(0))
            .map_err(|e| compaction_io("write header", e))?;
        let header = SegmentHeader {
            level: self.level,
            version: 0,
            secondary_index_count: self.secondary_index_count,
            strategy: STRATEGY_INVERTED,
            index_start,
        };
        header
            .write_to(inner)
            .map_err(|e| compaction_io("write header", e))
    }
}

/// Sorted merge of two pair lists by doc-id, tombstones kept as-is;
/// `cleanup` runs afterward and decides whether tombstoned entries
/// actually get dropped.
fn merge_pairs(a: Vec<TombstonedPair>, b: Vec<TombstonedPair>) -> Vec<TombstonedPair> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let mut ai = a.into_iter().peekable();
    let mut bi = b.into_iter().peekable();
    loop {
        match (ai.peek(), bi.peek()) {
            (Some(x), Some(y)) => {
                if x.pair.key <= y.pair.key {
                    merged.push(ai.next().unwrap());
                } else {
                    merged.push(bi.next().unwrap());
                }
            }
            (Some(_), None) => merged.push(ai.next().unwrap()),
            (None, Some(_)) => merged.push(bi.next().unwrap()),
            (None, None) => break,
        }
    }
    merged
}

fn compaction_io(step: &'static str, source: io::Error) -> Error {
    Error::CompactionIo { step, source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::MapPair;
    use bm25f_core::DocId;
    use byteorder::{LittleEndian as LE, WriteBytesExt as _};
    use std::io::Cursor;

    fn empty_segment() -> InvertedSegment {
        let mut buf = Vec::new();
        {
            let mut w = Cursor::new(&mut buf);
            w.write_all(&[0u8; HEADER_SIZE as usize]).unwrap();
            let h = SegmentHeader {
                level: 0,
                version: 0,
                secondary_index_count: 0,
                strategy: STRATEGY_INVERTED,
                index_start: HEADER_SIZE,
            };
            w.seek(SeekFrom::Start(0)).unwrap();
            h.write_to(&mut w).unwrap();
        }
        InvertedSegment::from_bytes(buf).unwrap()
    }

    fn single_term_segment(term: &str, postings: &[(u64, f32, f32)]) -> InvertedSegment {
        let mut buf = Vec::new();
        {
            let mut w = Cursor::new(&mut buf);
            w.write_all(&[0u8; HEADER_SIZE as usize]).unwrap();
            w.write_u16::<LE>(KEY_LEN).unwrap();
            w.write_u16::<LE>(VALUE_LEN).unwrap();
            w.write_u64::<LE>(0).unwrap();
            let node_start = HEADER_SIZE + 4 + 8;
            w.write_u16::<LE>(term.len() as u16).unwrap();
            w.write_all(term.as_bytes()).unwrap();
            w.write_u32::<LE>(postings.len() as u32).unwrap();
            for (id, freq, prop_len) in postings {
                w.write_u8(0).unwrap();
                let pair = MapPair::encode(DocId(*id), *freq, *prop_len);
                w.write_all(&pair.key).unwrap();
                w.write_all(&pair.value).unwrap();
            }
            let node_len = 2 + term.len() as u64 + 4 + postings.len() as u64 * 17;
            let index_start = node_start + node_len;
            w.write_u16::<LE>(term.len() as u16).unwrap();
            w.write_all(term.as_bytes()).unwrap();
            w.write_u64::<LE>(node_start).unwrap();
            w.write_u64::<LE>(index_start).unwrap();
            w.seek(SeekFrom::Start(0)).unwrap();
            let h = SegmentHeader {
                level: 0,
                version: 0,
                secondary_index_count: 0,
                strategy: STRATEGY_INVERTED,
                index_start,
            };
            h.write_to(&mut w).unwrap();
        }
        InvertedSegment::from_bytes(buf).unwrap()
    }

    #[test]
    fn newer_segment_wins_on_term_collision() {
        let older = single_term_segment("fox", &[(1, 1.0, 1.0)]);
        let newer = single_term_segment("fox", &[(2, 2.0, 2.0)]);

        let mut out = Vec::new();
        let compactor = InvertedCompactor::new(Cursor::new(&mut out), &older, &newer, 0, 0, true);
        compactor.run().unwrap();

        let merged = InvertedSegment::from_bytes(out).unwrap();
        let pairs = merged.map_list("fox").unwrap();
        let ids: Vec<u64> = pairs.iter().map(|p| p.doc_id().0).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn disjoint_terms_are_preserved() {
        let older = single_term_segment("fox", &[(1, 1.0, 1.0)]);
        let newer = single_term_segment("hound", &[(2, 2.0, 2.0)]);

        let mut out = Vec::new();
        let compactor = InvertedCompactor::new(Cursor::new(&mut out), &older, &newer, 0, 0, true);
        compactor.run().unwrap();

        let merged = InvertedSegment::from_bytes(out).unwrap();
        assert_eq!(merged.term_count(), 2);
        assert_eq!(merged.map_list("fox").unwrap().len(), 1);
        assert_eq!(merged.map_list("hound").unwrap().len(), 1);
    }

    #[test]
    fn tombstone_cleanup_drops_dead_entries_when_enabled() {
        let mut older_buf = Vec::new();
        {
            let mut w = Cursor::new(&mut older_buf);
            w.write_all(&[0u8; HEADER_SIZE as usize]).unwrap();
            w.write_u16::<LE>(KEY_LEN).unwrap();
            w.write_u16::<LE>(VALUE_LEN).unwrap();
            w.write_u64::<LE>(0).unwrap();
            let node_start = HEADER_SIZE + 4 + 8;
            let term = b"fox";
            w.write_u16::<LE>(term.len() as u16).unwrap();
            w.write_all(term).unwrap();
            w.write_u32::<LE>(1).unwrap();
            w.write_u8(1).unwrap(); // tombstoned
            let pair = MapPair::encode(DocId(1), 1.0, 1.0);
            w.write_all(&pair.key).unwrap();
            w.write_all(&pair.value).unwrap();
            let node_len = 2 + term.len() as u64 + 4 + 17;
            let index_start = node_start + node_len;
            w.write_u16::<LE>(term.len() as u16).unwrap();
            w.write_all(term).unwrap();
            w.write_u64::<LE>(node_start).unwrap();
            w.write_u64::<LE>(index_start).unwrap();
            w.seek(SeekFrom::Start(0)).unwrap();
            let h = SegmentHeader {
                level: 0,
                version: 0,
                secondary_index_count: 0,
                strategy: STRATEGY_INVERTED,
                index_start,
            };
            h.write_to(&mut w).unwrap();
        }
        let older = InvertedSegment::from_bytes(older_buf).unwrap();
        let newer = empty_segment();

        let mut out = Vec::new();
        let compactor = InvertedCompactor::new(Cursor::new(&mut out), &older, &newer, 0, 0, true);
        compactor.run().unwrap();

        let merged = InvertedSegment::from_bytes(out).unwrap();
        assert_eq!(merged.term_count(), 0);
    }

    #[test]
    fn tombstone_survives_without_cleanup() {
        let mut older_buf = Vec::new();
        {
            let mut w = Cursor::new(&mut older_buf);
            w.write_all(&[0u8; HEADER_SIZE as usize]).unwrap();
            w.write_u16::<LE>(KEY_LEN).unwrap();
            w.write_u16::<LE>(VALUE_LEN).unwrap();
            w.write_u64::<LE>(0).unwrap();
            let node_start = HEADER_SIZE + 4 + 8;
            let term = b"fox";
            w.write_u16::<LE>(term.len() as u16).unwrap();
            w.write_all(term).unwrap();
            w.write_u32::<LE>(1).unwrap();
            w.write_u8(1).unwrap();
            let pair = MapPair::encode(DocId(1), 1.0, 1.0);
            w.write_all(&pair.key).unwrap();
            w.write_all(&pair.value).unwrap();
            let node_len = 2 + term.len() as u64 + 4 + 17;
            let index_start = node_start + node_len;
            w.write_u16::<LE>(term.len() as u16).unwrap();
            w.write_all(term).unwrap();
            w.write_u64::<LE>(node_start).unwrap();
            w.write_u64::<LE>(index_start).unwrap();
            w.seek(SeekFrom::Start(0)).unwrap();
            let h = SegmentHeader {
                level: 0,
                version: 0,
                secondary_index_count: 0,
                strategy: STRATEGY_INVERTED,
                index_start,
            };
            h.write_to(&mut w).unwrap();
        }
        let older = InvertedSegment::from_bytes(older_buf).unwrap();
        let newer = empty_segment();

        let mut out = Vec::new();
        let compactor = InvertedCompactor::new(Cursor::new(&mut out), &older, &newer, 0, 0, false);
        compactor.run().unwrap();

        let merged = InvertedSegment::from_bytes(out).unwrap();
        // map_list filters tombstones at read time regardless of cleanup,
        // so the term still resolves but yields no live postings.
        assert_eq!(merged.term_count(), 1);
        assert!(merged.map_list("fox").unwrap().is_empty());
    }
}
