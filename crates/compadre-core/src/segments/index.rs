//! In-memory segment index.
//!
//! The index is built in two phases: a [`SegmentIndexBuilder`] accumulates
//! records while the segment file is read, then [`SegmentIndexBuilder::freeze`]
//! produces a read-only [`SegmentIndex`]. Only the builder can insert, so the
//! serving side cannot mutate the index.

use super::record::{PairKey, SegmentRecord};
use crate::config::SegmentConfig;
use crate::Result;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

/// Accumulates records during the load phase.
#[derive(Debug, Default)]
pub struct SegmentIndexBuilder {
    entries: Vec<(PairKey, Vec<SegmentRecord>)>,
    positions: HashMap<PairKey, usize>,
    ibd2_count: usize,
    annotated: bool,
}

impl SegmentIndexBuilder {
    /// `annotated` records whether the source carries IBD1/2 states.
    pub fn new(annotated: bool) -> Self {
        Self {
            annotated,
            ..Default::default()
        }
    }

    /// Offer one parsed record.
    ///
    /// IBD2 records are counted before the length filter; records shorter
    /// than [`SegmentConfig::MIN_SEGMENT_CM`] are then dropped. Returns whether
    /// the record was kept.
    pub fn offer(&mut self, key: PairKey, record: SegmentRecord) -> bool {
        if record.ibd.is_ibd2() {
            self.ibd2_count += 1;
        }
        if record.cm < SegmentConfig::MIN_SEGMENT_CM {
            return false;
        }
        match self.positions.get(&key) {
            Some(&pos) => self.entries[pos].1.push(record),
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, vec![record]));
            }
        }
        true
    }

    pub fn ibd2_count(&self) -> usize {
        self.ibd2_count
    }

    /// Finish the load phase.
    pub fn freeze(self) -> SegmentIndex {
        SegmentIndex {
            entries: self.entries,
            positions: self.positions,
            ibd2_count: self.ibd2_count,
            annotated: self.annotated,
        }
    }
}

/// Read-only mapping from pair key to its qualifying segments.
///
/// Pairs keep first-seen order and segments keep file order.
#[derive(Debug)]
pub struct SegmentIndex {
    entries: Vec<(PairKey, Vec<SegmentRecord>)>,
    positions: HashMap<PairKey, usize>,
    ibd2_count: usize,
    annotated: bool,
}

impl SegmentIndex {
    pub fn get(&self, key: &PairKey) -> Option<&[SegmentRecord]> {
        self.positions
            .get(key)
            .map(|&pos| self.entries[pos].1.as_slice())
    }

    /// Number of pairs with at least one qualifying segment.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total retained segments across all pairs.
    pub fn segment_count(&self) -> usize {
        self.entries.iter().map(|(_, segs)| segs.len()).sum()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&PairKey, &[SegmentRecord])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// IBD2 records seen in the source, including ones below the length cut.
    pub fn ibd2_count(&self) -> usize {
        self.ibd2_count
    }

    /// Whether the source file carried IBD1/2 annotations.
    pub fn is_annotated(&self) -> bool {
        self.annotated
    }

    /// JSON object of every pair, in first-seen order.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// JSON object holding a single pair, or `None` when the pair is absent.
    pub fn pair_json(&self, key: &PairKey) -> Result<Option<String>> {
        let Some(segments) = self.get(key) else {
            return Ok(None);
        };
        let single: HashMap<&PairKey, &[SegmentRecord]> = HashMap::from([(key, segments)]);
        Ok(Some(serde_json::to_string(&single)?))
    }
}

impl Serialize for SegmentIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, segments) in &self.entries {
            map.serialize_entry(key, segments)?;
        }
        map.end()
    }
}
