//! Canonical segment record and pair key types.

use serde::ser::{Serialize, SerializeTuple, Serializer};
use std::fmt;

/// IBD state of a shared segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IbdState {
    Ibd1,
    Ibd2,
    /// Source format carries no IBD1/2 annotation.
    NotApplicable,
}

impl IbdState {
    /// Parse the annotated-format column (`1` or `2`).
    pub fn from_column(value: &str) -> Option<Self> {
        match value.trim() {
            "1" => Some(IbdState::Ibd1),
            "2" => Some(IbdState::Ibd2),
            _ => None,
        }
    }

    pub fn is_ibd2(&self) -> bool {
        matches!(self, IbdState::Ibd2)
    }
}

impl Serialize for IbdState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            IbdState::Ibd1 => serializer.serialize_u8(1),
            IbdState::Ibd2 => serializer.serialize_u8(2),
            IbdState::NotApplicable => serializer.serialize_str("NA"),
        }
    }
}

/// One shared segment between a pair of individuals.
///
/// Serialized as the tuple `[chrom, start, end, cm, ibd]`, the shape the
/// estimator reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentRecord {
    pub chrom: i64,
    pub start: i64,
    pub end: i64,
    pub cm: f64,
    pub ibd: IbdState,
}

impl SegmentRecord {
    /// Construct a record, rounding the length to two decimals.
    pub fn new(chrom: i64, start: i64, end: i64, cm: f64, ibd: IbdState) -> Self {
        Self {
            chrom,
            start,
            end,
            cm: round_cm(cm),
            ibd,
        }
    }
}

impl Serialize for SegmentRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(5)?;
        tuple.serialize_element(&self.chrom)?;
        tuple.serialize_element(&self.start)?;
        tuple.serialize_element(&self.end)?;
        tuple.serialize_element(&self.cm)?;
        tuple.serialize_element(&self.ibd)?;
        tuple.end()
    }
}

/// Round a centiMorgan length to two decimals.
///
/// Rounds the exact binary value with ties to even, so `12.125` becomes
/// `12.12` and `0.015` (stored just below the tie) becomes `0.01`.
pub fn round_cm(cm: f64) -> f64 {
    format!("{cm:.2}").parse().unwrap_or(cm)
}

/// Ordered pair key `"{id1}:{id2}"`.
///
/// The order is the one the ids were given in; keys are never sorted, so
/// `a:b` and `b:a` are different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct PairKey(String);

impl PairKey {
    pub fn new(id1: &str, id2: &str) -> Self {
        PairKey(format!("{id1}:{id2}"))
    }

    /// Key for ids that may carry a prefix, keeping only the text after the
    /// last underscore of each.
    pub fn from_composite(id1: &str, id2: &str) -> Self {
        Self::new(canonical_id(id1), canonical_id(id2))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Substring after the final `_` (the whole id when there is none).
pub fn canonical_id(id: &str) -> &str {
    id.rsplit('_').next().unwrap_or(id)
}
