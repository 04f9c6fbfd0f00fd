//! Shared IBD segments: record types, the load-once index and the file loader.

pub mod index;
pub mod loader;
pub mod record;

pub use index::{SegmentIndex, SegmentIndexBuilder};
pub use loader::{load_segment_file, load_segments, SegmentFormat};
pub use record::{canonical_id, IbdState, PairKey, SegmentRecord};
