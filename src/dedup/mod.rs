//! Duplicate detection and resolution
//!
//! # Components
//!
//! - `identity`: per-item checks against the store while ingesting
//! - `similarity`: scoring and the background scan that builds groups
//! - `resolver`: merge / overwrite / ignore decisions on duplicates

mod identity;
mod resolver;
mod similarity;

pub use identity::{find_existing, find_existing_item, SeenItems};
pub use resolver::{auto_merge_by_recency, ignore, merge, overwrite, resolve_incoming, SaveDecision};
pub use similarity::{
    comparison_text, scan_duplicates, shingle_similarity, shingles, similarity, text_similarity,
    ScanReport, Shingles,
};
