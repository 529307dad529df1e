//! Domain models shared across the ingestion pipeline
//!
//! # Components
//!
//! - `RawWireItem`: one item as returned by the wire search endpoint
//! - `NewsRecord`: the canonical, persisted article
//! - `DuplicateGroup`: a cluster of records judged to be the same story

mod group;
mod record;
mod wire_item;

pub use group::{DuplicateGroup, GroupStatus};
pub use record::{
    Category, ContentQuality, ContentType, Language, NewsRecord, Priority, RecordStatus,
};
pub use wire_item::RawWireItem;
