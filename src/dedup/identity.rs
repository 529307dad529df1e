//! Identity duplicate checks used while ingesting

use crate::models::{NewsRecord, RawWireItem};
use crate::normalize::{normalize_external_id, normalize_title};
use crate::storage::{Storage, StorageResult};
use std::collections::HashSet;

/// Finds the stored record an incoming record would duplicate
///
/// Matches on external id when the incoming record has one, otherwise on the
/// exact (title, source) pair.
pub fn find_existing(storage: &dyn Storage, incoming: &NewsRecord) -> StorageResult<Option<NewsRecord>> {
    lookup(
        storage,
        incoming.external_id.as_deref(),
        &incoming.title,
        &incoming.source,
    )
}

/// Finds the stored record a raw wire item would duplicate
///
/// The item's id and title are normalized the way ingestion stores them, so
/// this agrees with [`find_existing`] on the record the item becomes.
pub fn find_existing_item(
    storage: &dyn Storage,
    item: &RawWireItem,
    source: &str,
) -> StorageResult<Option<NewsRecord>> {
    let external_id = normalize_external_id(&item.id);
    let title = normalize_title(&item.title);
    lookup(storage, external_id.as_deref(), &title, source)
}

fn lookup(
    storage: &dyn Storage,
    external_id: Option<&str>,
    title: &str,
    source: &str,
) -> StorageResult<Option<NewsRecord>> {
    match external_id {
        Some(external_id) => storage.find_by_external_id(external_id),
        None => storage.find_by_title_source(title, source),
    }
}

/// External ids already handled in the current cycle
#[derive(Debug, Default)]
pub struct SeenItems {
    ids: HashSet<String>,
}

impl SeenItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an id, returning `false` if it was already seen this cycle
    pub fn first_sighting(&mut self, external_id: &str) -> bool {
        self.ids.insert(external_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
