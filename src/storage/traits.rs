//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::CycleStats;
use crate::models::{DuplicateGroup, GroupStatus, NewsRecord};
use crate::storage::{RunRecord, StoreStats, TriggerKind};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("News record not found: {0}")]
    RecordNotFound(i64),

    #[error("Duplicate group not found: {0}")]
    GroupNotFound(i64),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for content store implementations
///
/// Reads take `&self`; anything that writes takes `&mut self`. Callers that
/// share a store across tasks wrap it in a mutex (see [`SharedStorage`]).
///
/// [`SharedStorage`]: crate::storage::SharedStorage
pub trait Storage {
    // ===== News Records =====

    /// Inserts or updates a record and returns its id
    ///
    /// A record with `id` set is updated in place. A record without an id is
    /// inserted, unless its external id already exists, in which case the
    /// existing row is updated. Updates never change `created_at`.
    fn upsert_record(&mut self, record: &NewsRecord) -> StorageResult<i64>;

    /// Gets a record by id
    fn get_record(&self, id: i64) -> StorageResult<Option<NewsRecord>>;

    /// Gets the record carrying a wire identifier
    fn find_by_external_id(&self, external_id: &str) -> StorageResult<Option<NewsRecord>>;

    /// Gets the oldest record with exactly this title and source
    fn find_by_title_source(&self, title: &str, source: &str)
        -> StorageResult<Option<NewsRecord>>;

    /// Deletes a record
    ///
    /// The record is also dropped from every pending duplicate group; pending
    /// groups left with fewer than two members are deleted. Returns whether a
    /// record was removed.
    fn delete_record(&mut self, id: i64) -> StorageResult<bool>;

    /// Lists up to `limit` records, most recently created first
    fn list_records(&self, limit: usize) -> StorageResult<Vec<NewsRecord>>;

    /// Counts all stored records
    fn count_records(&self) -> StorageResult<u64>;

    // ===== Duplicate Groups =====

    /// Creates a pending group and returns its id
    fn create_group(&mut self, similarity: u8, members: &[i64]) -> StorageResult<i64>;

    /// Gets a group by id
    fn get_group(&self, id: i64) -> StorageResult<Option<DuplicateGroup>>;

    /// Lists groups, optionally filtered by status, in id order
    fn list_groups(&self, status: Option<GroupStatus>) -> StorageResult<Vec<DuplicateGroup>>;

    /// Sets a group's status and surviving member, stamping `resolved_at`
    fn set_group_status(
        &mut self,
        id: i64,
        status: GroupStatus,
        keep_id: Option<i64>,
    ) -> StorageResult<()>;

    /// Resolves a group as merged and deletes the removed members together
    ///
    /// Runs as one unit: either the group is marked merged with `keep_id`
    /// and every record in `remove_ids` is deleted, or nothing changes. The
    /// removed records are dropped from other pending groups the same way
    /// [`Storage::delete_record`] does. Returns how many records were deleted.
    fn merge_group(
        &mut self,
        group_id: i64,
        keep_id: i64,
        remove_ids: &[i64],
    ) -> StorageResult<usize>;

    /// Deletes every pending group and returns how many were removed
    fn clear_pending_groups(&mut self) -> StorageResult<usize>;

    // ===== Crawl Runs =====

    /// Records the start of a cycle and returns the run id
    fn create_run(
        &mut self,
        trigger: TriggerKind,
        config_snapshot: &str,
        config_hash: &str,
    ) -> StorageResult<i64>;

    /// Marks a run completed with its final statistics
    fn complete_run(&mut self, run_id: i64, stats: &CycleStats) -> StorageResult<()>;

    /// Gets a run by id
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Statistics =====

    /// Gets aggregate counters for the status report
    fn get_store_stats(&self) -> StorageResult<StoreStats>;
}
