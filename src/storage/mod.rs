//! Storage module for persisting ingested content
//!
//! This module handles all database operations for the pipeline, including:
//! - SQLite database initialization and schema management
//! - News record upserts and identity lookups
//! - Duplicate group bookkeeping
//! - Crawl run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::crawler::ErrorEntry;
use crate::IngestError;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// A store shared between the controller, its scheduler task and callers
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;

/// Opens (or creates) a SQLite store and wraps it for sharing
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_storage(path: &Path) -> Result<SharedStorage, IngestError> {
    let storage = SqliteStorage::new(path)?;
    Ok(Arc::new(Mutex::new(storage)))
}

/// Locks a shared store
///
/// A poisoned lock is reported as a storage error.
pub fn lock_storage(
    storage: &SharedStorage,
) -> Result<MutexGuard<'_, dyn Storage + Send + 'static>, IngestError> {
    storage.lock().map_err(|_| {
        IngestError::from(StorageError::Database("storage lock poisoned".to_string()))
    })
}

/// How a crawl cycle was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriggerKind {
    Scheduled,
    Manual,
}

impl TriggerKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    Running,
    Completed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Represents one persisted crawl cycle
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub trigger: TriggerKind,
    pub status: RunStatus,
    /// Configuration in effect for the cycle, as JSON
    pub config_snapshot: String,
    pub config_hash: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_processed: u64,
    pub success: u64,
    pub duplicates: u64,
    pub errors: Vec<ErrorEntry>,
}

/// Aggregate counters over the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total_records: u64,
    pub published: u64,
    pub drafts: u64,
    pub full_quality: u64,
    pub partial_quality: u64,
    pub low_quality: u64,
    pub pending_groups: u64,
    pub merged_groups: u64,
    pub ignored_groups: u64,
    pub total_runs: u64,
}
