//! Cycle statistics and controller status snapshots

use crate::storage::TriggerKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One failure recorded during a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Wire category being processed; `None` for cycle-level failures
    pub category: Option<i64>,

    /// Item that failed; `None` when a whole category or cycle failed
    pub external_id: Option<String>,

    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorEntry {
    pub fn new(
        category: Option<i64>,
        external_id: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            external_id,
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// Counters for a single cycle
///
/// Every processed item lands in exactly one bucket, so
/// `total_processed == success + duplicates + errors` for item errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    pub total_processed: u64,
    /// Items inserted or overwritten
    pub success: u64,
    pub duplicates: u64,
    pub errors: Vec<ErrorEntry>,
}

impl CycleStats {
    pub fn error_count(&self) -> u64 {
        self.errors.len() as u64
    }
}

/// Result of one completed cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// Persisted run id
    pub run_id: i64,
    pub trigger: TriggerKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stats: CycleStats,
}

/// Counters accumulated over the controller's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CumulativeStats {
    pub cycles: u64,
    pub total_processed: u64,
    pub success: u64,
    pub duplicates: u64,
    pub errors: u64,
}

impl CumulativeStats {
    pub fn absorb(&mut self, stats: &CycleStats) {
        self.cycles += 1;
        self.total_processed += stats.total_processed;
        self.success += stats.success;
        self.duplicates += stats.duplicates;
        self.errors += stats.error_count();
    }
}

/// Bounded log of the most recent errors, oldest dropped first
#[derive(Debug, Clone)]
pub struct ErrorLog {
    capacity: usize,
    entries: VecDeque<ErrorEntry>,
}

impl ErrorLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entry: ErrorEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = ErrorEntry>) {
        for entry in entries {
            self.push(entry);
        }
    }

    /// Entries oldest first
    pub fn snapshot(&self) -> Vec<ErrorEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, Serialize)]
pub struct CrawlerStatus {
    /// Scheduled ticks are active
    pub enabled: bool,

    /// A cycle is executing right now
    pub running: bool,

    pub interval_minutes: u32,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub last_report: Option<CycleReport>,
    pub totals: CumulativeStats,
    pub recent_errors: Vec<ErrorEntry>,
}
