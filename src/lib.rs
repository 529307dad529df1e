//! Newswire-Ingest: a news-wire ingestion pipeline
//!
//! This crate pulls articles from a news-wire API, extracts full text from the
//! wire's semi-structured markup, normalizes taxonomy codes, detects duplicate
//! stories and persists canonical records on a recurring or manual schedule.

pub mod config;
pub mod crawler;
pub mod dedup;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod output;
pub mod services;
pub mod storage;
pub mod wire;

use thiserror::Error;

/// Main error type for Newswire-Ingest operations
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transient fetch error for {url}: {message}")]
    TransientFetch { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("News record not found: {0}")]
    RecordNotFound(i64),

    #[error("Duplicate group not found: {0}")]
    GroupNotFound(i64),

    #[error("Record {record_id} is not a member of duplicate group {group_id}")]
    MemberNotInGroup { group_id: i64, record_id: i64 },

    #[error("Merge of duplicate group {group_id} would leave record {record_id} alongside the kept one")]
    IncompleteMerge { group_id: i64, record_id: i64 },

    #[error("Duplicate group {group_id} is already {status}")]
    GroupNotPending { group_id: i64, status: String },

    #[error("Cannot auto-merge duplicate group {group_id}: {reason}")]
    AmbiguousMerge { group_id: i64, reason: String },

    #[error("Crawler is already running")]
    AlreadyRunning,

    #[error("A crawl cycle is already in progress")]
    Busy,

    #[error("Invalid crawl interval: {0} minutes (must be >= 1)")]
    InvalidInterval(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Newswire-Ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlerController, CrawlerStatus};
pub use models::{DuplicateGroup, NewsRecord, RawWireItem};
pub use storage::{SqliteStorage, Storage};
