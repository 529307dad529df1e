//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the content store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Canonical news records
CREATE TABLE IF NOT EXISTS news_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT UNIQUE,
    title TEXT NOT NULL,
    slug TEXT NOT NULL,
    summary TEXT NOT NULL,
    content TEXT NOT NULL,
    category TEXT NOT NULL,
    priority TEXT NOT NULL,
    content_type TEXT NOT NULL,
    language TEXT NOT NULL,
    images TEXT NOT NULL DEFAULT '[]',
    videos TEXT NOT NULL DEFAULT '[]',
    tags TEXT NOT NULL DEFAULT '[]',
    keywords TEXT NOT NULL DEFAULT '[]',
    author TEXT,
    source TEXT NOT NULL,
    status TEXT NOT NULL,
    content_quality TEXT NOT NULL,
    published_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    views INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_news_title_source ON news_records(title, source);
CREATE INDEX IF NOT EXISTS idx_news_category ON news_records(category);
CREATE INDEX IF NOT EXISTS idx_news_published ON news_records(published_at);

-- Similarity clusters awaiting or past resolution
CREATE TABLE IF NOT EXISTS duplicate_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    similarity INTEGER NOT NULL,
    status TEXT NOT NULL,
    keep_id INTEGER,
    created_at TEXT NOT NULL,
    resolved_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_groups_status ON duplicate_groups(status);

-- Group membership; record ids outlive deleted records for merge history
CREATE TABLE IF NOT EXISTS duplicate_group_members (
    group_id INTEGER NOT NULL REFERENCES duplicate_groups(id) ON DELETE CASCADE,
    record_id INTEGER NOT NULL,
    PRIMARY KEY (group_id, record_id)
);

CREATE INDEX IF NOT EXISTS idx_group_members_record ON duplicate_group_members(record_id);

-- One row per crawl cycle
CREATE TABLE IF NOT EXISTS crawl_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    trigger_kind TEXT NOT NULL,
    status TEXT NOT NULL,
    config_snapshot TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    total_processed INTEGER NOT NULL DEFAULT 0,
    success INTEGER NOT NULL DEFAULT 0,
    duplicates INTEGER NOT NULL DEFAULT 0,
    errors TEXT NOT NULL DEFAULT '[]'
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
