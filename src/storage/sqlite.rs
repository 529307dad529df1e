//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::{CycleStats, ErrorEntry};
use crate::models::{
    Category, ContentQuality, ContentType, DuplicateGroup, GroupStatus, Language, NewsRecord,
    Priority, RecordStatus,
};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, StoreStats, TriggerKind};
use crate::IngestError;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RECORD_COLUMNS: &str = "id, external_id, title, slug, summary, content, category, priority,
    content_type, language, images, videos, tags, keywords, author, source, status,
    content_quality, published_at, created_at, updated_at, views";

const RUN_COLUMNS: &str = "id, trigger_kind, status, config_snapshot, config_hash, started_at,
    finished_at, total_processed, success, duplicates, errors";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> Result<Self, IngestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, IngestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn query_record(
        &self,
        clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> StorageResult<Option<NewsRecord>> {
        let sql = format!("SELECT {} FROM news_records {}", RECORD_COLUMNS, clause);
        let record = self
            .conn
            .query_row(&sql, params, row_to_record)
            .optional()?;
        Ok(record)
    }

    fn members_of(&self, group_id: i64) -> StorageResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT record_id FROM duplicate_group_members WHERE group_id = ?1 ORDER BY record_id",
        )?;
        let members = stmt
            .query_map(params![group_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(members)
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl Storage for SqliteStorage {
    // ===== News Records =====

    fn upsert_record(&mut self, record: &NewsRecord) -> StorageResult<i64> {
        let images = to_json(&record.images)?;
        let videos = to_json(&record.videos)?;
        let tags = to_json(&record.tags)?;
        let keywords = to_json(&record.keywords)?;
        let published_at = record.published_at.map(|d| d.to_rfc3339());
        let now = Utc::now().to_rfc3339();

        if let Some(id) = record.id {
            let changed = self.conn.execute(
                "UPDATE news_records SET external_id = ?1, title = ?2, slug = ?3, summary = ?4,
                 content = ?5, category = ?6, priority = ?7, content_type = ?8, language = ?9,
                 images = ?10, videos = ?11, tags = ?12, keywords = ?13, author = ?14,
                 source = ?15, status = ?16, content_quality = ?17, published_at = ?18,
                 updated_at = ?19, views = ?20
                 WHERE id = ?21",
                params![
                    record.external_id,
                    record.title,
                    record.slug,
                    record.summary,
                    record.content,
                    record.category.to_db_string(),
                    record.priority.to_db_string(),
                    record.content_type.to_db_string(),
                    record.language.to_db_string(),
                    images,
                    videos,
                    tags,
                    keywords,
                    record.author,
                    record.source,
                    record.status.to_db_string(),
                    record.content_quality.to_db_string(),
                    published_at,
                    now,
                    record.views as i64,
                    id
                ],
            )?;
            if changed == 0 {
                return Err(StorageError::RecordNotFound(id));
            }
            return Ok(id);
        }

        // A known external id updates the existing row in place
        let id = self.conn.query_row(
            "INSERT INTO news_records (external_id, title, slug, summary, content, category,
             priority, content_type, language, images, videos, tags, keywords, author, source,
             status, content_quality, published_at, created_at, updated_at, views)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                     ?18, ?19, ?20, ?21)
             ON CONFLICT(external_id) DO UPDATE SET
                title = excluded.title, slug = excluded.slug, summary = excluded.summary,
                content = excluded.content, category = excluded.category,
                priority = excluded.priority, content_type = excluded.content_type,
                language = excluded.language, images = excluded.images,
                videos = excluded.videos, tags = excluded.tags, keywords = excluded.keywords,
                author = excluded.author, source = excluded.source, status = excluded.status,
                content_quality = excluded.content_quality,
                published_at = excluded.published_at, updated_at = excluded.updated_at
             RETURNING id",
            params![
                record.external_id,
                record.title,
                record.slug,
                record.summary,
                record.content,
                record.category.to_db_string(),
                record.priority.to_db_string(),
                record.content_type.to_db_string(),
                record.language.to_db_string(),
                images,
                videos,
                tags,
                keywords,
                record.author,
                record.source,
                record.status.to_db_string(),
                record.content_quality.to_db_string(),
                published_at,
                record.created_at.to_rfc3339(),
                now,
                record.views as i64
            ],
            |row| row.get(0),
        )?;

        Ok(id)
    }

    fn get_record(&self, id: i64) -> StorageResult<Option<NewsRecord>> {
        self.query_record("WHERE id = ?1", &[&id])
    }

    fn find_by_external_id(&self, external_id: &str) -> StorageResult<Option<NewsRecord>> {
        self.query_record("WHERE external_id = ?1", &[&external_id])
    }

    fn find_by_title_source(
        &self,
        title: &str,
        source: &str,
    ) -> StorageResult<Option<NewsRecord>> {
        self.query_record(
            "WHERE title = ?1 AND source = ?2 ORDER BY id LIMIT 1",
            &[&title, &source],
        )
    }

    fn delete_record(&mut self, id: i64) -> StorageResult<bool> {
        let pending = GroupStatus::Pending.to_db_string();
        let tx = self.conn.transaction()?;

        let removed = tx.execute("DELETE FROM news_records WHERE id = ?1", params![id])?;
        tx.execute(
            "DELETE FROM duplicate_group_members WHERE record_id = ?1
             AND group_id IN (SELECT id FROM duplicate_groups WHERE status = ?2)",
            params![id, pending],
        )?;
        tx.execute(
            "DELETE FROM duplicate_groups WHERE status = ?1
             AND (SELECT COUNT(*) FROM duplicate_group_members m
                  WHERE m.group_id = duplicate_groups.id) < 2",
            params![pending],
        )?;

        tx.commit()?;
        Ok(removed > 0)
    }

    fn list_records(&self, limit: usize) -> StorageResult<Vec<NewsRecord>> {
        let sql = format!(
            "SELECT {} FROM news_records ORDER BY id DESC LIMIT ?1",
            RECORD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![limit as i64], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn count_records(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM news_records")
    }

    // ===== Duplicate Groups =====

    fn create_group(&mut self, similarity: u8, members: &[i64]) -> StorageResult<i64> {
        if members.len() < 2 {
            return Err(StorageError::ConstraintViolation(format!(
                "duplicate group needs at least two members, got {}",
                members.len()
            )));
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO duplicate_groups (similarity, status, created_at) VALUES (?1, ?2, ?3)",
            params![similarity, GroupStatus::Pending.to_db_string(), now],
        )?;
        let group_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO duplicate_group_members (group_id, record_id) VALUES (?1, ?2)",
            )?;
            for member in members {
                stmt.execute(params![group_id, member])?;
            }
        }

        tx.commit()?;
        Ok(group_id)
    }

    fn get_group(&self, id: i64) -> StorageResult<Option<DuplicateGroup>> {
        let group = self
            .conn
            .query_row(
                "SELECT id, similarity, status, keep_id, created_at, resolved_at
                 FROM duplicate_groups WHERE id = ?1",
                params![id],
                row_to_group,
            )
            .optional()?;

        match group {
            Some(mut group) => {
                group.members = self.members_of(group.id)?;
                Ok(Some(group))
            }
            None => Ok(None),
        }
    }

    fn list_groups(&self, status: Option<GroupStatus>) -> StorageResult<Vec<DuplicateGroup>> {
        let mut groups = {
            let mut stmt = self.conn.prepare(
                "SELECT id, similarity, status, keep_id, created_at, resolved_at
                 FROM duplicate_groups WHERE ?1 IS NULL OR status = ?1 ORDER BY id",
            )?;
            let rows = stmt
                .query_map(params![status.map(|s| s.to_db_string())], row_to_group)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        for group in &mut groups {
            group.members = self.members_of(group.id)?;
        }

        Ok(groups)
    }

    fn set_group_status(
        &mut self,
        id: i64,
        status: GroupStatus,
        keep_id: Option<i64>,
    ) -> StorageResult<()> {
        let resolved_at = match status {
            GroupStatus::Pending => None,
            _ => Some(Utc::now().to_rfc3339()),
        };

        let changed = self.conn.execute(
            "UPDATE duplicate_groups SET status = ?1, keep_id = ?2, resolved_at = ?3 WHERE id = ?4",
            params![status.to_db_string(), keep_id, resolved_at, id],
        )?;

        if changed == 0 {
            return Err(StorageError::GroupNotFound(id));
        }
        Ok(())
    }

    fn merge_group(
        &mut self,
        group_id: i64,
        keep_id: i64,
        remove_ids: &[i64],
    ) -> StorageResult<usize> {
        let pending = GroupStatus::Pending.to_db_string();
        let tx = self.conn.transaction()?;

        let mut removed = 0;
        for id in remove_ids {
            removed += tx.execute("DELETE FROM news_records WHERE id = ?1", params![id])?;
            tx.execute(
                "DELETE FROM duplicate_group_members WHERE record_id = ?1 AND group_id != ?2
                 AND group_id IN (SELECT id FROM duplicate_groups WHERE status = ?3)",
                params![id, group_id, pending],
            )?;
        }
        tx.execute(
            "DELETE FROM duplicate_groups WHERE status = ?1 AND id != ?2
             AND (SELECT COUNT(*) FROM duplicate_group_members m
                  WHERE m.group_id = duplicate_groups.id) < 2",
            params![pending, group_id],
        )?;

        // Dropping the transaction without commit rolls the deletions back
        let changed = tx.execute(
            "UPDATE duplicate_groups SET status = ?1, keep_id = ?2, resolved_at = ?3 WHERE id = ?4",
            params![
                GroupStatus::Merged.to_db_string(),
                keep_id,
                Utc::now().to_rfc3339(),
                group_id
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::GroupNotFound(group_id));
        }

        tx.commit()?;
        Ok(removed)
    }

    fn clear_pending_groups(&mut self) -> StorageResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM duplicate_groups WHERE status = ?1",
            params![GroupStatus::Pending.to_db_string()],
        )?;
        Ok(removed)
    }

    // ===== Crawl Runs =====

    fn create_run(
        &mut self,
        trigger: TriggerKind,
        config_snapshot: &str,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO crawl_runs (trigger_kind, status, config_snapshot, config_hash, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                trigger.to_db_string(),
                RunStatus::Running.to_db_string(),
                config_snapshot,
                config_hash,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64, stats: &CycleStats) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let errors = serde_json::to_string(&stats.errors)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let changed = self.conn.execute(
            "UPDATE crawl_runs SET status = ?1, finished_at = ?2, total_processed = ?3,
             success = ?4, duplicates = ?5, errors = ?6 WHERE id = ?7",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                stats.total_processed as i64,
                stats.success as i64,
                stats.duplicates as i64,
                errors,
                run_id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM crawl_runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], row_to_run)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!(
            "SELECT {} FROM crawl_runs ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        );
        let run = self.conn.query_row(&sql, [], row_to_run).optional()?;
        Ok(run)
    }

    // ===== Statistics =====

    fn get_store_stats(&self) -> StorageResult<StoreStats> {
        let by_status = |status: RecordStatus| {
            format!(
                "SELECT COUNT(*) FROM news_records WHERE status = '{}'",
                status.to_db_string()
            )
        };
        let by_quality = |quality: ContentQuality| {
            format!(
                "SELECT COUNT(*) FROM news_records WHERE content_quality = '{}'",
                quality.to_db_string()
            )
        };
        let by_group = |status: GroupStatus| {
            format!(
                "SELECT COUNT(*) FROM duplicate_groups WHERE status = '{}'",
                status.to_db_string()
            )
        };

        Ok(StoreStats {
            total_records: self.count_records()?,
            published: self.count(&by_status(RecordStatus::Published))?,
            drafts: self.count(&by_status(RecordStatus::Draft))?,
            full_quality: self.count(&by_quality(ContentQuality::Full))?,
            partial_quality: self.count(&by_quality(ContentQuality::Partial))?,
            low_quality: self.count(&by_quality(ContentQuality::Low))?,
            pending_groups: self.count(&by_group(GroupStatus::Pending))?,
            merged_groups: self.count(&by_group(GroupStatus::Merged))?,
            ignored_groups: self.count(&by_group(GroupStatus::Ignored))?,
            total_runs: self.count("SELECT COUNT(*) FROM crawl_runs")?,
        })
    }
}

fn to_json(list: &[String]) -> StorageResult<String> {
    serde_json::to_string(list).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn get_list(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn get_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn get_optional_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

fn get_enum<T>(
    row: &Row<'_>,
    idx: usize,
    parse: impl Fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, format!("unknown value '{}'", raw)))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<NewsRecord> {
    Ok(NewsRecord {
        id: Some(row.get(0)?),
        external_id: row.get(1)?,
        title: row.get(2)?,
        slug: row.get(3)?,
        summary: row.get(4)?,
        content: row.get(5)?,
        category: get_enum(row, 6, Category::from_db_string)?,
        priority: get_enum(row, 7, Priority::from_db_string)?,
        content_type: get_enum(row, 8, ContentType::from_db_string)?,
        language: get_enum(row, 9, Language::from_db_string)?,
        images: get_list(row, 10)?,
        videos: get_list(row, 11)?,
        tags: get_list(row, 12)?,
        keywords: get_list(row, 13)?,
        author: row.get(14)?,
        source: row.get(15)?,
        status: get_enum(row, 16, RecordStatus::from_db_string)?,
        content_quality: get_enum(row, 17, ContentQuality::from_db_string)?,
        published_at: get_optional_timestamp(row, 18)?,
        created_at: get_timestamp(row, 19)?,
        updated_at: get_timestamp(row, 20)?,
        views: row.get::<_, i64>(21)?.max(0) as u64,
    })
}

/// Maps a group row; members are loaded separately
fn row_to_group(row: &Row<'_>) -> rusqlite::Result<DuplicateGroup> {
    Ok(DuplicateGroup {
        id: row.get(0)?,
        similarity: row.get(1)?,
        members: Vec::new(),
        status: get_enum(row, 2, GroupStatus::from_db_string)?,
        keep_id: row.get(3)?,
        created_at: get_timestamp(row, 4)?,
        resolved_at: get_optional_timestamp(row, 5)?,
    })
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let errors: String = row.get(10)?;
    let errors: Vec<ErrorEntry> =
        serde_json::from_str(&errors).map_err(|e| conversion_error(10, e))?;

    Ok(RunRecord {
        id: row.get(0)?,
        trigger: get_enum(row, 1, TriggerKind::from_db_string)?,
        status: get_enum(row, 2, RunStatus::from_db_string)?,
        config_snapshot: row.get(3)?,
        config_hash: row.get(4)?,
        started_at: get_timestamp(row, 5)?,
        finished_at: get_optional_timestamp(row, 6)?,
        total_processed: row.get::<_, i64>(7)? as u64,
        success: row.get::<_, i64>(8)? as u64,
        duplicates: row.get::<_, i64>(9)? as u64,
        errors,
    })
}
