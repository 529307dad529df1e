//! End-to-end cycle tests against a mock wire

use crate::common::*;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use newswire_ingest::crawler::{run_cycle, CycleStats};
use newswire_ingest::models::{Category, ContentQuality, DuplicateGroup, GroupStatus, NewsRecord};
use newswire_ingest::services::{ContentEnhancer, Enhancement, PhotoSearch, ServiceError};
use newswire_ingest::storage::{
    lock_storage, RunRecord, SharedStorage, SqliteStorage, Storage, StorageError, StorageResult,
    StoreStats, TriggerKind,
};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_search(server: &MockServer, category: i64, items: Vec<serde_json::Value>) {
    Mock::given(method("POST"))
        .and(path("/abone/search/"))
        .and(body_string_contains(format!("filter_category={}", category).as_str()))
        .respond_with(search_response(items))
        .mount(server)
        .await;
}

fn three_items() -> Vec<serde_json::Value> {
    vec![
        wire_item("aa:text:1", "Bridge opens to traffic", 1),
        wire_item("aa:text:2", "Harbour dredging resumes", 1),
        wire_item("aa:text:3", "New ferry line announced", 1),
    ]
}

#[tokio::test]
async fn test_three_items_one_already_stored() {
    let server = MockServer::start().await;
    mount_search(&server, 1, three_items()).await;

    let storage = memory_storage();
    {
        let mut existing = NewsRecord::draft("Harbour dredging resumes", "AA");
        existing.external_id = Some("aa:text:2".to_string());
        lock_storage(&storage).unwrap().upsert_record(&existing).unwrap();
    }

    let controller = controller(&server, storage.clone(), crawl_config("interval-minutes = 15\ncategories = [1]"));
    let report = controller.manual_trigger().await.unwrap();

    assert_eq!(report.trigger, TriggerKind::Manual);
    assert_eq!(report.stats.total_processed, 3);
    assert_eq!(report.stats.success, 2);
    assert_eq!(report.stats.duplicates, 1);
    assert_eq!(report.stats.error_count(), 0);

    let guard = lock_storage(&storage).unwrap();
    assert_eq!(guard.count_records().unwrap(), 3);

    let run = guard.get_latest_run().unwrap().unwrap();
    assert_eq!(run.id, report.run_id);
    assert_eq!(run.total_processed, 3);
    assert_eq!(run.success, 2);
    assert_eq!(run.duplicates, 1);
    assert!(run.finished_at.is_some());
    assert!(run.config_snapshot.contains("\"interval-minutes\":15"));

    let stored = guard.find_by_external_id("aa:text:1").unwrap().unwrap();
    assert_eq!(stored.slug, "bridge-opens-to-traffic");
    assert_eq!(stored.content_quality, ContentQuality::Full);
    assert!(stored.content.starts_with("Bridge opens to traffic was reported on Monday morning."));
}

#[tokio::test]
async fn test_second_identical_cycle_inserts_nothing() {
    let server = MockServer::start().await;
    mount_search(&server, 1, three_items()).await;

    let storage = memory_storage();
    let controller = controller(&server, storage.clone(), crawl_config("interval-minutes = 15\ncategories = [1]"));

    let first = controller.manual_trigger().await.unwrap();
    assert_eq!(first.stats.success, 3);

    let second = controller.manual_trigger().await.unwrap();
    assert_eq!(second.stats.total_processed, 3);
    assert_eq!(second.stats.success, 0);
    assert_eq!(second.stats.duplicates, 3);

    assert_eq!(lock_storage(&storage).unwrap().count_records().unwrap(), 3);

    let status = controller.get_status();
    assert_eq!(status.totals.cycles, 2);
    assert_eq!(status.totals.success, 3);
    assert_eq!(status.totals.duplicates, 3);
}

#[tokio::test]
async fn test_document_fetched_when_body_missing() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        4,
        vec![serde_json::json!({
            "id": "aa:text:9",
            "title": "Hospital wing opens",
            "category": 4,
            "date": "2024-03-02 08:00:00",
        })],
    )
    .await;

    let markup = format!(
        r#"<newsMessage>
            <remoteContent href="https://cdn.example.com/wing.jpg" contenttype="image/jpeg"></remoteContent>
            {}
        </newsMessage>"#,
        story_markup("The new hospital wing opened with two hundred beds.")
    );
    Mock::given(method("GET"))
        .and(path("/abone/document/aa:text:9/newsml29"))
        .respond_with(ResponseTemplate::new(200).set_body_string(markup))
        .expect(1)
        .mount(&server)
        .await;

    let storage = memory_storage();
    let controller = controller(&server, storage.clone(), crawl_config("interval-minutes = 15\ncategories = [4]"));
    let report = controller.manual_trigger().await.unwrap();
    assert_eq!(report.stats.success, 1);

    let record = lock_storage(&storage)
        .unwrap()
        .find_by_external_id("aa:text:9")
        .unwrap()
        .unwrap();
    assert_eq!(record.category, Category::Health);
    assert_eq!(record.images, vec!["https://cdn.example.com/wing.jpg"]);
    assert_eq!(
        record.summary,
        "The new hospital wing opened with two hundred beds."
    );
    assert_eq!(
        record.published_at,
        Some(Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap())
    );
}

#[tokio::test]
async fn test_document_failure_counts_as_item_error() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        1,
        vec![
            serde_json::json!({ "id": "aa:text:404", "title": "Missing body" }),
            wire_item("aa:text:5", "Stadium renovation completed", 1),
        ],
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/abone/document/aa:text:404/newsml29"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let storage = memory_storage();
    let controller = controller(&server, storage.clone(), crawl_config("interval-minutes = 15\ncategories = [1]"));
    let report = controller.manual_trigger().await.unwrap();

    assert_eq!(report.stats.total_processed, 2);
    assert_eq!(report.stats.success, 1);
    assert_eq!(report.stats.error_count(), 1);
    assert_eq!(
        report.stats.errors[0].external_id.as_deref(),
        Some("aa:text:404")
    );
    assert_eq!(lock_storage(&storage).unwrap().count_records().unwrap(), 1);
}

#[tokio::test]
async fn test_failed_category_does_not_abort_cycle() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/abone/search/"))
        .and(body_string_contains("filter_category=1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;
    mount_search(&server, 2, vec![wire_item("aa:text:20", "Markets close higher", 2)]).await;

    let storage = memory_storage();
    let controller = controller(&server, storage, crawl_config("interval-minutes = 15\ncategories = [1, 2]"));
    let report = controller.manual_trigger().await.unwrap();

    assert_eq!(report.stats.total_processed, 1);
    assert_eq!(report.stats.success, 1);
    assert_eq!(report.stats.error_count(), 1);

    let error = &report.stats.errors[0];
    assert_eq!(error.category, Some(1));
    assert!(error.external_id.is_none());

    let status = controller.get_status();
    assert_eq!(status.recent_errors.len(), 1);
    assert_eq!(status.totals.errors, 1);
}

#[tokio::test]
async fn test_search_retry_recovers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/abone/search/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_search(&server, 1, vec![wire_item("aa:text:30", "Rail strike ends", 1)]).await;

    let storage = memory_storage();
    let controller = controller(&server, storage, crawl_config("interval-minutes = 15\ncategories = [1]"));
    let report = controller.manual_trigger().await.unwrap();

    assert_eq!(report.stats.success, 1);
    assert_eq!(report.stats.error_count(), 0);
}

#[tokio::test]
async fn test_same_item_in_two_languages_counted_once() {
    let server = MockServer::start().await;
    mount_search(&server, 1, vec![wire_item("aa:text:40", "Summit opens in capital", 1)]).await;

    let storage = memory_storage();
    let crawl = crawl_config("interval-minutes = 15\ncategories = [1]\n[languages]\n1 = [1, 2]");
    let controller = controller(&server, storage.clone(), crawl);
    let report = controller.manual_trigger().await.unwrap();

    assert_eq!(report.stats.total_processed, 2);
    assert_eq!(report.stats.success, 1);
    assert_eq!(report.stats.duplicates, 1);
    assert_eq!(lock_storage(&storage).unwrap().count_records().unwrap(), 1);
}

#[tokio::test]
async fn test_overwrite_if_newer_replaces_older_copy() {
    let server = MockServer::start().await;
    let mut item = wire_item("aa:text:50", "Budget vote delayed again", 1);
    item["date"] = serde_json::json!("2024-03-05T12:00:00Z");
    mount_search(&server, 1, vec![item]).await;

    let storage = memory_storage();
    let existing_id = {
        let mut existing = NewsRecord::draft("Budget vote delayed", "AA");
        existing.external_id = Some("aa:text:50".to_string());
        existing.published_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        existing.views = 42;
        lock_storage(&storage).unwrap().upsert_record(&existing).unwrap()
    };

    let crawl = crawl_config(
        "interval-minutes = 15\ncategories = [1]\nsave-strategy = \"overwrite-if-newer\"",
    );
    let controller = controller(&server, storage.clone(), crawl);
    let report = controller.manual_trigger().await.unwrap();
    assert_eq!(report.stats.success, 1);
    assert_eq!(report.stats.duplicates, 0);

    let guard = lock_storage(&storage).unwrap();
    assert_eq!(guard.count_records().unwrap(), 1);
    let record = guard.get_record(existing_id).unwrap().unwrap();
    assert_eq!(record.title, "Budget vote delayed again");
    assert_eq!(record.views, 42);
}

struct FailingEnhancer;

#[async_trait]
impl ContentEnhancer for FailingEnhancer {
    async fn enhance(&self, _draft: &NewsRecord) -> Result<Enhancement, ServiceError> {
        Err("enhancement service unavailable".into())
    }
}

struct RetitlingEnhancer;

#[async_trait]
impl ContentEnhancer for RetitlingEnhancer {
    async fn enhance(&self, draft: &NewsRecord) -> Result<Enhancement, ServiceError> {
        Ok(Enhancement {
            title: Some(format!("{} (updated)", draft.title)),
            tags: vec!["transport".to_string()],
            ..Enhancement::default()
        })
    }
}

struct FixedPhotos;

#[async_trait]
impl PhotoSearch for FixedPhotos {
    async fn search(
        &self,
        _title: &str,
        _keywords: &[String],
        _category: Category,
    ) -> Result<Vec<String>, ServiceError> {
        Ok(vec!["https://photos.example.com/stock.jpg".to_string()])
    }
}

#[tokio::test]
async fn test_enhancer_failure_does_not_fail_item() {
    let server = MockServer::start().await;
    mount_search(&server, 1, vec![wire_item("aa:text:60", "Tunnel works begin", 1)]).await;

    let storage = memory_storage();
    let pipeline = pipeline(&server, storage.clone()).with_enhancer(Arc::new(FailingEnhancer));
    let crawl = crawl_config("interval-minutes = 15\ncategories = [1]\nenable-ai = true");
    let report = run_cycle(&pipeline, &crawl, TriggerKind::Manual).await.unwrap();

    assert_eq!(report.stats.success, 1);
    assert_eq!(report.stats.error_count(), 0);

    let record = lock_storage(&storage)
        .unwrap()
        .find_by_external_id("aa:text:60")
        .unwrap()
        .unwrap();
    assert_eq!(record.title, "Tunnel works begin");
}

#[tokio::test]
async fn test_enhancement_and_photo_search_applied() {
    let server = MockServer::start().await;
    mount_search(&server, 1, vec![wire_item("aa:text:61", "Airport expansion approved", 1)]).await;

    let storage = memory_storage();
    let pipeline = pipeline(&server, storage.clone())
        .with_enhancer(Arc::new(RetitlingEnhancer))
        .with_photo_search(Arc::new(FixedPhotos));
    let crawl = crawl_config(
        "interval-minutes = 15\ncategories = [1]\nenable-ai = true\nenable-photo-search = true",
    );
    run_cycle(&pipeline, &crawl, TriggerKind::Manual).await.unwrap();

    let record = lock_storage(&storage)
        .unwrap()
        .find_by_external_id("aa:text:61")
        .unwrap()
        .unwrap();
    assert_eq!(record.title, "Airport expansion approved (updated)");
    assert_eq!(record.slug, "airport-expansion-approved-updated");
    assert_eq!(record.tags, vec!["transport"]);
    assert_eq!(record.images, vec!["https://photos.example.com/stock.jpg"]);
}

#[tokio::test]
async fn test_untagged_item_with_spaced_title_stored_once() {
    let server = MockServer::start().await;
    mount_search(&server, 1, vec![wire_item("", "Bridge  opens to\ttraffic ", 1)]).await;

    let storage = memory_storage();
    let controller = controller(&server, storage.clone(), crawl_config("interval-minutes = 15\ncategories = [1]"));

    let first = controller.manual_trigger().await.unwrap();
    assert_eq!(first.stats.success, 1);

    let second = controller.manual_trigger().await.unwrap();
    assert_eq!(second.stats.success, 0);
    assert_eq!(second.stats.duplicates, 1);

    let guard = lock_storage(&storage).unwrap();
    assert_eq!(guard.count_records().unwrap(), 1);
    let stored = guard
        .find_by_title_source("Bridge opens to traffic", "AA")
        .unwrap()
        .unwrap();
    assert!(stored.external_id.is_none());
}

/// SQLite store whose first record writes fail
struct FlakyStorage {
    inner: SqliteStorage,
    failures_left: usize,
}

impl FlakyStorage {
    fn shared(failures: usize) -> SharedStorage {
        Arc::new(Mutex::new(FlakyStorage {
            inner: SqliteStorage::new_in_memory().unwrap(),
            failures_left: failures,
        }))
    }
}

impl Storage for FlakyStorage {
    fn upsert_record(&mut self, record: &NewsRecord) -> StorageResult<i64> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(StorageError::Database("database is locked".to_string()));
        }
        self.inner.upsert_record(record)
    }

    fn get_record(&self, id: i64) -> StorageResult<Option<NewsRecord>> {
        self.inner.get_record(id)
    }

    fn find_by_external_id(&self, external_id: &str) -> StorageResult<Option<NewsRecord>> {
        self.inner.find_by_external_id(external_id)
    }

    fn find_by_title_source(&self, title: &str, source: &str) -> StorageResult<Option<NewsRecord>> {
        self.inner.find_by_title_source(title, source)
    }

    fn delete_record(&mut self, id: i64) -> StorageResult<bool> {
        self.inner.delete_record(id)
    }

    fn list_records(&self, limit: usize) -> StorageResult<Vec<NewsRecord>> {
        self.inner.list_records(limit)
    }

    fn count_records(&self) -> StorageResult<u64> {
        self.inner.count_records()
    }

    fn create_group(&mut self, similarity: u8, members: &[i64]) -> StorageResult<i64> {
        self.inner.create_group(similarity, members)
    }

    fn get_group(&self, id: i64) -> StorageResult<Option<DuplicateGroup>> {
        self.inner.get_group(id)
    }

    fn list_groups(&self, status: Option<GroupStatus>) -> StorageResult<Vec<DuplicateGroup>> {
        self.inner.list_groups(status)
    }

    fn set_group_status(
        &mut self,
        id: i64,
        status: GroupStatus,
        keep_id: Option<i64>,
    ) -> StorageResult<()> {
        self.inner.set_group_status(id, status, keep_id)
    }

    fn merge_group(
        &mut self,
        group_id: i64,
        keep_id: i64,
        remove_ids: &[i64],
    ) -> StorageResult<usize> {
        self.inner.merge_group(group_id, keep_id, remove_ids)
    }

    fn clear_pending_groups(&mut self) -> StorageResult<usize> {
        self.inner.clear_pending_groups()
    }

    fn create_run(
        &mut self,
        trigger: TriggerKind,
        config_snapshot: &str,
        config_hash: &str,
    ) -> StorageResult<i64> {
        self.inner.create_run(trigger, config_snapshot, config_hash)
    }

    fn complete_run(&mut self, run_id: i64, stats: &CycleStats) -> StorageResult<()> {
        self.inner.complete_run(run_id, stats)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.inner.get_run(run_id)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        self.inner.get_latest_run()
    }

    fn get_store_stats(&self) -> StorageResult<StoreStats> {
        self.inner.get_store_stats()
    }
}

#[tokio::test]
async fn test_persist_retried_once_after_write_failure() {
    let server = MockServer::start().await;
    mount_search(&server, 1, vec![wire_item("aa:text:70", "Dam inspection finished", 1)]).await;

    let storage = FlakyStorage::shared(1);
    let pipeline = pipeline(&server, storage.clone());
    let crawl = crawl_config("interval-minutes = 15\ncategories = [1]");
    let report = run_cycle(&pipeline, &crawl, TriggerKind::Manual).await.unwrap();

    assert_eq!(report.stats.success, 1);
    assert_eq!(report.stats.error_count(), 0);
    assert!(lock_storage(&storage)
        .unwrap()
        .find_by_external_id("aa:text:70")
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_persist_failing_twice_is_item_error() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        1,
        vec![
            wire_item("aa:text:71", "Dam inspection finished", 1),
            wire_item("aa:text:72", "Reservoir levels recover", 1),
        ],
    )
    .await;

    let storage = FlakyStorage::shared(2);
    let pipeline = pipeline(&server, storage.clone());
    let crawl = crawl_config("interval-minutes = 15\ncategories = [1]");
    let report = run_cycle(&pipeline, &crawl, TriggerKind::Manual).await.unwrap();

    assert_eq!(report.stats.total_processed, 2);
    assert_eq!(report.stats.success, 1);
    assert_eq!(report.stats.error_count(), 1);

    let error = &report.stats.errors[0];
    assert_eq!(error.external_id.as_deref(), Some("aa:text:71"));
    assert!(error.message.starts_with("Persistence failed"));

    let guard = lock_storage(&storage).unwrap();
    assert!(guard.find_by_external_id("aa:text:71").unwrap().is_none());
    assert!(guard.find_by_external_id("aa:text:72").unwrap().is_some());
    assert_eq!(guard.get_latest_run().unwrap().unwrap().errors.len(), 1);
}
