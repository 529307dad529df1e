//! Scheduler and mutual-exclusion tests

use crate::common::*;
use newswire_ingest::config::load_config;
use newswire_ingest::storage::{lock_storage, open_storage, TriggerKind};
use newswire_ingest::{CrawlerController, IngestError};
use std::io::Write;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

/// Mounts a search endpoint that answers slowly
async fn mount_slow_search(server: &MockServer, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/abone/search/"))
        .respond_with(
            search_response(vec![wire_item("aa:text:1", "Dam reservoir levels rise", 1)])
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Polls the controller until `done` holds or the timeout passes
async fn wait_until(
    controller: &CrawlerController,
    timeout: Duration,
    done: impl Fn(&newswire_ingest::CrawlerStatus) -> bool,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if done(&controller.get_status()) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_manual_trigger_rejected_while_cycle_running() {
    let server = MockServer::start().await;
    mount_slow_search(&server, Duration::from_millis(600)).await;

    let controller = controller(&server, memory_storage(), crawl_config("interval-minutes = 15\ncategories = [1]"));

    let background = controller.clone();
    let first = tokio::spawn(async move { background.manual_trigger().await });

    assert!(wait_until(&controller, Duration::from_secs(5), |s| s.running).await);
    assert!(matches!(
        controller.manual_trigger().await,
        Err(IngestError::Busy)
    ));

    let report = first.await.unwrap().unwrap();
    assert_eq!(report.stats.success, 1);
    assert!(!controller.get_status().running);

    // The rejected trigger left no trace
    assert_eq!(controller.get_status().totals.cycles, 1);
}

#[tokio::test]
async fn test_start_while_enabled_is_rejected() {
    let server = MockServer::start().await;
    let controller = controller(&server, memory_storage(), crawl_config("interval-minutes = 15\ncategories = [1]"));

    let crawl = crawl_config("interval-minutes = 15\ncategories = [1]\nrun-immediately = false");
    controller.start(crawl.clone()).unwrap();
    let next_run = controller.get_status().next_run;

    assert!(matches!(
        controller.start(crawl),
        Err(IngestError::AlreadyRunning)
    ));
    assert_eq!(controller.get_status().next_run, next_run);

    controller.stop();
    controller.join().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduled_tick_runs_immediately() {
    let server = MockServer::start().await;
    mount_slow_search(&server, Duration::from_millis(0)).await;

    let storage = memory_storage();
    let controller = controller(&server, storage.clone(), crawl_config("interval-minutes = 15\ncategories = [1]"));
    controller
        .start(crawl_config("interval-minutes = 30\ncategories = [1]"))
        .unwrap();

    assert!(wait_until(&controller, Duration::from_secs(5), |s| s.totals.cycles == 1).await);

    let status = controller.get_status();
    assert!(status.enabled);
    assert_eq!(status.last_report.as_ref().map(|r| r.trigger), Some(TriggerKind::Scheduled));
    let next_run = status.next_run.unwrap();
    assert!(next_run > chrono::Utc::now() + chrono::Duration::minutes(29));

    controller.stop();
    controller.join().await;
    assert!(!controller.get_status().enabled);

    let run = lock_storage(&storage).unwrap().get_latest_run().unwrap().unwrap();
    assert_eq!(run.trigger, TriggerKind::Scheduled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduled_tick_dropped_during_manual_cycle() {
    let server = MockServer::start().await;
    mount_slow_search(&server, Duration::from_millis(1000)).await;

    let storage = memory_storage();
    let controller = controller(&server, storage.clone(), crawl_config("interval-minutes = 15\ncategories = [1]"));

    let background = controller.clone();
    let manual = tokio::spawn(async move { background.manual_trigger().await });
    assert!(wait_until(&controller, Duration::from_secs(5), |s| s.running).await);

    // run-immediately makes the first tick due at once, while the manual cycle holds RUNNING
    let started = chrono::Utc::now();
    controller
        .start(crawl_config("interval-minutes = 30\ncategories = [1]"))
        .unwrap();
    assert!(
        wait_until(&controller, Duration::from_secs(5), |s| {
            s.next_run
                .map_or(false, |t| t > started + chrono::Duration::minutes(29))
        })
        .await
    );
    assert!(controller.get_status().running);

    let report = manual.await.unwrap().unwrap();
    assert_eq!(report.trigger, TriggerKind::Manual);

    // The dropped tick is not replayed once the manual cycle ends
    tokio::time::sleep(Duration::from_millis(200)).await;
    let status = controller.get_status();
    assert_eq!(status.totals.cycles, 1);
    assert_eq!(status.last_report.as_ref().map(|r| r.trigger), Some(TriggerKind::Manual));

    controller.stop();
    controller.join().await;

    let stats = lock_storage(&storage).unwrap().get_store_stats().unwrap();
    assert_eq!(stats.total_runs, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_update_interval_mid_cycle_moves_only_next_run() {
    let server = MockServer::start().await;
    mount_slow_search(&server, Duration::from_millis(600)).await;

    let controller = controller(&server, memory_storage(), crawl_config("interval-minutes = 15\ncategories = [1]"));
    controller
        .start(crawl_config("interval-minutes = 60\ncategories = [1]"))
        .unwrap();

    assert!(wait_until(&controller, Duration::from_secs(5), |s| s.running).await);

    let before = chrono::Utc::now();
    controller.update_interval(5).unwrap();
    let next_run = controller.get_status().next_run.unwrap();
    assert!(next_run >= before + chrono::Duration::minutes(5));
    assert!(next_run < before + chrono::Duration::minutes(6));

    // The cycle in flight completes normally
    assert!(wait_until(&controller, Duration::from_secs(5), |s| s.totals.cycles == 1).await);
    let status = controller.get_status();
    assert_eq!(status.interval_minutes, 5);
    assert_eq!(status.last_report.unwrap().stats.success, 1);
    assert_eq!(status.next_run, Some(next_run));

    controller.stop();
    controller.join().await;
}

#[tokio::test]
async fn test_controller_from_config_file() {
    let server = MockServer::start().await;
    mount_slow_search(&server, Duration::from_millis(0)).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("news.db");
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[wire]
base-url = "{}"
username = "user"
password = "secret"

[user-agent]
crawler-name = "TestIngest"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[crawl]
interval-minutes = 10
categories = [1]
auto-publish = true

[rate-limit]
search-interval-ms = 0
document-interval-ms = 0
retry-delay-ms = 10

[output]
database-path = "{}"
"#,
        server.uri(),
        db_path.display()
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    let storage = open_storage(&db_path).unwrap();
    let controller = CrawlerController::from_config(&config, storage.clone()).unwrap();

    let report = controller.manual_trigger().await.unwrap();
    assert_eq!(report.stats.success, 1);

    let stats = lock_storage(&storage).unwrap().get_store_stats().unwrap();
    assert_eq!(stats.total_records, 1);
    assert_eq!(stats.published, 1);
    assert_eq!(stats.total_runs, 1);
}
