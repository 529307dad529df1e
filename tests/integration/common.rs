//! Shared fixtures for the integration tests

use newswire_ingest::config::{CrawlConfig, RateLimitConfig, UserAgentConfig, WireConfig};
use newswire_ingest::crawler::{CrawlerController, Pipeline};
use newswire_ingest::storage::{SharedStorage, SqliteStorage};
use newswire_ingest::wire::WireClient;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use wiremock::{MockServer, ResponseTemplate};

pub fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestIngest".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

pub fn wire_config(base_url: &str) -> WireConfig {
    WireConfig {
        base_url: base_url.to_string(),
        username: "user".to_string(),
        password: "secret".to_string(),
        document_format: "newsml29".to_string(),
    }
}

/// Pacing fast enough for tests; two attempts per request
pub fn rate_limit() -> RateLimitConfig {
    RateLimitConfig {
        search_interval_ms: 0,
        document_interval_ms: 0,
        max_items_per_request: 100,
        max_retries: 2,
        retry_delay_ms: 10,
    }
}

/// Parses a `[crawl]` section body
pub fn crawl_config(toml_body: &str) -> CrawlConfig {
    toml::from_str(toml_body).expect("valid crawl config")
}

pub fn memory_storage() -> SharedStorage {
    Arc::new(Mutex::new(
        SqliteStorage::new_in_memory().expect("in-memory store"),
    ))
}

pub fn pipeline(server: &MockServer, storage: SharedStorage) -> Pipeline {
    let client = WireClient::new(&wire_config(&server.uri()), &user_agent(), &rate_limit())
        .expect("wire client");
    Pipeline::new(client, storage)
}

pub fn controller(server: &MockServer, storage: SharedStorage, crawl: CrawlConfig) -> CrawlerController {
    CrawlerController::new(pipeline(server, storage), crawl, 20)
}

/// Story markup whose body clears the full-quality threshold
pub fn story_markup(lead: &str) -> String {
    format!(
        "<nitf><body><body.content><p>{}</p><p>{}</p></body.content></body></nitf>",
        lead,
        "The ministry said more details would follow in the coming days as officials review the figures."
    )
}

/// One search result item carrying its own body
pub fn wire_item(id: &str, title: &str, category: i64) -> Value {
    json!({
        "id": id,
        "title": title,
        "brief": format!("{} brief", title),
        "body": story_markup(&format!("{} was reported on Monday morning.", title)),
        "category": category,
        "priority": 3,
        "type": 1,
        "language": 1,
        "date": "2024-03-01T09:30:00Z",
    })
}

/// A successful search envelope
pub fn search_response(items: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "response": { "success": true, "status": 200 },
        "data": { "result": items },
    }))
}
