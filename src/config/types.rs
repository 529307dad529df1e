use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main configuration structure for Newswire-Ingest
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub wire: WireConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub crawl: CrawlConfig,
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub duplicates: DuplicateConfig,
    pub output: OutputConfig,
}

/// Wire API connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WireConfig {
    /// Base URL of the wire API (e.g. "https://api.aa.com.tr")
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Basic-auth username
    pub username: String,

    /// Basic-auth password
    #[serde(skip_serializing)]
    pub password: String,

    /// Document format requested from the document endpoint
    #[serde(rename = "document-format", default = "default_document_format")]
    pub document_format: String,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserAgentConfig {
    /// Name of the ingester
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the ingester
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the ingester
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for ingester-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// How an incoming item is saved when an identity duplicate already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveStrategy {
    /// Keep the stored record, count the item as a duplicate
    #[default]
    Skip,

    /// Replace the stored record's mutable fields
    OverwriteAlways,

    /// Replace only when the incoming item was published later
    OverwriteIfNewer,
}

/// Crawl cycle behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlConfig {
    /// Minutes between scheduled cycles
    #[serde(rename = "interval-minutes")]
    pub interval_minutes: u32,

    /// Wire category codes visited each cycle, in order
    pub categories: Vec<i64>,

    /// Wire language codes enabled per category code; categories without an
    /// entry use `default-languages`
    #[serde(default)]
    pub languages: BTreeMap<String, Vec<i64>>,

    /// Language codes for categories without an explicit entry
    #[serde(rename = "default-languages", default = "default_languages")]
    pub default_languages: Vec<i64>,

    /// Publish records immediately instead of saving them as drafts
    #[serde(rename = "auto-publish", default)]
    pub auto_publish: bool,

    /// Pass drafts through the enhancement collaborator
    #[serde(rename = "enable-ai", default)]
    pub enable_ai: bool,

    /// Check the store for an existing record before saving
    #[serde(rename = "enable-duplicate-check", default = "default_true")]
    pub enable_duplicate_check: bool,

    /// Ask the photo collaborator when extraction found no photos
    #[serde(rename = "enable-photo-search", default)]
    pub enable_photo_search: bool,

    /// Items requested per search call
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Save strategy for identity duplicates
    #[serde(rename = "save-strategy", default)]
    pub save_strategy: SaveStrategy,

    /// Fire the first cycle as soon as the scheduler starts
    #[serde(rename = "run-immediately", default = "default_true")]
    pub run_immediately: bool,

    /// Source label stamped on every record
    #[serde(default = "default_source")]
    pub source: String,
}

impl CrawlConfig {
    /// Returns the language codes enabled for a category
    pub fn languages_for(&self, category: i64) -> &[i64] {
        self.languages
            .get(&category.to_string())
            .map(Vec::as_slice)
            .unwrap_or(&self.default_languages)
    }
}

/// Wire API pacing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Minimum time between search requests (milliseconds)
    #[serde(rename = "search-interval-ms", default = "default_interval_ms")]
    pub search_interval_ms: u64,

    /// Minimum time between document requests (milliseconds)
    #[serde(rename = "document-interval-ms", default = "default_interval_ms")]
    pub document_interval_ms: u64,

    /// Upper bound on items requested per search call
    #[serde(rename = "max-items-per-request", default = "default_max_items")]
    pub max_items_per_request: u32,

    /// Attempts per request before a transient failure is reported
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between attempts (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            search_interval_ms: default_interval_ms(),
            document_interval_ms: default_interval_ms(),
            max_items_per_request: default_max_items(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Similarity scan settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DuplicateConfig {
    /// Minimum pairwise similarity (0-100) for two records to be grouped
    #[serde(default = "default_threshold")]
    pub threshold: u8,

    /// Maximum number of most recent records read by one scan
    #[serde(rename = "scan-limit", default = "default_scan_limit")]
    pub scan_limit: usize,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            scan_limit: default_scan_limit(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Capacity of the recent-errors ring buffer shown in status
    #[serde(rename = "recent-errors", default = "default_recent_errors")]
    pub recent_errors: usize,
}

fn default_document_format() -> String {
    "newsml29".to_string()
}

fn default_languages() -> Vec<i64> {
    vec![1]
}

fn default_true() -> bool {
    true
}

fn default_batch_size() -> u32 {
    20
}

fn default_source() -> String {
    "AA".to_string()
}

fn default_interval_ms() -> u64 {
    500
}

fn default_max_items() -> u32 {
    100
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    5000
}

fn default_threshold() -> u8 {
    70
}

fn default_scan_limit() -> usize {
    500
}

fn default_recent_errors() -> usize {
    50
}
