use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One item from the wire's search endpoint, before normalization
///
/// Codes are kept as the raw integers the wire sends; the normalizer owns
/// the mapping into canonical enums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWireItem {
    /// Wire identifier (e.g. `aa:text:20240101:12345`)
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Short lead sent with the search result
    #[serde(default, alias = "summary", alias = "spot")]
    pub brief: String,

    /// Full body markup, when the search result already carries it
    #[serde(default, alias = "content")]
    pub body: Option<String>,

    #[serde(default)]
    pub category: Option<i64>,

    #[serde(default)]
    pub priority: Option<i64>,

    #[serde(default, rename = "type")]
    pub item_type: Option<i64>,

    #[serde(default)]
    pub language: Option<i64>,

    /// Publish timestamp as sent by the wire
    #[serde(default)]
    pub date: Option<String>,

    /// Media references (photo/video ids or URLs)
    #[serde(default)]
    pub media: Vec<String>,
}

impl RawWireItem {
    /// Parses the wire timestamp
    ///
    /// Accepts RFC 3339 and the wire's legacy `YYYY-MM-DD HH:MM:SS` form
    /// (interpreted as UTC). Unparseable values yield `None`.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.date.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }

        ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}
