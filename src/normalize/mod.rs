//! Wire item normalization
//!
//! Maps the wire's integer taxonomy onto the canonical enums and assembles a
//! draft [`NewsRecord`] from a wire item plus its extracted content.
//!
//! # Normalization Steps
//!
//! 1. Collapse whitespace in the title and derive the slug
//! 2. Map category, priority, type and language codes (unknown codes use defaults)
//! 3. Take body, summary and quality from the extraction output
//! 4. Route media references: videos for video items, otherwise absolute
//!    URLs are appended to the extracted photos
//! 5. Stamp source, status and publish time from the crawl configuration

mod slug;
mod taxonomy;

pub use slug::{fold_text, slugify, MAX_SLUG_CHARS};
pub use taxonomy::{map_category, map_content_type, map_language, map_priority};

use crate::config::CrawlConfig;
use crate::extract::{
    collapse_whitespace, truncate_with_ellipsis, ExtractedContent, PRIMARY_SUMMARY_MAX_CHARS,
};
use crate::models::{ContentQuality, ContentType, NewsRecord, RawWireItem, RecordStatus};

/// Title as stored on a record
pub fn normalize_title(raw: &str) -> String {
    collapse_whitespace(raw)
}

/// Wire id as stored on a record; a blank id means the item has none
pub fn normalize_external_id(raw: &str) -> Option<String> {
    Some(raw.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Builds an unsaved record from a wire item and its extraction output
///
/// # Examples
///
/// ```
/// use newswire_ingest::extract::ExtractedContent;
/// use newswire_ingest::models::{Category, ContentQuality, RawWireItem};
/// use newswire_ingest::normalize::normalize_item;
///
/// let item: RawWireItem = serde_json::from_str(
///     r#"{"id": "aa:text:1", "title": "Vaccine  rollout begins", "category": 4}"#,
/// ).unwrap();
/// let extracted = ExtractedContent {
///     content: "Body".to_string(),
///     summary: "Body".to_string(),
///     photos: vec![],
///     quality: ContentQuality::Full,
/// };
/// let crawl: newswire_ingest::config::CrawlConfig = toml::from_str("interval-minutes = 5\ncategories = [4]").unwrap();
///
/// let record = normalize_item(&item, extracted, &crawl);
/// assert_eq!(record.title, "Vaccine rollout begins");
/// assert_eq!(record.slug, "vaccine-rollout-begins");
/// assert_eq!(record.category, Category::Health);
/// ```
pub fn normalize_item(
    item: &RawWireItem,
    extracted: ExtractedContent,
    crawl: &CrawlConfig,
) -> NewsRecord {
    let mut record = NewsRecord::draft(normalize_title(&item.title), crawl.source.clone());

    record.external_id = normalize_external_id(&item.id);
    record.slug = slugify(&record.title);
    record.category = map_category(item.category);
    record.priority = map_priority(item.priority);
    record.content_type = map_content_type(item.item_type);
    record.language = map_language(item.language);
    record.published_at = item.published_at();
    record.status = if crawl.auto_publish {
        RecordStatus::Published
    } else {
        RecordStatus::Draft
    };

    // A placeholder summary is just the title; the wire's own lead is better
    let brief = collapse_whitespace(&item.brief);
    record.summary = if extracted.quality == ContentQuality::Low && !brief.is_empty() {
        truncate_with_ellipsis(&brief, PRIMARY_SUMMARY_MAX_CHARS)
    } else {
        extracted.summary
    };
    record.content = extracted.content;
    record.content_quality = extracted.quality;
    record.images = extracted.photos;

    let media = item.media.iter().map(|m| m.trim()).filter(|m| !m.is_empty());
    if record.content_type == ContentType::Video {
        for reference in media {
            push_unique(&mut record.videos, reference);
        }
    } else {
        for reference in media.filter(|m| is_absolute_http(m)) {
            push_unique(&mut record.images, reference);
        }
    }

    record
}

fn is_absolute_http(reference: &str) -> bool {
    match url::Url::parse(reference) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
