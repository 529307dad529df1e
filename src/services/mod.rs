//! External collaborators called during a crawl cycle
//!
//! Both collaborators are optional. Their failures never fail an item: a
//! failed enhancement leaves the draft as normalized, a failed photo search
//! leaves it without images.

use crate::models::{Category, NewsRecord};
use async_trait::async_trait;

/// Boxed error returned by collaborators
pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// Fields proposed by an enhancement service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enhancement {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
}

/// Rewrites or annotates a draft record (e.g. an AI editing service)
#[async_trait]
pub trait ContentEnhancer: Send + Sync {
    async fn enhance(&self, draft: &NewsRecord) -> Result<Enhancement, ServiceError>;
}

/// Finds candidate images for a story that arrived without photos
#[async_trait]
pub trait PhotoSearch: Send + Sync {
    async fn search(
        &self,
        title: &str,
        keywords: &[String],
        category: Category,
    ) -> Result<Vec<String>, ServiceError>;
}

/// Applies an enhancement to a record without destroying existing data
///
/// Absent or blank fields keep the record's value. Tags and keywords are
/// unioned, existing entries first.
pub fn merge_enhancement(record: &mut NewsRecord, enhancement: Enhancement) {
    fn replace_if_present(target: &mut String, value: Option<String>) {
        if let Some(value) = value {
            let value = value.trim();
            if !value.is_empty() {
                *target = value.to_string();
            }
        }
    }

    fn union(target: &mut Vec<String>, extra: Vec<String>) {
        for item in extra {
            let item = item.trim();
            if !item.is_empty() && !target.iter().any(|t| t == item) {
                target.push(item.to_string());
            }
        }
    }

    replace_if_present(&mut record.title, enhancement.title);
    replace_if_present(&mut record.summary, enhancement.summary);
    replace_if_present(&mut record.content, enhancement.content);
    union(&mut record.tags, enhancement.tags);
    union(&mut record.keywords, enhancement.keywords);
}
