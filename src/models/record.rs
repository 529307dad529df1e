/// Canonical news record and its taxonomy enums
///
/// Every enum here has a stable string form used both in the database and in
/// the site's URLs, so the strings must never change once records exist.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical site category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    General,
    Sports,
    Economy,
    Health,
    Technology,
    Politics,
    Culture,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Self::General,
        Self::Sports,
        Self::Economy,
        Self::Health,
        Self::Technology,
        Self::Politics,
        Self::Culture,
    ];

    /// Converts the category to its canonical slug
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Sports => "sports",
            Self::Economy => "economy",
            Self::Health => "health",
            Self::Technology => "technology",
            Self::Politics => "politics",
            Self::Culture => "culture",
        }
    }

    /// Parses a category from its canonical slug
    pub fn from_db_string(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.to_db_string() == s)
    }

    /// Human readable label, used by the placeholder body
    pub fn label(&self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Sports => "Sports",
            Self::Economy => "Economy",
            Self::Health => "Health",
            Self::Technology => "Technology",
            Self::Politics => "Politics",
            Self::Culture => "Culture & Arts",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Editorial priority of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Urgent,
    High,
    Normal,
    Low,
}

impl Priority {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "urgent" => Some(Self::Urgent),
            "high" => Some(Self::High),
            "normal" => Some(Self::Normal),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Media kind of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Text,
    Photo,
    Video,
    Graphic,
}

impl ContentType {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Graphic => "graphic",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "photo" => Some(Self::Photo),
            "video" => Some(Self::Video),
            "graphic" => Some(Self::Graphic),
            _ => None,
        }
    }
}

/// Publication language (ISO 639-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Language {
    Tr,
    En,
    Ar,
    Ru,
    Ku,
    Fr,
    Es,
    Fa,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Self::Tr,
        Self::En,
        Self::Ar,
        Self::Ru,
        Self::Ku,
        Self::Fr,
        Self::Es,
        Self::Fa,
    ];

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Tr => "tr",
            Self::En => "en",
            Self::Ar => "ar",
            Self::Ru => "ru",
            Self::Ku => "ku",
            Self::Fr => "fr",
            Self::Es => "es",
            Self::Fa => "fa",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.to_db_string() == s)
    }
}

/// Publication status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordStatus {
    Draft,
    Published,
    Archived,
}

impl RecordStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// How the record's body text was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentQuality {
    /// Paragraphs taken from the structured body block
    Full,

    /// Loose text nodes scraped when the body block was too thin
    Partial,

    /// Placeholder synthesized from title, date and category
    Low,
}

impl ContentQuality {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Partial => "partial",
            Self::Low => "low",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "full" => Some(Self::Full),
            "partial" => Some(Self::Partial),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// The canonical, persisted form of a news article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    /// Store id; `None` until the record has been persisted
    pub id: Option<i64>,

    /// Wire identifier, when the record came from the wire
    pub external_id: Option<String>,

    pub title: String,
    pub slug: String,
    pub summary: String,
    pub content: String,
    pub category: Category,
    pub priority: Priority,
    pub content_type: ContentType,
    pub language: Language,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    pub author: Option<String>,
    pub source: String,
    pub status: RecordStatus,
    pub content_quality: ContentQuality,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub views: u64,
}

impl NewsRecord {
    /// Creates an unsaved draft record with empty body fields
    pub fn draft(title: impl Into<String>, source: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            external_id: None,
            title: title.into(),
            slug: String::new(),
            summary: String::new(),
            content: String::new(),
            category: Category::General,
            priority: Priority::Normal,
            content_type: ContentType::Text,
            language: Language::Tr,
            images: Vec::new(),
            videos: Vec::new(),
            tags: Vec::new(),
            keywords: Vec::new(),
            author: None,
            source: source.into(),
            status: RecordStatus::Draft,
            content_quality: ContentQuality::Full,
            published_at: None,
            created_at: now,
            updated_at: now,
            views: 0,
        }
    }

    /// Returns the first paragraph of the content (the story's lead)
    pub fn lead_paragraph(&self) -> &str {
        self.content
            .split("\n\n")
            .map(str::trim)
            .find(|p| !p.is_empty())
            .unwrap_or("")
    }
}
