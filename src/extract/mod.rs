//! Content extraction from wire markup
//!
//! Turns the wire's semi-structured document markup into plain full text, a
//! short summary and the list of referenced photos. Extraction runs a fixed
//! chain of tiers and never fails:
//!
//! 1. **Primary**: paragraphs of the structured body block, joined with blank
//!    lines. Summary is the first one or two sentences of the first
//!    paragraph, at most 200 characters.
//! 2. **Fallback** (primary content under 100 characters): every text node of
//!    20+ characters that does not look like metadata. Summary is the first
//!    sentence of the first such node, at most 150 characters. When the scan
//!    yields under 50 characters, thin primary text of 50+ characters is kept
//!    instead, with its summary cut to the same 150 characters.
//! 3. **Placeholder** (still under 50 characters): a templated body built
//!    from title, date and category, flagged [`ContentQuality::Low`].

mod markup;
mod text;

pub use text::{collapse_whitespace, split_sentences, truncate_with_ellipsis};

use crate::models::{Category, ContentQuality};
use chrono::{DateTime, Utc};
use scraper::Html;

/// Primary content shorter than this falls through to the fallback tier
pub const PRIMARY_MIN_CHARS: usize = 100;

/// Content shorter than this after the fallback tier is replaced by a placeholder
pub const FALLBACK_MIN_CHARS: usize = 50;

/// Text nodes shorter than this are ignored by the fallback tier
pub const TEXT_NODE_MIN_CHARS: usize = 20;

/// Sentence fragments must be longer than this to count toward a summary
pub const SENTENCE_MIN_CHARS: usize = 10;

pub const PRIMARY_SUMMARY_MAX_CHARS: usize = 200;
pub const FALLBACK_SUMMARY_MAX_CHARS: usize = 150;

/// Item facts used to build a placeholder body
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    pub title: &'a str,
    pub published_at: Option<DateTime<Utc>>,
    pub category: Category,
}

/// Result of running the extraction chain
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContent {
    /// Plain text, paragraphs separated by blank lines; never empty
    pub content: String,

    pub summary: String,

    /// Photo URLs in document order, first occurrence kept
    pub photos: Vec<String>,

    /// Which tier produced `content`
    pub quality: ContentQuality,
}

/// Intermediate output of one tier
struct TierOutput {
    content: String,
    summary: String,
}

impl TierOutput {
    fn len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Runs the extraction chain over raw wire markup
///
/// # Example
///
/// ```
/// use newswire_ingest::extract::{extract_content, ExtractContext};
/// use newswire_ingest::models::{Category, ContentQuality};
///
/// let ctx = ExtractContext {
///     title: "Headline",
///     published_at: None,
///     category: Category::General,
/// };
/// let extracted = extract_content("", &ctx);
/// assert_eq!(extracted.quality, ContentQuality::Low);
/// assert!(!extracted.content.is_empty());
/// ```
pub fn extract_content(raw_markup: &str, ctx: &ExtractContext<'_>) -> ExtractedContent {
    let document = Html::parse_document(raw_markup);
    let photos = markup::photo_urls(&document);

    let primary = extract_primary(&document);
    if let Some(primary) = &primary {
        if primary.len() >= PRIMARY_MIN_CHARS {
            return ExtractedContent {
                content: primary.content.clone(),
                summary: primary.summary.clone(),
                photos,
                quality: ContentQuality::Full,
            };
        }
    }

    tracing::debug!(
        "Primary extraction below {} chars for '{}', scanning text nodes",
        PRIMARY_MIN_CHARS,
        ctx.title
    );

    // Fallback output takes precedence once it clears the floor; thin
    // primary text is only used when the text-node scan comes up short
    let best = extract_fallback(&document)
        .filter(|f| f.len() >= FALLBACK_MIN_CHARS)
        .or_else(|| {
            primary
                .filter(|p| p.len() >= FALLBACK_MIN_CHARS)
                .map(|p| TierOutput {
                    summary: truncate_with_ellipsis(&p.summary, FALLBACK_SUMMARY_MAX_CHARS),
                    content: p.content,
                })
        });

    match best {
        Some(tier) => ExtractedContent {
            content: tier.content,
            summary: tier.summary,
            photos,
            quality: ContentQuality::Partial,
        },
        None => {
            tracing::debug!("Synthesizing placeholder body for '{}'", ctx.title);
            let placeholder = synthesize_placeholder(ctx);
            ExtractedContent {
                content: placeholder.content,
                summary: placeholder.summary,
                photos,
                quality: ContentQuality::Low,
            }
        }
    }
}

/// Primary tier: paragraphs of the body block
fn extract_primary(document: &Html) -> Option<TierOutput> {
    let block = markup::find_body_block(document)?;

    let mut paragraphs = markup::paragraphs(block);
    if paragraphs.is_empty() {
        paragraphs = markup::escaped_paragraphs(block);
    }
    let first = paragraphs.first()?;

    let summary = {
        let sentences = text::meaningful_sentences(first, SENTENCE_MIN_CHARS);
        let lead = if sentences.is_empty() {
            first.clone()
        } else {
            sentences.into_iter().take(2).collect::<Vec<_>>().join(" ")
        };
        truncate_with_ellipsis(&lead, PRIMARY_SUMMARY_MAX_CHARS)
    };

    Some(TierOutput {
        content: paragraphs.join("\n\n"),
        summary,
    })
}

/// Fallback tier: loose text nodes that read like prose
fn extract_fallback(document: &Html) -> Option<TierOutput> {
    let mut fragments: Vec<String> = Vec::new();
    for node in markup::text_nodes(document) {
        if node.chars().count() < TEXT_NODE_MIN_CHARS || text::looks_like_metadata(&node) {
            continue;
        }
        if !fragments.contains(&node) {
            fragments.push(node);
        }
    }

    let first = fragments.first()?;
    let first_sentence = text::meaningful_sentences(first, SENTENCE_MIN_CHARS)
        .into_iter()
        .next()
        .unwrap_or_else(|| first.clone());

    Some(TierOutput {
        summary: truncate_with_ellipsis(&first_sentence, FALLBACK_SUMMARY_MAX_CHARS),
        content: fragments.join("\n\n"),
    })
}

/// Final tier: a templated body so downstream consumers always get text
fn synthesize_placeholder(ctx: &ExtractContext<'_>) -> TierOutput {
    let title = collapse_whitespace(ctx.title);
    let title = if title.is_empty() {
        "Untitled story".to_string()
    } else {
        title
    };

    let date = ctx
        .published_at
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "an unknown date".to_string());

    let content = format!(
        "{}\n\nThis {} story was published on {}. The full text is not yet available from the wire.",
        title,
        ctx.category.label(),
        date
    );

    TierOutput {
        summary: truncate_with_ellipsis(&title, FALLBACK_SUMMARY_MAX_CHARS),
        content,
    }
}
