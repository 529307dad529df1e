//! Plain-text helpers used by the extraction tiers
//!
//! All functions here operate on `char` counts, never byte lengths, so
//! Turkish and Arabic text is truncated on character boundaries.

use scraper::Html;

/// Collapses every whitespace run (including NBSP) to a single space and trims
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decodes entities that survived parsing because the source double-escaped them
///
/// Text that still contains `&...;` after the markup parser ran is fed back
/// through the parser as a fragment, which decodes the remaining layer. Only
/// apply this to text known to be escaped twice; ordinary parsed text may
/// legitimately contain `&lt;` as literal characters.
pub fn unescape_residual_entities(text: &str) -> String {
    if !text.contains('&') || !text.contains(';') || text.contains('<') {
        return text.to_string();
    }

    let fragment = Html::parse_fragment(text);
    let decoded: String = fragment.root_element().text().collect();
    decoded
}

/// Normalizes one parsed text node
pub fn clean_text(text: &str) -> String {
    collapse_whitespace(text)
}

/// Splits text into sentence fragments, keeping their terminators
///
/// A terminator (`.`, `!`, `?`, `…`) only ends a sentence when followed by
/// whitespace or the end of the text, so decimals like `3.5` stay intact.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        current.push(c);
        let is_terminator = matches!(c, '.' | '!' | '?' | '…');
        let at_boundary = chars.get(i + 1).map_or(true, |next| next.is_whitespace());

        if is_terminator && at_boundary {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }

    sentences
}

/// Returns sentence fragments longer than `min_chars` characters
pub fn meaningful_sentences(text: &str, min_chars: usize) -> Vec<String> {
    split_sentences(text)
        .into_iter()
        .filter(|s| s.chars().count() > min_chars)
        .collect()
}

/// Truncates to at most `max_chars` characters, ending with `...` when cut
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let cut: String = text.chars().take(keep).collect();
    format!("{}...", cut.trim_end())
}

/// Heuristic for text nodes that carry markup metadata rather than prose
///
/// Matches encoding declarations, namespace URIs, URLs and pure digit strings.
pub fn looks_like_metadata(text: &str) -> bool {
    let lower = text.to_lowercase();

    const TOKENS: [&str; 9] = [
        "xmlns",
        "encoding=",
        "utf-8",
        "iso-8859",
        "urn:",
        "http://",
        "https://",
        "www.",
        "xml version",
    ];
    if TOKENS.iter().any(|t| lower.contains(t)) {
        return true;
    }

    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    !compact.is_empty() && compact.chars().all(|c| c.is_ascii_digit())
}
