//! Element-tree walking over wire markup
//!
//! The wire's document format is XML (NewsML wrapping NITF). It is parsed
//! with the HTML5 parser, which lowercases element and attribute names and
//! keeps unknown elements such as `body.content` and `remoteContent` as
//! ordinary elements.

use crate::extract::text::{clean_text, unescape_residual_entities};
use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Element holding the story paragraphs in NITF
const BODY_BLOCK: &str = "body.content";

/// NewsML element referencing external media
const REMOTE_CONTENT: &str = "remotecontent";

const IMAGE_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp"];

/// Finds the structured body block, falling back to the document body
pub fn find_body_block(document: &Html) -> Option<ElementRef<'_>> {
    let root = document.root_element();

    root.descendants()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == BODY_BLOCK)
        .or_else(|| {
            root.descendants()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "body")
        })
}

/// Collects the cleaned text of every non-empty `<p>` under `block`
pub fn paragraphs(block: ElementRef<'_>) -> Vec<String> {
    block
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "p")
        .map(|p| clean_text(&p.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Collects paragraphs from a block whose markup arrived entity-escaped
///
/// Some feeds ship `&lt;p&gt;...` inside the body block; the parser turns
/// that into literal text, which is parsed again as a fragment here. Those
/// feeds escape the paragraph text one layer deeper too, so entities left
/// over after the second parse are decoded as well.
pub fn escaped_paragraphs(block: ElementRef<'_>) -> Vec<String> {
    let inner: String = block.text().collect();
    if !inner.contains("<p") {
        return Vec::new();
    }

    let fragment = Html::parse_fragment(&inner);
    paragraphs(fragment.root_element())
        .into_iter()
        .map(|p| unescape_residual_entities(&p))
        .collect()
}

/// Collects every cleaned text node in document order
///
/// Text inside `script` and `style` elements is skipped.
pub fn text_nodes(document: &Html) -> Vec<String> {
    document
        .tree
        .root()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let inside_code = node.ancestors().any(|a| match a.value() {
                    Node::Element(e) => matches!(e.name(), "script" | "style"),
                    _ => false,
                });
                if inside_code {
                    None
                } else {
                    Some(clean_text(text))
                }
            }
            _ => None,
        })
        .filter(|text| !text.is_empty())
        .collect()
}

/// Collects photo URLs referenced by remote-content elements
///
/// Order follows the document; later repeats of a URL are dropped. An
/// element counts as a photo when its content type is absent or `image/*`,
/// or when the URL ends in a known image extension.
pub fn photo_urls(document: &Html) -> Vec<String> {
    let mut photos: Vec<String> = Vec::new();

    for element in document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == REMOTE_CONTENT)
    {
        let Some(href) = element.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() {
            continue;
        }

        let is_image_type = element
            .value()
            .attr("contenttype")
            .map_or(true, |ct| ct.trim().to_lowercase().starts_with("image/"));
        let has_image_extension = {
            let lower = href.to_lowercase();
            let path = lower.split(['?', '#']).next().unwrap_or("");
            IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        };

        if (is_image_type || has_image_extension) && !photos.iter().any(|p| p == href) {
            photos.push(href.to_string());
        }
    }

    photos
}
