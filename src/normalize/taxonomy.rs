use crate::models::{Category, ContentType, Language, Priority};

/// Wire category code -> canonical category
///
/// The wire has seven top-level categories; science/technology collapses into
/// the site's `technology` bucket and culture/arts into `culture`.
const CATEGORY_TABLE: &[(i64, Category)] = &[
    (1, Category::General),
    (2, Category::Sports),
    (3, Category::Economy),
    (4, Category::Health),
    (5, Category::Technology),
    (6, Category::Politics),
    (7, Category::Culture),
];

const PRIORITY_TABLE: &[(i64, Priority)] = &[
    (1, Priority::Urgent),
    (2, Priority::High),
    (3, Priority::Normal),
    (4, Priority::Low),
    (5, Priority::Low),
];

const TYPE_TABLE: &[(i64, ContentType)] = &[
    (1, ContentType::Text),
    (2, ContentType::Photo),
    (3, ContentType::Video),
    (4, ContentType::Graphic),
];

const LANGUAGE_TABLE: &[(i64, Language)] = &[
    (1, Language::Tr),
    (2, Language::En),
    (3, Language::Ar),
    (4, Language::Ru),
    (5, Language::Ku),
    (6, Language::Fr),
    (7, Language::Es),
    (8, Language::Fa),
];

fn lookup<T: Copy>(table: &[(i64, T)], code: Option<i64>, default: T) -> T {
    code.and_then(|code| table.iter().find(|(c, _)| *c == code).map(|(_, v)| *v))
        .unwrap_or(default)
}

/// Maps a wire category code; unknown or missing codes map to `general`
pub fn map_category(code: Option<i64>) -> Category {
    lookup(CATEGORY_TABLE, code, Category::General)
}

/// Maps a wire priority code; unknown or missing codes map to `normal`
pub fn map_priority(code: Option<i64>) -> Priority {
    lookup(PRIORITY_TABLE, code, Priority::Normal)
}

/// Maps a wire type code; unknown or missing codes map to `text`
pub fn map_content_type(code: Option<i64>) -> ContentType {
    lookup(TYPE_TABLE, code, ContentType::Text)
}

/// Maps a wire language code; unknown or missing codes map to `tr`
pub fn map_language(code: Option<i64>) -> Language {
    lookup(LANGUAGE_TABLE, code, Language::Tr)
}
