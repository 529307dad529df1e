/// Maximum slug length in characters
pub const MAX_SLUG_CHARS: usize = 120;

/// Maps Turkish letters to their ASCII base letter
///
/// Done before lowercasing: `'İ'.to_lowercase()` yields `i` plus a combining
/// dot, which would otherwise survive into the slug.
fn transliterate(c: char) -> Option<char> {
    let mapped = match c {
        'ç' | 'Ç' => 'c',
        'ğ' | 'Ğ' => 'g',
        'ı' | 'I' | 'İ' => 'i',
        'ö' | 'Ö' => 'o',
        'ş' | 'Ş' => 's',
        'ü' | 'Ü' => 'u',
        'â' | 'Â' => 'a',
        'î' | 'Î' => 'i',
        'û' | 'Û' => 'u',
        _ => return None,
    };
    Some(mapped)
}

/// Lowercases and transliterates text, replacing everything that is not a
/// letter or digit with a space
pub fn fold_text(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.chars() {
        if let Some(t) = transliterate(c) {
            folded.push(t);
        } else if c.is_alphanumeric() {
            folded.extend(c.to_lowercase());
        } else {
            folded.push(' ');
        }
    }
    folded
}

/// Derives a URL slug from a title
///
/// Lowercase, punctuation stripped, whitespace runs become single hyphens,
/// no leading or trailing hyphen. Long slugs are cut at a word boundary.
///
/// # Examples
///
/// ```
/// use newswire_ingest::normalize::slugify;
///
/// assert_eq!(slugify("  Breaking: Markets Rally!  "), "breaking-markets-rally");
/// assert_eq!(slugify("İstanbul'da yağmur"), "istanbul-da-yagmur");
/// ```
pub fn slugify(title: &str) -> String {
    let words: Vec<String> = fold_text(title)
        .split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .filter(|w| !w.is_empty())
        .collect();

    let mut slug = String::new();
    for word in words {
        let needed = if slug.is_empty() { 0 } else { 1 } + word.chars().count();
        if slug.chars().count() + needed > MAX_SLUG_CHARS {
            if slug.is_empty() {
                slug = word.chars().take(MAX_SLUG_CHARS).collect();
            }
            break;
        }
        if !slug.is_empty() {
            slug.push('-');
        }
        slug.push_str(&word);
    }

    slug
}
