//! Accent- and case-insensitive canonical form shared by every text comparison.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Strip diacritics, lower-case, and trim. `"Reforma Tributária "` becomes
/// `"reforma tributaria"`.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Substring test over already-normalized inputs. Empty terms never match.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    !term.is_empty() && haystack.contains(term)
}

pub fn contains_any<S: AsRef<str>>(haystack: &str, terms: &[S]) -> bool {
    terms
        .iter()
        .any(|term| contains_term(haystack, term.as_ref()))
}

/// Truncate on a character boundary, appending an ellipsis when shortened.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut shortened: String = trimmed.chars().take(max_chars).collect();
    shortened.push_str("...");
    shortened
}
