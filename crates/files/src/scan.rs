//! Keyword scan over uploaded text.

/// Returns the first keyword from `keywords` that occurs in `text`.
///
/// The match is a literal, case-insensitive substring search. Keywords are tried in the order
/// given, so the configured order decides the tag when several keywords are present. Blank
/// keywords are ignored.
pub fn scan_keywords(text: &str, keywords: &[String]) -> Option<String> {
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .find(|k| haystack.contains(&k.to_lowercase()))
        .map(str::to_owned)
}
