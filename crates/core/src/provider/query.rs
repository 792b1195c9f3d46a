//! Outbound query text construction shared by all providers.

use super::{ContentType, SearchQuery};

/// Reduce a title to alphanumeric words separated by single spaces.
pub fn clean_title(title: &str) -> String {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `S01E02` / `S01` / year suffix for a query.
pub fn query_suffix(query: &SearchQuery) -> Option<String> {
    match query.content_type {
        ContentType::Movie => query.year.map(|year| year.to_string()),
        ContentType::Series => match (query.wanted_episode(), query.season) {
            (Some((season, episode)), _) => Some(format!("S{:02}E{:02}", season, episode)),
            (None, Some(season)) => Some(format!("S{:02}", season)),
            (None, None) => None,
        },
    }
}

/// Cleaned title plus the optional suffix, not yet URL-encoded.
pub fn query_terms(query: &SearchQuery) -> String {
    let title = clean_title(&query.free_text);
    match query_suffix(query) {
        Some(suffix) if !title.is_empty() => format!("{} {}", title, suffix),
        Some(suffix) => suffix,
        None => title,
    }
}

/// URL-encoded [`query_terms`].
pub fn encoded_terms(query: &SearchQuery) -> String {
    urlencoding::encode(&query_terms(query)).into_owned()
}
