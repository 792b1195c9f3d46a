//! Metadata types.

use serde::{Deserialize, Serialize};

use crate::provider::ContentType;

/// Canonical and localized titles of one piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    /// TMDB id.
    pub tmdb_id: u32,
    pub content_type: ContentType,
    /// ISO 639-1 code, e.g. "en", "fr".
    pub original_language: String,
    pub english_title: String,
    /// Title in the secondary language, when the service has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localized_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
}

impl ContentMetadata {
    pub fn is_english(&self) -> bool {
        self.original_language.eq_ignore_ascii_case("en")
    }
}

/// One hit of a metadata search or external-id lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleMatch {
    pub tmdb_id: u32,
    /// Title as returned by the search, in the service's default language.
    pub title: String,
    pub original_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
}

/// Year of a `YYYY-MM-DD` (or partial) date.
pub(crate) fn year_of(date: Option<&str>) -> Option<u32> {
    date.and_then(|d| d.split('-').next())
        .and_then(|y| y.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_of() {
        assert_eq!(year_of(Some("2008-01-20")), Some(2008));
        assert_eq!(year_of(Some("1999")), Some(1999));
        assert_eq!(year_of(Some("")), None);
        assert_eq!(year_of(None), None);
    }

    #[test]
    fn test_is_english() {
        let meta = ContentMetadata {
            tmdb_id: 1396,
            content_type: ContentType::Series,
            original_language: "EN".to_string(),
            english_title: "Breaking Bad".to_string(),
            localized_title: None,
            year: Some(2008),
        };
        assert!(meta.is_english());
        assert!(!ContentMetadata {
            original_language: "fr".to_string(),
            ..meta
        }
        .is_english());
    }
}
