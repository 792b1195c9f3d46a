//! Filename parser capability.
//!
//! Torrent title parsing is not done here: an implementation of
//! [`TitleParser`] is plugged in by the embedding application. The engine only
//! consumes its output (season/episode numbers, quality tags, a confidence
//! score) to classify and order candidates.

use serde::{Deserialize, Serialize};

/// Information extracted from a raw torrent title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedInfo {
    /// Title with release tags stripped.
    pub resolved_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    /// Whether the torrent bundles a whole series.
    #[serde(default)]
    pub is_complete_bundle: bool,
    /// e.g. "1080p"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// e.g. "x265"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    /// e.g. "WEB-DL", "BluRay"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_tag: Option<String>,
    /// Parser confidence. The range is parser-defined; only compared within
    /// one provider's bucket.
    pub score: f64,
}

/// Parses raw torrent titles.
///
/// Returning `None` means the title could not be parsed; the candidate is
/// still classified using filename heuristics, with a confidence of zero.
pub trait TitleParser: Send + Sync {
    fn parse(&self, title: &str) -> Option<ParsedInfo>;
}

/// Parser that never recognises anything.
///
/// Used when no parser is wired in: every candidate falls back to
/// heuristic classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullParser;

impl TitleParser for NullParser {
    fn parse(&self, _title: &str) -> Option<ParsedInfo> {
        None
    }
}

impl<F> TitleParser for F
where
    F: Fn(&str) -> Option<ParsedInfo> + Send + Sync,
{
    fn parse(&self, title: &str) -> Option<ParsedInfo> {
        self(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_parser_never_parses() {
        assert!(NullParser.parse("Breaking.Bad.S01E01.1080p.WEB").is_none());
    }

    #[test]
    fn test_closure_parser() {
        let parser = |title: &str| {
            Some(ParsedInfo {
                resolved_title: title.to_string(),
                year: None,
                season: Some(1),
                episode: None,
                is_complete_bundle: false,
                resolution: None,
                codec: None,
                source_tag: None,
                score: 0.5,
            })
        };
        let parsed = parser.parse("Show S01").unwrap();
        assert_eq!(parsed.season, Some(1));
        assert_eq!(parsed.score, 0.5);
    }

    #[test]
    fn test_parsed_info_minimal_json() {
        let json = r#"{"resolved_title": "Show", "score": 3.0}"#;
        let parsed: ParsedInfo = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.resolved_title, "Show");
        assert!(!parsed.is_complete_bundle);
        assert!(parsed.season.is_none());
    }
}
