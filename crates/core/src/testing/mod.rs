//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the provider and metadata
//! traits, allowing orchestration to be tested without real indexers.
//!
//! # Example
//!
//! ```rust,ignore
//! use magnetar_core::testing::{fixtures, MockMetadataService, MockProvider};
//!
//! let provider = MockProvider::new("apibay");
//! let metadata = Arc::new(MockMetadataService::new());
//!
//! // Configure mock responses
//! provider.set_results(vec![fixtures::candidate("Show.S01E01.1080p", "abc", 0.0)]).await;
//! metadata.add_content(1, ContentType::Series, "Show", "en", None, None).await;
//!
//! // Build an Orchestrator with fixtures::metadata_fetcher(metadata)...
//! ```

mod mock_metadata;
mod mock_provider;

pub use mock_metadata::MockMetadataService;
pub use mock_provider::MockProvider;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::cache::MemoCache;
    use crate::classifier::scan_title;
    use crate::metadata::{ContentMetadata, MetadataFetcher, MetadataService};
    use crate::parser::{ParsedInfo, TitleParser};
    use crate::provider::{CandidateTorrent, ContentType};

    /// Create a test candidate with reasonable defaults.
    pub fn candidate(title: &str, content_hash: &str, confidence: f64) -> CandidateTorrent {
        let mut candidate = CandidateTorrent::new(
            format!("id-{}", title.to_lowercase().replace(' ', "-")),
            title,
            content_hash,
            "mock",
        );
        candidate.size_bytes = 1024 * 1024 * 700; // 700 MB
        candidate.seeders = 50;
        candidate.leechers = 10;
        candidate.confidence = confidence;
        candidate
    }

    /// Create series metadata with the given titles.
    pub fn content_metadata(
        english_title: &str,
        original_language: &str,
        localized_title: Option<&str>,
    ) -> ContentMetadata {
        ContentMetadata {
            tmdb_id: 1000 + english_title.len() as u32,
            content_type: ContentType::Series,
            original_language: original_language.to_string(),
            english_title: english_title.to_string(),
            localized_title: localized_title.map(String::from),
            year: None,
        }
    }

    /// Create a fetcher over `service` with a French secondary language.
    pub fn metadata_fetcher(service: Arc<dyn MetadataService>) -> MetadataFetcher {
        MetadataFetcher::new(
            service,
            "fr-FR",
            Arc::new(MemoCache::new("metadata", 64, Duration::from_secs(300))),
        )
    }

    /// A parser scoring titles by resolution, with season/episode tags from
    /// the filename heuristics.
    pub fn resolution_parser() -> Arc<dyn TitleParser> {
        Arc::new(|title: &str| {
            let lower = title.to_lowercase();
            let (resolution, score) = if lower.contains("2160p") {
                (Some("2160p"), 3.0)
            } else if lower.contains("1080p") {
                (Some("1080p"), 2.0)
            } else if lower.contains("720p") {
                (Some("720p"), 1.0)
            } else {
                return None;
            };
            let tags = scan_title(title);
            Some(ParsedInfo {
                resolved_title: title.to_string(),
                year: None,
                season: tags.season,
                episode: tags.episode,
                is_complete_bundle: tags.complete,
                resolution: resolution.map(String::from),
                codec: None,
                source_tag: None,
                score,
            })
        })
    }
}
