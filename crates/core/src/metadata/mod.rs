//! Content metadata lookup.
//!
//! Resolves a free-text query or an IMDb id to a canonical TMDB entry, then
//! fetches its English and secondary-language titles. Results are memoized in
//! the shared metadata cache.

mod tmdb;
mod types;

pub use tmdb::TmdbClient;
pub use types::*;

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::MemoCache;
use crate::metrics;
use crate::provider::ContentType;

/// English title language tag.
pub const ENGLISH_LANGUAGE: &str = "en-US";

/// Errors that can occur when looking up metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// No match for the query or id.
    #[error("No metadata found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Service not configured (missing or rejected API key).
    #[error("Metadata service not configured: {0}")]
    NotConfigured(String),
}

impl MetadataError {
    /// Whether the error means no lookup can ever succeed with this setup.
    pub fn is_configuration(&self) -> bool {
        matches!(self, MetadataError::NotConfigured(_))
    }
}

/// A metadata backend (TMDB in production, mocks in tests).
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Free-text search, best match first.
    async fn search_title(
        &self,
        query: &str,
        content_type: ContentType,
    ) -> Result<Vec<TitleMatch>, MetadataError>;

    /// Look up content by IMDb id.
    async fn find_by_external_id(
        &self,
        external_id: &str,
        content_type: ContentType,
    ) -> Result<Option<TitleMatch>, MetadataError>;

    /// Title of `tmdb_id` in `language` (e.g. "fr-FR").
    async fn localized_title(
        &self,
        tmdb_id: u32,
        content_type: ContentType,
        language: &str,
    ) -> Result<Option<String>, MetadataError>;
}

static EXTERNAL_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^tt\d{5,}$").unwrap());

/// Whether `query` is an IMDb id such as `tt0903747`.
pub fn is_external_id(query: &str) -> bool {
    EXTERNAL_ID_RE.is_match(query.trim())
}

/// Cache-backed metadata resolution.
pub struct MetadataFetcher {
    service: Arc<dyn MetadataService>,
    secondary_language: String,
    cache: Arc<MemoCache<String, ContentMetadata>>,
}

impl MetadataFetcher {
    pub fn new(
        service: Arc<dyn MetadataService>,
        secondary_language: impl Into<String>,
        cache: Arc<MemoCache<String, ContentMetadata>>,
    ) -> Self {
        Self {
            service,
            secondary_language: secondary_language.into(),
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<MemoCache<String, ContentMetadata>> {
        &self.cache
    }

    /// Language tag of the localized title, e.g. "fr-FR".
    pub fn secondary_language(&self) -> &str {
        &self.secondary_language
    }

    /// Resolve metadata from a free-text title.
    pub async fn fetch_metadata(
        &self,
        free_text: &str,
        content_type: ContentType,
    ) -> Result<ContentMetadata, MetadataError> {
        let key = format!("{}:text:{}", content_type, free_text.trim().to_lowercase());
        if let Some(hit) = self.cache_hit(&key, "text") {
            return Ok(hit);
        }

        let result = self.lookup_text(free_text.trim(), content_type).await;
        self.finish(key, "text", result)
    }

    /// Resolve metadata from an IMDb id.
    pub async fn fetch_metadata_by_external_id(
        &self,
        external_id: &str,
        content_type: ContentType,
    ) -> Result<ContentMetadata, MetadataError> {
        let external_id = external_id.trim();
        let key = format!("{}:id:{}", content_type, external_id);
        if let Some(hit) = self.cache_hit(&key, "external_id") {
            return Ok(hit);
        }

        let result = self.lookup_external_id(external_id, content_type).await;
        self.finish(key, "external_id", result)
    }

    async fn lookup_text(
        &self,
        free_text: &str,
        content_type: ContentType,
    ) -> Result<ContentMetadata, MetadataError> {
        let best = self
            .service
            .search_title(free_text, content_type)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MetadataError::NotFound(free_text.to_string()))?;
        self.resolve_titles(best, content_type).await
    }

    async fn lookup_external_id(
        &self,
        external_id: &str,
        content_type: ContentType,
    ) -> Result<ContentMetadata, MetadataError> {
        let found = self
            .service
            .find_by_external_id(external_id, content_type)
            .await?
            .ok_or_else(|| MetadataError::NotFound(external_id.to_string()))?;
        self.resolve_titles(found, content_type).await
    }

    /// Fetch both title variants of a match concurrently.
    async fn resolve_titles(
        &self,
        found: TitleMatch,
        content_type: ContentType,
    ) -> Result<ContentMetadata, MetadataError> {
        let (english, localized) = tokio::join!(
            self.service
                .localized_title(found.tmdb_id, content_type, ENGLISH_LANGUAGE),
            self.service
                .localized_title(found.tmdb_id, content_type, &self.secondary_language),
        );

        let english_title = english?.unwrap_or_else(|| found.title.clone());
        let localized_title = match localized {
            Ok(title) => title,
            Err(e) if e.is_configuration() => return Err(e),
            Err(e) => {
                warn!(
                    tmdb_id = found.tmdb_id,
                    language = %self.secondary_language,
                    error = %e,
                    "Localized title lookup failed"
                );
                None
            }
        };

        Ok(ContentMetadata {
            tmdb_id: found.tmdb_id,
            content_type,
            original_language: found.original_language,
            english_title,
            localized_title,
            year: found.year,
        })
    }

    fn cache_hit(&self, key: &String, source: &str) -> Option<ContentMetadata> {
        let hit = self.cache.get(key)?;
        metrics::METADATA_LOOKUPS
            .with_label_values(&[source, "cached"])
            .inc();
        Some(hit)
    }

    fn finish(
        &self,
        key: String,
        source: &str,
        result: Result<ContentMetadata, MetadataError>,
    ) -> Result<ContentMetadata, MetadataError> {
        let outcome = match &result {
            Ok(_) => "success",
            Err(MetadataError::NotFound(_)) => "not_found",
            Err(_) => "error",
        };
        metrics::METADATA_LOOKUPS
            .with_label_values(&[source, outcome])
            .inc();

        if let Ok(metadata) = &result {
            debug!(
                tmdb_id = metadata.tmdb_id,
                original_language = %metadata.original_language,
                english_title = %metadata.english_title,
                localized_title = ?metadata.localized_title,
                "Resolved metadata"
            );
            self.cache.set(key, metadata.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockMetadataService;
    use std::time::Duration;

    fn fetcher(service: Arc<MockMetadataService>) -> MetadataFetcher {
        MetadataFetcher::new(
            service,
            "fr-FR",
            Arc::new(MemoCache::new("metadata", 16, Duration::from_secs(60))),
        )
    }

    #[test]
    fn test_is_external_id() {
        assert!(is_external_id("tt0903747"));
        assert!(is_external_id(" tt12345 "));
        assert!(!is_external_id("tt123"));
        assert!(!is_external_id("Breaking Bad"));
        assert!(!is_external_id("tt0903747x"));
    }

    #[tokio::test]
    async fn test_fetch_metadata_resolves_both_titles() {
        let service = Arc::new(MockMetadataService::new());
        service
            .add_content(
                1396,
                ContentType::Series,
                "Breaking Bad",
                "en",
                Some(2008),
                Some("tt0903747"),
            )
            .await;
        service.set_title(1396, "fr-FR", "Breaking Bad (FR)").await;

        let metadata = fetcher(Arc::clone(&service))
            .fetch_metadata("breaking bad", ContentType::Series)
            .await
            .unwrap();

        assert_eq!(metadata.tmdb_id, 1396);
        assert_eq!(metadata.english_title, "Breaking Bad");
        assert_eq!(metadata.localized_title.as_deref(), Some("Breaking Bad (FR)"));
        assert_eq!(metadata.year, Some(2008));
        assert!(metadata.is_english());
    }

    #[tokio::test]
    async fn test_fetch_metadata_is_cached() {
        let service = Arc::new(MockMetadataService::new());
        service
            .add_content(603, ContentType::Movie, "The Matrix", "en", Some(1999), None)
            .await;
        let fetcher = fetcher(Arc::clone(&service));

        fetcher.fetch_metadata("The Matrix", ContentType::Movie).await.unwrap();
        fetcher.fetch_metadata("the matrix ", ContentType::Movie).await.unwrap();

        assert_eq!(service.search_count().await, 1);
    }

    #[tokio::test]
    async fn test_fetch_metadata_no_match() {
        let service = Arc::new(MockMetadataService::new());
        let result = fetcher(service)
            .fetch_metadata("Nothing Like This", ContentType::Movie)
            .await;
        assert!(matches!(result, Err(MetadataError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fetch_by_external_id() {
        let service = Arc::new(MockMetadataService::new());
        service
            .add_content(
                62852,
                ContentType::Series,
                "The Bureau",
                "fr",
                Some(2015),
                Some("tt4063800"),
            )
            .await;
        service.set_title(62852, "fr-FR", "Le Bureau des Légendes").await;

        let fetcher = fetcher(Arc::clone(&service));
        let metadata = fetcher
            .fetch_metadata_by_external_id("tt4063800", ContentType::Series)
            .await
            .unwrap();
        assert_eq!(metadata.original_language, "fr");
        assert_eq!(metadata.localized_title.as_deref(), Some("Le Bureau des Légendes"));

        let missing = fetcher
            .fetch_metadata_by_external_id("tt4063800", ContentType::Movie)
            .await;
        assert!(matches!(missing, Err(MetadataError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_title_lookups_run_concurrently() {
        let service = Arc::new(MockMetadataService::new());
        service
            .add_content(1396, ContentType::Series, "Breaking Bad", "en", None, None)
            .await;
        service.set_title_delay(Duration::from_millis(50)).await;

        fetcher(Arc::clone(&service))
            .fetch_metadata("Breaking Bad", ContentType::Series)
            .await
            .unwrap();

        assert_eq!(service.max_concurrent_title_lookups(), 2);
    }

    #[tokio::test]
    async fn test_localized_failure_is_not_fatal() {
        let service = Arc::new(MockMetadataService::new());
        service
            .add_content(1, ContentType::Movie, "Amelie", "fr", Some(2001), None)
            .await;
        service.fail_language("fr-FR").await;

        let metadata = fetcher(service)
            .fetch_metadata("Amelie", ContentType::Movie)
            .await
            .unwrap();
        assert_eq!(metadata.english_title, "Amelie");
        assert!(metadata.localized_title.is_none());
    }

    #[tokio::test]
    async fn test_not_configured_propagates() {
        let service = Arc::new(MockMetadataService::new());
        service.set_not_configured(true).await;

        let result = fetcher(service)
            .fetch_metadata("Anything", ContentType::Movie)
            .await;
        assert!(result.unwrap_err().is_configuration());
    }
}
