//! Mock metadata service for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::metadata::{MetadataError, MetadataService, TitleMatch};
use crate::provider::ContentType;

#[derive(Debug, Clone)]
struct MockContent {
    content_type: ContentType,
    title_match: TitleMatch,
    external_id: Option<String>,
}

/// Mock implementation of the MetadataService trait.
///
/// Provides controllable behavior for testing:
/// - Register content searchable by title or IMDb id
/// - Override titles per language
/// - Simulate per-language failures or a missing API key
/// - Observe how many title lookups ran at the same time
#[derive(Debug)]
pub struct MockMetadataService {
    contents: Arc<RwLock<Vec<MockContent>>>,
    /// Titles by (tmdb id, language).
    titles: Arc<RwLock<HashMap<(u32, String), String>>>,
    failing_languages: Arc<RwLock<HashSet<String>>>,
    not_configured: Arc<RwLock<bool>>,
    /// Recorded search and find queries.
    searches: Arc<RwLock<Vec<String>>>,
    title_delay: Arc<RwLock<Option<Duration>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockMetadataService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMetadataService {
    /// Create a new empty mock metadata service.
    pub fn new() -> Self {
        Self {
            contents: Arc::new(RwLock::new(Vec::new())),
            titles: Arc::new(RwLock::new(HashMap::new())),
            failing_languages: Arc::new(RwLock::new(HashSet::new())),
            not_configured: Arc::new(RwLock::new(false)),
            searches: Arc::new(RwLock::new(Vec::new())),
            title_delay: Arc::new(RwLock::new(None)),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Register searchable content. Its search title doubles as the English title.
    pub async fn add_content(
        &self,
        tmdb_id: u32,
        content_type: ContentType,
        title: &str,
        original_language: &str,
        year: Option<u32>,
        external_id: Option<&str>,
    ) {
        self.contents.write().await.push(MockContent {
            content_type,
            title_match: TitleMatch {
                tmdb_id,
                title: title.to_string(),
                original_language: original_language.to_string(),
                year,
            },
            external_id: external_id.map(String::from),
        });
    }

    /// Title returned for `tmdb_id` in `language`.
    pub async fn set_title(&self, tmdb_id: u32, language: &str, title: &str) {
        self.titles
            .write()
            .await
            .insert((tmdb_id, language.to_string()), title.to_string());
    }

    /// Make localized title lookups in `language` fail.
    pub async fn fail_language(&self, language: &str) {
        self.failing_languages
            .write()
            .await
            .insert(language.to_string());
    }

    /// Make every call fail as if the API key were missing.
    pub async fn set_not_configured(&self, not_configured: bool) {
        *self.not_configured.write().await = not_configured;
    }

    /// Delay every localized title lookup.
    pub async fn set_title_delay(&self, delay: Duration) {
        *self.title_delay.write().await = Some(delay);
    }

    /// Get recorded search and find queries.
    pub async fn recorded_searches(&self) -> Vec<String> {
        self.searches.read().await.clone()
    }

    /// Get the number of search and find calls.
    pub async fn search_count(&self) -> usize {
        self.searches.read().await.len()
    }

    /// Highest number of localized title lookups running at once.
    pub fn max_concurrent_title_lookups(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn check_configured(&self) -> Result<(), MetadataError> {
        if *self.not_configured.read().await {
            return Err(MetadataError::NotConfigured(
                "Invalid TMDB API key".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataService for MockMetadataService {
    async fn search_title(
        &self,
        query: &str,
        content_type: ContentType,
    ) -> Result<Vec<TitleMatch>, MetadataError> {
        self.searches.write().await.push(query.to_string());
        self.check_configured().await?;

        let needle = query.to_lowercase();
        Ok(self
            .contents
            .read()
            .await
            .iter()
            .filter(|c| c.content_type == content_type)
            .filter(|c| c.title_match.title.to_lowercase().contains(&needle))
            .map(|c| c.title_match.clone())
            .collect())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
        content_type: ContentType,
    ) -> Result<Option<TitleMatch>, MetadataError> {
        self.searches.write().await.push(external_id.to_string());
        self.check_configured().await?;

        Ok(self
            .contents
            .read()
            .await
            .iter()
            .find(|c| {
                c.content_type == content_type && c.external_id.as_deref() == Some(external_id)
            })
            .map(|c| c.title_match.clone()))
    }

    async fn localized_title(
        &self,
        tmdb_id: u32,
        _content_type: ContentType,
        language: &str,
    ) -> Result<Option<String>, MetadataError> {
        self.check_configured().await?;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let delay = *self.title_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_languages.read().await.contains(language) {
            return Err(MetadataError::ApiError {
                status: 500,
                message: format!("mock failure for {}", language),
            });
        }

        if let Some(title) = self
            .titles
            .read()
            .await
            .get(&(tmdb_id, language.to_string()))
        {
            return Ok(Some(title.clone()));
        }

        if language.starts_with("en") {
            return Ok(self
                .contents
                .read()
                .await
                .iter()
                .find(|c| c.title_match.tmdb_id == tmdb_id)
                .map(|c| c.title_match.title.clone()));
        }
        Ok(None)
    }
}
