//! Mock provider for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::classifier::Classifier;
use crate::parser::{NullParser, TitleParser};
use crate::provider::query::encoded_terms;
use crate::provider::{
    CandidateTorrent, CategoryBuckets, Provider, ProviderCache, ProviderError, SearchQuery,
};

/// Mock implementation of the Provider trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable candidates, classified like a real provider
/// - Record every query it receives
/// - Simulate failures, panics and slow responses
///
/// Clones share state, so a test can keep a handle after registering the
/// provider with an orchestrator.
///
/// # Example
///
/// ```rust,ignore
/// use magnetar_core::testing::{MockProvider, fixtures};
///
/// let provider = MockProvider::new("apibay");
/// provider.set_results(vec![fixtures::candidate("Dune.2021.1080p", "abc", 0.0)]).await;
///
/// let orchestrator = Orchestrator::builder(cache)
///     .register(Box::new(provider.clone()))
///     .build();
/// orchestrator.search_all(&SearchQuery::movie("Dune")).await;
///
/// assert_eq!(provider.search_count().await, 1);
/// ```
#[derive(Clone)]
pub struct MockProvider {
    name: String,
    classifier: Arc<Classifier>,
    /// Candidates returned by every search.
    results: Arc<RwLock<Vec<CandidateTorrent>>>,
    /// Recorded queries.
    searches: Arc<RwLock<Vec<SearchQuery>>>,
    /// If set, every search fails with this message.
    error: Arc<RwLock<Option<String>>>,
    /// If set, every search panics.
    panics: Arc<RwLock<bool>>,
    /// Simulated network latency.
    delay: Arc<RwLock<Option<Duration>>>,
    /// Content hashes by candidate id.
    hashes: Arc<RwLock<HashMap<String, String>>>,
    cache: Option<ProviderCache>,
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("name", &self.name)
            .field("has_cache", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl MockProvider {
    /// Create a mock provider with no results, classifying with heuristics only.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_parser(name, Arc::new(NullParser))
    }

    /// Create a mock provider classifying with `parser`.
    pub fn with_parser(name: impl Into<String>, parser: Arc<dyn TitleParser>) -> Self {
        Self {
            name: name.into(),
            classifier: Arc::new(Classifier::new(parser)),
            results: Arc::new(RwLock::new(Vec::new())),
            searches: Arc::new(RwLock::new(Vec::new())),
            error: Arc::new(RwLock::new(None)),
            panics: Arc::new(RwLock::new(false)),
            delay: Arc::new(RwLock::new(None)),
            hashes: Arc::new(RwLock::new(HashMap::new())),
            cache: None,
        }
    }

    /// Set the candidates returned by subsequent searches.
    pub async fn set_results(&self, results: Vec<CandidateTorrent>) {
        *self.results.write().await = results;
    }

    /// Make every subsequent search fail.
    pub async fn fail_with(&self, message: &str) {
        *self.error.write().await = Some(message.to_string());
    }

    /// Clear any configured failure.
    pub async fn clear_error(&self) {
        *self.error.write().await = None;
    }

    /// Make every subsequent search panic.
    pub async fn panic_on_search(&self, panics: bool) {
        *self.panics.write().await = panics;
    }

    /// Delay every search by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Register the hash returned by `content_hash(id)`.
    pub async fn set_hash(&self, id: &str, hash: &str) {
        self.hashes
            .write()
            .await
            .insert(id.to_string(), hash.to_string());
    }

    /// Get recorded queries.
    pub async fn recorded_searches(&self) -> Vec<SearchQuery> {
        self.searches.read().await.clone()
    }

    /// Get the number of searches performed.
    pub async fn search_count(&self) -> usize {
        self.searches.read().await.len()
    }

    /// Whether the orchestrator attached its cache.
    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn query_url(&self, query: &SearchQuery) -> String {
        format!("mock://{}/search?q={}", self.name, encoded_terms(query))
    }

    async fn search(&self, query: &SearchQuery) -> Result<CategoryBuckets, ProviderError> {
        self.searches.write().await.push(query.clone());

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let panics = *self.panics.read().await;
        if panics {
            panic!("{} mock provider panicked", self.name);
        }

        if let Some(message) = self.error.read().await.clone() {
            return Err(ProviderError::ApiError(message));
        }

        let candidates = self.results.read().await.clone();
        Ok(self.classifier.classify(candidates, query))
    }

    async fn content_hash(&self, candidate_id: &str) -> Result<String, ProviderError> {
        self.hashes
            .read()
            .await
            .get(candidate_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("{} {}", self.name, candidate_id)))
    }

    fn set_cache(&mut self, cache: ProviderCache) {
        self.cache = Some(cache);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_mock_provider_classifies_and_records() {
        let provider = MockProvider::new("mock");
        provider
            .set_results(vec![
                fixtures::candidate("Show.S01E02.720p", "h1", 0.0),
                fixtures::candidate("Show.S01.1080p", "h2", 0.0),
            ])
            .await;

        let query = SearchQuery::series("Show", Some(1), Some(2), true);
        let buckets = provider.search(&query).await.unwrap();

        assert_eq!(buckets.episodes.len(), 1);
        assert_eq!(buckets.complete_seasons.len(), 1);
        assert_eq!(provider.recorded_searches().await, vec![query]);
    }

    #[tokio::test]
    async fn test_mock_provider_failure() {
        let provider = MockProvider::new("mock");
        provider.fail_with("boom").await;
        assert!(provider.search(&SearchQuery::movie("x")).await.is_err());

        provider.clear_error().await;
        assert!(provider.search(&SearchQuery::movie("x")).await.is_ok());
        assert_eq!(provider.search_count().await, 2);
    }

    #[tokio::test]
    async fn test_mock_provider_hashes() {
        let provider = MockProvider::new("mock");
        provider.set_hash("7", "cafe").await;
        assert_eq!(provider.content_hash("7").await.unwrap(), "cafe");
        assert!(matches!(
            provider.content_hash("8").await,
            Err(ProviderError::NotFound(_))
        ));
    }
}
