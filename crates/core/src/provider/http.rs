//! Plumbing shared by the HTTP/JSON indexer providers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::classifier::Classifier;
use crate::metrics;

use super::{CandidateTorrent, CategoryBuckets, ProviderCache, ProviderError, SearchQuery};

/// HTTP client, cache handle and classifier of one provider.
pub(crate) struct IndexerHttp {
    name: &'static str,
    client: Client,
    classifier: Arc<Classifier>,
    cache: Option<ProviderCache>,
}

impl IndexerHttp {
    pub fn new(
        name: &'static str,
        timeout_secs: u32,
        classifier: Arc<Classifier>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs as u64))
            .build()
            .map_err(|e| ProviderError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name,
            client,
            classifier,
            cache: None,
        })
    }

    pub fn set_cache(&mut self, cache: ProviderCache) {
        self.cache = Some(cache);
    }

    /// GET `url` and decode the JSON body, timed under `operation`
    /// (`"search"` or `"content_hash"`).
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        operation: &'static str,
    ) -> Result<T, ProviderError> {
        let start = Instant::now();
        let result = self.fetch(url).await;
        metrics::PROVIDER_REQUEST_DURATION
            .with_label_values(&[self.name, operation])
            .observe(start.elapsed().as_secs_f64());
        result
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        debug!(provider = self.name, url = %url, "Requesting indexer");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ProviderError::ParseError(format!("{}: {}", self.name, e)))
    }

    /// Previously classified results for `query`, if still cached.
    pub fn cached_results(&self, query: &SearchQuery) -> Option<CategoryBuckets> {
        let hit = self
            .cache
            .as_ref()?
            .results
            .get(&query.cache_key(self.name))?;
        debug!(provider = self.name, "Serving search from cache");
        metrics::PROVIDER_SEARCHES
            .with_label_values(&[self.name, "cached"])
            .inc();
        Some(hit)
    }

    /// Classify freshly fetched candidates and remember the result.
    pub fn finish(&self, query: &SearchQuery, candidates: Vec<CandidateTorrent>) -> CategoryBuckets {
        metrics::PROVIDER_CANDIDATES
            .with_label_values(&[self.name])
            .observe(candidates.len() as f64);
        metrics::PROVIDER_SEARCHES
            .with_label_values(&[self.name, "success"])
            .inc();

        let buckets = self.classifier.classify(candidates, query);
        if let Some(cache) = &self.cache {
            cache.results.set(query.cache_key(self.name), buckets.clone());
        }
        buckets
    }

    pub fn cached_hash(&self, candidate_id: &str) -> Option<String> {
        self.cache
            .as_ref()?
            .hashes
            .get(&ProviderCache::hash_key(self.name, candidate_id))
    }

    pub fn remember_hash(&self, candidate_id: &str, hash: &str) {
        if let Some(cache) = &self.cache {
            cache
                .hashes
                .set(ProviderCache::hash_key(self.name, candidate_id), hash.to_string());
        }
    }

    /// Count a failed search.
    pub fn record_error(&self) {
        metrics::PROVIDER_SEARCHES
            .with_label_values(&[self.name, "error"])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::NullParser;

    fn http(name: &'static str) -> IndexerHttp {
        IndexerHttp::new(name, 2, Arc::new(Classifier::new(Arc::new(NullParser)))).unwrap()
    }

    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/t.php?id=1", listener.local_addr().unwrap());
        drop(listener);
        url
    }

    #[tokio::test]
    async fn test_request_duration_labelled_by_operation() {
        let http = http("timing-test");
        let result = http
            .get_json::<serde_json::Value>(&closed_port_url(), "content_hash")
            .await;
        assert!(matches!(result, Err(ProviderError::ConnectionFailed(_))));

        let samples = |operation: &str| {
            metrics::PROVIDER_REQUEST_DURATION
                .with_label_values(&["timing-test", operation])
                .get_sample_count()
        };
        assert_eq!(samples("content_hash"), 1);
        assert_eq!(samples("search"), 0);
    }

    #[test]
    fn test_hash_cache_requires_cache_handle() {
        let mut http = http("hash-cache-test");
        http.remember_hash("7", "abc");
        assert_eq!(http.cached_hash("7"), None);

        http.set_cache(ProviderCache::new(8, Duration::from_secs(60)));
        http.remember_hash("7", "abc");
        assert_eq!(http.cached_hash("7").as_deref(), Some("abc"));
    }
}
