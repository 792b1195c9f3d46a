//! torrents-csv.com provider.
//!
//! The candidate id is the info hash itself, so hash lookups need no network call.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::classifier::Classifier;
use crate::config::IndexerConfig;

use super::http::IndexerHttp;
use super::query::encoded_terms;
use super::{
    CandidateTorrent, CategoryBuckets, Provider, ProviderCache, ProviderError, SearchQuery,
};

pub const TORRENTS_CSV_NAME: &str = "torrents_csv";
const DEFAULT_BASE_URL: &str = "https://torrents-csv.com";

/// torrents-csv search provider.
pub struct TorrentsCsvProvider {
    http: IndexerHttp,
    base_url: String,
    limit: usize,
}

impl TorrentsCsvProvider {
    pub fn new(config: &IndexerConfig, classifier: Arc<Classifier>) -> Result<Self, ProviderError> {
        Ok(Self {
            http: IndexerHttp::new(TORRENTS_CSV_NAME, config.timeout_secs, classifier)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            limit: config.limit,
        })
    }
}

#[async_trait]
impl Provider for TorrentsCsvProvider {
    fn name(&self) -> &str {
        TORRENTS_CSV_NAME
    }

    fn query_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}/service/search?q={}&size={}",
            self.base_url,
            encoded_terms(query),
            self.limit
        )
    }

    async fn search(&self, query: &SearchQuery) -> Result<CategoryBuckets, ProviderError> {
        if let Some(hit) = self.http.cached_results(query) {
            return Ok(hit);
        }

        let url = self.query_url(query);
        let response: TorrentsCsvResponse = self
            .http
            .get_json(&url, "search")
            .await
            .inspect_err(|_| self.http.record_error())?;

        let candidates: Vec<CandidateTorrent> = response
            .torrents
            .into_iter()
            .take(self.limit)
            .map(TorrentsCsvRow::into_candidate)
            .collect();

        debug!(
            provider = TORRENTS_CSV_NAME,
            results = candidates.len(),
            "Search complete"
        );
        Ok(self.http.finish(query, candidates))
    }

    async fn content_hash(&self, candidate_id: &str) -> Result<String, ProviderError> {
        if candidate_id.is_empty() {
            return Err(ProviderError::NotFound(format!(
                "{} empty candidate id",
                TORRENTS_CSV_NAME
            )));
        }
        Ok(candidate_id.to_lowercase())
    }

    fn set_cache(&mut self, cache: ProviderCache) {
        self.http.set_cache(cache);
    }
}

// torrents-csv response types

#[derive(Debug, Deserialize)]
struct TorrentsCsvResponse {
    #[serde(default)]
    torrents: Vec<TorrentsCsvRow>,
}

#[derive(Debug, Deserialize)]
struct TorrentsCsvRow {
    infohash: String,
    name: String,
    #[serde(default)]
    size_bytes: u64,
    #[serde(default)]
    seeders: u32,
    #[serde(default)]
    leechers: u32,
}

impl TorrentsCsvRow {
    fn into_candidate(self) -> CandidateTorrent {
        let mut candidate =
            CandidateTorrent::new(self.infohash.clone(), self.name, self.infohash, TORRENTS_CSV_NAME);
        candidate.size_bytes = self.size_bytes;
        candidate.seeders = self.seeders;
        candidate.leechers = self.leechers;
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::NullParser;

    fn provider() -> TorrentsCsvProvider {
        let config = IndexerConfig {
            limit: 25,
            ..Default::default()
        };
        TorrentsCsvProvider::new(&config, Arc::new(Classifier::new(Arc::new(NullParser)))).unwrap()
    }

    #[test]
    fn test_query_url() {
        let url = provider().query_url(&SearchQuery::series("The Office (US)", Some(2), None, false));
        assert_eq!(
            url,
            "https://torrents-csv.com/service/search?q=The%20Office%20US%20S02&size=25"
        );
    }

    #[test]
    fn test_response_decoding() {
        let json = r#"{
            "torrents": [
                {"rowid": 1, "infohash": "DEADBEEF", "name": "The.Office.US.S02.720p", "size_bytes": 5000, "created_unix": 1, "seeders": 12, "leechers": 3, "completed": 100, "scraped_date": 2}
            ],
            "next": 1
        }"#;
        let response: TorrentsCsvResponse = serde_json::from_str(json).unwrap();
        let candidate = response.torrents.into_iter().next().unwrap().into_candidate();
        assert_eq!(candidate.id, "DEADBEEF");
        assert_eq!(candidate.content_hash, "deadbeef");
        assert_eq!(candidate.seeders, 12);
        assert_eq!(candidate.size_bytes, 5000);
    }

    #[test]
    fn test_empty_response() {
        let response: TorrentsCsvResponse = serde_json::from_str(r#"{"torrents": []}"#).unwrap();
        assert!(response.torrents.is_empty());
        let response: TorrentsCsvResponse = serde_json::from_str("{}").unwrap();
        assert!(response.torrents.is_empty());
    }

    #[tokio::test]
    async fn test_content_hash_is_candidate_id() {
        let hash = provider().content_hash("ABC123").await.unwrap();
        assert_eq!(hash, "abc123");
        assert!(provider().content_hash("").await.is_err());
    }
}
