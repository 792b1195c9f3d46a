//! YggTorrent provider (French indexer, via the public ygg API mirror).
//!
//! Listings carry no info hash; it is resolved per torrent with a second
//! request and cached separately.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::classifier::Classifier;
use crate::config::IndexerConfig;

use super::http::IndexerHttp;
use super::query::encoded_terms;
use super::{
    CandidateTorrent, CategoryBuckets, ContentType, Provider, ProviderCache, ProviderError,
    SearchQuery,
};

pub const YGG_NAME: &str = "ygg";
const DEFAULT_BASE_URL: &str = "https://yggapi.eu";

/// Ygg search provider.
pub struct YggProvider {
    http: IndexerHttp,
    base_url: String,
    limit: usize,
}

impl YggProvider {
    pub fn new(config: &IndexerConfig, classifier: Arc<Classifier>) -> Result<Self, ProviderError> {
        Ok(Self {
            http: IndexerHttp::new(YGG_NAME, config.timeout_secs, classifier)?,
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

/// Ygg "Film" and "Série TV" category ids.
fn category_for(content_type: ContentType) -> u32 {
    match content_type {
        ContentType::Movie => 2183,
        ContentType::Series => 2184,
    }
}

#[async_trait]
impl Provider for YggProvider {
    fn name(&self) -> &str {
        YGG_NAME
    }

    fn query_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}/torrents?q={}&category_id={}&page=1&per_page={}&order_by=seeders",
            self.base_url,
            encoded_terms(query),
            category_for(query.content_type),
            self.limit.min(100)
        )
    }

    async fn search(&self, query: &SearchQuery) -> Result<CategoryBuckets, ProviderError> {
        if let Some(hit) = self.http.cached_results(query) {
            return Ok(hit);
        }

        let url = self.query_url(query);
        let rows: Vec<YggRow> = self
            .http
            .get_json(&url, "search")
            .await
            .inspect_err(|_| self.http.record_error())?;

        let candidates: Vec<CandidateTorrent> = rows
            .into_iter()
            .take(self.limit)
            .map(YggRow::into_candidate)
            .collect();

        debug!(provider = YGG_NAME, results = candidates.len(), "Search complete");
        Ok(self.http.finish(query, candidates))
    }

    async fn content_hash(&self, candidate_id: &str) -> Result<String, ProviderError> {
        if let Some(hash) = self.http.cached_hash(candidate_id) {
            return Ok(hash);
        }

        let url = format!(
            "{}/torrent/{}",
            self.base_url,
            urlencoding::encode(candidate_id)
        );
        let details: YggDetails = self.http.get_json(&url, "content_hash").await?;
        let hash = details
            .hash
            .filter(|h| !h.is_empty())
            .map(|h| h.to_lowercase())
            .ok_or_else(|| {
                ProviderError::NotFound(format!("{} hash for torrent {}", YGG_NAME, candidate_id))
            })?;

        self.http.remember_hash(candidate_id, &hash);
        Ok(hash)
    }

    fn set_cache(&mut self, cache: ProviderCache) {
        self.http.set_cache(cache);
    }
}

// ygg API response types

#[derive(Debug, Deserialize)]
struct YggRow {
    id: u64,
    title: String,
    #[serde(default)]
    seeders: u32,
    #[serde(default)]
    leechers: u32,
    #[serde(default)]
    size: u64,
}

impl YggRow {
    fn into_candidate(self) -> CandidateTorrent {
        let mut candidate = CandidateTorrent::new(self.id.to_string(), self.title, "", YGG_NAME);
        candidate.size_bytes = self.size;
        candidate.seeders = self.seeders;
        candidate.leechers = self.leechers;
        candidate
    }
}

#[derive(Debug, Deserialize)]
struct YggDetails {
    #[serde(default)]
    hash: Option<String>,
}
