//! Types shared by every indexer provider.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::MemoCache;
use crate::parser::ParsedInfo;

/// Kind of content being searched for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Movie,
    Series,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Series => "series",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one logical search.
///
/// Never mutated once built; provider-specific variants are derived as copies
/// with [`SearchQuery::with_title`] and friends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Title or free text to search for.
    pub free_text: String,
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    /// Whether the caller wants one exact episode rather than the season.
    #[serde(default)]
    pub want_specific_episode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    /// Language of `free_text`, when it is a localized title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_hint: Option<String>,
}

impl SearchQuery {
    /// Query for a movie.
    pub fn movie(free_text: impl Into<String>) -> Self {
        Self {
            free_text: free_text.into(),
            content_type: ContentType::Movie,
            season: None,
            episode: None,
            want_specific_episode: false,
            year: None,
            language_hint: None,
        }
    }

    /// Query for series content, optionally narrowed to a season or episode.
    pub fn series(
        free_text: impl Into<String>,
        season: Option<u32>,
        episode: Option<u32>,
        want_specific_episode: bool,
    ) -> Self {
        Self {
            free_text: free_text.into(),
            content_type: ContentType::Series,
            season,
            episode,
            want_specific_episode,
            year: None,
            language_hint: None,
        }
    }

    /// Copy of this query searching for another title.
    pub fn with_title(&self, title: impl Into<String>) -> Self {
        Self {
            free_text: title.into(),
            ..self.clone()
        }
    }

    pub fn with_year(mut self, year: Option<u32>) -> Self {
        self.year = year;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language_hint = Some(language.into());
        self
    }

    /// The (season, episode) pair when one exact episode is wanted.
    pub fn wanted_episode(&self) -> Option<(u32, u32)> {
        match (self.want_specific_episode, self.season, self.episode) {
            (true, Some(season), Some(episode)) => Some((season, episode)),
            _ => None,
        }
    }

    /// Result cache key for this query on `provider`.
    pub fn cache_key(&self, provider: &str) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}:{}",
            provider,
            self.content_type,
            self.free_text.to_lowercase(),
            opt_to_string(self.season),
            opt_to_string(self.episode),
            self.want_specific_episode,
            opt_to_string(self.year),
        )
    }
}

fn opt_to_string(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One raw search result from a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTorrent {
    /// Provider-native identifier.
    pub id: String,
    pub title: String,
    /// Info hash, lowercase. Empty when the provider needs a second call
    /// ([`Provider::content_hash`]) to resolve it.
    pub content_hash: String,
    pub source_provider: String,
    pub size_bytes: u64,
    pub seeders: u32,
    pub leechers: u32,
    /// Attached during classification; `None` when the title was unparseable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ParsedInfo>,
    /// Parser confidence, zero when unparsed.
    #[serde(default)]
    pub confidence: f64,
}

impl CandidateTorrent {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content_hash: impl Into<String>,
        source_provider: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content_hash: content_hash.into().to_lowercase(),
            source_provider: source_provider.into(),
            size_bytes: 0,
            seeders: 0,
            leechers: 0,
            parsed: None,
            confidence: 0.0,
        }
    }

    /// Magnet link for this candidate, if the hash is known.
    pub fn magnet_uri(&self) -> Option<String> {
        if self.content_hash.is_empty() {
            return None;
        }
        Some(format!(
            "magnet:?xt=urn:btih:{}&dn={}",
            self.content_hash,
            urlencoding::encode(&self.title)
        ))
    }
}

/// Result category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Movie,
    CompleteSeries,
    CompleteSeason,
    Episode,
}

impl Bucket {
    pub const ALL: [Bucket; 4] = [
        Bucket::Movie,
        Bucket::CompleteSeries,
        Bucket::CompleteSeason,
        Bucket::Episode,
    ];
}

/// Candidates of one provider split into the four result categories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryBuckets {
    #[serde(default)]
    pub movies: Vec<CandidateTorrent>,
    #[serde(default)]
    pub complete_series: Vec<CandidateTorrent>,
    #[serde(default)]
    pub complete_seasons: Vec<CandidateTorrent>,
    #[serde(default)]
    pub episodes: Vec<CandidateTorrent>,
}

impl CategoryBuckets {
    pub fn get(&self, bucket: Bucket) -> &[CandidateTorrent] {
        match bucket {
            Bucket::Movie => &self.movies,
            Bucket::CompleteSeries => &self.complete_series,
            Bucket::CompleteSeason => &self.complete_seasons,
            Bucket::Episode => &self.episodes,
        }
    }

    pub fn get_mut(&mut self, bucket: Bucket) -> &mut Vec<CandidateTorrent> {
        match bucket {
            Bucket::Movie => &mut self.movies,
            Bucket::CompleteSeries => &mut self.complete_series,
            Bucket::CompleteSeason => &mut self.complete_seasons,
            Bucket::Episode => &mut self.episodes,
        }
    }

    pub fn push(&mut self, bucket: Bucket, candidate: CandidateTorrent) {
        self.get_mut(bucket).push(candidate);
    }

    /// Apply `f` to every bucket in place.
    pub fn map_buckets<F>(mut self, mut f: F) -> Self
    where
        F: FnMut(Vec<CandidateTorrent>) -> Vec<CandidateTorrent>,
    {
        for bucket in Bucket::ALL {
            let items = std::mem::take(self.get_mut(bucket));
            *self.get_mut(bucket) = f(items);
        }
        self
    }

    /// Total candidates across all buckets.
    pub fn len(&self) -> usize {
        Bucket::ALL.iter().map(|b| self.get(*b).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Errors raised by a single provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Provider API error: {0}")]
    ApiError(String),

    #[error("Failed to parse provider response: {0}")]
    ParseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Provider panicked: {0}")]
    Panicked(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_connect() {
            ProviderError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            ProviderError::ParseError(e.to_string())
        } else {
            ProviderError::ApiError(e.to_string())
        }
    }
}

/// Cache namespaces shared by all providers.
#[derive(Debug, Clone)]
pub struct ProviderCache {
    /// Classified search results keyed by [`SearchQuery::cache_key`].
    pub results: Arc<MemoCache<String, CategoryBuckets>>,
    /// Content hashes keyed by `"{provider}:{candidate_id}"`.
    pub hashes: Arc<MemoCache<String, String>>,
}

impl ProviderCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            results: Arc::new(MemoCache::new("provider_results", capacity, ttl)),
            hashes: Arc::new(MemoCache::new("content_hashes", capacity, ttl)),
        }
    }

    pub fn hash_key(provider: &str, candidate_id: &str) -> String {
        format!("{}:{}", provider, candidate_id)
    }
}

/// A torrent indexer integration.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name, unique within one orchestrator.
    fn name(&self) -> &str;

    /// The single outbound URL a search for `query` requests.
    fn query_url(&self, query: &SearchQuery) -> String;

    /// Search the indexer and classify the results.
    ///
    /// Zero results is not an error.
    async fn search(&self, query: &SearchQuery) -> Result<CategoryBuckets, ProviderError>;

    /// Resolve the info hash of a candidate returned by [`Provider::search`].
    async fn content_hash(&self, candidate_id: &str) -> Result<String, ProviderError>;

    /// Attach the shared cache. Called once, before the first search.
    fn set_cache(&mut self, cache: ProviderCache);
}
