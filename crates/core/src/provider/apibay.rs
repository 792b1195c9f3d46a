//! The Pirate Bay JSON API (apibay) provider.
//!
//! Search returns a bare JSON array whose numeric fields are encoded as
//! strings. An empty search yields a single placeholder row with id `"0"`.

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

pub const APIBAY_NAME: &str = "apibay";
const DEFAULT_BASE_URL: &str = "https://apibay.org";
const EMPTY_HASH: &str = "0000000000000000000000000000000000000000";

/// apibay.org search provider.
pub struct ApiBayProvider {
    http: IndexerHttp,
    base_url: String,
    limit: usize,
}

impl ApiBayProvider {
    pub fn new(config: &IndexerConfig, classifier: Arc<Classifier>) -> Result<Self, ProviderError> {
        Ok(Self {
            http: IndexerHttp::new(APIBAY_NAME, config.timeout_secs, classifier)?,
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

/// TPB video category ids.
fn category_for(content_type: ContentType) -> u32 {
    match content_type {
        ContentType::Movie => 201,
        ContentType::Series => 205,
    }
}

#[async_trait]
impl Provider for ApiBayProvider {
    fn name(&self) -> &str {
        APIBAY_NAME
    }

    fn query_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}/q.php?q={}&cat={}",
            self.base_url,
            encoded_terms(query),
            category_for(query.content_type)
        )
    }

    async fn search(&self, query: &SearchQuery) -> Result<CategoryBuckets, ProviderError> {
        if let Some(hit) = self.http.cached_results(query) {
            return Ok(hit);
        }

        let url = self.query_url(query);
        let rows: Vec<ApiBayRow> = self
            .http
            .get_json(&url, "search")
            .await
            .inspect_err(|_| self.http.record_error())?;

        let candidates: Vec<CandidateTorrent> = rows
            .into_iter()
            .filter(|row| !row.is_placeholder())
            .take(self.limit)
            .map(|row| row.into_candidate())
            .collect();

        debug!(provider = APIBAY_NAME, results = candidates.len(), "Search complete");
        Ok(self.http.finish(query, candidates))
    }

    async fn content_hash(&self, candidate_id: &str) -> Result<String, ProviderError> {
        if let Some(hash) = self.http.cached_hash(candidate_id) {
            return Ok(hash);
        }

        let url = format!(
            "{}/t.php?id={}",
            self.base_url,
            urlencoding::encode(candidate_id)
        );
        let details: ApiBayDetails = self.http.get_json(&url, "content_hash").await?;
        let hash = details.info_hash.to_lowercase();
        if hash.is_empty() || hash == EMPTY_HASH {
            return Err(ProviderError::NotFound(format!(
                "{} torrent {}",
                APIBAY_NAME, candidate_id
            )));
        }

        self.http.remember_hash(candidate_id, &hash);
        Ok(hash)
    }

    fn set_cache(&mut self, cache: ProviderCache) {
        self.http.set_cache(cache);
    }
}

// apibay response types

#[derive(Debug, Deserialize)]
struct ApiBayRow {
    id: String,
    name: String,
    info_hash: String,
    #[serde(default)]
    seeders: String,
    #[serde(default)]
    leechers: String,
    #[serde(default)]
    size: String,
}

impl ApiBayRow {
    fn is_placeholder(&self) -> bool {
        self.id == "0" || self.info_hash == EMPTY_HASH
    }

    fn into_candidate(self) -> CandidateTorrent {
        let mut candidate = CandidateTorrent::new(self.id, self.name, self.info_hash, APIBAY_NAME);
        candidate.size_bytes = self.size.parse().unwrap_or(0);
        candidate.seeders = self.seeders.parse().unwrap_or(0);
        candidate.leechers = self.leechers.parse().unwrap_or(0);
        candidate
    }
}

#[derive(Debug, Deserialize)]
struct ApiBayDetails {
    #[serde(default)]
    info_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::NullParser;

    fn provider(base_url: Option<&str>) -> ApiBayProvider {
        let config = IndexerConfig {
            base_url: base_url.map(String::from),
            ..Default::default()
        };
        ApiBayProvider::new(&config, Arc::new(Classifier::new(Arc::new(NullParser)))).unwrap()
    }

    #[test]
    fn test_query_url_series_episode() {
        let url = provider(None).query_url(&SearchQuery::series("Breaking Bad", Some(1), Some(1), true));
        assert_eq!(
            url,
            "https://apibay.org/q.php?q=Breaking%20Bad%20S01E01&cat=205"
        );
    }

    #[test]
    fn test_query_url_movie_with_custom_base() {
        let url = provider(Some("http://localhost:8080/"))
            .query_url(&SearchQuery::movie("Dune").with_year(Some(2021)));
        assert_eq!(url, "http://localhost:8080/q.php?q=Dune%202021&cat=201");
    }

    #[test]
    fn test_row_decoding() {
        let json = r#"[
            {"id":"123","name":"Breaking.Bad.S01E01.720p","info_hash":"ABCDEF0123","leechers":"4","seeders":"57","num_files":"1","size":"1073741824","username":"u","added":"1","status":"vip","category":"205","imdb":""},
            {"id":"0","name":"No results returned","info_hash":"0000000000000000000000000000000000000000","leechers":"0","seeders":"0","num_files":"0","size":"0","username":"","added":"0","status":"member","category":"0","imdb":""}
        ]"#;
        let rows: Vec<ApiBayRow> = serde_json::from_str(json).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].is_placeholder());
        assert!(rows[1].is_placeholder());

        let candidate = rows.into_iter().next().unwrap().into_candidate();
        assert_eq!(candidate.id, "123");
        assert_eq!(candidate.content_hash, "abcdef0123");
        assert_eq!(candidate.seeders, 57);
        assert_eq!(candidate.leechers, 4);
        assert_eq!(candidate.size_bytes, 1_073_741_824);
        assert_eq!(candidate.source_provider, "apibay");
    }

    #[test]
    fn test_row_with_bad_numbers_defaults_to_zero() {
        let json = r#"{"id":"9","name":"x","info_hash":"aa","seeders":"n/a"}"#;
        let row: ApiBayRow = serde_json::from_str(json).unwrap();
        let candidate = row.into_candidate();
        assert_eq!(candidate.seeders, 0);
        assert_eq!(candidate.size_bytes, 0);
    }
}
