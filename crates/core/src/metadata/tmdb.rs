//! TMDB (The Movie Database) v3 API client.
//!
//! TMDB requires an API key for access.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::MetadataConfig;
use crate::provider::ContentType;

use super::types::{year_of, TitleMatch};
use super::{MetadataError, MetadataService};

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// TMDB API client.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    /// Create a new TMDB client.
    pub fn new(config: &MetadataConfig) -> Result<Self, MetadataError> {
        if config.api_key.is_empty() {
            return Err(MetadataError::NotConfigured(
                "TMDB API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        what: &str,
    ) -> Result<T, MetadataError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let response = check_status(response, what).await?;
        response
            .json()
            .await
            .map_err(|e| MetadataError::ParseError(format!("Failed to parse {}: {}", what, e)))
    }
}

async fn check_status(response: Response, what: &str) -> Result<Response, MetadataError> {
    let status = response.status();
    if status == 401 {
        return Err(MetadataError::NotConfigured(
            "Invalid TMDB API key".to_string(),
        ));
    }
    if status == 429 {
        return Err(MetadataError::RateLimitExceeded);
    }
    if status == 404 {
        return Err(MetadataError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(MetadataError::ApiError {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(response)
}

fn media_path(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Movie => "movie",
        ContentType::Series => "tv",
    }
}

#[async_trait]
impl MetadataService for TmdbClient {
    async fn search_title(
        &self,
        query: &str,
        content_type: ContentType,
    ) -> Result<Vec<TitleMatch>, MetadataError> {
        debug!(query = %query, %content_type, "TMDB search");

        let path = format!("/search/{}", media_path(content_type));
        let response: TmdbSearchResponse = self
            .get(&path, &[("query", query), ("language", "en-US")], "search response")
            .await?;

        Ok(response
            .results
            .into_iter()
            .filter_map(TmdbResult::into_match)
            .collect())
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
        content_type: ContentType,
    ) -> Result<Option<TitleMatch>, MetadataError> {
        debug!(external_id = %external_id, %content_type, "TMDB find");

        let path = format!("/find/{}", urlencoding::encode(external_id));
        let response: TmdbFindResponse = self
            .get(
                &path,
                &[("external_source", "imdb_id"), ("language", "en-US")],
                "find response",
            )
            .await?;

        let results = match content_type {
            ContentType::Movie => response.movie_results,
            ContentType::Series => response.tv_results,
        };
        Ok(results.into_iter().find_map(TmdbResult::into_match))
    }

    async fn localized_title(
        &self,
        tmdb_id: u32,
        content_type: ContentType,
        language: &str,
    ) -> Result<Option<String>, MetadataError> {
        debug!(tmdb_id, %content_type, language, "TMDB localized title");

        let path = format!("/{}/{}", media_path(content_type), tmdb_id);
        let details: TmdbResult = self
            .get(&path, &[("language", language)], "details response")
            .await?;

        Ok(details.display_title().filter(|t| !t.is_empty()))
    }
}

// ============================================================================
// TMDB API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    #[serde(default)]
    results: Vec<TmdbResult>,
}

#[derive(Debug, Deserialize)]
struct TmdbFindResponse {
    #[serde(default)]
    movie_results: Vec<TmdbResult>,
    #[serde(default)]
    tv_results: Vec<TmdbResult>,
}

/// Movie and TV payloads share this shape; movies use `title`/`release_date`,
/// series use `name`/`first_air_date`.
#[derive(Debug, Deserialize)]
struct TmdbResult {
    id: u32,
    title: Option<String>,
    name: Option<String>,
    original_language: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
}

impl TmdbResult {
    fn display_title(&self) -> Option<String> {
        self.title.clone().or_else(|| self.name.clone())
    }

    fn into_match(self) -> Option<TitleMatch> {
        let title = self.display_title()?;
        let date = self.release_date.as_deref().or(self.first_air_date.as_deref());
        Some(TitleMatch {
            tmdb_id: self.id,
            title,
            original_language: self.original_language.clone().unwrap_or_default(),
            year: year_of(date),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_api_key() {
        let config = MetadataConfig {
            api_key: String::new(),
            base_url: None,
            secondary_language: "fr-FR".to_string(),
            timeout_secs: 10,
        };
        assert!(matches!(
            TmdbClient::new(&config),
            Err(MetadataError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_movie_result_conversion() {
        let json = r#"{"id": 603, "title": "The Matrix", "original_title": "The Matrix", "original_language": "en", "release_date": "1999-03-30", "popularity": 80.1}"#;
        let result: TmdbResult = serde_json::from_str(json).unwrap();
        let hit = result.into_match().unwrap();
        assert_eq!(hit.tmdb_id, 603);
        assert_eq!(hit.title, "The Matrix");
        assert_eq!(hit.original_language, "en");
        assert_eq!(hit.year, Some(1999));
    }

    #[test]
    fn test_tv_result_conversion() {
        let json = r#"{"id": 62852, "name": "The Bureau", "original_name": "Le Bureau des Légendes", "original_language": "fr", "first_air_date": "2015-04-27"}"#;
        let result: TmdbResult = serde_json::from_str(json).unwrap();
        let hit = result.into_match().unwrap();
        assert_eq!(hit.title, "The Bureau");
        assert_eq!(hit.original_language, "fr");
        assert_eq!(hit.year, Some(2015));
    }

    #[test]
    fn test_result_without_title_is_skipped() {
        let result: TmdbResult = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert!(result.into_match().is_none());
    }

    #[test]
    fn test_find_response_decoding() {
        let json = r#"{"movie_results": [], "person_results": [], "tv_results": [{"id": 1396, "name": "Breaking Bad", "original_language": "en", "first_air_date": "2008-01-20"}], "tv_episode_results": []}"#;
        let response: TmdbFindResponse = serde_json::from_str(json).unwrap();
        assert!(response.movie_results.is_empty());
        assert_eq!(response.tv_results.len(), 1);
    }

    #[test]
    fn test_media_path() {
        assert_eq!(media_path(ContentType::Movie), "movie");
        assert_eq!(media_path(ContentType::Series), "tv");
    }
}
