//! Types for the search orchestrator.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metadata::{ContentMetadata, MetadataError};
use crate::provider::{CategoryBuckets, ProviderError};

/// Errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Metadata lookup failed in a way no fallback can recover from.
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Every provider failed on the fallback path.
    #[error("no results from any provider ({} failed)", .0.len())]
    NoResults(HashMap<String, String>),

    /// No provider registered under that name.
    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    /// Single-provider operation failed.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// How a smart search routed its title variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// English original: English title everywhere but the secondary provider.
    English,
    /// Foreign original: localized title to the secondary provider, English
    /// title to the rest.
    Localized,
    /// No metadata: raw query to every provider.
    Fallback,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::English => "english",
            Route::Localized => "localized",
            Route::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-provider results of one search call.
///
/// Every dispatched provider has an entry in `results`, empty when it failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedSearchResults {
    pub results: HashMap<String, CategoryBuckets>,
    /// Outbound URL per provider.
    pub debug_urls: HashMap<String, String>,
    /// Error message per failed provider.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub errors: HashMap<String, String>,
}

impl CombinedSearchResults {
    /// Provider names in alphabetical order.
    pub fn provider_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.results.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether at least one provider completed without error.
    pub fn any_succeeded(&self) -> bool {
        self.results.keys().any(|name| !self.errors.contains_key(name))
    }

    /// Total candidates over all providers.
    pub fn total_candidates(&self) -> usize {
        self.results.values().map(CategoryBuckets::len).sum()
    }

    /// Results keyed in provider-name order, for stable presentation.
    pub fn sorted(&self) -> BTreeMap<&str, &CategoryBuckets> {
        self.results.iter().map(|(k, v)| (k.as_str(), v)).collect()
    }
}

/// Outcome of [`super::Orchestrator::search_smart`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartSearchResult {
    pub route: Route,
    /// Metadata used for routing; `None` on the fallback path.
    pub metadata: Option<ContentMetadata>,
    pub combined: CombinedSearchResults,
}
