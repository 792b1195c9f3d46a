//! Search orchestrator implementation.
//!
//! Resolves metadata, picks a title variant per provider, fans the searches
//! out as one task per provider and collects the per-provider results.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::cache::MemoCache;
use crate::classifier::{rank_buckets, Classifier};
use crate::config::Config;
use crate::metadata::{
    is_external_id, ContentMetadata, MetadataError, MetadataFetcher, TmdbClient, ENGLISH_LANGUAGE,
};
use crate::metrics;
use crate::parser::TitleParser;
use crate::provider::{
    build_providers, CategoryBuckets, Provider, ProviderCache, ProviderError, SearchQuery,
};

use super::types::{CombinedSearchResults, Route, SearchError, SmartSearchResult};

/// One provider paired with the query variant it will receive.
pub(crate) struct Dispatch {
    pub provider: Arc<dyn Provider>,
    pub query: SearchQuery,
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch")
            .field("provider", &self.provider.name())
            .field("query", &self.query)
            .finish()
    }
}

/// Multi-provider search engine.
///
/// The provider registry is fixed at build time; `search_smart` can be called
/// concurrently from many tasks.
pub struct Orchestrator {
    providers: Vec<Arc<dyn Provider>>,
    metadata: Option<MetadataFetcher>,
    secondary_provider: String,
    min_confidence: f64,
    cache: ProviderCache,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("providers", &self.provider_names())
            .field("metadata", &self.metadata.is_some())
            .field("secondary_provider", &self.secondary_provider)
            .field("min_confidence", &self.min_confidence)
            .finish()
    }
}

impl Orchestrator {
    pub fn builder(cache: ProviderCache) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cache)
    }

    /// Registered provider names, in registration order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    fn provider(&self, name: &str) -> Result<&Arc<dyn Provider>, SearchError> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| SearchError::ProviderNotFound(name.to_string()))
    }

    fn is_secondary(&self, provider: &dyn Provider) -> bool {
        provider.name() == self.secondary_provider
    }

    /// Metadata-aware search across every registered provider.
    ///
    /// Metadata failures fall back to the raw query on every provider, except
    /// a missing metadata configuration which is returned as an error.
    pub async fn search_smart(&self, query: &SearchQuery) -> Result<SmartSearchResult, SearchError> {
        let start = Instant::now();

        let metadata = match self.resolve_metadata(query).await {
            Ok(metadata) => Some(metadata),
            Err(e) if e.is_configuration() => {
                metrics::SMART_SEARCHES.with_label_values(&["failed"]).inc();
                return Err(e.into());
            }
            Err(e) => {
                info!(
                    query = %query.free_text,
                    error = %e,
                    "Metadata unavailable, searching with raw query"
                );
                None
            }
        };

        let (route, dispatches) = self.plan_dispatch(query, metadata.as_ref());
        info!(
            query = %query.free_text,
            content_type = %query.content_type,
            route = %route,
            providers = dispatches.len(),
            "Dispatching search"
        );

        let combined = self.dispatch(dispatches).await;

        if route == Route::Fallback && !combined.any_succeeded() {
            metrics::SMART_SEARCHES.with_label_values(&["failed"]).inc();
            warn!(query = %query.free_text, "No provider returned results");
            return Err(SearchError::NoResults(combined.errors));
        }

        metrics::SMART_SEARCHES
            .with_label_values(&[route.as_str()])
            .inc();
        metrics::SMART_SEARCH_DURATION
            .with_label_values(&[route.as_str()])
            .observe(start.elapsed().as_secs_f64());

        info!(
            query = %query.free_text,
            route = %route,
            candidates = combined.total_candidates(),
            failed = combined.errors.len(),
            "Search complete"
        );

        Ok(SmartSearchResult {
            route,
            metadata,
            combined,
        })
    }

    /// Raw query to every registered provider, no metadata lookup.
    pub async fn search_all(&self, query: &SearchQuery) -> CombinedSearchResults {
        let dispatches = self.fan_out(query, |_| true);
        self.dispatch(dispatches).await
    }

    /// Search a single provider by name.
    pub async fn search_provider(
        &self,
        name: &str,
        query: &SearchQuery,
    ) -> Result<CategoryBuckets, SearchError> {
        let buckets = self.provider(name)?.search(query).await?;
        Ok(rank_buckets(buckets, self.min_confidence))
    }

    /// Resolve the info hash of a candidate through the provider that found it.
    pub async fn content_hash(&self, provider: &str, candidate_id: &str) -> Result<String, SearchError> {
        Ok(self.provider(provider)?.content_hash(candidate_id).await?)
    }

    /// Start background expiry sweeps for every cache namespace.
    pub fn spawn_cache_sweepers(&self, interval: Duration) -> Vec<JoinHandle<()>> {
        let mut handles = vec![
            self.cache.results.spawn_sweeper(interval),
            self.cache.hashes.spawn_sweeper(interval),
        ];
        if let Some(fetcher) = &self.metadata {
            handles.push(fetcher.cache().spawn_sweeper(interval));
        }
        handles
    }

    async fn resolve_metadata(&self, query: &SearchQuery) -> Result<ContentMetadata, MetadataError> {
        let fetcher = self.metadata.as_ref().ok_or_else(|| {
            MetadataError::NotConfigured("no metadata service configured".to_string())
        })?;

        if is_external_id(&query.free_text) {
            fetcher
                .fetch_metadata_by_external_id(&query.free_text, query.content_type)
                .await
        } else {
            fetcher
                .fetch_metadata(&query.free_text, query.content_type)
                .await
        }
    }

    fn fan_out<F>(&self, query: &SearchQuery, mut include: F) -> Vec<Dispatch>
    where
        F: FnMut(&dyn Provider) -> bool,
    {
        self.providers
            .iter()
            .filter(|p| include(p.as_ref()))
            .map(|p| Dispatch {
                provider: Arc::clone(p),
                query: query.clone(),
            })
            .collect()
    }

    /// Decide which query variant each provider receives.
    pub(crate) fn plan_dispatch(
        &self,
        query: &SearchQuery,
        metadata: Option<&ContentMetadata>,
    ) -> (Route, Vec<Dispatch>) {
        let Some(metadata) = metadata else {
            return (Route::Fallback, self.fan_out(query, |_| true));
        };

        let year = query.year.or(metadata.year);
        let english = query
            .with_title(&metadata.english_title)
            .with_year(year)
            .with_language(ENGLISH_LANGUAGE);

        if metadata.is_english() {
            return (
                Route::English,
                self.fan_out(&english, |p| !self.is_secondary(p)),
            );
        }

        let mut dispatches = self.fan_out(&english, |p| !self.is_secondary(p));
        match (&metadata.localized_title, self.provider(&self.secondary_provider)) {
            (Some(title), Ok(provider)) => {
                let mut localized = query.with_title(title).with_year(year);
                if let Some(fetcher) = &self.metadata {
                    localized = localized.with_language(fetcher.secondary_language());
                }
                dispatches.push(Dispatch {
                    provider: Arc::clone(provider),
                    query: localized,
                });
            }
            (None, _) => debug!(
                tmdb_id = metadata.tmdb_id,
                "No localized title, skipping secondary provider"
            ),
            (Some(_), Err(_)) => debug!(
                provider = %self.secondary_provider,
                "Secondary provider not registered"
            ),
        }
        (Route::Localized, dispatches)
    }

    /// Run every dispatch in its own task and collect the results.
    async fn dispatch(&self, dispatches: Vec<Dispatch>) -> CombinedSearchResults {
        let combined = Arc::new(Mutex::new(CombinedSearchResults::default()));
        let mut tasks = JoinSet::new();

        for Dispatch { provider, query } in dispatches {
            let name = provider.name().to_string();
            let combined = Arc::clone(&combined);
            let min_confidence = self.min_confidence;

            tasks.spawn(async move {
                let outcome =
                    match std::panic::catch_unwind(AssertUnwindSafe(|| provider.query_url(&query))) {
                        Ok(url) => {
                            combined.lock().await.debug_urls.insert(name.clone(), url);
                            AssertUnwindSafe(provider.search(&query))
                                .catch_unwind()
                                .await
                                .unwrap_or_else(|panic| Err(panicked(&name, panic)))
                        }
                        Err(panic) => Err(panicked(&name, panic)),
                    };

                let mut combined = combined.lock().await;
                match outcome {
                    Ok(buckets) => {
                        debug!(provider = %name, results = buckets.len(), "Provider search succeeded");
                        combined
                            .results
                            .insert(name, rank_buckets(buckets, min_confidence));
                    }
                    Err(e) => {
                        warn!(provider = %name, error = %e, "Provider search failed");
                        combined.errors.insert(name.clone(), e.to_string());
                        combined.results.insert(name, CategoryBuckets::default());
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Provider task aborted");
            }
        }

        match Arc::try_unwrap(combined) {
            Ok(combined) => combined.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        }
    }
}

fn panicked(provider: &str, payload: Box<dyn Any + Send>) -> ProviderError {
    metrics::PROVIDER_SEARCHES
        .with_label_values(&[provider, "panicked"])
        .inc();
    ProviderError::Panicked(panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Builds an [`Orchestrator`]; providers are registered here and nowhere else.
pub struct OrchestratorBuilder {
    cache: ProviderCache,
    providers: Vec<Box<dyn Provider>>,
    metadata: Option<MetadataFetcher>,
    secondary_provider: String,
    min_confidence: f64,
}

impl OrchestratorBuilder {
    pub fn new(cache: ProviderCache) -> Self {
        Self {
            cache,
            providers: Vec::new(),
            metadata: None,
            secondary_provider: crate::provider::YGG_NAME.to_string(),
            min_confidence: 0.0,
        }
    }

    pub fn register(mut self, provider: Box<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn metadata(mut self, fetcher: MetadataFetcher) -> Self {
        self.metadata = Some(fetcher);
        self
    }

    /// Provider reserved for the secondary-language title.
    pub fn secondary_provider(mut self, name: impl Into<String>) -> Self {
        self.secondary_provider = name.into();
        self
    }

    pub fn min_confidence(mut self, threshold: f64) -> Self {
        self.min_confidence = threshold;
        self
    }

    pub fn build(self) -> Orchestrator {
        let mut providers: Vec<Arc<dyn Provider>> = Vec::with_capacity(self.providers.len());
        for mut provider in self.providers {
            if providers.iter().any(|p| p.name() == provider.name()) {
                warn!(provider = %provider.name(), "Duplicate provider name, ignoring");
                continue;
            }
            provider.set_cache(self.cache.clone());
            providers.push(Arc::from(provider));
        }

        Orchestrator {
            providers,
            metadata: self.metadata,
            secondary_provider: self.secondary_provider,
            min_confidence: self.min_confidence,
            cache: self.cache,
        }
    }
}

/// Wire an orchestrator from configuration.
///
/// Without a `[metadata]` section the orchestrator has no metadata service and
/// `search_smart` reports it as not configured.
pub fn build_orchestrator(
    config: &Config,
    parser: Arc<dyn TitleParser>,
) -> Result<Orchestrator, SearchError> {
    let ttl = Duration::from_secs(config.cache.ttl_secs);
    let cache = ProviderCache::new(config.cache.capacity, ttl);
    let classifier = Arc::new(Classifier::new(parser));

    let mut builder = Orchestrator::builder(cache)
        .secondary_provider(config.search.secondary_provider.clone())
        .min_confidence(config.search.min_confidence);

    if let Some(metadata_config) = &config.metadata {
        let client = TmdbClient::new(metadata_config)?;
        let metadata_cache = Arc::new(MemoCache::new("metadata", config.cache.capacity, ttl));
        builder = builder.metadata(MetadataFetcher::new(
            Arc::new(client),
            metadata_config.secondary_language.clone(),
            metadata_cache,
        ));
    }

    for provider in build_providers(&config.providers, classifier)? {
        builder = builder.register(provider);
    }

    let orchestrator = builder.build();
    info!(
        providers = ?orchestrator.provider_names(),
        metadata = orchestrator.metadata.is_some(),
        secondary_provider = %orchestrator.secondary_provider,
        "Orchestrator ready"
    );
    Ok(orchestrator)
}
