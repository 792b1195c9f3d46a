pub mod cache;
pub mod classifier;
pub mod config;
pub mod metadata;
pub mod metrics;
pub mod orchestrator;
pub mod parser;
pub mod provider;
pub mod testing;

pub use cache::MemoCache;
pub use classifier::{
    bucket_for, filter_by_min_confidence, rank_buckets, sort_by_confidence, Classifier,
};
pub use config::{
    load_config, load_config_env_only, load_config_from_str, validate_config, Config, ConfigError,
    SanitizedConfig,
};
pub use metadata::{
    is_external_id, ContentMetadata, MetadataError, MetadataFetcher, MetadataService, TmdbClient,
};
pub use orchestrator::{
    build_orchestrator, CombinedSearchResults, Orchestrator, OrchestratorBuilder, Route,
    SearchError, SmartSearchResult,
};
pub use parser::{NullParser, ParsedInfo, TitleParser};
pub use provider::{
    build_providers, Bucket, CandidateTorrent, CategoryBuckets, ContentType, Provider,
    ProviderCache, ProviderError, SearchQuery,
};
