use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub metadata: Option<MetadataConfig>,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Shared in-memory cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Max entries per cache namespace
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    /// Entry time-to-live in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    /// Background sweep interval in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_sweep_interval() -> u64 {
    300
}

/// Metadata service (TMDB) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataConfig {
    /// TMDB API key
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// TMDB language tag of the secondary localized title
    #[serde(default = "default_secondary_language")]
    pub secondary_language: String,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_secondary_language() -> String {
    "fr-FR".to_string()
}

fn default_timeout() -> u32 {
    10
}

/// Orchestration configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Provider reserved for the secondary-language title
    #[serde(default = "default_secondary_provider")]
    pub secondary_provider: String,
    /// Candidates below this confidence are dropped (0 keeps everything)
    #[serde(default)]
    pub min_confidence: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            secondary_provider: default_secondary_provider(),
            min_confidence: 0.0,
        }
    }
}

fn default_secondary_provider() -> String {
    "ygg".to_string()
}

/// Indexer provider configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub apibay: IndexerConfig,
    #[serde(default)]
    pub torrents_csv: IndexerConfig,
    #[serde(default)]
    pub ygg: IndexerConfig,
}

/// Single indexer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Override the indexer's public API URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Max candidates kept per search
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: None,
            timeout_secs: default_timeout(),
            limit: default_limit(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_limit() -> usize {
    100
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub cache: CacheConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SanitizedMetadataConfig>,
    pub search: SearchConfig,
    pub providers: ProvidersConfig,
}

/// Sanitized metadata config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMetadataConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub api_key_configured: bool,
    pub secondary_language: String,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            cache: config.cache.clone(),
            metadata: config.metadata.as_ref().map(|m| SanitizedMetadataConfig {
                base_url: m.base_url.clone(),
                api_key_configured: !m.api_key.is_empty(),
                secondary_language: m.secondary_language.clone(),
                timeout_secs: m.timeout_secs,
            }),
            search: config.search.clone(),
            providers: config.providers.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cache.capacity, 1000);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert_eq!(config.search.secondary_provider, "ygg");
        assert_eq!(config.search.min_confidence, 0.0);
        assert!(config.metadata.is_none());
        assert!(config.providers.apibay.enabled);
        assert_eq!(config.providers.ygg.limit, 100);
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[cache]
capacity = 50
ttl_secs = 60

[metadata]
api_key = "tmdb-key"
secondary_language = "es-ES"

[search]
secondary_provider = "torrents_csv"
min_confidence = 0.5

[providers.apibay]
enabled = false

[providers.ygg]
base_url = "http://localhost:9000"
timeout_secs = 3
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.capacity, 50);
        assert_eq!(config.cache.sweep_interval_secs, 300); // default

        let metadata = config.metadata.as_ref().unwrap();
        assert_eq!(metadata.api_key, "tmdb-key");
        assert_eq!(metadata.secondary_language, "es-ES");
        assert_eq!(metadata.timeout_secs, 10);

        assert_eq!(config.search.secondary_provider, "torrents_csv");
        assert!(!config.providers.apibay.enabled);
        assert!(config.providers.torrents_csv.enabled);
        assert_eq!(
            config.providers.ygg.base_url.as_deref(),
            Some("http://localhost:9000")
        );
        assert_eq!(config.providers.ygg.timeout_secs, 3);
    }

    #[test]
    fn test_metadata_requires_api_key_field() {
        let toml = r#"
[metadata]
secondary_language = "fr-FR"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let config: Config = toml::from_str(
            r#"
[metadata]
api_key = "secret-key"
"#,
        )
        .unwrap();

        let sanitized = SanitizedConfig::from(&config);
        let metadata = sanitized.metadata.as_ref().unwrap();
        assert!(metadata.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
    }
}
