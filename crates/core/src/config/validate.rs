use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Cache capacity, TTL and sweep interval are non-zero
/// - min_confidence is a finite number
/// - A secondary provider is named
/// - At least one provider is enabled
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.cache.capacity == 0 {
        return Err(ConfigError::ValidationError(
            "cache.capacity cannot be 0".to_string(),
        ));
    }
    if config.cache.ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "cache.ttl_secs cannot be 0".to_string(),
        ));
    }
    if config.cache.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "cache.sweep_interval_secs cannot be 0".to_string(),
        ));
    }

    if !config.search.min_confidence.is_finite() {
        return Err(ConfigError::ValidationError(
            "search.min_confidence must be a finite number".to_string(),
        ));
    }
    if config.search.secondary_provider.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "search.secondary_provider cannot be empty".to_string(),
        ));
    }

    let providers = &config.providers;
    if !(providers.apibay.enabled || providers.torrents_csv.enabled || providers.ygg.enabled) {
        return Err(ConfigError::ValidationError(
            "at least one provider must be enabled".to_string(),
        ));
    }

    Ok(())
}
