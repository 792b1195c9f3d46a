use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variable prefix. Nested keys are separated by a double
/// underscore: `MAGNETAR_METADATA__API_KEY`, `MAGNETAR_PROVIDERS__YGG__ENABLED`.
pub const ENV_PREFIX: &str = "MAGNETAR_";

fn layered(path: &Path) -> Figment {
    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load configuration from a TOML file, then apply environment overrides.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    layered(path)
        .extract()
        .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))
}

/// Built-in defaults with environment overrides, for runs without a file.
pub fn load_config_env_only() -> Result<Config, ConfigError> {
    Figment::new()
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Parse configuration from a TOML string, without environment overrides.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_parse_partial_config() {
        let config = load_config_from_str("[cache]\ncapacity = 10\n").unwrap();
        assert_eq!(config.cache.capacity, 10);
        assert_eq!(config.cache.ttl_secs, 3600);
    }

    #[test]
    fn test_parse_wrong_type_is_error() {
        let result = load_config_from_str("[cache]\ncapacity = \"lots\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Path::new("/nonexistent/magnetar.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let file = temp_config(
            r#"
[metadata]
api_key = "from-file"

[providers.torrents_csv]
enabled = false
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.metadata.unwrap().api_key, "from-file");
        assert!(!config.providers.torrents_csv.enabled);
        assert!(config.providers.apibay.enabled);
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        let file = temp_config("[providers.ygg]\nlimit = 20\n");
        std::env::set_var("MAGNETAR_PROVIDERS__YGG__TIMEOUT_SECS", "4");

        let config = load_config(file.path()).unwrap();
        std::env::remove_var("MAGNETAR_PROVIDERS__YGG__TIMEOUT_SECS");

        assert_eq!(config.providers.ygg.limit, 20);
        assert_eq!(config.providers.ygg.timeout_secs, 4);
    }

    #[test]
    fn test_env_only_without_file() {
        std::env::set_var("MAGNETAR_SEARCH__SECONDARY_PROVIDER", "torrents_csv");
        std::env::set_var("MAGNETAR_CACHE__TTL_SECS", "120");
        let config = load_config_env_only().unwrap();
        std::env::remove_var("MAGNETAR_SEARCH__SECONDARY_PROVIDER");
        std::env::remove_var("MAGNETAR_CACHE__TTL_SECS");

        assert_eq!(config.search.secondary_provider, "torrents_csv");
        assert_eq!(config.cache.ttl_secs, 120);
        assert_eq!(config.cache.capacity, 1000);
        assert!(config.providers.ygg.enabled);
    }
}
