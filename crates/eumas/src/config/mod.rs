use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{EumasError, Result};

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const WEAVIATE_URL_ENV: &str = "WEAVIATE_URL";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const ENVIRONMENT_ENV: &str = "ENVIRONMENT";

/// Main configuration structure for EUMAS.
///
/// Built once at startup and passed by reference to the components that need
/// it; nothing in the crate reads process-wide settings on its own.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Vector store connection configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Batch import configuration
    #[serde(default)]
    pub batch: BatchSettings,
    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    /// API key for the embeddings endpoint
    #[serde(default)]
    pub api_key: String,
    /// Model identifier sent with every request
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_embedding_api_url")]
    pub api_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_embedding_model(),
            api_url: default_embedding_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_embedding_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Weaviate connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Weaviate base URL (e.g., "http://localhost:8080")
    #[serde(default)]
    pub url: String,
    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            headers: BTreeMap::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Batch import configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSettings {
    /// Objects accumulated before a flush
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Retries of a flush that failed at the transport level
    #[serde(default = "default_timeout_retries")]
    pub timeout_retries: u32,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            timeout_retries: default_timeout_retries(),
        }
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_timeout_retries() -> u32 {
    3
}

/// Log output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "json" for structured output, anything else for human-readable
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Deployment environment name, attached to the startup event
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            environment: default_environment(),
        }
    }
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

impl Config {
    /// Build a configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup, starting from defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_lookup(lookup);
        config
    }

    /// Overlay values found through `lookup` onto this configuration.
    /// Unset keys leave the current value untouched.
    pub fn apply_lookup<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(OPENAI_API_KEY_ENV) {
            self.embedding.api_key = key;
        }
        if let Some(url) = lookup(WEAVIATE_URL_ENV) {
            self.store.url = url;
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            self.logging.level = level;
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            self.logging.format = format;
        }
        if let Some(environment) = lookup(ENVIRONMENT_ENV) {
            self.logging.environment = environment;
        }
    }

    /// Parse a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from: {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            EumasError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content)
            .map_err(|e| EumasError::config(format!("Failed to parse config: {e}")))
    }

    /// Load the first config file found in the default locations, then
    /// overlay the environment. Falls back to defaults plus environment.
    pub fn load_default() -> Result<Self> {
        let mut config = match Self::default_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load(&path)?,
            None => {
                tracing::info!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_lookup(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn default_paths() -> Vec<PathBuf> {
        [
            dirs::home_dir().map(|h| h.join(".eumas").join("config.toml")),
            dirs::config_dir().map(|c| c.join("eumas").join("config.toml")),
            Some(PathBuf::from("config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Check required settings.
    ///
    /// Returns a description of the first missing requirement (API key is
    /// checked before the store URL), or `None` when everything is present.
    pub fn validate(&self) -> Option<String> {
        if self.embedding.api_key.is_empty() {
            return Some(format!("{OPENAI_API_KEY_ENV} is not set"));
        }
        if self.store.url.is_empty() {
            return Some(format!("{WEAVIATE_URL_ENV} is not set"));
        }
        None
    }

    /// Like [`Config::validate`], but as a configuration error.
    pub fn ensure_valid(&self) -> Result<()> {
        match self.validate() {
            Some(message) => Err(EumasError::config(message)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.embedding.api_key.is_empty());
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.embedding.api_url, "https://api.openai.com/v1");
        assert_eq!(config.embedding.timeout_secs, 30);
        assert!(config.store.url.is_empty());
        assert!(config.store.headers.is_empty());
        assert_eq!(config.batch.batch_size, 100);
        assert_eq!(config.batch.timeout_retries, 3);
        assert_eq!(config.logging.level, "INFO");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.environment, "development");
    }

    #[test]
    fn test_config_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "test_key"),
            ("WEAVIATE_URL", "test_url"),
            ("LOG_LEVEL", "DEBUG"),
            ("LOG_FORMAT", "json"),
            ("ENVIRONMENT", "test"),
        ]));

        assert_eq!(config.embedding.api_key, "test_key");
        assert_eq!(config.store.url, "test_url");
        assert_eq!(config.logging.level, "DEBUG");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.environment, "test");
    }

    #[test]
    fn test_validate_missing_api_key() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", ""),
            ("WEAVIATE_URL", "test_url"),
        ]));
        assert_eq!(config.validate().as_deref(), Some("OPENAI_API_KEY is not set"));
    }

    #[test]
    fn test_validate_missing_url() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "test_key"),
            ("WEAVIATE_URL", ""),
        ]));
        assert_eq!(config.validate().as_deref(), Some("WEAVIATE_URL is not set"));
    }

    #[test]
    fn test_validate_api_key_checked_first() {
        let config = Config::from_lookup(lookup_from(&[]));
        assert_eq!(config.validate().as_deref(), Some("OPENAI_API_KEY is not set"));
        assert!(config.ensure_valid().is_err());
    }

    #[test]
    fn test_validate_ok() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "test_key"),
            ("WEAVIATE_URL", "http://localhost:8080"),
        ]));
        assert!(config.validate().is_none());
        assert!(config.ensure_valid().is_ok());
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
[embedding]
api_key = "sk-test"
model = "text-embedding-3-small"
api_url = "http://localhost:9000/v1"
timeout_secs = 10

[store]
url = "http://localhost:8080"
timeout_secs = 5

[store.headers]
X-Introspection = "enabled"

[batch]
batch_size = 50
timeout_retries = 1

[logging]
level = "DEBUG"
format = "pretty"
environment = "production"
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to parse TOML");

        assert_eq!(config.embedding.api_key, "sk-test");
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.embedding.api_url, "http://localhost:9000/v1");
        assert_eq!(config.embedding.timeout_secs, 10);
        assert_eq!(config.store.url, "http://localhost:8080");
        assert_eq!(config.store.timeout_secs, 5);
        assert_eq!(
            config.store.headers.get("X-Introspection").map(String::as_str),
            Some("enabled")
        );
        assert_eq!(config.batch.batch_size, 50);
        assert_eq!(config.batch.timeout_retries, 1);
        assert_eq!(config.logging.level, "DEBUG");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.logging.environment, "production");
    }

    #[test]
    fn test_toml_partial_deserialization() {
        let toml_str = r#"
[store]
url = "http://weaviate:8080"
"#;

        let config: Config = toml::from_str(toml_str).expect("Failed to parse partial TOML");

        assert_eq!(config.store.url, "http://weaviate:8080");
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.batch.batch_size, 100);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_lookup_overlays_file_values() {
        let mut config: Config = toml::from_str(
            r#"
[store]
url = "http://from-file:8080"
"#,
        )
        .unwrap();

        config.apply_lookup(lookup_from(&[("OPENAI_API_KEY", "from-env")]));

        assert_eq!(config.embedding.api_key, "from-env");
        assert_eq!(config.store.url, "http://from-file:8080");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[batch]\nbatch_size = 25\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.batch.batch_size, 25);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(&dir.path().join("missing.toml"));

        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("Configuration error"));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[batch\nbatch_size = ").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
