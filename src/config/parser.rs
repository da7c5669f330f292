use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use deal_crawler::config::load_config;
///
/// let config = load_config(Path::new("crawler.toml")).unwrap();
/// println!("Budget: {}", config.crawler.max_requests_per_crawl);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is recorded with every run so datasets can be traced back to the
/// configuration that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

/// Hashes arbitrary configuration text
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Loads the configuration at `path`, or the built-in defaults when absent
///
/// The hash of the default configuration is computed over its JSON form.
pub fn load_config_or_default(path: Option<&Path>) -> Result<(Config, String), ConfigError> {
    match path {
        Some(path) => load_config_with_hash(path),
        None => {
            let config = Config::default();
            let json = serde_json::to_string(&config)
                .map_err(|e| ConfigError::Validation(format!("Cannot encode defaults: {}", e)))?;
            Ok((config, hash_content(&json)))
        }
    }
}
