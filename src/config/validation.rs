use crate::config::types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::url::compile_globs;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_start_urls(&config.start_urls)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    compile_globs(&config.follow_patterns)?;
    compile_globs(&config.exclude_patterns)?;
    config.selector_config()?;
    Ok(())
}

/// Validates seed URLs: at least one, all absolute HTTP(S)
pub fn validate_start_urls(urls: &[String]) -> Result<(), ConfigError> {
    if urls.is_empty() {
        return Err(ConfigError::Validation(
            "At least one start URL is required".to_string(),
        ));
    }

    for raw in urls {
        let url = Url::parse(raw)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", raw, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Start URL '{}' must use HTTP or HTTPS",
                raw
            )));
        }
    }

    Ok(())
}

/// Validates crawler limits
pub fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and 100, got {}",
            config.max_concurrency
        )));
    }

    if config.max_requests_per_crawl < 1 {
        return Err(ConfigError::Validation(format!(
            "max_requests_per_crawl must be >= 1, got {}",
            config.max_requests_per_crawl
        )));
    }

    if config.max_request_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_request_retries must be <= 10, got {}",
            config.max_request_retries
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.save_to_dataset && config.dataset_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "dataset_path cannot be empty when save_to_dataset is enabled".to_string(),
        ));
    }

    Ok(())
}
