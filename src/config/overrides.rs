//! Caller-supplied configuration overrides
//!
//! Overrides come from three places: named profiles (config file or
//! built-in), the `customConfig` body of the configurable crawl endpoint, and
//! `PUT /config`. All of them are shallow-merged onto a base [`Config`].

use crate::config::types::{Config, OutputConfig, SelectorsConfig};
use crate::url::LinkStrategy;
use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// A partial configuration; present keys replace the base value wholesale
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverrides {
    #[serde(alias = "start-urls", skip_serializing_if = "Option::is_none")]
    pub start_urls: Option<Vec<String>>,

    #[serde(alias = "link-strategy", skip_serializing_if = "Option::is_none")]
    pub link_strategy: Option<LinkStrategy>,

    #[serde(alias = "follow-patterns", skip_serializing_if = "Option::is_none")]
    pub follow_patterns: Option<Vec<String>>,

    #[serde(alias = "exclude-patterns", skip_serializing_if = "Option::is_none")]
    pub exclude_patterns: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub selectors: Option<SelectorOverrides>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputOverrides>,

    #[serde(alias = "max-requests-per-crawl", skip_serializing_if = "Option::is_none")]
    pub max_requests_per_crawl: Option<u32>,

    #[serde(alias = "max-request-retries", skip_serializing_if = "Option::is_none")]
    pub max_request_retries: Option<u32>,

    #[serde(alias = "max-concurrency", skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<u32>,

    #[serde(alias = "politeness-delay-ms", skip_serializing_if = "Option::is_none")]
    pub politeness_delay_ms: Option<u64>,

    #[serde(alias = "request-timeout-secs", skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

/// A replacement selector table; missing fields become empty selectors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectorOverrides {
    pub deals: Option<String>,
    pub titles: Option<String>,
    pub prices: Option<String>,
    #[serde(alias = "original-prices")]
    pub original_prices: Option<String>,
    pub discounts: Option<String>,
    pub descriptions: Option<String>,
    pub images: Option<String>,
    pub links: Option<String>,
    pub categories: Option<String>,
    pub stores: Option<String>,
}

/// Output settings to change; unlike selectors, absent fields keep the base value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputOverrides {
    #[serde(alias = "dataset-path", skip_serializing_if = "Option::is_none")]
    pub dataset_path: Option<String>,

    #[serde(alias = "save-to-dataset", skip_serializing_if = "Option::is_none")]
    pub save_to_dataset: Option<bool>,

    #[serde(alias = "log-to-console", skip_serializing_if = "Option::is_none")]
    pub log_to_console: Option<bool>,

    #[serde(alias = "max-deals-to-log", skip_serializing_if = "Option::is_none")]
    pub max_deals_to_log: Option<usize>,
}

impl OutputOverrides {
    fn apply(self, output: &mut OutputConfig) {
        if let Some(v) = self.dataset_path {
            output.dataset_path = v;
        }
        if let Some(v) = self.save_to_dataset {
            output.save_to_dataset = v;
        }
        if let Some(v) = self.log_to_console {
            output.log_to_console = v;
        }
        if let Some(v) = self.max_deals_to_log {
            output.max_deals_to_log = v;
        }
    }
}

impl SelectorOverrides {
    fn into_selectors(self) -> SelectorsConfig {
        SelectorsConfig {
            deals: self.deals.unwrap_or_default(),
            titles: self.titles.unwrap_or_default(),
            prices: self.prices.unwrap_or_default(),
            original_prices: self.original_prices.unwrap_or_default(),
            discounts: self.discounts.unwrap_or_default(),
            descriptions: self.descriptions.unwrap_or_default(),
            images: self.images.unwrap_or_default(),
            links: self.links.unwrap_or_default(),
            categories: self.categories.unwrap_or_default(),
            stores: self.stores.unwrap_or_default(),
        }
    }
}

impl Config {
    /// Returns a new configuration with `overrides` shallow-merged on top
    ///
    /// # Example
    ///
    /// ```
    /// use deal_crawler::config::{Config, ConfigOverrides};
    ///
    /// let overrides = ConfigOverrides {
    ///     max_requests_per_crawl: Some(5),
    ///     ..Default::default()
    /// };
    /// let merged = Config::default().merged(&overrides);
    /// assert_eq!(merged.crawler.max_requests_per_crawl, 5);
    /// assert_eq!(merged.crawler.max_request_retries, 3);
    /// ```
    pub fn merged(&self, overrides: &ConfigOverrides) -> Config {
        let mut config = self.clone();
        let o = overrides.clone();

        if let Some(v) = o.start_urls {
            config.start_urls = v;
        }
        if let Some(v) = o.link_strategy {
            config.link_strategy = v;
        }
        if let Some(v) = o.follow_patterns {
            config.follow_patterns = v;
        }
        if let Some(v) = o.exclude_patterns {
            config.exclude_patterns = v;
        }
        if let Some(v) = o.selectors {
            config.selectors = v.into_selectors();
        }
        if let Some(v) = o.output {
            v.apply(&mut config.output);
        }
        if let Some(v) = o.max_requests_per_crawl {
            config.crawler.max_requests_per_crawl = v;
        }
        if let Some(v) = o.max_request_retries {
            config.crawler.max_request_retries = v;
        }
        if let Some(v) = o.max_concurrency {
            config.crawler.max_concurrency = v;
        }
        if let Some(v) = o.politeness_delay_ms {
            config.crawler.politeness_delay_ms = v;
        }
        if let Some(v) = o.request_timeout_secs {
            config.crawler.request_timeout_secs = v;
        }

        config
    }

    /// Applies a named profile
    ///
    /// Profiles defined in the configuration file take precedence over the
    /// built-in `development`, `production` and `testing` profiles.
    pub fn with_profile(&self, name: &str) -> Result<Config, ConfigError> {
        let overrides = match self.profiles.get(name) {
            Some(o) => o.clone(),
            None => builtin_profile(name)
                .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?,
        };
        Ok(self.merged(&overrides))
    }
}

/// Built-in environment profiles
fn builtin_profile(name: &str) -> Option<ConfigOverrides> {
    match name {
        "development" => Some(ConfigOverrides::default()),
        "production" => Some(ConfigOverrides {
            max_requests_per_crawl: Some(50),
            politeness_delay_ms: Some(2000),
            ..Default::default()
        }),
        "testing" => Some(ConfigOverrides {
            max_requests_per_crawl: Some(5),
            ..Default::default()
        }),
        _ => None,
    }
}
