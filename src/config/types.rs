use crate::url::LinkStrategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main configuration structure
///
/// Every field has a default, so an empty TOML file yields a usable
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// URLs the crawl starts from
    pub start_urls: Vec<String>,

    /// Which discovered links stay in scope
    pub link_strategy: LinkStrategy,

    /// Glob patterns a discovered URL must match (any of) to be followed
    pub follow_patterns: Vec<String>,

    /// Glob patterns that reject a URL; these win over follow patterns
    pub exclude_patterns: Vec<String>,

    pub crawler: CrawlerConfig,

    pub user_agent: UserAgentConfig,

    pub selectors: SelectorsConfig,

    pub output: OutputConfig,

    /// Named override sets selected with `--profile`
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, super::ConfigOverrides>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start_urls: vec!["https://www.dealnews.com".to_string()],
            link_strategy: LinkStrategy::SameDomain,
            follow_patterns: [
                "**/deals/**",
                "**/products/**",
                "**/sales/**",
                "**/offers/**",
                "**/discounts/**",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            exclude_patterns: [
                "**/login/**",
                "**/register/**",
                "**/cart/**",
                "**/checkout/**",
                "**/admin/**",
                "**/api/**",
                "**/*.pdf",
                "**/*.jpg",
                "**/*.png",
                "**/*.gif",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            crawler: CrawlerConfig::default(),
            user_agent: UserAgentConfig::default(),
            selectors: SelectorsConfig::default(),
            output: OutputConfig::default(),
            profiles: BTreeMap::new(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Maximum number of first-attempt requests per crawl
    pub max_requests_per_crawl: u32,

    /// Retries allowed after a transient failure
    pub max_request_retries: u32,

    /// Maximum number of pages processed at the same time
    pub max_concurrency: u32,

    /// Minimum time between dispatches to the same host (milliseconds)
    pub politeness_delay_ms: u64,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_requests_per_crawl: 20,
            max_request_retries: 3,
            max_concurrency: 4,
            politeness_delay_ms: 1000,
            request_timeout_secs: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct UserAgentConfig {
    pub crawler_name: String,

    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "DealCrawler".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// CSS selectors used to locate deals and their fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SelectorsConfig {
    /// Deal container selector; field selectors are scoped to its matches
    pub deals: String,
    pub titles: String,
    pub prices: String,
    pub original_prices: String,
    pub discounts: String,
    pub descriptions: String,
    pub images: String,
    pub links: String,
    pub categories: String,
    pub stores: String,
}

impl Default for SelectorsConfig {
    fn default() -> Self {
        Self {
            deals: r#"[class*="deal"], [class*="product"], [class*="item"]"#.to_string(),
            titles: "h1, h2, h3, h4, .title, .name".to_string(),
            prices: r#"[class*="price"], .price, .cost"#.to_string(),
            original_prices: r#"[class*="original"], .original-price"#.to_string(),
            discounts: r#"[class*="discount"], .discount, .savings"#.to_string(),
            descriptions: r#"[class*="description"], .description, .summary"#.to_string(),
            images: "img".to_string(),
            links: "a".to_string(),
            categories: r#"[class*="category"], .category"#.to_string(),
            stores: r#"[class*="store"], .store, .merchant"#.to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Path to the SQLite dataset file
    pub dataset_path: String,

    /// Persist page results to the dataset
    pub save_to_dataset: bool,

    /// Log a sample of each page's deals
    pub log_to_console: bool,

    /// How many deals per page to log
    pub max_deals_to_log: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dataset_path: "./storage/dataset.db".to_string(),
            save_to_dataset: true,
            log_to_console: true,
            max_deals_to_log: 3,
        }
    }
}
