//! Configuration module
//!
//! This module handles loading, parsing, validating and merging the TOML
//! crawler configuration, and builds the immutable [`SelectorConfig`]
//! snapshot each crawl runs with.
//!
//! # Example
//!
//! ```no_run
//! use deal_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! let production = config.with_profile("production").unwrap();
//! println!("Budget: {}", production.crawler.max_requests_per_crawl);
//! ```

mod overrides;
mod parser;
mod selector;
mod types;
mod validation;

pub use overrides::{ConfigOverrides, OutputOverrides, SelectorOverrides};
pub use selector::{DealField, FieldSelector, SelectorConfig};
pub use types::{
    Config, CrawlerConfig, OutputConfig, SelectorsConfig, UserAgentConfig,
};
pub use validation::validate;

pub use parser::{
    compute_config_hash, hash_content, load_config, load_config_or_default,
    load_config_with_hash, parse_config,
};
