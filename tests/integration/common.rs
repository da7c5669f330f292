//! Shared helpers for the integration tests

use async_trait::async_trait;
use deal_crawler::config::Config;
use deal_crawler::crawler::{FetchError, FetchedPage, Fetcher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;
use wiremock::ResponseTemplate;

/// A configuration crawling `start_url` with no politeness delay and no
/// follow patterns, writing to memory only
pub fn test_config(start_url: &str) -> Config {
    let mut config = Config {
        start_urls: vec![start_url.to_string()],
        follow_patterns: Vec::new(),
        exclude_patterns: Vec::new(),
        ..Default::default()
    };
    config.crawler.politeness_delay_ms = 0;
    config.crawler.request_timeout_secs = 5;
    config.output.save_to_dataset = false;
    config.output.log_to_console = false;
    config
}

/// An HTML response; `set_body_string` would label it text/plain
pub fn html(body: impl Into<String>) -> ResponseTemplate {
    let body: String = body.into();
    ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/html")
}

/// What a [`ScriptedFetcher`] does on every call
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Serve an empty page after `delay`
    Page { delay: Duration },
    /// Always fail with a transient error
    AlwaysTransient,
}

/// In-process fetcher that counts calls and concurrent fetches
pub struct ScriptedFetcher {
    script: Script,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most fetches ever running at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match self.script {
            Script::AlwaysTransient => Err(FetchError::transient(url, "HTTP 503", Some(503))),
            Script::Page { delay } => {
                let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                self.active.fetch_sub(1, Ordering::SeqCst);

                Ok(FetchedPage {
                    url: url.clone(),
                    status: 200,
                    content_type: Some("text/html".to_string()),
                    body: "<html><head><title>Page</title></head><body></body></html>".to_string(),
                })
            }
        }
    }
}
