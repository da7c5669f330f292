use crate::state::PageStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One extracted deal
///
/// Every field defaults to an empty string when its selector matched nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DealRecord {
    pub title: String,
    pub price: String,
    pub original_price: String,
    pub discount: String,
    pub description: String,
    pub image: String,
    pub link: String,
    pub category: String,
    pub store: String,
    pub source_url: String,
    pub timestamp: DateTime<Utc>,
}

impl DealRecord {
    /// A container match only counts as a deal when it has a title or a price
    pub fn has_minimum_signal(&self) -> bool {
        !self.title.is_empty() || !self.price.is_empty()
    }
}

/// Metadata read from the document head
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub canonical: String,
}

/// An outbound anchor exactly as written in the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredLink {
    pub href: String,
    pub text: String,
}

/// The outcome of processing one page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub url: String,
    pub title: String,
    pub metadata: PageMetadata,
    pub deals: Vec<DealRecord>,
    pub links: Vec<DiscoveredLink>,
    pub timestamp: DateTime<Utc>,
    pub status: PageStatus,

    /// Fetch attempts made, including the first
    pub attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageResult {
    /// A successfully processed page
    pub fn success(
        url: &str,
        metadata: PageMetadata,
        deals: Vec<DealRecord>,
        links: Vec<DiscoveredLink>,
        attempts: u32,
    ) -> Self {
        Self {
            url: url.to_string(),
            title: metadata.title.clone(),
            metadata,
            deals,
            links,
            timestamp: Utc::now(),
            status: PageStatus::Success,
            attempts,
            error: None,
        }
    }

    /// A page that failed permanently or ran out of retries
    pub fn failure(url: &str, attempts: u32, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            title: String::new(),
            metadata: PageMetadata::default(),
            deals: Vec::new(),
            links: Vec::new(),
            timestamp: Utc::now(),
            status: PageStatus::Failed,
            attempts,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
