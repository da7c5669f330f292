//! Extractor
//!
//! Turns a parsed document into page metadata, deal records and outbound
//! links. Extraction is a pure function of the document and the selector
//! snapshot; a selector that matches nothing only produces empty values.

mod deals;
mod page;
mod record;

pub use deals::extract_deals;
pub use page::{extract_links, extract_metadata, resolve_link};
pub use record::{DealRecord, DiscoveredLink, PageMetadata, PageResult};

use crate::config::SelectorConfig;
use chrono::{DateTime, Utc};
use scraper::Html;
use url::Url;

/// Everything extracted from one page
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub metadata: PageMetadata,
    pub deals: Vec<DealRecord>,

    /// Every `a[href]` as written in the page
    pub links: Vec<DiscoveredLink>,

    /// Absolute HTTP(S) URLs to offer to the frontier
    pub outbound: Vec<Url>,
}

/// Extracts metadata, deals and links from a parsed page
///
/// # Arguments
///
/// * `document` - The parsed HTML page
/// * `selectors` - The crawl's compiled selector snapshot
/// * `source_url` - Final URL of the page, used to resolve relative links
///
/// # Returns
///
/// An `ExtractedPage` holding the page metadata, the deal records that pass
/// the minimum-signal rule, the raw links and the resolved outbound URLs
///
/// # Example
///
/// ```
/// use deal_crawler::config::Config;
/// use deal_crawler::extract::extract_page;
/// use scraper::Html;
/// use url::Url;
///
/// let html = r#"<title>Deals</title><div class="deal"><h2>Widget</h2><span class="price">$5</span></div>"#;
/// let selectors = Config::default().selector_config().unwrap();
/// let source = Url::parse("https://example.test/").unwrap();
///
/// let page = extract_page(&Html::parse_document(html), &selectors, &source);
/// assert_eq!(page.metadata.title, "Deals");
/// assert_eq!(page.deals[0].title, "Widget");
/// ```
pub fn extract_page(document: &Html, selectors: &SelectorConfig, source_url: &Url) -> ExtractedPage {
    extract_page_at(document, selectors, source_url, Utc::now())
}

/// Same as [`extract_page`] with a fixed extraction timestamp
pub fn extract_page_at(
    document: &Html,
    selectors: &SelectorConfig,
    source_url: &Url,
    timestamp: DateTime<Utc>,
) -> ExtractedPage {
    let metadata = extract_metadata(document);
    let deals = extract_deals(document, selectors, source_url.as_str(), timestamp);
    let (links, outbound) = extract_links(document, source_url);

    ExtractedPage {
        metadata,
        deals,
        links,
        outbound,
    }
}
