//! Page-level extraction: head metadata and outbound links
//!
//! Link extraction rules:
//!
//! **Include:** `<a href="...">` anywhere in the document
//!
//! **Skip when enqueueing:** `javascript:`, `mailto:`, `tel:` and `data:`
//! hrefs, fragment-only anchors, `<a download>` and anything that does not
//! resolve to HTTP(S). These are still reported as discovered links.

use crate::extract::record::{DiscoveredLink, PageMetadata};
use scraper::{Html, Selector};
use url::Url;

/// Extracts title, description, keywords and canonical link
pub fn extract_metadata(document: &Html) -> PageMetadata {
    PageMetadata {
        title: first_text(document, "title"),
        description: first_attr(document, r#"meta[name="description"]"#, "content"),
        keywords: first_attr(document, r#"meta[name="keywords"]"#, "content"),
        canonical: first_attr(document, r#"link[rel="canonical"]"#, "href"),
    }
}

fn first_text(document: &Html, selector: &str) -> String {
    let Ok(selector) = Selector::parse(selector) else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> String {
    let Ok(selector) = Selector::parse(selector) else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr(attr))
        .unwrap_or_default()
        .to_string()
}

/// Extracts every anchor's href and text, plus the absolute URLs worth enqueueing
pub fn extract_links(document: &Html, base_url: &Url) -> (Vec<DiscoveredLink>, Vec<Url>) {
    let mut discovered = Vec::new();
    let mut outbound = Vec::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return (discovered, outbound);
    };

    for element in document.select(&a_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        discovered.push(DiscoveredLink {
            href: href.to_string(),
            text: element.text().collect::<String>().trim().to_string(),
        });

        // Skip if it has the download attribute
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(absolute) = resolve_link(href, base_url) {
            outbound.push(absolute);
        }
    }

    (discovered, outbound)
}

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None for special schemes, fragment-only anchors and anything that
/// fails to resolve.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}
