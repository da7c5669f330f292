//! Deal extraction over a parsed document

use crate::config::{DealField, SelectorConfig};
use crate::extract::record::DealRecord;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};

/// Extracts every deal that passes the minimum-signal rule
///
/// Each node matching the deal container selector is handled independently.
/// Field selectors are scoped to that node and only their first match is read.
pub fn extract_deals(
    document: &Html,
    selectors: &SelectorConfig,
    source_url: &str,
    timestamp: DateTime<Utc>,
) -> Vec<DealRecord> {
    let Some(container) = selectors.deal_container.compiled.as_ref() else {
        return Vec::new();
    };

    document
        .select(container)
        .map(|node| {
            let field = |f: DealField| resolve_field(node, selectors, f);
            DealRecord {
                title: field(DealField::Title),
                price: field(DealField::Price),
                original_price: field(DealField::OriginalPrice),
                discount: field(DealField::Discount),
                description: field(DealField::Description),
                image: field(DealField::Image),
                link: field(DealField::Link),
                category: field(DealField::Category),
                store: field(DealField::Store),
                source_url: source_url.to_string(),
                timestamp,
            }
        })
        .filter(DealRecord::has_minimum_signal)
        .collect()
}

/// Reads one field from the first matching descendant of `node`
fn resolve_field(node: ElementRef<'_>, selectors: &SelectorConfig, field: DealField) -> String {
    let Some(selector) = selectors.field(field).and_then(|f| f.compiled.as_ref()) else {
        return String::new();
    };

    let Some(first) = node.select(selector).next() else {
        return String::new();
    };

    match field.attribute() {
        Some(attr) => first.value().attr(attr).unwrap_or_default().to_string(),
        None => first.text().collect::<String>().trim().to_string(),
    }
}
