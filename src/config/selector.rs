//! Immutable selector snapshot shared by every page processed in a crawl

use crate::config::types::{Config, SelectorsConfig};
use crate::url::LinkFilter;
use crate::ConfigError;
use scraper::Selector;
use std::collections::BTreeMap;
use std::fmt;

/// A named field of a deal record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DealField {
    Title,
    Price,
    OriginalPrice,
    Discount,
    Description,
    Image,
    Link,
    Category,
    Store,
}

impl DealField {
    pub const ALL: [DealField; 9] = [
        DealField::Title,
        DealField::Price,
        DealField::OriginalPrice,
        DealField::Discount,
        DealField::Description,
        DealField::Image,
        DealField::Link,
        DealField::Category,
        DealField::Store,
    ];

    /// The attribute read from the first match, or `None` for its text
    pub fn attribute(&self) -> Option<&'static str> {
        match self {
            Self::Image => Some("src"),
            Self::Link => Some("href"),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Price => "price",
            Self::OriginalPrice => "originalPrice",
            Self::Discount => "discount",
            Self::Description => "description",
            Self::Image => "image",
            Self::Link => "link",
            Self::Category => "category",
            Self::Store => "store",
        }
    }
}

impl fmt::Display for DealField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A CSS selector kept alongside its source text
///
/// `compiled` is `None` when the source is empty or fails to parse; such a
/// selector matches nothing.
#[derive(Debug, Clone)]
pub struct FieldSelector {
    pub source: String,
    pub compiled: Option<Selector>,
}

impl FieldSelector {
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        let compiled = if trimmed.is_empty() {
            None
        } else {
            match Selector::parse(trimmed) {
                Ok(selector) => Some(selector),
                Err(e) => {
                    tracing::warn!("Ignoring unparsable selector '{}': {:?}", trimmed, e);
                    None
                }
            }
        };

        Self {
            source: source.to_string(),
            compiled,
        }
    }
}

/// The selector configuration a crawl runs with
///
/// Built once per run and shared behind an `Arc`; it is never mutated after
/// the crawl starts.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub link_filter: LinkFilter,
    pub deal_container: FieldSelector,
    pub fields: BTreeMap<DealField, FieldSelector>,
}

impl SelectorConfig {
    /// Compiles the selector table and link rules
    ///
    /// An unparsable field selector only produces empty values, but the deal
    /// container selector must be valid when non-empty.
    ///
    /// # Arguments
    ///
    /// * `selectors` - Selector strings from the configuration
    /// * `link_filter` - Strategy and glob patterns for discovered links
    ///
    /// # Returns
    ///
    /// The immutable snapshot shared by every unit of a crawl, or
    /// `ConfigError::InvalidPattern` for a bad container selector
    pub fn new(selectors: &SelectorsConfig, link_filter: LinkFilter) -> Result<Self, ConfigError> {
        let deal_container = FieldSelector::parse(&selectors.deals);
        if deal_container.compiled.is_none() && !selectors.deals.trim().is_empty() {
            return Err(ConfigError::InvalidPattern(format!(
                "Invalid deal container selector '{}'",
                selectors.deals
            )));
        }

        let fields = DealField::ALL
            .iter()
            .map(|field| {
                let source = match field {
                    DealField::Title => &selectors.titles,
                    DealField::Price => &selectors.prices,
                    DealField::OriginalPrice => &selectors.original_prices,
                    DealField::Discount => &selectors.discounts,
                    DealField::Description => &selectors.descriptions,
                    DealField::Image => &selectors.images,
                    DealField::Link => &selectors.links,
                    DealField::Category => &selectors.categories,
                    DealField::Store => &selectors.stores,
                };
                (*field, FieldSelector::parse(source))
            })
            .collect();

        Ok(Self {
            link_filter,
            deal_container,
            fields,
        })
    }

    /// A configuration that extracts no deals and only applies `link_filter`
    pub fn links_only(link_filter: LinkFilter) -> Self {
        Self {
            link_filter,
            deal_container: FieldSelector::parse(""),
            fields: BTreeMap::new(),
        }
    }

    pub fn field(&self, field: DealField) -> Option<&FieldSelector> {
        self.fields.get(&field)
    }
}

impl Config {
    /// Builds the immutable selector snapshot for a crawl
    pub fn selector_config(&self) -> Result<SelectorConfig, ConfigError> {
        let link_filter = LinkFilter::new(
            self.link_strategy,
            &self.follow_patterns,
            &self.exclude_patterns,
        )?;
        SelectorConfig::new(&self.selectors, link_filter)
    }
}
