//! URL handling module
//!
//! This module provides URL normalization (dedup keys), domain extraction,
//! glob matching, and the link filter that decides which discovered URLs the
//! crawler is allowed to follow.

mod domain;
mod matcher;
mod normalize;

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, registrable_domain};
pub use matcher::{compile_globs, GlobPattern};
pub use normalize::{normalize_url, strip_fragment};

/// Which discovered links stay in scope relative to the page they were found on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStrategy {
    /// Follow links to any host
    All,
    /// Follow links whose registrable domain matches the referrer's
    #[default]
    SameDomain,
    /// Follow links whose host matches the referrer's exactly
    SameHostname,
    /// Follow links whose scheme, host and port match the referrer's
    SameOrigin,
}

impl LinkStrategy {
    /// Returns true if `candidate` is in scope for a link found on `referrer`
    pub fn in_scope(&self, candidate: &Url, referrer: &Url) -> bool {
        match self {
            Self::All => true,
            Self::SameDomain => {
                registrable_domain(candidate).is_some()
                    && registrable_domain(candidate) == registrable_domain(referrer)
            }
            Self::SameHostname => {
                extract_domain(candidate).is_some()
                    && extract_domain(candidate) == extract_domain(referrer)
            }
            Self::SameOrigin => candidate.origin() == referrer.origin(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::SameDomain => "same-domain",
            Self::SameHostname => "same-hostname",
            Self::SameOrigin => "same-origin",
        }
    }
}

/// Outcome of running a URL through the link filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// The URL may be enqueued
    Admitted,
    /// An exclude pattern matched
    Excluded,
    /// Follow patterns exist and none matched
    NotFollowed,
    /// The link strategy rejected the URL
    OutOfScope,
}

impl FilterDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Follow/exclude rules applied before a URL is admitted to the frontier
///
/// Exclude patterns always take precedence over follow patterns. When follow
/// patterns are configured, at least one must match; the link strategy is
/// checked in every case except for seeds.
#[derive(Debug, Clone)]
pub struct LinkFilter {
    strategy: LinkStrategy,
    follow: Vec<GlobPattern>,
    exclude: Vec<GlobPattern>,
}

impl LinkFilter {
    /// Builds a filter from raw glob strings
    pub fn new(
        strategy: LinkStrategy,
        follow: &[String],
        exclude: &[String],
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            strategy,
            follow: compile_globs(follow)?,
            exclude: compile_globs(exclude)?,
        })
    }

    /// A filter that only applies the given strategy
    pub fn with_strategy(strategy: LinkStrategy) -> Self {
        Self {
            strategy,
            follow: Vec::new(),
            exclude: Vec::new(),
        }
    }

    pub fn strategy(&self) -> LinkStrategy {
        self.strategy
    }

    pub fn follow_patterns(&self) -> Vec<String> {
        self.follow.iter().map(|g| g.as_str().to_string()).collect()
    }

    pub fn exclude_patterns(&self) -> Vec<String> {
        self.exclude.iter().map(|g| g.as_str().to_string()).collect()
    }

    /// Returns true if any exclude pattern matches the URL
    pub fn is_excluded(&self, url: &Url) -> bool {
        let candidate = strip_fragment(url);
        self.exclude.iter().any(|g| g.matches(candidate.as_str()))
    }

    /// Decides whether a discovered link may be followed
    ///
    /// A `None` referrer marks a seed URL, which skips the strategy and
    /// follow checks but can still be excluded.
    pub fn check(&self, candidate: &Url, referrer: Option<&Url>) -> FilterDecision {
        if self.is_excluded(candidate) {
            return FilterDecision::Excluded;
        }

        let Some(referrer) = referrer else {
            return FilterDecision::Admitted;
        };

        if !self.strategy.in_scope(candidate, referrer) {
            return FilterDecision::OutOfScope;
        }

        if !self.follow.is_empty() {
            let stripped = strip_fragment(candidate);
            if !self.follow.iter().any(|g| g.matches(stripped.as_str())) {
                return FilterDecision::NotFollowed;
            }
        }

        FilterDecision::Admitted
    }
}

impl Default for LinkFilter {
    fn default() -> Self {
        Self::with_strategy(LinkStrategy::default())
    }
}
