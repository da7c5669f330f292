use url::{Host, Url};

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use deal_crawler::url::extract_domain;
///
/// let url = Url::parse("https://Deals.Example.TEST/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("deals.example.test".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the registrable domain of a URL's host
///
/// This is approximated as the last two labels of the host name, so
/// `www.shop.example.test` and `example.test` share `example.test`. IP
/// addresses are returned unchanged since they have no label hierarchy.
pub fn registrable_domain(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_lowercase();
            let labels: Vec<&str> = domain.split('.').collect();
            if labels.len() <= 2 {
                Some(domain)
            } else {
                Some(labels[labels.len() - 2..].join("."))
            }
        }
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(addr.to_string()),
    }
}
