use crate::ConfigError;
use regex::Regex;

/// A compiled glob pattern matched against absolute URLs
///
/// Supported syntax:
/// - `**` matches any sequence of characters, including `/`
/// - `**/` matches zero or more whole path segments
/// - `*` matches any sequence of characters within one segment
/// - `?` matches a single non-`/` character
///
/// Everything else is matched literally.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    raw: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compiles a glob pattern
    ///
    /// # Examples
    ///
    /// ```
    /// use deal_crawler::url::GlobPattern;
    ///
    /// let glob = GlobPattern::new("**/login/**").unwrap();
    /// assert!(glob.matches("https://example.test/login/signin"));
    /// assert!(!glob.matches("https://example.test/deals/login-bonus"));
    /// ```
    pub fn new(pattern: &str) -> Result<Self, ConfigError> {
        if pattern.trim().is_empty() {
            return Err(ConfigError::InvalidPattern(
                "Glob pattern cannot be empty".to_string(),
            ));
        }

        let regex = Regex::new(&glob_to_regex(pattern)).map_err(|e| {
            ConfigError::InvalidPattern(format!("Invalid glob '{}': {}", pattern, e))
        })?;

        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    /// Returns true if the whole candidate string matches the pattern
    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// The pattern as written in the configuration
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Compiles a list of glob patterns, failing on the first invalid one
pub fn compile_globs(patterns: &[String]) -> Result<Vec<GlobPattern>, ConfigError> {
    patterns.iter().map(|p| GlobPattern::new(p)).collect()
}

/// Translates a glob into an anchored regular expression
fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    out.push('$');
    out
}
