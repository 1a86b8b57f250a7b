use regex::Regex;
use url::Url;

/// Options for resolving and filtering discovered links
#[derive(Debug, Clone, Default)]
pub struct UrlFilterConfig {
    /// Regex patterns for URLs to exclude
    pub exclude_patterns: Vec<String>,

    /// Drop the fragment from accepted URLs
    pub strip_fragments: bool,
}

/// Resolves hrefs found in page markup and keeps only same-origin candidates
#[derive(Debug, Default)]
pub struct UrlFilter {
    strip_fragments: bool,
    exclude_regexes: Vec<Regex>,
}

impl UrlFilter {
    /// Create a new URL filter from configuration
    pub fn new(config: UrlFilterConfig) -> Result<Self, regex::Error> {
        let mut exclude_regexes = Vec::with_capacity(config.exclude_patterns.len());
        for pattern in &config.exclude_patterns {
            exclude_regexes.push(Regex::new(pattern)?);
        }

        Ok(Self {
            strip_fragments: config.strip_fragments,
            exclude_regexes,
        })
    }

    /// Resolve `href` against `base` and return it if it is a crawl candidate.
    ///
    /// Empty hrefs, same-page anchors, unparseable hrefs, other origins and
    /// excluded patterns all yield `None`.
    pub fn resolve(&self, href: &str, base: &Url) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }

        // Absolute hrefs parse on their own; `join` handles both cases.
        let mut resolved = match base.join(href) {
            Ok(url) => url,
            Err(e) => {
                ::log::trace!("Dropping malformed href {:?}: {}", href, e);
                return None;
            }
        };

        if resolved.origin() != base.origin() {
            return None;
        }

        if self.strip_fragments {
            resolved.set_fragment(None);
        }

        if self.is_excluded(&resolved) {
            ::log::debug!("URL filter rejected: {}", resolved);
            return None;
        }

        Some(resolved)
    }

    fn is_excluded(&self, url: &Url) -> bool {
        let url_str = url.as_str();
        self.exclude_regexes.iter().any(|regex| regex.is_match(url_str))
    }
}

/// The origin of `url` as a URL with an empty path, used as the crawl scope
pub fn origin_of(url: &Url) -> Url {
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin
}
