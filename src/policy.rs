//! Content extraction and link discovery strategies.
//!
//! Both run against whatever page the renderer currently shows and never
//! fail: a script error degrades to an empty result and is logged.

use crate::filter::UrlFilter;
use crate::parsers::clean_text;
use crate::renderer::{PageScript, Renderer};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use url::Url;

/// Produces the text body of the rendered page
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, page: &mut dyn Renderer) -> String;
}

/// Produces crawl candidates from the rendered page
#[async_trait]
pub trait LinkDiscoverer: Send + Sync {
    /// Ordered, duplicate-free same-origin URLs linked from the page
    async fn discover(&self, page: &mut dyn Renderer, base: &Url) -> Vec<Url>;
}

/// Strips chrome, then tries content selectors in order, falling back to the
/// whole document
#[derive(Debug, Clone)]
pub struct SelectorChainExtractor {
    strip_selectors: Vec<String>,
    content_selectors: Vec<String>,
}

impl SelectorChainExtractor {
    pub fn new(strip_selectors: Vec<String>, content_selectors: Vec<String>) -> Self {
        Self {
            strip_selectors,
            content_selectors,
        }
    }
}

impl Default for SelectorChainExtractor {
    fn default() -> Self {
        Self::new(
            vec!["header".to_string()],
            ["main", "#__next", "#root", "body"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

#[async_trait]
impl ContentExtractor for SelectorChainExtractor {
    async fn extract(&self, page: &mut dyn Renderer) -> String {
        if !self.strip_selectors.is_empty() {
            let script = PageScript::StripElements {
                selectors: self.strip_selectors.clone(),
            };
            match page.run_in_page(&script).await {
                Ok(removed) => ::log::trace!("Stripped {} chrome elements", removed),
                Err(e) => ::log::debug!("Could not strip chrome elements: {}", e),
            }
        }

        if !self.content_selectors.is_empty() {
            let script = PageScript::SelectorText {
                selectors: self.content_selectors.clone(),
            };
            match page.run_in_page(&script).await {
                Ok(Value::String(text)) => {
                    let text = clean_text(&text);
                    if !text.is_empty() {
                        return text;
                    }
                }
                Ok(_) => {}
                Err(e) => ::log::warn!("Content selector lookup failed: {}", e),
            }
        }

        match page.run_in_page(&PageScript::DocumentText).await {
            Ok(Value::String(text)) => clean_text(&text),
            Ok(_) => String::new(),
            Err(e) => {
                ::log::warn!("Document text lookup failed: {}", e);
                String::new()
            }
        }
    }
}

/// Follows `a[href]` elements, resolved through a [`UrlFilter`]
#[derive(Debug, Default)]
pub struct AnchorLinkDiscoverer {
    filter: UrlFilter,
}

impl AnchorLinkDiscoverer {
    pub fn new(filter: UrlFilter) -> Self {
        Self { filter }
    }

    /// Resolve raw hrefs, keeping first occurrences in order
    pub fn resolve_all<'a, I>(&self, hrefs: I, base: &Url) -> Vec<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        hrefs
            .into_iter()
            .filter_map(|href| self.filter.resolve(href, base))
            .filter(|url| seen.insert(url.as_str().to_string()))
            .collect()
    }
}

#[async_trait]
impl LinkDiscoverer for AnchorLinkDiscoverer {
    async fn discover(&self, page: &mut dyn Renderer, base: &Url) -> Vec<Url> {
        let hrefs = match page.run_in_page(&PageScript::AnchorHrefs).await {
            Ok(Value::Array(values)) => values,
            Ok(other) => {
                ::log::warn!("Unexpected anchor list from page: {}", other);
                return Vec::new();
            }
            Err(e) => {
                ::log::warn!("Link discovery failed: {}", e);
                return Vec::new();
            }
        };

        self.resolve_all(hrefs.iter().filter_map(Value::as_str), base)
    }
}
