//! The page renderer capability used by the crawl controller.
//!
//! A renderer owns one browsing surface. The controller navigates it from
//! page to page and asks it to run one of a small, closed set of in-page
//! scripts ([`PageScript`]) against whatever document is currently loaded.

pub mod webdriver;

use crate::error::RenderError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use url::Url;

pub use webdriver::WebDriverRenderer;

/// When a navigation counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Deadline covering the navigation and the idle wait together
    pub navigation_timeout: Duration,
    /// Resource loading must stay quiet this long
    pub idle_window: Duration,
    /// Interval between idle checks
    pub poll_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            idle_window: Duration::from_millis(500),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Scripts the controller may run against the loaded document.
///
/// Results are JSON values:
/// - `StripElements` → number of elements removed
/// - `SelectorText` → text of the first selector with non-empty text, or `null`
/// - `DocumentText` → text of the whole document (string, possibly empty)
/// - `AnchorHrefs` → raw `href` attributes of anchors in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageScript {
    StripElements { selectors: Vec<String> },
    SelectorText { selectors: Vec<String> },
    DocumentText,
    AnchorHrefs,
}

impl PageScript {
    pub fn name(&self) -> &'static str {
        match self {
            PageScript::StripElements { .. } => "strip_elements",
            PageScript::SelectorText { .. } => "selector_text",
            PageScript::DocumentText => "document_text",
            PageScript::AnchorHrefs => "anchor_hrefs",
        }
    }
}

/// A single rendering surface reused across a crawl
#[async_trait]
pub trait Renderer: Send {
    /// Load `url` and wait until the page settles according to `wait`
    async fn navigate(&mut self, url: &Url, wait: &WaitPolicy) -> Result<(), RenderError>;

    /// Run `script` against the currently loaded document
    async fn run_in_page(&mut self, script: &PageScript) -> Result<Value, RenderError>;

    /// Release the surface. Further calls fail with [`RenderError::SessionClosed`].
    async fn close(&mut self) -> Result<(), RenderError>;
}
