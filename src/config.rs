use crate::error::ConfigError;
use crate::renderer::WaitPolicy;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// How in-page scripts are evaluated by the WebDriver renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Run scripts as JavaScript against the live DOM
    #[default]
    InPage,
    /// Capture the rendered source once idle and evaluate scripts on it locally
    Snapshot,
}

/// Configuration for a single crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// URL to start crawling from
    pub start_url: String,

    /// Maximum number of pages admitted into the crawl
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Directory receiving one text file per saved page
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Try well-known local WebDriver ports if `webdriver_url` refuses a session
    #[serde(default = "default_true")]
    pub try_fallback_drivers: bool,

    /// Ask the browser to run without a window
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Deadline for navigating to a page and waiting for it to settle
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// How long resource loading must stay quiet before a page counts as idle
    #[serde(default = "default_idle_window_ms")]
    pub idle_window_ms: u64,

    /// Interval between idle checks
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    /// Chrome elements removed before content extraction
    #[serde(default = "default_strip_selectors")]
    pub strip_selectors: Vec<String>,

    /// Content regions tried in order; the first with text wins
    #[serde(default = "default_content_selectors")]
    pub content_selectors: Vec<String>,

    /// Regex patterns for URLs never scheduled
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Drop `#fragment` parts from discovered links
    #[serde(default)]
    pub strip_fragments: bool,

    /// Maximum number of link hops from the start URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    #[serde(default)]
    pub evaluation: EvaluationMode,
}

fn default_max_pages() -> usize {
    50
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("crawled_pages")
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_true() -> bool {
    true
}

fn default_navigation_timeout_secs() -> u64 {
    30
}

fn default_idle_window_ms() -> u64 {
    500
}

fn default_idle_poll_ms() -> u64 {
    100
}

fn default_strip_selectors() -> Vec<String> {
    vec!["header".to_string()]
}

fn default_content_selectors() -> Vec<String> {
    ["main", "#__next", "#root", "body"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_exclude_patterns() -> Vec<String> {
    vec![r"\.(jpg|jpeg|png|gif|css|js|ico|woff|woff2|ttf|eot|svg|pdf|zip)$".to_string()]
}

impl CrawlConfig {
    /// Create a new configuration with default values
    pub fn new(start_url: &str) -> Self {
        Self {
            start_url: start_url.to_string(),
            max_pages: default_max_pages(),
            output_dir: default_output_dir(),
            webdriver_url: default_webdriver_url(),
            try_fallback_drivers: true,
            headless: true,
            navigation_timeout_secs: default_navigation_timeout_secs(),
            idle_window_ms: default_idle_window_ms(),
            idle_poll_ms: default_idle_poll_ms(),
            strip_selectors: default_strip_selectors(),
            content_selectors: default_content_selectors(),
            exclude_patterns: default_exclude_patterns(),
            strip_fragments: false,
            max_depth: None,
            evaluation: EvaluationMode::default(),
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replace the WebDriver URL with `WEBDRIVER_URL` when it is set and non-empty
    pub fn apply_env(&mut self) {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
    }

    /// Check the configuration and return the parsed start URL
    pub fn validate(&self) -> Result<Url, ConfigError> {
        if self.max_pages == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        if self.navigation_timeout_secs == 0 {
            return Err(ConfigError::ZeroDuration("navigation_timeout_secs"));
        }
        if self.idle_poll_ms == 0 {
            return Err(ConfigError::ZeroDuration("idle_poll_ms"));
        }
        for pattern in &self.exclude_patterns {
            if let Err(source) = regex::Regex::new(pattern) {
                return Err(ConfigError::Pattern {
                    pattern: pattern.clone(),
                    source,
                });
            }
        }
        parse_start_url(&self.start_url)
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            idle_window: Duration::from_millis(self.idle_window_ms),
            poll_interval: Duration::from_millis(self.idle_poll_ms),
        }
    }
}

fn parse_start_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::StartUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("only http and https URLs can be crawled"));
    }
    if url.host().is_none() {
        return Err(invalid("URL has no host"));
    }
    Ok(url)
}
