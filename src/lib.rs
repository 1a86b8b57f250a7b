//! Same-origin crawler that renders pages in a real browser and saves the
//! text of each page to its own file.

pub mod config;
pub mod crawler;
pub mod error;
pub mod filter;
pub mod parsers;
pub mod policy;
pub mod renderer;
pub mod results;
pub mod visited;
pub mod writer;

// Re-export commonly used types for convenience
pub use config::{CrawlConfig, EvaluationMode};
pub use crawler::{CrawlSettings, Crawler};
pub use error::{ConfigError, CrawlError, RenderError, WriteError};
pub use renderer::{PageScript, Renderer, WaitPolicy, WebDriverRenderer};
pub use results::{CrawlReport, FailureKind, PageArtifact, PageFailure};

use filter::{UrlFilter, UrlFilterConfig};
use policy::{AnchorLinkDiscoverer, SelectorChainExtractor};
use std::path::{Path, PathBuf};
use writer::{ArtifactSink, FileArtifactWriter};

/// Crawl `seed_url` with default settings and return the number of pages saved
pub async fn crawl(seed_url: &str, max_pages: usize) -> Result<usize, CrawlError> {
    let report = SiteCrawl::new(seed_url)
        .with_max_pages(max_pages)
        .run()
        .await?;
    Ok(report.page_count())
}

/// Builder for configuring and running a crawl
#[derive(Debug, Clone)]
pub struct SiteCrawl {
    config: CrawlConfig,
}

impl SiteCrawl {
    /// Create a new crawl of `start_url` with default values
    pub fn new(start_url: &str) -> Self {
        Self::from_config(CrawlConfig::new(start_url))
    }

    /// Use a complete configuration; `WEBDRIVER_URL` still overrides the driver
    pub fn from_config(mut config: CrawlConfig) -> Self {
        config.apply_env();
        Self { config }
    }

    /// Load configuration from a JSON file
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self::from_config(CrawlConfig::from_file(path)?))
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = output_dir.into();
        self
    }

    pub fn with_webdriver_url(mut self, webdriver_url: &str) -> Self {
        self.config.webdriver_url = webdriver_url.to_string();
        self
    }

    /// Set the navigation deadline in seconds
    pub fn with_navigation_timeout(mut self, seconds: u64) -> Self {
        self.config.navigation_timeout_secs = seconds;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    pub fn with_evaluation(mut self, evaluation: EvaluationMode) -> Self {
        self.config.evaluation = evaluation;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    /// Build the controller with the configured policies and the given sink
    pub fn build_crawler(&self, sink: Box<dyn ArtifactSink>) -> Result<Crawler, ConfigError> {
        let filter = UrlFilter::new(UrlFilterConfig {
            exclude_patterns: self.config.exclude_patterns.clone(),
            strip_fragments: self.config.strip_fragments,
        })
        .map_err(|source| ConfigError::Pattern {
            pattern: self.config.exclude_patterns.join(", "),
            source,
        })?;

        let settings = CrawlSettings {
            max_pages: self.config.max_pages,
            max_depth: self.config.max_depth,
            wait: self.config.wait_policy(),
        };

        Ok(Crawler::new(
            settings,
            Box::new(SelectorChainExtractor::new(
                self.config.strip_selectors.clone(),
                self.config.content_selectors.clone(),
            )),
            Box::new(AnchorLinkDiscoverer::new(filter)),
            sink,
        ))
    }

    /// Crawl with a WebDriver browser, writing artifacts to the output directory
    pub async fn run(self) -> Result<CrawlReport, CrawlError> {
        self.config.validate()?;

        let output_dir = self.config.output_dir.clone();
        let writer = FileArtifactWriter::create(&output_dir)
            .await
            .map_err(|source| CrawlError::OutputDir {
                path: output_dir,
                source,
            })?;

        ::log::info!("Connecting to WebDriver at {}", self.config.webdriver_url);
        let renderer = WebDriverRenderer::connect(&self.config).await?;

        self.run_with(renderer, Box::new(writer)).await
    }

    /// Crawl with the given renderer and sink.
    ///
    /// The renderer is closed before returning, whatever the outcome.
    pub async fn run_with<R: Renderer>(
        self,
        mut renderer: R,
        sink: Box<dyn ArtifactSink>,
    ) -> Result<CrawlReport, CrawlError> {
        let prepared = self
            .config
            .validate()
            .and_then(|seed| Ok((seed, self.build_crawler(sink)?)));

        let report = match prepared {
            Ok((seed, crawler)) => {
                ::log::info!(
                    "Starting crawl of {} (max {} pages)",
                    seed,
                    self.config.max_pages
                );
                Ok(crawler.run(&mut renderer, &seed).await)
            }
            Err(e) => Err(CrawlError::from(e)),
        };

        if let Err(e) = renderer.close().await {
            ::log::warn!("{}", e);
        }

        let report = report?;
        ::log::info!(
            "Crawl finished: {} pages saved, {} visited, {} failures",
            report.page_count(),
            report.visited.len(),
            report.failures.len()
        );
        Ok(report)
    }
}
