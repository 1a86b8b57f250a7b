//! The crawl controller.
//!
//! Visits pages depth-first from a seed, one at a time on a single renderer
//! surface. Each URL is marked visited before it is rendered, so cycles and
//! repeated links never schedule a page twice, and the page budget bounds the
//! total number of visits. Render and write failures are recorded against the
//! URL and the crawl moves on.

use crate::filter::origin_of;
use crate::policy::{ContentExtractor, LinkDiscoverer};
use crate::renderer::{Renderer, WaitPolicy};
use crate::results::{CrawlReport, FailureKind, PageArtifact, PageFailure};
use crate::visited::{Admission, VisitedSet};
use crate::writer::ArtifactSink;
use url::Url;

/// Limits and timing for a crawl
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Maximum number of URLs admitted
    pub max_pages: usize,
    /// Links are not followed from pages this many hops from the seed
    pub max_depth: Option<usize>,
    pub wait: WaitPolicy,
}

/// Mutable state of one crawl invocation
struct CrawlSession {
    visited: VisitedSet,
    saved: Vec<PageArtifact>,
    failures: Vec<PageFailure>,
}

impl CrawlSession {
    fn new(max_pages: usize) -> Self {
        Self {
            visited: VisitedSet::new(max_pages),
            saved: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn record_failure(&mut self, url: &Url, kind: FailureKind, message: String) {
        self.failures.push(PageFailure {
            url: url.to_string(),
            kind,
            message,
        });
    }

    fn into_report(self) -> CrawlReport {
        CrawlReport {
            visited: self
                .visited
                .into_order()
                .into_iter()
                .map(String::from)
                .collect(),
            saved: self.saved,
            failures: self.failures,
        }
    }
}

/// A pending visit on the work stack
struct Pending {
    url: Url,
    depth: usize,
}

pub struct Crawler {
    settings: CrawlSettings,
    extractor: Box<dyn ContentExtractor>,
    discoverer: Box<dyn LinkDiscoverer>,
    sink: Box<dyn ArtifactSink>,
}

impl Crawler {
    pub fn new(
        settings: CrawlSettings,
        extractor: Box<dyn ContentExtractor>,
        discoverer: Box<dyn LinkDiscoverer>,
        sink: Box<dyn ArtifactSink>,
    ) -> Self {
        Self {
            settings,
            extractor,
            discoverer,
            sink,
        }
    }

    /// Crawl everything reachable from `seed` within its origin and the budget.
    ///
    /// Never fails: per-URL problems end up in [`CrawlReport::failures`].
    pub async fn run(&self, renderer: &mut dyn Renderer, seed: &Url) -> CrawlReport {
        let origin = origin_of(seed);
        let mut session = CrawlSession::new(self.settings.max_pages);

        // LIFO with children pushed in reverse, so the first discovered link
        // is expanded fully before its next sibling.
        let mut stack = vec![Pending {
            url: seed.clone(),
            depth: 0,
        }];

        while let Some(Pending { url, depth }) = stack.pop() {
            match session.visited.admit(&url) {
                Admission::Admitted => {}
                Admission::AlreadyVisited => {
                    ::log::trace!("Skipping already visited: {}", url);
                    continue;
                }
                Admission::BudgetExhausted => {
                    ::log::debug!(
                        "Page budget of {} reached, stopping before {}",
                        self.settings.max_pages,
                        url
                    );
                    break;
                }
            }

            let links = self
                .visit(renderer, &mut session, &url, &origin, depth)
                .await;

            stack.extend(links.into_iter().rev().map(|url| Pending {
                url,
                depth: depth + 1,
            }));
        }

        session.into_report()
    }

    /// Render, extract, save and discover for one admitted URL.
    /// Returns the links to schedule next.
    async fn visit(
        &self,
        renderer: &mut dyn Renderer,
        session: &mut CrawlSession,
        url: &Url,
        origin: &Url,
        depth: usize,
    ) -> Vec<Url> {
        ::log::info!(
            "Crawling ({}/{}): {}",
            session.visited.len(),
            self.settings.max_pages,
            url
        );

        if let Err(e) = renderer.navigate(url, &self.settings.wait).await {
            ::log::error!("Failed to render {}: {}", url, e);
            session.record_failure(url, FailureKind::Navigation, e.to_string());
            return Vec::new();
        }

        let content = self.extractor.extract(renderer).await;
        match self.sink.save(url.as_str(), &content).await {
            Ok(path) => {
                ::log::info!("Saved {} to {}", url, path.display());
                session.saved.push(PageArtifact {
                    url: url.to_string(),
                    path,
                });
            }
            Err(e) => {
                ::log::error!("{}", e);
                session.record_failure(url, FailureKind::Write, e.to_string());
            }
        }

        if self.settings.max_depth.is_some_and(|max| depth >= max) {
            ::log::debug!("Not following links from {} at depth {}", url, depth);
            return Vec::new();
        }

        if session.visited.is_exhausted() {
            return Vec::new();
        }

        let links = self.discoverer.discover(renderer, origin).await;
        ::log::info!("Found {} links on {}", links.len(), url);
        links
    }
}
