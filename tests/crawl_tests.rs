//! End-to-end crawls against an in-memory site.

use async_trait::async_trait;
use page_harvest::error::WriteError;
use page_harvest::parsers::Snapshot;
use page_harvest::policy::{ContentExtractor, SelectorChainExtractor};
use page_harvest::writer::{ArtifactSink, FileArtifactWriter};
use page_harvest::{
    ConfigError, CrawlConfig, CrawlError, FailureKind, PageScript, RenderError, Renderer,
    SiteCrawl, WaitPolicy,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use url::Url;

const ORIGIN: &str = "https://example.test";

#[derive(Default)]
struct RendererLog {
    navigations: Vec<String>,
    closed: bool,
}

/// Serves fixed HTML per URL; unknown and failing URLs fail to render
struct FakeRenderer {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    current: Option<Snapshot>,
    log: Arc<Mutex<RendererLog>>,
}

impl FakeRenderer {
    fn new(site: &[(&str, &str)]) -> (Self, Arc<Mutex<RendererLog>>) {
        let log = Arc::new(Mutex::new(RendererLog::default()));
        let pages = site
            .iter()
            .map(|(path, html)| (format!("{}{}", ORIGIN, path), html.to_string()))
            .collect();
        let renderer = Self {
            pages,
            failing: HashSet::new(),
            current: None,
            log: Arc::clone(&log),
        };
        (renderer, log)
    }

    fn failing_on(mut self, path: &str) -> Self {
        self.failing.insert(format!("{}{}", ORIGIN, path));
        self
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn navigate(&mut self, url: &Url, _wait: &WaitPolicy) -> Result<(), RenderError> {
        self.log.lock().unwrap().navigations.push(url.to_string());
        self.current = None;

        if self.failing.contains(url.as_str()) {
            return Err(RenderError::Timeout {
                url: url.to_string(),
                seconds: 30,
            });
        }
        match self.pages.get(url.as_str()) {
            Some(html) => {
                self.current = Some(Snapshot::new(html.clone()));
                Ok(())
            }
            None => Err(RenderError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            }),
        }
    }

    async fn run_in_page(&mut self, script: &PageScript) -> Result<Value, RenderError> {
        match self.current.as_mut() {
            Some(snapshot) => snapshot.evaluate(script),
            None => Err(RenderError::SessionClosed),
        }
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Keeps artifacts in memory; configured URLs fail to save
#[derive(Clone, Default)]
struct MemorySink {
    saved: Arc<Mutex<Vec<(String, String)>>>,
    failing: HashSet<String>,
}

impl MemorySink {
    fn failing_on(mut self, path: &str) -> Self {
        self.failing.insert(format!("{}{}", ORIGIN, path));
        self
    }

    fn urls(&self) -> Vec<String> {
        self.saved
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    fn content_of(&self, path: &str) -> Option<String> {
        let url = format!("{}{}", ORIGIN, path);
        self.saved
            .lock()
            .unwrap()
            .iter()
            .find(|(saved_url, _)| *saved_url == url)
            .map(|(_, content)| content.clone())
    }
}

#[async_trait]
impl ArtifactSink for MemorySink {
    async fn save(&self, url: &str, content: &str) -> Result<PathBuf, WriteError> {
        if self.failing.contains(url) {
            return Err(WriteError {
                url: url.to_string(),
                path: PathBuf::from("/read-only").join(url.len().to_string()),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        self.saved
            .lock()
            .unwrap()
            .push((url.to_string(), content.to_string()));
        Ok(PathBuf::from(url))
    }
}

fn page(body: &str) -> String {
    format!("<html><body><main>{}</main></body></html>", body)
}

fn links(paths: &[&str]) -> String {
    let anchors: Vec<String> = paths
        .iter()
        .map(|path| format!("<a href=\"{}\">{}</a>", path, path))
        .collect();
    page(&anchors.join(" "))
}

fn abs(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|path| format!("{}{}", ORIGIN, path)).collect()
}

fn crawl_of(max_pages: usize) -> SiteCrawl {
    SiteCrawl::new(&format!("{}/", ORIGIN)).with_max_pages(max_pages)
}

#[tokio::test]
async fn test_depth_first_with_budget() {
    let root = links(&["/a", "/b"]);
    let a = links(&["/", "/c"]);
    let (renderer, log) = FakeRenderer::new(&[
        ("/", &root),
        ("/a", &a),
        ("/b", &page("B")),
        ("/c", &page("C")),
    ]);
    let sink = MemorySink::default();

    let report = crawl_of(3)
        .run_with(renderer, Box::new(sink.clone()))
        .await
        .unwrap();

    // `/a` is expanded before its sibling `/b`; its back link to `/` is
    // skipped and `/c` takes the last slot.
    assert_eq!(report.visited, abs(&["/", "/a", "/c"]));
    assert_eq!(report.page_count(), 3);
    assert_eq!(sink.urls(), abs(&["/", "/a", "/c"]));
    assert_eq!(log.lock().unwrap().navigations, abs(&["/", "/a", "/c"]));
    assert!(log.lock().unwrap().closed);
}

#[tokio::test]
async fn test_unbounded_budget_visits_everything_once() {
    let root = links(&["/a", "/b", "/a"]);
    let a = links(&["/", "/b", "/c"]);
    let b = links(&["/a", "/c", "/"]);
    let c = links(&["/b", "/"]);
    let (renderer, log) =
        FakeRenderer::new(&[("/", &root), ("/a", &a), ("/b", &b), ("/c", &c)]);
    let sink = MemorySink::default();

    let report = crawl_of(100)
        .run_with(renderer, Box::new(sink.clone()))
        .await
        .unwrap();

    assert_eq!(report.visited, abs(&["/", "/a", "/b", "/c"]));
    let navigations = log.lock().unwrap().navigations.clone();
    let unique: HashSet<&String> = navigations.iter().collect();
    assert_eq!(unique.len(), navigations.len());
    assert_eq!(sink.urls().len(), 4);
}

#[tokio::test]
async fn test_cycle_terminates() {
    let a = links(&["/b"]);
    let b = links(&["/"]);
    let (renderer, _log) = FakeRenderer::new(&[("/", &a), ("/b", &b)]);

    let report = crawl_of(10)
        .run_with(renderer, Box::new(MemorySink::default()))
        .await
        .unwrap();

    assert_eq!(report.visited, abs(&["/", "/b"]));
    assert_eq!(report.page_count(), 2);
}

#[tokio::test]
async fn test_budget_bounds_admissions() {
    let fan_out: Vec<String> = (0..20).map(|i| format!("/p{}", i)).collect();
    let fan_out: Vec<&str> = fan_out.iter().map(String::as_str).collect();
    let root = links(&fan_out);
    let mut site = vec![("/".to_string(), root)];
    for path in &fan_out {
        site.push((path.to_string(), page(path)));
    }
    let site: Vec<(&str, &str)> = site.iter().map(|(p, h)| (p.as_str(), h.as_str())).collect();
    let (renderer, log) = FakeRenderer::new(&site);

    let report = crawl_of(5)
        .run_with(renderer, Box::new(MemorySink::default()))
        .await
        .unwrap();

    assert_eq!(report.visited.len(), 5);
    assert_eq!(log.lock().unwrap().navigations.len(), 5);
    assert_eq!(report.visited, abs(&["/", "/p0", "/p1", "/p2", "/p3"]));
}

#[tokio::test]
async fn test_other_origins_never_visited() {
    let root = links(&[
        "https://other.test/a",
        "http://example.test/insecure",
        "https://example.test:8443/port",
        "mailto:someone@example.test",
        "#top",
        "/inside",
    ]);
    let (renderer, log) = FakeRenderer::new(&[("/", &root), ("/inside", &page("in"))]);

    let report = crawl_of(10)
        .run_with(renderer, Box::new(MemorySink::default()))
        .await
        .unwrap();

    assert_eq!(report.visited, abs(&["/", "/inside"]));
    for url in &log.lock().unwrap().navigations {
        assert!(url.starts_with("https://example.test/"), "left origin: {}", url);
    }
}

#[tokio::test]
async fn test_render_failure_is_isolated() {
    let root = links(&["/a", "/b", "/c"]);
    let a = links(&["/d"]);
    let (renderer, _log) = FakeRenderer::new(&[
        ("/", &root),
        ("/a", &a),
        ("/b", &page("B")),
        ("/c", &page("C")),
        ("/d", &page("D")),
    ]);
    let renderer = renderer.failing_on("/a");
    let sink = MemorySink::default();

    let report = crawl_of(10)
        .run_with(renderer, Box::new(sink.clone()))
        .await
        .unwrap();

    // `/d` is only reachable through the failed page.
    assert_eq!(report.visited, abs(&["/", "/a", "/b", "/c"]));
    assert_eq!(sink.urls(), abs(&["/", "/b", "/c"]));
    assert_eq!(report.page_count(), 3);

    let failures: Vec<_> = report.failures_of(FailureKind::Navigation).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].url, format!("{}/a", ORIGIN));
}

#[tokio::test]
async fn test_dead_link_is_a_navigation_failure() {
    let root = links(&["/missing", "/ok"]);
    let (renderer, _log) = FakeRenderer::new(&[("/", &root), ("/ok", &page("ok"))]);

    let report = crawl_of(10)
        .run_with(renderer, Box::new(MemorySink::default()))
        .await
        .unwrap();

    assert_eq!(report.page_count(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].kind, FailureKind::Navigation);
}

#[tokio::test]
async fn test_write_failure_counts_and_no_retry() {
    let root = links(&["/a", "/b"]);
    let a = links(&["/a", "/"]);
    let b = links(&["/a"]);
    let (renderer, log) = FakeRenderer::new(&[("/", &root), ("/a", &a), ("/b", &b)]);
    let sink = MemorySink::default().failing_on("/a");

    let report = crawl_of(10)
        .run_with(renderer, Box::new(sink.clone()))
        .await
        .unwrap();

    assert_eq!(report.page_count(), 2);
    assert_eq!(sink.urls(), abs(&["/", "/b"]));
    assert_eq!(report.visited, abs(&["/", "/a", "/b"]));

    let navigations = log.lock().unwrap().navigations.clone();
    assert_eq!(navigations.iter().filter(|u| u.ends_with("/a")).count(), 1);

    let failures: Vec<_> = report.failures_of(FailureKind::Write).collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].url, format!("{}/a", ORIGIN));
}

#[tokio::test]
async fn test_links_still_followed_after_write_failure() {
    let root = links(&["/a"]);
    let a = links(&["/deep"]);
    let (renderer, _log) =
        FakeRenderer::new(&[("/", &root), ("/a", &a), ("/deep", &page("deep"))]);
    let sink = MemorySink::default().failing_on("/a");

    let report = crawl_of(10)
        .run_with(renderer, Box::new(sink.clone()))
        .await
        .unwrap();

    assert_eq!(sink.urls(), abs(&["/", "/deep"]));
    assert_eq!(report.visited.len(), 3);
}

#[tokio::test]
async fn test_max_depth() {
    let root = links(&["/a"]);
    let a = links(&["/b"]);
    let (renderer, _log) = FakeRenderer::new(&[("/", &root), ("/a", &a), ("/b", &page("B"))]);

    let report = crawl_of(10)
        .with_max_depth(Some(1))
        .run_with(renderer, Box::new(MemorySink::default()))
        .await
        .unwrap();

    assert_eq!(report.visited, abs(&["/", "/a"]));
}

#[tokio::test]
async fn test_zero_budget_rejected_and_renderer_closed() {
    let (renderer, log) = FakeRenderer::new(&[("/", &page("root"))]);

    let result = crawl_of(0)
        .run_with(renderer, Box::new(MemorySink::default()))
        .await;

    assert!(matches!(
        result,
        Err(CrawlError::Config(ConfigError::ZeroBudget))
    ));
    let log = log.lock().unwrap();
    assert!(log.navigations.is_empty());
    assert!(log.closed);
}

#[tokio::test]
async fn test_content_extraction_strips_header_and_prefers_main() {
    let html = r#"<html><body>
        <header>Site navigation</header>
        <div id="sidebar">Sidebar</div>
        <main><h1>Title</h1><p>Body text.</p></main>
    </body></html>"#;
    let (renderer, _log) = FakeRenderer::new(&[("/", html)]);
    let sink = MemorySink::default();

    crawl_of(1)
        .run_with(renderer, Box::new(sink.clone()))
        .await
        .unwrap();

    assert_eq!(sink.content_of("/").unwrap(), "Title\n\nBody text.");
}

#[tokio::test]
async fn test_extractor_falls_back_to_document_text() {
    let html = "<html><body><header>Top</header><div>Only <em>div</em> content</div></body></html>";
    let (mut renderer, _log) = FakeRenderer::new(&[("/", html)]);
    let url = Url::parse(&format!("{}/", ORIGIN)).unwrap();
    renderer.navigate(&url, &WaitPolicy::default()).await.unwrap();

    let extractor = SelectorChainExtractor::new(
        vec!["header".to_string()],
        vec!["main".to_string(), "#__next".to_string()],
    );
    assert_eq!(extractor.extract(&mut renderer).await, "Only div content");
}

#[tokio::test]
async fn test_extractor_on_failed_page_is_empty() {
    let (mut renderer, _log) = FakeRenderer::new(&[]);
    let extractor = SelectorChainExtractor::default();
    assert_eq!(extractor.extract(&mut renderer).await, "");
}

#[tokio::test]
async fn test_files_written_to_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let root = links(&["/docs/intro", "/docs/intro#setup"]);
    let (renderer, _log) = FakeRenderer::new(&[
        ("/", &root),
        ("/docs/intro", &page("Intro text")),
    ]);

    let mut config = CrawlConfig::new(&format!("{}/", ORIGIN));
    config.strip_fragments = true;
    config.output_dir = dir.path().join("out");
    let writer = FileArtifactWriter::create(&config.output_dir).await.unwrap();

    let report = SiteCrawl::from_config(config)
        .run_with(renderer, Box::new(writer))
        .await
        .unwrap();

    assert_eq!(report.page_count(), 2);
    let intro = std::fs::read_to_string(dir.path().join("out/example_test_docs_intro.txt")).unwrap();
    assert_eq!(
        intro,
        "URL: https://example.test/docs/intro\n\nContent:\nIntro text"
    );
    assert!(dir.path().join("out/example_test_.txt").exists());
}

#[tokio::test]
async fn test_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crawl.json");
    std::fs::write(
        &path,
        r#"{"start_url": "https://example.test/", "max_pages": 7, "content_selectors": ["article"]}"#,
    )
    .unwrap();

    let crawl = SiteCrawl::from_config_file(&path).unwrap();
    assert_eq!(crawl.config().max_pages, 7);
    assert_eq!(crawl.config().content_selectors, vec!["article"]);
    assert!(crawl.config().validate().is_ok());
}

#[tokio::test]
async fn test_unreachable_webdriver_is_a_session_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = CrawlConfig::new(&format!("{}/", ORIGIN));
    config.try_fallback_drivers = false;
    config.output_dir = dir.path().join("out");

    let result = SiteCrawl::from_config(config)
        .with_webdriver_url("http://127.0.0.1:1")
        .run()
        .await;

    match result {
        Err(CrawlError::Session(message)) => assert!(message.contains("127.0.0.1:1")),
        other => panic!("expected a session error, got {:?}", other.map(|r| r.page_count())),
    }
    let written = std::fs::read_dir(dir.path().join("out"))
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(written, 0);
}
