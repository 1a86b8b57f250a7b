use super::{PageScript, Renderer, WaitPolicy};
use crate::config::{CrawlConfig, EvaluationMode};
use crate::error::{CrawlError, RenderError};
use crate::parsers::Snapshot;
use async_trait::async_trait;
use fantoccini::wd::TimeoutConfiguration;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Map, Value, json};
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use url::Url;

/// Local endpoints tried when the configured WebDriver refuses a session
const FALLBACK_WEBDRIVER_URLS: &[&str] = &[
    "http://localhost:9515", // ChromeDriver default
    "http://localhost:4723", // Appium default
    "http://localhost:9222", // Chrome debug port default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

// The resource timing buffer defaults to 250 entries; past that the count
// freezes and the page would look idle too early.
const IDLE_CHECK_JS: &str = "performance.setResourceTimingBufferSize(100000); \
     return [document.readyState, performance.getEntriesByType('resource').length];";

const STRIP_ELEMENTS_JS: &str = r#"
const selectors = arguments[0];
let removed = 0;
for (const selector of selectors) {
    try {
        const element = document.querySelector(selector);
        if (element) {
            element.remove();
            removed += 1;
        }
    } catch (e) {}
}
return removed;
"#;

const SELECTOR_TEXT_JS: &str = r#"
const selectors = arguments[0];
for (const selector of selectors) {
    let element = null;
    try {
        element = document.querySelector(selector);
    } catch (e) {
        continue;
    }
    if (element) {
        const text = (element.innerText || '').trim();
        if (text) {
            return text;
        }
    }
}
return null;
"#;

const DOCUMENT_TEXT_JS: &str = r#"
const root = document.body || document.documentElement;
return root ? (root.innerText || '') : '';
"#;

const ANCHOR_HREFS_JS: &str =
    "return Array.from(document.querySelectorAll('a[href]'), (a) => a.getAttribute('href'));";

/// A browser driven over WebDriver, reused for every page of a crawl
pub struct WebDriverRenderer {
    client: Option<Client>,
    evaluation: EvaluationMode,
    snapshot: Option<Snapshot>,
}

impl WebDriverRenderer {
    /// Open a browser session as described by `config`
    pub async fn connect(config: &CrawlConfig) -> Result<Self, CrawlError> {
        let client = connect_to_webdriver(
            &config.webdriver_url,
            config.try_fallback_drivers,
            config.headless,
        )
        .await?;

        // The tokio deadline in `navigate` still applies if the driver ignores this.
        let page_load = config.wait_policy().navigation_timeout;
        if let Err(e) = client
            .update_timeouts(TimeoutConfiguration::new(None, Some(page_load), None))
            .await
        {
            ::log::warn!("Failed to set WebDriver page load timeout: {}", e);
        }

        Ok(Self {
            client: Some(client),
            evaluation: config.evaluation,
            snapshot: None,
        })
    }

    fn client(&self) -> Result<Client, RenderError> {
        self.client.clone().ok_or(RenderError::SessionClosed)
    }
}

#[async_trait]
impl Renderer for WebDriverRenderer {
    async fn navigate(&mut self, url: &Url, wait: &WaitPolicy) -> Result<(), RenderError> {
        let client = self.client()?;
        self.snapshot = None;
        let started = Instant::now();

        let snapshot_mode = self.evaluation == EvaluationMode::Snapshot;
        let source = within_deadline(url, wait.navigation_timeout, async {
            client
                .goto(url.as_str())
                .await
                .map_err(|e| navigation_error(e, "accessing", url))?;
            wait_for_network_idle(&client, url, wait).await?;

            if !snapshot_mode {
                return Ok(None);
            }
            client
                .source()
                .await
                .map(Some)
                .map_err(|e| navigation_error(e, "getting source for", url))
        })
        .await?;
        self.snapshot = source.map(Snapshot::new);

        ::log::debug!(
            "Rendered {} in {:.2} seconds",
            url,
            started.elapsed().as_secs_f64()
        );
        Ok(())
    }

    async fn run_in_page(&mut self, script: &PageScript) -> Result<Value, RenderError> {
        let client = self.client()?;

        if self.evaluation == EvaluationMode::Snapshot {
            return match self.snapshot.as_mut() {
                Some(snapshot) => snapshot.evaluate(script),
                None => Err(RenderError::Script {
                    script: script.name(),
                    message: "no page has been rendered".to_string(),
                }),
            };
        }

        let (source, args) = in_page_source(script);
        client
            .execute(source, args)
            .await
            .map_err(|e| RenderError::Script {
                script: script.name(),
                message: e.to_string(),
            })
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        self.snapshot = None;
        match self.client.take() {
            Some(client) => {
                client
                    .close()
                    .await
                    .map_err(|e| RenderError::Close(e.to_string()))?;
                ::log::debug!("Closed WebDriver session");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for WebDriverRenderer {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };

        // Drop cannot await, so hand the close to the runtime if one is running.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                ::log::warn!("Renderer dropped without close, closing WebDriver session");
                handle.spawn(async move {
                    if let Err(e) = client.close().await {
                        ::log::warn!("Failed to close WebDriver session: {}", e);
                    }
                });
            }
            Err(_) => {
                ::log::warn!("Renderer dropped outside a runtime, WebDriver session left open");
            }
        }
    }
}

fn in_page_source(script: &PageScript) -> (&'static str, Vec<Value>) {
    match script {
        PageScript::StripElements { selectors } => (STRIP_ELEMENTS_JS, vec![json!(selectors)]),
        PageScript::SelectorText { selectors } => (SELECTOR_TEXT_JS, vec![json!(selectors)]),
        PageScript::DocumentText => (DOCUMENT_TEXT_JS, Vec::new()),
        PageScript::AnchorHrefs => (ANCHOR_HREFS_JS, Vec::new()),
    }
}

/// Runs `work` under `deadline`, reporting an overrun as a timeout for `url`
async fn within_deadline<T>(
    url: &Url,
    deadline: Duration,
    work: impl Future<Output = Result<T, RenderError>>,
) -> Result<T, RenderError> {
    match timeout(deadline, work).await {
        Ok(result) => result,
        Err(_) => Err(RenderError::Timeout {
            url: url.to_string(),
            seconds: deadline.as_secs(),
        }),
    }
}

/// Waits until the document is complete and no new resources have been
/// requested for `wait.idle_window`. Bounded by the caller's deadline.
async fn wait_for_network_idle(
    client: &Client,
    url: &Url,
    wait: &WaitPolicy,
) -> Result<(), RenderError> {
    let mut last_count: Option<u64> = None;
    let mut quiet_since = Instant::now();

    loop {
        let state = client
            .execute(IDLE_CHECK_JS, Vec::new())
            .await
            .map_err(|e| navigation_error(e, "checking", url))?;

        let complete = state.get(0).and_then(Value::as_str) == Some("complete");
        let count = state.get(1).and_then(Value::as_u64);

        if !complete || count != last_count {
            last_count = count;
            quiet_since = Instant::now();
        } else if quiet_since.elapsed() >= wait.idle_window {
            ::log::trace!("Network idle for {} ({:?} resources)", url, count);
            return Ok(());
        }

        sleep(wait.poll_interval).await;
    }
}

/// Connects to the WebDriver instance, optionally trying common local ports
async fn connect_to_webdriver(
    webdriver_url: &str,
    try_fallbacks: bool,
    headless: bool,
) -> Result<Client, CrawlError> {
    let first_error = match open_session(webdriver_url, headless).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Ok(client);
        }
        Err(e) => {
            ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
            e
        }
    };

    if try_fallbacks {
        for url in FALLBACK_WEBDRIVER_URLS {
            if *url == webdriver_url {
                continue;
            }

            ::log::info!("Trying fallback WebDriver URL: {}", url);
            if let Ok(client) = open_session(url, headless).await {
                ::log::debug!("Connected to fallback WebDriver at {}", url);
                return Ok(client);
            }
        }
    }

    ::log::error!(
        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
    );
    Err(CrawlError::Session(format!("{}: {}", webdriver_url, first_error)))
}

async fn open_session(
    webdriver_url: &str,
    headless: bool,
) -> Result<Client, fantoccini::error::NewSessionError> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(capabilities(headless));
    builder.connect(webdriver_url).await
}

fn capabilities(headless: bool) -> Map<String, Value> {
    let mut caps = Map::new();
    if headless {
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": ["--headless=new", "--disable-gpu", "--no-sandbox"] }),
        );
        caps.insert(
            "moz:firefoxOptions".to_string(),
            json!({ "args": ["-headless"] }),
        );
    }
    caps
}

/// Maps a WebDriver command failure for `url` into a navigation error
fn navigation_error(error: fantoccini::error::CmdError, context: &str, url: &Url) -> RenderError {
    let message = error.to_string();
    if message.contains("Unable to find session") {
        ::log::warn!("Lost WebDriver session while {} {}", context, url);
    }
    RenderError::Navigation {
        url: url.to_string(),
        message: format!("{}: {}", context, message),
    }
}
