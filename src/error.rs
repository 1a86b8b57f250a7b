use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort a whole crawl invocation.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Could not establish a renderer session: {0}")]
    Session(String),

    #[error("Could not prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Problems found while loading or validating a [`crate::config::CrawlConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid start URL {url}: {reason}")]
    StartUrl { url: String, reason: String },

    #[error("max_pages must be at least 1")]
    ZeroBudget,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Invalid URL pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Per-URL render failures. The controller recovers from all of them.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out after {seconds}s waiting for {url}")]
    Timeout { url: String, seconds: u64 },

    #[error("In-page script {script} failed: {message}")]
    Script {
        script: &'static str,
        message: String,
    },

    #[error("Renderer session is closed")]
    SessionClosed,

    #[error("Failed to close renderer session: {0}")]
    Close(String),
}

/// An artifact could not be persisted.
#[derive(Debug, Error)]
#[error("Failed to write {path} for {url}: {source}")]
pub struct WriteError {
    pub url: String,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
