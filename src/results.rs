use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A page whose artifact was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageArtifact {
    /// URL of the page
    pub url: String,

    /// File holding the extracted text
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The page could not be rendered; nothing was extracted or followed
    Navigation,
    /// The page rendered but its artifact could not be written
    Write,
}

/// A URL whose processing failed without stopping the crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFailure {
    pub url: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of one crawl
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlReport {
    /// URLs admitted into the crawl, in visiting order
    pub visited: Vec<String>,

    /// Artifacts written, in visiting order
    pub saved: Vec<PageArtifact>,

    pub failures: Vec<PageFailure>,
}

impl CrawlReport {
    /// Number of pages saved successfully
    pub fn page_count(&self) -> usize {
        self.saved.len()
    }

    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &PageFailure> {
        self.failures.iter().filter(move |failure| failure.kind == kind)
    }
}
