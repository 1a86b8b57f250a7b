use crate::error::WriteError;
use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

static SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").expect("Scheme pattern should be valid")
});
static NON_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9]+").expect("Separator pattern should be valid")
});

/// Extension of every artifact file
pub const ARTIFACT_EXTENSION: &str = "txt";

/// Convert a URL to the artifact file name.
///
/// The scheme is dropped, every run of non-alphanumeric characters becomes a
/// single `_`, and the result is lowercased. Distinct URLs can map to the same
/// name (`/a-b` and `/a_b`), in which case the later save overwrites.
pub fn url_to_file_name(url: &str) -> String {
    let without_scheme = SCHEME.replace(url, "");
    let collapsed = NON_ALPHANUMERIC.replace_all(&without_scheme, "_");
    format!("{}.{}", collapsed.to_lowercase(), ARTIFACT_EXTENSION)
}

/// Text written for one page
pub fn format_artifact(url: &str, content: &str) -> String {
    format!("URL: {}\n\nContent:\n{}", url, content.trim())
}

/// Destination for page artifacts
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Persist the artifact for `url` and return where it went
    async fn save(&self, url: &str, content: &str) -> Result<PathBuf, WriteError>;
}

/// Writes one text file per page into a directory
#[derive(Debug, Clone)]
pub struct FileArtifactWriter {
    output_dir: PathBuf,
}

impl FileArtifactWriter {
    /// Use `output_dir`, creating it (and its parents) if needed
    pub async fn create(output_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let output_dir = output_dir.into();
        tokio::fs::create_dir_all(&output_dir).await?;
        Ok(Self { output_dir })
    }

    pub fn path_for(&self, url: &str) -> PathBuf {
        self.output_dir.join(url_to_file_name(url))
    }
}

#[async_trait]
impl ArtifactSink for FileArtifactWriter {
    async fn save(&self, url: &str, content: &str) -> Result<PathBuf, WriteError> {
        let path = self.path_for(url);
        match tokio::fs::write(&path, format_artifact(url, content)).await {
            Ok(()) => Ok(path),
            Err(source) => Err(WriteError {
                url: url.to_string(),
                path,
                source,
            }),
        }
    }
}
