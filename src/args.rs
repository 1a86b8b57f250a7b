use clap::{Parser, ValueEnum};
use page_harvest::EvaluationMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "page-harvest")]
#[command(about = "Crawls a site in a browser and saves the text of each page")]
#[command(version)]
pub struct Args {
    /// URL to start from; only pages on the same origin are followed
    #[arg(required_unless_present = "config")]
    pub url: Option<String>,

    /// JSON configuration file (command-line flags take precedence)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum number of pages to crawl
    #[arg(short, long)]
    pub max_pages: Option<usize>,

    /// Directory receiving one .txt file per page
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// WebDriver endpoint (e.g. ChromeDriver)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Seconds allowed for loading each page
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Maximum link depth from the start URL
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Where page scripts are evaluated
    #[arg(long, value_enum)]
    pub evaluation: Option<EvaluationArg>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub show_browser: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum EvaluationArg {
    /// Run extraction scripts in the live page
    InPage,
    /// Extract from the rendered HTML source
    Snapshot,
}

impl From<EvaluationArg> for EvaluationMode {
    fn from(arg: EvaluationArg) -> Self {
        match arg {
            EvaluationArg::InPage => EvaluationMode::InPage,
            EvaluationArg::Snapshot => EvaluationMode::Snapshot,
        }
    }
}
