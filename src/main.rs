use clap::Parser;
use page_harvest::{ConfigError, CrawlConfig, SiteCrawl};
use std::process::ExitCode;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let crawl = match build_crawl(&args) {
        Ok(crawl) => crawl,
        Err(e) => {
            ::log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    ::log::info!("Crawling requires a WebDriver server (e.g., ChromeDriver)");
    ::log::info!(
        "Set the WEBDRIVER_URL environment variable if not using the default http://localhost:4444"
    );

    let start_time = std::time::Instant::now();
    match crawl.run().await {
        Ok(report) => {
            for failure in &report.failures {
                ::log::warn!("{:?} failure for {}: {}", failure.kind, failure.url, failure.message);
            }
            ::log::info!(
                "Crawling complete - saved {} pages in {:.2} seconds",
                report.page_count(),
                start_time.elapsed().as_secs_f64()
            );
            println!("{}", report.page_count());
            ExitCode::SUCCESS
        }
        Err(e) => {
            ::log::error!("Crawl failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Merge the config file (if any) with command-line overrides
fn build_crawl(args: &Args) -> Result<SiteCrawl, ConfigError> {
    let mut crawl = match &args.config {
        Some(path) => {
            let mut config = CrawlConfig::from_file(path)?;
            if let Some(url) = &args.url {
                config.start_url = url.clone();
            }
            SiteCrawl::from_config(config)
        }
        None => SiteCrawl::new(args.url.as_deref().unwrap_or_default()),
    };

    if let Some(max_pages) = args.max_pages {
        crawl = crawl.with_max_pages(max_pages);
    }
    if let Some(output_dir) = &args.output_dir {
        crawl = crawl.with_output_dir(output_dir);
    }
    if let Some(webdriver_url) = &args.webdriver_url {
        crawl = crawl.with_webdriver_url(webdriver_url);
    }
    if let Some(timeout) = args.timeout {
        crawl = crawl.with_navigation_timeout(timeout);
    }
    if args.max_depth.is_some() {
        crawl = crawl.with_max_depth(args.max_depth);
    }
    if let Some(evaluation) = args.evaluation {
        crawl = crawl.with_evaluation(evaluation.into());
    }
    if args.show_browser {
        crawl = crawl.with_headless(false);
    }

    crawl.config().validate()?;
    Ok(crawl)
}
