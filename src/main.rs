//! Ladle main entry point
//!
//! This is the command-line interface for the Ladle recipe crawler.

use anyhow::Context;
use clap::{ArgGroup, Parser};
use ladle::config::{load_config, validate, Config, RateLimit};
use ladle::crawler::{
    install_signal_handler, Coordinator, CrawlReport, ReqwestTransport, SeedSource, Shutdown,
};
use ladle::DedupIndex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Ladle: a breadth-first recipe crawler
///
/// Ladle fetches recipes from the portal, follows their related recipes
/// level by level, and writes one JSON file per recipe. An index in the
/// output folder remembers every recipe already fetched.
#[derive(Parser, Debug)]
#[command(name = "ladle")]
#[command(version = "1.0.0")]
#[command(about = "A breadth-first recipe crawler", long_about = None)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["daily", "search", "url", "id", "all"])
))]
struct Cli {
    /// Start from the recipe of the day
    #[arg(short, long)]
    daily: bool,

    /// Start from the results of one or more searches
    #[arg(short, long, value_name = "TERM", num_args = 1..)]
    search: Vec<String>,

    /// Start from recipe page URLs
    #[arg(short, long, value_name = "URL", num_args = 1..)]
    url: Vec<String>,

    /// Start from recipe identifiers
    #[arg(short, long, value_name = "ID", num_args = 1..)]
    id: Vec<String>,

    /// Start from the complete recipe listing
    #[arg(short, long)]
    all: bool,

    /// Path to TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Fetch recipes even if the index already contains them
    #[arg(short, long)]
    force_all: bool,

    /// Output folder for recipes and the index
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Number of results to take from each search
    #[arg(short = 'n', long, value_name = "N")]
    search_count: Option<usize>,

    /// Levels of related recipes to follow after the seeds
    #[arg(short, long, value_name = "DEPTH")]
    recursion: Option<u32>,

    /// Comments to fetch per recipe (0 = none, negative = all)
    #[arg(short, long, value_name = "N", allow_negative_numbers = true)]
    comments: Option<i64>,

    /// Delay between requests: seconds, or a range such as 0.1,0.5
    #[arg(long, value_name = "SECONDS")]
    rate_limit: Option<RateLimit>,

    /// Attempts per request before giving up
    #[arg(long, value_name = "N")]
    max_attempts: Option<u32>,

    /// Number of concurrent fetch workers
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Only add the seed identifiers to the index, fetch nothing
    #[arg(long)]
    index_only: bool,

    /// Validate the configuration and show what would be crawled
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn seed_source(&self) -> SeedSource {
        if self.daily {
            SeedSource::Daily
        } else if self.all {
            SeedSource::All
        } else if !self.search.is_empty() {
            SeedSource::Search(self.search.clone())
        } else if !self.url.is_empty() {
            SeedSource::Urls(self.url.clone())
        } else {
            SeedSource::Ids(self.id.clone())
        }
    }

    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        let crawler = &mut config.crawler;
        crawler.force_all |= self.force_all;
        crawler.index_only |= self.index_only;
        if let Some(depth) = self.recursion {
            crawler.recursion_depth = depth;
        }
        if let Some(count) = self.comments {
            crawler.comment_fetch_count = count;
        }
        if let Some(count) = self.search_count {
            crawler.search_result_count = count;
        }
        if let Some(limit) = self.rate_limit {
            crawler.rate_limit = limit;
        }
        if let Some(attempts) = self.max_attempts {
            crawler.max_fetch_attempts = attempts;
        }
        if let Some(workers) = self.workers {
            crawler.worker_pool_size = workers;
        }
        if let Some(folder) = &self.output {
            config.output.folder = folder.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => Config::default(),
    };
    cli.apply_overrides(&mut config);
    validate(&config).context("Invalid configuration")?;

    let source = cli.seed_source();

    if cli.dry_run {
        handle_dry_run(&config, &source);
        return Ok(());
    }

    handle_crawl(config, source, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ladle=warn"),
            1 => EnvFilter::new("ladle=info,warn"),
            2 => EnvFilter::new("ladle=debug,info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, source: &SeedSource) {
    let crawler = &config.crawler;

    println!("=== Ladle Dry Run ===\n");

    println!("Seeds: {:?}", source);

    println!("\nCrawler Configuration:");
    println!("  Recursion depth: {}", crawler.recursion_depth);
    println!("  Force all: {}", crawler.force_all);
    println!("  Index only: {}", crawler.index_only);
    println!("  Rate limit: {}", crawler.rate_limit);
    println!("  Max fetch attempts: {}", crawler.max_fetch_attempts);
    println!("  Workers: {}", crawler.worker_pool_size);
    println!("  Comments per recipe: {}", crawler.comment_fetch_count);
    println!("  Results per search: {}", crawler.search_result_count);

    println!("\nPortal:");
    println!("  Pages: {}", config.portal.base_url);
    println!("  API: {}", config.portal.api_url);

    println!("\nOutput:");
    println!("  Folder: {}", config.output.folder.display());
    println!("  Index: {}", config.output.index_path().display());

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, source: SeedSource, quiet: bool) -> anyhow::Result<()> {
    let index_path = config.output.index_path();
    let index = Arc::new(
        DedupIndex::open(&index_path)
            .with_context(|| format!("Failed to open index {}", index_path.display()))?,
    );
    tracing::info!("Index holds {} recipes", index.len());

    let shutdown = Shutdown::new();
    install_signal_handler(shutdown.clone(), Arc::clone(&index));

    let transport = Arc::new(ReqwestTransport::new().context("Failed to build HTTP client")?);
    let coordinator = Coordinator::new(Arc::new(config), Arc::clone(&index), transport, shutdown);

    let outcome = crawl(&coordinator, &source).await;

    index.close().context("Failed to close index")?;

    let report = outcome.context("Crawl failed")?;
    if !quiet {
        println!("Fetched {} recipes", report.fetched);
        if report.interrupted {
            println!("Crawl was interrupted; rerun to continue");
        }
    }

    Ok(())
}

/// Resolves the seeds and runs the crawl
async fn crawl(coordinator: &Coordinator, source: &SeedSource) -> ladle::Result<CrawlReport> {
    let seeds = coordinator.resolve_seeds(source).await?;
    tracing::info!("Resolved {} seed recipes", seeds.len());
    coordinator.run(seeds).await
}
