//! Onion-Crawler main entry point
//!
//! This is the command-line interface for the Onion-Crawler Tor crawler.

use anyhow::Context;
use clap::Parser;
use onion_crawler::config::{load_config_with_hash, validate, Config};
use onion_crawler::output::{format_elapsed, print_report};
use onion_crawler::Crawler;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Pages file used when neither the command line nor a config file names one
const DEFAULT_PAGES_PATH: &str = "results.csv";

/// Failed-links file used when neither the command line nor a config file names one
const DEFAULT_FAILED_PATH: &str = "failed.csv";

/// Batch size of a run without a config file
const DEFAULT_CLI_BATCH_SIZE: usize = 40;

/// Onion-Crawler: a breadth-first crawler for onion sites
///
/// Onion-Crawler fetches pages through a Tor SOCKS proxy starting from a
/// root URL, follows onion links breadth-first and writes pages, failed
/// links and external links to CSV files in batches.
#[derive(Parser, Debug)]
#[command(name = "onion-crawler")]
#[command(version = "2.0.0")]
#[command(about = "A breadth-first crawler for onion sites", long_about = None)]
struct Cli {
    /// URL to start crawling from
    #[arg(value_name = "ROOT_URL")]
    root_url: String,

    /// Path to TOML configuration file; command-line options override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SOCKS proxy host
    #[arg(long)]
    proxy_host: Option<String>,

    /// SOCKS proxy port
    #[arg(long)]
    proxy_port: Option<u16>,

    /// URL fetched through the proxy to check that it is up
    #[arg(long)]
    ping_url: Option<String>,

    /// Connect directly instead of through the proxy
    #[arg(long)]
    no_proxy: bool,

    /// Skip the proxy health check before crawling
    #[arg(long)]
    skip_proxy_check: bool,

    /// Maximum fetch attempts per link
    #[arg(long)]
    max_retry: Option<u32>,

    /// Maximum number of concurrent workers
    #[arg(long)]
    max_threads: Option<usize>,

    /// Use --max-threads as given instead of clamping it to the CPU count
    #[arg(long)]
    force_thread_count: bool,

    /// Maximum link depth from the root URL
    #[arg(long)]
    max_depth: Option<u32>,

    /// Stop after this many pages
    #[arg(long)]
    max_pages: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Pages kept in memory before a batch is written [default: 40]
    #[arg(long)]
    batch_size: Option<usize>,

    /// Maximum number of links waiting in the queue
    #[arg(long)]
    max_in_queue: Option<usize>,

    /// Do not extract onion links
    #[arg(long)]
    no_onion: bool,

    /// Extract clearnet links
    #[arg(long)]
    clearnet: bool,

    /// Extract I2P links
    #[arg(long)]
    i2p: bool,

    /// Extract bare-IP links
    #[arg(long)]
    ip: bool,

    /// CSV file receiving fetched pages [default: results.csv]
    #[arg(long, value_name = "FILE")]
    pages_path: Option<PathBuf>,

    /// CSV file receiving failed links [default: failed.csv]
    #[arg(long, value_name = "FILE")]
    failed_path: Option<PathBuf>,

    /// CSV file receiving external links
    #[arg(long, value_name = "FILE")]
    external_path: Option<PathBuf>,

    /// Seconds between status lines (0 disables them)
    #[arg(long, default_value_t = 5)]
    status_interval: u64,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Loads the config file if one was given, otherwise the CLI defaults
    fn base_config(&self) -> anyhow::Result<Config> {
        let Some(path) = &self.config else {
            return Ok(cli_default_config());
        };

        tracing::info!("Loading configuration from: {}", path.display());
        let (mut config, hash) = load_config_with_hash(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
        tracing::info!("Configuration loaded successfully (hash: {})", hash);

        let output = &mut config.output;
        output
            .pages_path
            .get_or_insert_with(|| PathBuf::from(DEFAULT_PAGES_PATH));
        output
            .failed_path
            .get_or_insert_with(|| PathBuf::from(DEFAULT_FAILED_PATH));
        Ok(config)
    }

    /// Applies command-line options on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        let crawler = &mut config.crawler;
        if let Some(v) = self.max_retry {
            crawler.max_retry = v;
        }
        if let Some(v) = self.max_threads {
            crawler.max_threads = v;
        }
        if self.force_thread_count {
            crawler.force_thread_count = true;
        }
        if let Some(v) = self.max_depth {
            crawler.max_depth = v;
        }
        if let Some(v) = self.max_pages {
            crawler.max_pages = v;
        }
        if let Some(v) = self.timeout {
            crawler.timeout_secs = v;
        }
        if let Some(v) = self.batch_size {
            crawler.batch_size = v;
        }
        if let Some(v) = self.max_in_queue {
            crawler.max_in_queue = v;
        }

        let proxy = &mut config.proxy;
        if let Some(v) = &self.proxy_host {
            proxy.host = v.clone();
        }
        if let Some(v) = self.proxy_port {
            proxy.port = v;
        }
        if let Some(v) = &self.ping_url {
            proxy.ping_url = v.clone();
        }
        if self.no_proxy {
            proxy.enabled = false;
        }

        let include = &mut config.include;
        if self.no_onion {
            include.onion = false;
        }
        include.clearnet |= self.clearnet;
        include.i2p |= self.i2p;
        include.ip |= self.ip;

        let output = &mut config.output;
        if self.pages_path.is_some() {
            output.pages_path = self.pages_path.clone();
        }
        if self.failed_path.is_some() {
            output.failed_path = self.failed_path.clone();
        }
        if self.external_path.is_some() {
            output.external_path = self.external_path.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = cli.base_config()?;
    cli.apply_overrides(&mut config);
    validate(&config).context("Invalid configuration")?;

    let crawler = Arc::new(Crawler::new(config).context("Failed to build HTTP client")?);

    let proxy = &crawler.config().proxy;
    if proxy.enabled && !cli.skip_proxy_check {
        if !crawler.check_proxy_is_up(&proxy.ping_url).await {
            eprintln!("Proxy at {} is not reachable. Possible reasons:", proxy.proxy_url());
            eprintln!("  - Tor is not running");
            eprintln!("  - The proxy host or port is wrong");
            eprintln!("  - {} is down or blocked", proxy.ping_url);
            anyhow::bail!("proxy check failed");
        }
        tracing::info!("Proxy is up");
    }

    handle_crawl(crawler, &cli).await
}

/// Configuration of a run without a config file
///
/// Results go to `results.csv` and failed links to `failed.csv` in the
/// working directory, in batches of 40 pages.
fn cli_default_config() -> Config {
    let mut config = Config::default();
    config.crawler.batch_size = DEFAULT_CLI_BATCH_SIZE;
    config.output.pages_path = Some(PathBuf::from(DEFAULT_PAGES_PATH));
    config.output.failed_path = Some(PathBuf::from(DEFAULT_FAILED_PATH));
    config
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("onion_crawler=info,warn"),
            1 => EnvFilter::new("onion_crawler=debug,info"),
            2 => EnvFilter::new("onion_crawler=trace,debug"),
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

/// Runs the crawl, stopping it on Ctrl-C, then reports and saves the rest
async fn handle_crawl(crawler: Arc<Crawler>, cli: &Cli) -> anyhow::Result<()> {
    let started = Instant::now();
    let mut task = tokio::spawn({
        let crawler = Arc::clone(&crawler);
        let root_url = cli.root_url.clone();
        async move { crawler.crawl(&root_url).await }
    });

    let mut status = tokio::time::interval(Duration::from_secs(cli.status_interval.max(1)));
    let result = loop {
        tokio::select! {
            result = &mut task => break result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, waiting for workers to finish");
                crawler.stop();
            }
            _ = status.tick(), if cli.status_interval > 0 => {
                print_status(&crawler, started.elapsed());
            }
        }
    };

    let outcome = result.context("Crawl task panicked")?;
    if let Err(e) = &outcome {
        tracing::error!("Crawl failed: {}", e);
    }
    outcome?;

    print_report(&crawler.report(), &cli.root_url, started.elapsed());

    match crawler.flush() {
        Ok(0) => {}
        Ok(pages) => tracing::info!("Saved final batch ({} pages)", pages),
        Err(e) => tracing::error!("Failed to save final batch: {}", e),
    }

    Ok(())
}

/// Prints a one-line progress summary
fn print_status(crawler: &Crawler, elapsed: Duration) {
    let state = crawler.state();
    println!(
        "[{}] Pages: {} | In progress: {} | Queued: {} | Failed: {} | Saved batches: {}",
        format_elapsed(elapsed),
        state.total_pages(),
        crawler.in_progress(),
        state.frontier_len(),
        state.failed_len(),
        crawler.saved_batches()
    );
}
