//! Crawler coordinator - the public face of the crawl engine
//!
//! A `Crawler` owns the shared stores, the fetcher, the batch sink and the
//! event channel. Each call to `crawl` runs a fresh control loop over the
//! same stores with a fresh cancellation token.

use crate::config::{check_crawl_limits, Config};
use crate::crawler::events::{CrawlEvent, EVENT_CHANNEL_CAPACITY};
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::scheduler::Scheduler;
use crate::crawler::worker::WorkerContext;
use crate::link::{url_type, QueuedLink, WebPage};
use crate::output::{build_report, flush_batch, BatchSink, CrawlReport, CsvBatchWriter};
use crate::state::{lock, CrawlState};
use crate::CrawlError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Main crawler structure
pub struct Crawler<F = HttpFetcher> {
    config: Config,
    state: Arc<CrawlState>,
    fetcher: Arc<F>,
    sink: Option<Arc<dyn BatchSink>>,
    events: broadcast::Sender<CrawlEvent>,
    cancel: Mutex<CancellationToken>,
    crawling: AtomicBool,
}

impl Crawler<HttpFetcher> {
    /// Creates a crawler that fetches through the configured proxy
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built (e.g. a malformed proxy
    /// address).
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::new(&config.proxy, config.crawler.timeout())?;
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Checks that `ping_url` is reachable through the proxy
    ///
    /// # Arguments
    ///
    /// * `ping_url` - Page fetched through the proxy, normally a clearnet site
    ///
    /// # Returns
    ///
    /// `true` when the page answered with a 2xx status
    pub async fn check_proxy_is_up(&self, ping_url: &str) -> bool {
        tracing::info!("Checking proxy via {}", ping_url);
        self.fetcher.ping(ping_url).await
    }
}

impl<F: Fetcher> Crawler<F> {
    /// Creates a crawler around any fetcher
    ///
    /// Batches are flushed to CSV when `output.pages-path` is configured;
    /// otherwise results stay in memory.
    ///
    /// # Arguments
    ///
    /// * `config` - Crawl settings; limits are checked when `crawl` starts
    /// * `fetcher` - Source of page bodies, shared by every worker
    pub fn with_fetcher(config: Config, fetcher: F) -> Self {
        let sink = CsvBatchWriter::from_config(&config.output)
            .map(|writer| Arc::new(writer) as Arc<dyn BatchSink>);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            config,
            state: Arc::new(CrawlState::new()),
            fetcher: Arc::new(fetcher),
            sink,
            events,
            cancel: Mutex::new(CancellationToken::new()),
            crawling: AtomicBool::new(false),
        }
    }

    /// Replaces the batch sink
    pub fn with_sink(mut self, sink: Arc<dyn BatchSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Subscribes to crawl events
    ///
    /// Receivers only see events published after they subscribe. A receiver
    /// that falls behind loses the oldest events, never the crawl.
    ///
    /// # Returns
    ///
    /// A receiver for every `CrawlEvent` of later crawls
    pub fn subscribe(&self) -> broadcast::Receiver<CrawlEvent> {
        self.events.subscribe()
    }

    /// Asks the running crawl to stop
    ///
    /// Queued links are left alone; in-flight fetches are abandoned and
    /// recorded as failed. Has no effect on a later `crawl` call.
    pub fn stop(&self) {
        tracing::info!("Stop requested");
        lock(&self.cancel).cancel();
    }

    pub fn is_crawling(&self) -> bool {
        self.crawling.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn saved_batches(&self) -> u64 {
        self.state.saved_batches()
    }

    pub fn in_progress(&self) -> usize {
        self.state.in_progress()
    }

    pub fn report(&self) -> CrawlReport {
        build_report(&self.state)
    }

    /// Flushes the current batch to the sink
    ///
    /// # Returns
    ///
    /// The number of pages written; 0 when there is nothing to write or no
    /// sink is configured
    ///
    /// # Errors
    ///
    /// Returns the sink's error. Records that were not written stay in
    /// memory for the next flush.
    pub fn flush(&self) -> Result<usize, CrawlError> {
        match &self.sink {
            Some(sink) => Ok(flush_batch(&self.state, sink.as_ref())?),
            None => Ok(0),
        }
    }

    /// Crawls breadth-first from `root_url`
    ///
    /// Per-link failures never surface here; they are recorded in the
    /// Failed store.
    ///
    /// # Arguments
    ///
    /// * `root_url` - Absolute URL queued at depth 0
    ///
    /// # Returns
    ///
    /// The pages still held in memory when the crawl ends, i.e. the last
    /// unflushed batch
    ///
    /// # Errors
    ///
    /// Fails before any fetch when the crawl limits are invalid or
    /// `root_url` is not an absolute URL.
    pub async fn crawl(&self, root_url: &str) -> Result<Vec<WebPage>, CrawlError> {
        check_crawl_limits(&self.config.crawler)?;
        Url::parse(root_url)?;

        let cancel = self.reset_cancellation();
        let max_workers = self.config.crawler.effective_threads();
        let ctx = Arc::new(WorkerContext {
            state: Arc::clone(&self.state),
            fetcher: Arc::clone(&self.fetcher),
            settings: self.config.crawler.clone(),
            include: self.config.include,
            events: self.events.clone(),
            cancel,
        });

        tracing::info!("Starting crawl of {} with {} workers", root_url, max_workers);
        self.crawling.store(true, Ordering::SeqCst);

        let scheduler = Scheduler::new(ctx, self.sink.clone(), max_workers);
        let root = QueuedLink::new(root_url, 0, url_type(root_url));
        let pages = scheduler.run(root).await;

        self.crawling.store(false, Ordering::SeqCst);
        tracing::info!(
            "Crawl completed: {} pages fetched, {} batches saved",
            self.state.total_pages(),
            self.state.saved_batches()
        );

        Ok(pages)
    }

    fn reset_cancellation(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *lock(&self.cancel) = token.clone();
        token
    }
}
