//! Shared helpers: an in-process fetcher serving scripted onion sites

use onion_crawler::config::{Config, CrawlerConfig, ProxyConfig};
use onion_crawler::crawler::{FetchFailure, Fetcher};
use onion_crawler::output::{BatchSink, OutputResult};
use onion_crawler::{Link, QueuedLink, WebPage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Builds a syntactically valid v2-length onion URL from a short label
pub fn onion(label: &str) -> String {
    format!("http://{:a<16}.onion/", label)
}

/// Builds an onion URL with a 56-character (v3-length) host
pub fn onion_v3(label: &str) -> String {
    format!("http://{:a<56}.onion/", label)
}

/// Renders a page linking to each URL
pub fn page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|url| format!(r#"<a href="{}">link</a>"#, url))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, anchors
    )
}

/// Config with the proxy off and an exact worker count
pub fn test_config(max_threads: usize) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_threads,
            force_thread_count: true,
            timeout_secs: 5,
            ..CrawlerConfig::default()
        },
        proxy: ProxyConfig {
            enabled: false,
            ..ProxyConfig::default()
        },
        ..Config::default()
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Page(String),
    Status(u16),
    Hang,
}

#[derive(Default)]
struct Script {
    replies: HashMap<String, Reply>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Fetcher answering from a fixed URL -> reply table
///
/// Unknown URLs get an empty page. Clones share the call log.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    script: Arc<Script>,
}

impl ScriptedFetcher {
    pub fn new(replies: Vec<(String, Reply)>) -> Self {
        Self::with_delay(replies, Duration::ZERO)
    }

    pub fn with_delay(replies: Vec<(String, Reply)>, delay: Duration) -> Self {
        Self {
            script: Arc::new(Script {
                replies: replies.into_iter().collect(),
                delay,
                ..Script::default()
            }),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.script.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls().iter().filter(|called| *called == url).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.script.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchFailure> {
        let script = &self.script;
        script.calls.lock().unwrap().push(url.to_string());
        let now = script.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        script.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }

        let reply = script
            .replies
            .get(url)
            .cloned()
            .unwrap_or_else(|| Reply::Page(String::new()));
        let result = match reply {
            Reply::Page(body) => Ok(body),
            Reply::Status(status) => Err(FetchFailure::Status {
                url: url.to_string(),
                status,
            }),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        };

        script.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Sink remembering the size of every batch it receives
///
/// A flush writes failed and external links before pages, so a batch is
/// recorded when its pages arrive.
#[derive(Default)]
pub struct RecordingSink {
    pending: Mutex<(usize, usize)>,
    batches: Mutex<Vec<(usize, usize, usize)>>,
}

impl RecordingSink {
    /// `(pages, failed, external)` per written batch
    pub fn batches(&self) -> Vec<(usize, usize, usize)> {
        self.batches.lock().unwrap().clone()
    }
}

impl BatchSink for RecordingSink {
    fn write_pages(&self, pages: &[WebPage]) -> OutputResult<()> {
        let (failed, external) = std::mem::take(&mut *self.pending.lock().unwrap());
        self.batches
            .lock()
            .unwrap()
            .push((pages.len(), failed, external));
        Ok(())
    }

    fn write_failed(&self, links: &[QueuedLink]) -> OutputResult<()> {
        self.pending.lock().unwrap().0 = links.len();
        Ok(())
    }

    fn write_external(&self, links: &[Link]) -> OutputResult<()> {
        self.pending.lock().unwrap().1 = links.len();
        Ok(())
    }
}
