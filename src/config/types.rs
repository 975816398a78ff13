use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Onion-Crawler
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub proxy: ProxyConfig,
    pub include: IncludeConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum fetch attempts per link (transient failures only)
    pub max_retry: u32,

    /// Maximum link depth from the root URL
    pub max_depth: u32,

    /// Maximum number of pages fetched before the crawl stops
    pub max_pages: u64,

    /// Maximum number of concurrently running workers
    pub max_threads: usize,

    /// Use `max_threads` as-is instead of clamping it to the available cores
    pub force_thread_count: bool,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Number of fetched pages that triggers a flush to disk
    pub batch_size: usize,

    /// Frontier capacity; discoveries beyond it are dropped
    pub max_in_queue: usize,
}

impl CrawlerConfig {
    /// Per-request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Number of workers the engine will actually run
    ///
    /// Unless `force_thread_count` is set, `max_threads` is clamped to one
    /// less than the available parallelism (but never below 1).
    pub fn effective_threads(&self) -> usize {
        if self.force_thread_count {
            return self.max_threads;
        }

        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.max_threads.min(available.saturating_sub(1).max(1))
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_retry: 3,
            max_depth: 10,
            max_pages: 1000,
            max_threads: 3,
            force_thread_count: false,
            timeout_secs: 20,
            batch_size: 200,
            max_in_queue: 1000,
        }
    }
}

/// SOCKS proxy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProxyConfig {
    /// Proxy host, either bare (`127.0.0.1`) or with a scheme (`socks5://127.0.0.1`)
    pub host: String,

    /// Proxy port
    pub port: u16,

    /// URL fetched through the proxy to check that it is up
    pub ping_url: String,

    /// Route requests through the proxy
    pub enabled: bool,
}

impl ProxyConfig {
    /// Builds the proxy URL handed to the HTTP client
    ///
    /// Bare hosts and `socks5://` hosts become `socks5h://` so that hostnames
    /// (and `.onion` names in particular) are resolved by the proxy.
    pub fn proxy_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        let host = match host.split_once("://") {
            Some(("socks5", rest)) => format!("socks5h://{}", rest),
            Some(_) => host.to_string(),
            None => format!("socks5h://{}", host),
        };
        format!("{}:{}", host, self.port)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9050,
            ping_url: "https://check.torproject.org/api/ip".to_string(),
            enabled: true,
        }
    }
}

/// Link categories extracted from fetched pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IncludeConfig {
    pub onion: bool,
    pub clearnet: bool,
    pub i2p: bool,
    pub ip: bool,
}

impl Default for IncludeConfig {
    fn default() -> Self {
        Self {
            onion: true,
            clearnet: false,
            i2p: false,
            ip: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// CSV file receiving fetched pages; batches are only flushed when set
    pub pages_path: Option<PathBuf>,

    /// CSV file receiving failed links
    pub failed_path: Option<PathBuf>,

    /// CSV file receiving external (non-onion) links
    pub external_path: Option<PathBuf>,
}
