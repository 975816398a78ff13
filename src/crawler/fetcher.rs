//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building a SOCKS5-proxied HTTP client with browser-like headers
//! - GET requests returning the page body
//! - Error classification (HTTP status vs. transient network failure)
//! - The proxy health check

use crate::config::ProxyConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION};
use reqwest::{redirect::Policy, Client, Proxy};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
pub const DEFAULT_ACCEPT_ENCODING: &str = "gzip, deflate, br";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; rv:102.0) Gecko/20100101 Firefox/102.0";

/// Why a link could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Fetch of {url} cancelled")]
    Cancelled { url: String },

    #[error("Giving up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

impl FetchFailure {
    /// Transient failures are retried; everything else is terminal
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Network { .. })
    }
}

/// Fetches the body of a page
///
/// Implementations must be cheap to share between workers; one call is one
/// attempt, retries are the caller's business.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchFailure>> + Send;
}

/// Builds the HTTP client used for every request
///
/// Redirects are not followed: a 3xx response counts as a failed fetch.
/// When the proxy is enabled all traffic goes through it; otherwise
/// environment proxy settings are ignored as well.
///
/// # Arguments
///
/// * `proxy` - SOCKS proxy settings
/// * `timeout` - Limit for a whole request, connect included
///
/// # Errors
///
/// Fails when the proxy address cannot be parsed or the TLS backend
/// cannot be initialized.
pub fn build_http_client(proxy: &ProxyConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(DEFAULT_ACCEPT_ENCODING));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    let builder = Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .default_headers(headers)
        .timeout(timeout)
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .deflate(true);

    let builder = if proxy.enabled {
        builder.proxy(Proxy::all(proxy.proxy_url())?)
    } else {
        builder.no_proxy()
    };

    builder.build()
}

/// Fetcher backed by a (normally SOCKS-proxied) reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(proxy: &ProxyConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(proxy, timeout)?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Checks that the proxy is usable by fetching `ping_url` through it
    ///
    /// Any 2xx response counts as up; every error counts as down.
    pub async fn ping(&self, ping_url: &str) -> bool {
        match self.client.get(ping_url).send().await {
            Ok(response) => {
                let up = response.status().is_success();
                if !up {
                    tracing::warn!("Proxy check got HTTP {} from {}", response.status(), ping_url);
                }
                up
            }
            Err(e) => {
                tracing::warn!("Proxy check failed: {}", e);
                false
            }
        }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| classify_error(url, e))
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> FetchFailure {
    if error.is_timeout() {
        FetchFailure::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchFailure::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
