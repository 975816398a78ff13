//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching through the SOCKS proxy with retry logic
//! - HTML metadata extraction
//! - The bounded worker pool and its control loop
//! - Overall crawl coordination and progress events

mod coordinator;
mod events;
mod fetcher;
mod parser;
mod scheduler;
mod worker;

pub use coordinator::Crawler;
pub use events::{CrawlEvent, EVENT_CHANNEL_CAPACITY};
pub use fetcher::{build_http_client, FetchFailure, Fetcher, HttpFetcher};
pub use parser::{parse_metadata, PageMetadata};
