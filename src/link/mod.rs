//! Link model for Onion-Crawler
//!
//! This module defines the three record shapes the crawler moves between its
//! stores (`Link`, `QueuedLink`, `WebPage`), the `LinkType` categories, and the
//! regex-based link classifier.
//!
//! All three records are identified by URL alone. Instead of comparing records
//! of different shapes with each other, every store deduplicates through the
//! [`UrlKey`] accessor.

mod classify;
mod host;

pub use classify::{extract_links, url_type};
pub use host::extract_host;

use std::fmt;

/// Network category of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkType {
    Onion,
    Clearnet,
    I2P,
    IP,
    Unknown,
}

impl LinkType {
    /// Returns true for links the crawler follows
    ///
    /// Clearnet, I2P and IP links are recorded as external and never queued.
    pub fn is_in_network(&self) -> bool {
        matches!(self, Self::Onion | Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Onion => "Onion",
            Self::Clearnet => "Clearnet",
            Self::I2P => "I2P",
            Self::IP => "IP",
            Self::Unknown => "Unknown",
        }
    }

    /// Parses the name written by [`LinkType::as_str`]
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "Onion" => Some(Self::Onion),
            "Clearnet" => Some(Self::Clearnet),
            "I2P" => Some(Self::I2P),
            "IP" => Some(Self::IP),
            "Unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared identity of every stored record: its URL
pub trait UrlKey {
    fn url_key(&self) -> &str;
}

/// A classified link discovered on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub link_type: LinkType,
}

impl Link {
    pub fn new(url: impl Into<String>, link_type: LinkType) -> Self {
        Self {
            url: url.into(),
            link_type,
        }
    }

    /// Builds a link, classifying the URL with the pattern rules
    pub fn classified(url: impl Into<String>) -> Self {
        let url = url.into();
        let link_type = url_type(&url);
        Self { url, link_type }
    }
}

impl UrlKey for Link {
    fn url_key(&self) -> &str {
        &self.url
    }
}

/// A link accepted into the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedLink {
    pub url: String,
    pub depth: u32,
    /// Transient fetch failures so far; only the owning worker changes it
    pub retry_count: u32,
    pub link_type: LinkType,
}

impl QueuedLink {
    pub fn new(url: impl Into<String>, depth: u32, link_type: LinkType) -> Self {
        Self {
            url: url.into(),
            depth,
            retry_count: 0,
            link_type,
        }
    }

    /// Queues a discovered link one level below its parent
    pub fn child_of(link: Link, parent_depth: u32) -> Self {
        Self::new(link.url, parent_depth + 1, link.link_type)
    }

    pub fn increment_retry_count(&mut self) {
        self.retry_count += 1;
    }
}

impl UrlKey for QueuedLink {
    fn url_key(&self) -> &str {
        &self.url
    }
}

/// A successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebPage {
    pub url: String,
    pub title: String,
    /// Host part of the URL, empty when the URL cannot be parsed
    pub host: String,
    pub description: String,
    pub depth: u32,
    /// Links found on the page, whether or not they were queued
    pub extracted_link_count: usize,
    pub link_type: LinkType,
}

impl WebPage {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        depth: u32,
        extracted_link_count: usize,
        link_type: LinkType,
    ) -> Self {
        let url = url.into();
        let host = extract_host(&url).unwrap_or_default();
        Self {
            url,
            title: title.into(),
            host,
            description: description.into(),
            depth,
            extracted_link_count,
            link_type,
        }
    }
}

impl UrlKey for WebPage {
    fn url_key(&self) -> &str {
        &self.url
    }
}
