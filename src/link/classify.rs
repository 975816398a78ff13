//! Regex-based link classification
//!
//! Links are found by scanning raw page text with one pattern per network,
//! so links inside scripts, comments or plain text are picked up as well as
//! those in `href` attributes. Everything here is a pure function of its input.

use super::{Link, LinkType};
use crate::config::IncludeConfig;
use regex::Regex;
use std::sync::LazyLock;

const URL_PATH: &str = r#"(?:/[^\s"><]*)?"#;

const CLEARNET_TLDS: &str = "com|org|net|gov|edu|io|co|biz|info|me|mil|us|uk|ca|de|jp|fr|au|cn|ru|br|it|in|es|nl|se|no|ch|fi|pl|gr|pt|tr|mx|ar|za|nz|sg|kr|hk|my|th|vn|cz|ro|bg|lt|lv|ee|sk|hu|be|is|dk|at|sa|ae|il|ir|pk|bd|tw|ph";

static ONION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\bhttps?://[a-z2-7]{{16,56}}\.onion\b{}", URL_PATH))
        .expect("hardcoded regex pattern is valid")
});

static CLEARNET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\bhttps?://(?:[a-zA-Z0-9-]+\.)+(?:{})\b{}",
        CLEARNET_TLDS, URL_PATH
    ))
    .expect("hardcoded regex pattern is valid")
});

static I2P_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\bhttps?://[a-zA-Z0-9-]+\.i2p\b{}", URL_PATH))
        .expect("hardcoded regex pattern is valid")
});

static IP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\bhttps?://(?:\d{{1,3}}\.){{3}}\d{{1,3}}(?::\d+)?\b{}",
        URL_PATH
    ))
    .expect("hardcoded regex pattern is valid")
});

/// Extracts every link of an enabled category from page text
///
/// Matches are returned grouped by category (onion, clearnet, I2P, IP) in
/// document order within each group. Duplicates are kept: the caller counts
/// every occurrence.
///
/// # Example
///
/// ```
/// use onion_crawler::config::IncludeConfig;
/// use onion_crawler::link::{extract_links, LinkType};
///
/// let html = r#"<a href="http://abcdefghijklmnop.onion/x">x</a> http://www.example.com/"#;
/// let include = IncludeConfig { onion: true, clearnet: true, i2p: false, ip: false };
/// let links = extract_links(html, &include);
/// assert_eq!(links.len(), 2);
/// assert_eq!(links[0].link_type, LinkType::Onion);
/// assert_eq!(links[1].link_type, LinkType::Clearnet);
/// ```
pub fn extract_links(html: &str, include: &IncludeConfig) -> Vec<Link> {
    let rules: [(bool, &Regex, LinkType); 4] = [
        (include.onion, &ONION_PATTERN, LinkType::Onion),
        (include.clearnet, &CLEARNET_PATTERN, LinkType::Clearnet),
        (include.i2p, &I2P_PATTERN, LinkType::I2P),
        (include.ip, &IP_PATTERN, LinkType::IP),
    ];

    rules
        .into_iter()
        .filter(|(enabled, _, _)| *enabled)
        .flat_map(|(_, pattern, link_type)| {
            pattern
                .find_iter(html)
                .map(move |m| Link::new(m.as_str(), link_type))
        })
        .collect()
}

/// Classifies a single URL
///
/// Patterns are tried in priority order: onion, clearnet, I2P, IP. A URL
/// matching none of them is `Unknown`.
pub fn url_type(url: &str) -> LinkType {
    if ONION_PATTERN.is_match(url) {
        LinkType::Onion
    } else if CLEARNET_PATTERN.is_match(url) {
        LinkType::Clearnet
    } else if I2P_PATTERN.is_match(url) {
        LinkType::I2P
    } else if IP_PATTERN.is_match(url) {
        LinkType::IP
    } else {
        LinkType::Unknown
    }
}
