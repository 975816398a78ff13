//! Aggregate crawl counters
//!
//! Totals combine the live in-memory stores with the pages already flushed
//! to disk. Per-host and per-category counts only see the live stores.

use crate::link::LinkType;
use crate::state::CrawlState;
use chrono::Local;
use std::collections::HashSet;
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Pages fetched, live and flushed
    pub total_pages: u64,

    /// Links known: queued links plus fetched pages
    pub total_links: u64,

    /// Distinct hosts among the live pages
    pub total_hosts: usize,

    /// Onion pages in the live batch plus every queued link
    pub onion_links: usize,

    /// Clearnet pages and external links in the live batch
    pub clearnet_links: usize,

    /// I2P pages and external links in the live batch
    pub i2p_links: usize,

    /// IP pages and external links in the live batch
    pub ip_links: usize,

    /// Failed links in the live batch
    pub failed_links: usize,

    pub queued: usize,
    pub in_progress: usize,
    pub saved_batches: u64,
}

/// Computes the report from the current crawl state
pub fn build_report(state: &CrawlState) -> CrawlReport {
    let queued = state.frontier_len();
    let pages = state.pages_snapshot();
    let external = state.external_snapshot();

    let total_pages = pages.len() as u64 + state.pages_flushed();
    let total_hosts = pages
        .iter()
        .map(|p| p.host.as_str())
        .collect::<HashSet<_>>()
        .len();

    let count = |link_type: LinkType| {
        pages.iter().filter(|p| p.link_type == link_type).count()
            + external.iter().filter(|l| l.link_type == link_type).count()
    };

    CrawlReport {
        total_pages,
        total_links: queued as u64 + total_pages,
        total_hosts,
        onion_links: pages
            .iter()
            .filter(|p| p.link_type == LinkType::Onion)
            .count()
            + queued,
        clearnet_links: count(LinkType::Clearnet),
        i2p_links: count(LinkType::I2P),
        ip_links: count(LinkType::IP),
        failed_links: state.failed_len(),
        queued,
        in_progress: state.in_progress(),
        saved_batches: state.saved_batches(),
    }
}

/// Formats a duration as `H:MM:SS`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Prints the final results block to stdout
pub fn print_report(report: &CrawlReport, root_url: &str, elapsed: Duration) {
    println!("\n=================== Crawling Results ===================");
    println!("Root URL: {}", root_url);
    println!("Finished: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("Elapsed: {}", format_elapsed(elapsed));
    println!("Total Pages Found: {}", report.total_pages);
    println!("Total Links Found: {}", report.total_links);
    println!("Total Hosts Found: {}", report.total_hosts);
    println!("Total Onion Links Found: {}", report.onion_links);
    println!(
        "Total Clearnet Links Found (Last Batch): {}",
        report.clearnet_links
    );
    println!("Total I2P Links Found (Last Batch): {}", report.i2p_links);
    println!("Total IP Links Found (Last Batch): {}", report.ip_links);
    println!("Failed Links (Last Batch): {}", report.failed_links);
    println!("Written Batches: {}", report.saved_batches);
    println!("========================================================\n");
}
