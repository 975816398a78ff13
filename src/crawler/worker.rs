//! Per-link processing
//!
//! A worker fetches one link (retrying transient failures), extracts and
//! routes the links found on the page, and records the outcome in the
//! shared stores.

use crate::config::{CrawlerConfig, IncludeConfig};
use crate::crawler::events::{emit, CrawlEvent};
use crate::crawler::fetcher::{FetchFailure, Fetcher};
use crate::crawler::parser::parse_metadata;
use crate::link::{extract_links, QueuedLink, WebPage};
use crate::state::CrawlState;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Everything a worker needs, shared by all workers of one crawl
pub(crate) struct WorkerContext<F> {
    pub state: Arc<CrawlState>,
    pub fetcher: Arc<F>,
    pub settings: CrawlerConfig,
    pub include: IncludeConfig,
    pub events: broadcast::Sender<CrawlEvent>,
    pub cancel: CancellationToken,
}

/// Processes one dequeued link to completion
///
/// Whatever the outcome, the link ends up in Visited, the current depth is
/// set to the link's depth and the in-progress counter is decremented.
pub(crate) async fn process_link<F: Fetcher>(ctx: Arc<WorkerContext<F>>, mut link: QueuedLink) {
    tracing::debug!("Processing URL: {} (depth {})", link.url, link.depth);

    match fetch_with_retry(&ctx, &mut link).await {
        Ok(body) => handle_page(&ctx, &link, &body),
        Err(reason) => {
            tracing::debug!("Link failed: {}", reason);
            ctx.state.insert_failed(link.clone());
            emit(
                &ctx.events,
                CrawlEvent::Failed {
                    link: link.clone(),
                    reason,
                },
            );
        }
    }

    ctx.state.set_current_depth(link.depth);
    ctx.state.mark_visited(&link.url);
    ctx.state.finish_processing();
}

/// Fetches a link, retrying timeouts and network errors
///
/// An HTTP status failure or a cancellation ends the attempts at once.
/// Each transient failure bumps the link's retry count; when it reaches
/// `max_retry` the link is given up on.
async fn fetch_with_retry<F: Fetcher>(
    ctx: &WorkerContext<F>,
    link: &mut QueuedLink,
) -> Result<String, FetchFailure> {
    let mut last_error = None;

    while link.retry_count < ctx.settings.max_retry {
        if ctx.cancel.is_cancelled() {
            return Err(FetchFailure::Cancelled {
                url: link.url.clone(),
            });
        }

        let attempt = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(FetchFailure::Cancelled { url: link.url.clone() }),
            result = ctx.fetcher.fetch(&link.url) => result,
        };

        match attempt {
            Ok(body) => return Ok(body),
            Err(FetchFailure::Status { url, status }) => {
                tracing::warn!("HTTP {} from {}", status, url);
                emit(
                    &ctx.events,
                    CrawlEvent::HttpError {
                        url: url.clone(),
                        status,
                    },
                );
                return Err(FetchFailure::Status { url, status });
            }
            Err(e) if e.is_retryable() => {
                link.increment_retry_count();
                tracing::debug!(
                    "Attempt {}/{} failed: {}",
                    link.retry_count,
                    ctx.settings.max_retry,
                    e
                );
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(FetchFailure::RetriesExhausted {
        url: link.url.clone(),
        attempts: link.retry_count,
        last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}

/// Routes the links found on a fetched page and stores the page
fn handle_page<F>(ctx: &WorkerContext<F>, link: &QueuedLink, body: &str) {
    let found = extract_links(body, &ctx.include);
    let extracted_link_count = found.len();

    let mut children = Vec::new();
    for candidate in found {
        if candidate.link_type.is_in_network() {
            children.push(QueuedLink::child_of(candidate, link.depth));
        } else {
            ctx.state.record_external(candidate);
        }
    }

    let queued = ctx.state.enqueue_discovered(
        children,
        ctx.settings.max_in_queue,
        ctx.settings.max_depth,
    );

    let metadata = parse_metadata(body);
    let page = WebPage::new(
        &link.url,
        metadata.title,
        metadata.description,
        link.depth,
        extracted_link_count,
        link.link_type,
    );
    tracing::debug!(
        "Fetched {}: {} links found, {} queued",
        page.url,
        extracted_link_count,
        queued.len()
    );
    ctx.state.insert_page(page.clone());

    if !queued.is_empty() {
        emit(&ctx.events, CrawlEvent::Queued(queued));
    }
    emit(&ctx.events, CrawlEvent::PageFetched(page));
}
