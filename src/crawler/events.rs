use crate::crawler::fetcher::FetchFailure;
use crate::link::{QueuedLink, WebPage};
use tokio::sync::broadcast;

/// Capacity of the event channel; slow subscribers lag rather than block workers
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Progress notifications published by the crawl engine
#[derive(Debug, Clone)]
pub enum CrawlEvent {
    /// Links accepted into the frontier
    Queued(Vec<QueuedLink>),

    /// A link was handed to a worker
    Processing(QueuedLink),

    /// A page was fetched and stored
    PageFetched(WebPage),

    /// A link ended up in the Failed store
    Failed {
        link: QueuedLink,
        reason: FetchFailure,
    },

    /// A fetch got a non-success HTTP status
    HttpError { url: String, status: u16 },

    /// The crawl ended; carries the pages of the last (unflushed) batch
    Finished(Vec<WebPage>),
}

/// Publishes an event, ignoring the error raised when nobody is subscribed
pub(crate) fn emit(tx: &broadcast::Sender<CrawlEvent>, event: CrawlEvent) {
    let _ = tx.send(event);
}
