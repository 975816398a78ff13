//! Crawl control loop
//!
//! This module handles:
//! - Dispatching frontier links to a bounded pool of worker tasks
//! - Stopping on cancellation, depth or page limits
//! - Flushing batches once enough pages accumulate
//! - Draining in-flight workers before reporting completion

use crate::crawler::events::{emit, CrawlEvent};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::worker::{process_link, WorkerContext};
use crate::link::{QueuedLink, WebPage};
use crate::output::{flush_batch, BatchSink};
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};

/// Why the control loop stopped dispatching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    FrontierExhausted,
    Cancelled,
    /// Backstop only: children deeper than the limit are never enqueued,
    /// so a finished link cannot normally report a depth past it
    DepthLimit,
    PageLimit,
}

/// Runs the control loop for a single crawl
pub(crate) struct Scheduler<F> {
    ctx: Arc<WorkerContext<F>>,
    sink: Option<Arc<dyn BatchSink>>,
    max_workers: usize,
}

impl<F: Fetcher> Scheduler<F> {
    pub fn new(
        ctx: Arc<WorkerContext<F>>,
        sink: Option<Arc<dyn BatchSink>>,
        max_workers: usize,
    ) -> Self {
        Self {
            ctx,
            sink,
            max_workers: max_workers.max(1),
        }
    }

    /// Crawls from `root` until a stop condition holds
    ///
    /// Workers already running when the loop stops are awaited. Returns the
    /// pages still held in memory, i.e. those of the last unflushed batch.
    pub async fn run(&self, root: QueuedLink) -> Vec<WebPage> {
        let state = &self.ctx.state;
        if state.seed(root.clone()) {
            emit(&self.ctx.events, CrawlEvent::Queued(vec![root]));
        }

        let batch_size = self.ctx.settings.batch_size;
        // Pages held before the next flush attempt; raised after a failure
        // so the sink is not retried on every iteration
        let mut flush_above = batch_size;

        let mut workers: JoinSet<()> = JoinSet::new();
        let reason = loop {
            if let Some(reason) = self.stop_reason(&workers) {
                break reason;
            }

            if state.pages_len() > flush_above {
                flush_above = if self.flush() {
                    batch_size
                } else {
                    state.pages_len() + batch_size
                };
            }

            if workers.len() < self.max_workers {
                if let Some(link) = state.dequeue() {
                    state.begin_processing();
                    emit(&self.ctx.events, CrawlEvent::Processing(link.clone()));
                    workers.spawn(process_link(Arc::clone(&self.ctx), link));
                    continue;
                }
            }

            match workers.join_next().await {
                Some(result) => self.reap(result),
                None => tokio::task::yield_now().await,
            }
        };

        tracing::info!("Stopping crawl: {:?}", reason);

        if !workers.is_empty() {
            tracing::info!("Waiting for {} workers to finish", workers.len());
        }
        while let Some(result) = workers.join_next().await {
            self.reap(result);
        }

        let pages = state.pages_snapshot();
        emit(&self.ctx.events, CrawlEvent::Finished(pages.clone()));
        pages
    }

    fn stop_reason(&self, workers: &JoinSet<()>) -> Option<StopReason> {
        let state = &self.ctx.state;
        let settings = &self.ctx.settings;

        if self.ctx.cancel.is_cancelled() {
            Some(StopReason::Cancelled)
        } else if state.frontier_len() == 0 && workers.is_empty() {
            Some(StopReason::FrontierExhausted)
        } else if state.current_depth() > settings.max_depth {
            Some(StopReason::DepthLimit)
        } else if state.total_pages() > settings.max_pages {
            Some(StopReason::PageLimit)
        } else {
            None
        }
    }

    /// Writes the current batch, returning false when the sink failed
    fn flush(&self) -> bool {
        let Some(sink) = &self.sink else {
            return true;
        };

        match flush_batch(&self.ctx.state, sink.as_ref()) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Batch flush failed, keeping unwritten records in memory: {}", e);
                false
            }
        }
    }

    fn reap(&self, result: Result<(), JoinError>) {
        if let Err(e) = result {
            tracing::error!("Worker task failed: {}", e);
            self.ctx.state.finish_processing();
        }
    }
}
