//! Output sink trait and error types
//!
//! A sink receives each drained batch of pages, failed links and external
//! links, one store at a time. Sinks are append-only: writing the same
//! records again adds rows.

use crate::link::{Link, QueuedLink, WebPage};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for flushed batches
///
/// Each store is written by its own call so that a failure in one leaves
/// the others written exactly once. Empty slices may be passed.
pub trait BatchSink: Send + Sync {
    /// Appends fetched pages
    fn write_pages(&self, pages: &[WebPage]) -> OutputResult<()>;

    /// Appends links that failed to fetch
    fn write_failed(&self, links: &[QueuedLink]) -> OutputResult<()>;

    /// Appends links outside the crawled network
    fn write_external(&self, links: &[Link]) -> OutputResult<()>;
}
