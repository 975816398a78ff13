//! Output module for persisting crawl results
//!
//! This module handles:
//! - Flushing batches of pages, failed links and external links to a sink
//! - Appending those batches to CSV files
//! - Computing and printing aggregate crawl statistics

mod csv_output;
pub mod stats;
mod traits;

pub use csv_output::{write_links, write_pages, write_queued_links, CsvBatchWriter};
pub use stats::{build_report, format_elapsed, print_report, CrawlReport};
pub use traits::{BatchSink, OutputError, OutputResult};

use crate::state::{Batch, CrawlState};

/// Moves the current Pages / Failed / External stores to the sink
///
/// Each store is written separately. When all three succeed the stores
/// are left empty (apart from records added while writing) and the
/// saved-batch counter is incremented. When one fails, only that store's
/// records are put back for a later flush; the parts that were written
/// stay written, and written pages still count towards the crawl total.
/// An empty batch is not written and not counted.
///
/// # Arguments
///
/// * `state` - Crawl state to drain
/// * `sink` - Destination for the drained records
///
/// # Returns
///
/// The number of pages written
///
/// # Errors
///
/// The first write error. The batch is not counted as saved.
pub fn flush_batch(state: &CrawlState, sink: &dyn BatchSink) -> OutputResult<usize> {
    let batch = state.take_batch();
    if batch.is_empty() {
        return Ok(0);
    }
    let counts = (batch.pages.len(), batch.failed.len(), batch.external.len());

    let mut unwritten = Batch::default();
    let mut first_error = None;

    if let Err(e) = sink.write_failed(&batch.failed) {
        first_error.get_or_insert(e);
        unwritten.failed = batch.failed;
    }
    if let Err(e) = sink.write_external(&batch.external) {
        first_error.get_or_insert(e);
        unwritten.external = batch.external;
    }
    let written = match sink.write_pages(&batch.pages) {
        Ok(()) => batch.pages.len(),
        Err(e) => {
            first_error.get_or_insert(e);
            unwritten.pages = batch.pages;
            0
        }
    };

    match first_error {
        None => {
            state.complete_batch(written);
            tracing::info!(
                "Saved batch {} ({} pages, {} failed, {} external)",
                state.saved_batches(),
                counts.0,
                counts.1,
                counts.2
            );
            Ok(written)
        }
        Some(e) => {
            state.record_flushed_pages(written);
            state.restore_batch(unwritten);
            Err(e)
        }
    }
}
