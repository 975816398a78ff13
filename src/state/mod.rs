//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `Frontier`: FIFO of links waiting to be fetched
//! - `KeyedSet`: insertion-ordered set deduplicated by URL
//! - `CrawlState`: the frontier, the Visited set, the Pages / Failed /
//!   External stores and the progress counters shared by all workers
//!
//! # Locking
//!
//! Each store sits behind its own mutex. No operation needs two stores to
//! change atomically; the only nested acquisition is frontier -> visited when
//! discovered links are enqueued. Locks that are taken one after the other
//! always follow the order frontier, visited, external, pages, failed.

mod frontier;
mod stores;

pub use frontier::Frontier;
pub use stores::{Batch, CrawlState, KeyedSet};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a store, recovering the data if a worker panicked while holding it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
