use super::{lock, Frontier};
use crate::link::{Link, LinkType, QueuedLink, UrlKey, WebPage};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Insertion-ordered collection holding at most one record per URL
#[derive(Debug, Clone)]
pub struct KeyedSet<T> {
    items: Vec<T>,
    keys: HashSet<String>,
}

impl<T> Default for KeyedSet<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            keys: HashSet::new(),
        }
    }
}

impl<T: UrlKey> KeyedSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record; the first record stored for a URL wins
    pub fn insert(&mut self, item: T) -> bool {
        if !self.keys.insert(item.url_key().to_string()) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.keys.contains(url)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Empties the set, returning its records in insertion order
    pub fn take(&mut self) -> Vec<T> {
        self.keys.clear();
        std::mem::take(&mut self.items)
    }

    /// Puts previously taken records back in front of anything added since
    pub fn restore(&mut self, items: Vec<T>) {
        let newer = self.take();
        for item in items.into_iter().chain(newer) {
            self.insert(item);
        }
    }
}

impl<T: UrlKey + Clone> KeyedSet<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.clone()
    }
}

/// Records drained from the Pages, Failed and External stores for one flush
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub pages: Vec<WebPage>,
    pub failed: Vec<QueuedLink>,
    pub external: Vec<Link>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty() && self.failed.is_empty() && self.external.is_empty()
    }
}

/// Shared crawl state mutated concurrently by the workers
///
/// Visited only grows. Pages, Failed and External are drained together at
/// each batch flush; Visited and the frontier survive flushes so
/// deduplication spans the whole crawl.
#[derive(Debug, Default)]
pub struct CrawlState {
    frontier: Mutex<Frontier>,
    visited: Mutex<HashSet<String>>,
    external: Mutex<KeyedSet<Link>>,
    pages: Mutex<KeyedSet<WebPage>>,
    failed: Mutex<KeyedSet<QueuedLink>>,
    in_progress: AtomicUsize,
    current_depth: AtomicU32,
    saved_batches: AtomicU64,
    pages_flushed: AtomicU64,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Frontier =====

    /// Queues the root link, bypassing the capacity and Visited checks
    pub fn seed(&self, root: QueuedLink) -> bool {
        lock(&self.frontier).push(root)
    }

    pub fn dequeue(&self) -> Option<QueuedLink> {
        lock(&self.frontier).pop()
    }

    /// Queues links discovered on a page
    ///
    /// A link is dropped for good when it is deeper than `max_depth`, when
    /// the frontier already holds `max_in_queue` links, when its URL is in
    /// Visited, or when it is already waiting in the frontier.
    ///
    /// # Arguments
    ///
    /// * `links` - Children of the page, already typed and at their depth
    /// * `max_in_queue` - Frontier capacity
    /// * `max_depth` - Deepest link the crawl may fetch
    ///
    /// # Returns
    ///
    /// The links actually accepted, in discovery order
    pub fn enqueue_discovered(
        &self,
        links: Vec<QueuedLink>,
        max_in_queue: usize,
        max_depth: u32,
    ) -> Vec<QueuedLink> {
        let mut frontier = lock(&self.frontier);
        let visited = lock(&self.visited);

        let mut accepted = Vec::new();
        for link in links {
            if link.depth > max_depth
                || frontier.len() >= max_in_queue
                || visited.contains(&link.url)
            {
                continue;
            }
            if frontier.push(link.clone()) {
                accepted.push(link);
            }
        }
        accepted
    }

    pub fn frontier_len(&self) -> usize {
        lock(&self.frontier).len()
    }

    pub fn frontier_snapshot(&self) -> Vec<QueuedLink> {
        lock(&self.frontier).snapshot()
    }

    pub fn frontier_count_type(&self, link_type: LinkType) -> usize {
        lock(&self.frontier).count_type(link_type)
    }

    // ===== Visited =====

    pub fn mark_visited(&self, url: &str) {
        lock(&self.visited).insert(url.to_string());
    }

    pub fn is_visited(&self, url: &str) -> bool {
        lock(&self.visited).contains(url)
    }

    pub fn visited_len(&self) -> usize {
        lock(&self.visited).len()
    }

    // ===== Result stores =====

    /// Records a non-onion link; External is not checked against Visited
    pub fn record_external(&self, link: Link) -> bool {
        lock(&self.external).insert(link)
    }

    pub fn insert_page(&self, page: WebPage) -> bool {
        lock(&self.pages).insert(page)
    }

    pub fn insert_failed(&self, link: QueuedLink) -> bool {
        lock(&self.failed).insert(link)
    }

    pub fn pages_len(&self) -> usize {
        lock(&self.pages).len()
    }

    pub fn failed_len(&self) -> usize {
        lock(&self.failed).len()
    }

    pub fn external_len(&self) -> usize {
        lock(&self.external).len()
    }

    pub fn pages_snapshot(&self) -> Vec<WebPage> {
        lock(&self.pages).to_vec()
    }

    pub fn failed_snapshot(&self) -> Vec<QueuedLink> {
        lock(&self.failed).to_vec()
    }

    pub fn external_snapshot(&self) -> Vec<Link> {
        lock(&self.external).to_vec()
    }

    /// Pages fetched so far in this crawl, including flushed batches
    pub fn total_pages(&self) -> u64 {
        self.pages_len() as u64 + self.pages_flushed.load(Ordering::SeqCst)
    }

    // ===== Batches =====

    /// Drains Pages, Failed and External for a flush
    ///
    /// Each store is drained under its own lock; records added by workers
    /// while the batch is being written belong to the next batch.
    ///
    /// # Returns
    ///
    /// Everything the three stores held, in insertion order
    pub fn take_batch(&self) -> Batch {
        let external = lock(&self.external).take();
        let pages = lock(&self.pages).take();
        let failed = lock(&self.failed).take();
        Batch {
            pages,
            failed,
            external,
        }
    }

    /// Returns records whose write failed to the stores
    ///
    /// # Arguments
    ///
    /// * `batch` - Unwritten records; parts that did get written must be
    ///   left empty so they are not written twice
    ///
    /// Restored records keep their place ahead of anything inserted while
    /// the batch was out.
    pub fn restore_batch(&self, batch: Batch) {
        lock(&self.external).restore(batch.external);
        lock(&self.pages).restore(batch.pages);
        lock(&self.failed).restore(batch.failed);
    }

    /// Counts pages that reached the sink towards the crawl total
    pub fn record_flushed_pages(&self, pages_written: usize) {
        self.pages_flushed
            .fetch_add(pages_written as u64, Ordering::SeqCst);
    }

    /// Records a batch whose every part was written
    pub fn complete_batch(&self, pages_written: usize) {
        self.record_flushed_pages(pages_written);
        self.saved_batches.fetch_add(1, Ordering::SeqCst);
    }

    pub fn saved_batches(&self) -> u64 {
        self.saved_batches.load(Ordering::SeqCst)
    }

    pub fn pages_flushed(&self) -> u64 {
        self.pages_flushed.load(Ordering::SeqCst)
    }

    // ===== Progress =====

    pub fn begin_processing(&self) {
        self.in_progress.fetch_add(1, Ordering::SeqCst);
    }

    pub fn finish_processing(&self) {
        let _ = self
            .in_progress
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn in_progress(&self) -> usize {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Depth of the link most recently finished by any worker
    pub fn current_depth(&self) -> u32 {
        self.current_depth.load(Ordering::SeqCst)
    }

    pub fn set_current_depth(&self, depth: u32) {
        self.current_depth.store(depth, Ordering::SeqCst);
    }
}
