use crate::link::{LinkType, QueuedLink};
use std::collections::{HashSet, VecDeque};

/// Breadth-first queue of links waiting to be fetched
///
/// A URL is held at most once while it waits; once popped it may be pushed
/// again (the Visited set, not the frontier, prevents refetching).
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<QueuedLink>,
    pending: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a link, returning false if its URL is already waiting
    pub fn push(&mut self, link: QueuedLink) -> bool {
        if !self.pending.insert(link.url.clone()) {
            return false;
        }
        self.queue.push_back(link);
        true
    }

    /// Removes the oldest link
    pub fn pop(&mut self) -> Option<QueuedLink> {
        let link = self.queue.pop_front()?;
        self.pending.remove(&link.url);
        Some(link)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.pending.contains(url)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn count_type(&self, link_type: LinkType) -> usize {
        self.queue
            .iter()
            .filter(|l| l.link_type == link_type)
            .count()
    }

    pub fn snapshot(&self) -> Vec<QueuedLink> {
        self.queue.iter().cloned().collect()
    }
}
