//! Page scanning: which queue targets are reachable from the current page.

pub mod indicator;
pub mod scanner;

use std::collections::HashSet;

use crate::link::LinkUrl;

pub use indicator::looks_like_video_tile;
pub use scanner::{PageMode, PageScanner};

/// Insertion-ordered, deduplicated, size-capped set of links.
///
/// Shared by single scans and by the incremental collector so both apply
/// the same first-seen-wins and cap semantics.
#[derive(Debug, Clone)]
pub struct LinkSet {
    order: Vec<LinkUrl>,
    seen: HashSet<LinkUrl>,
    cap: usize,
}

impl LinkSet {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            order: Vec::new(),
            seen: HashSet::new(),
            cap,
        }
    }

    /// Insert a link. Returns `true` if it was new and fit under the cap.
    pub fn insert(&mut self, link: LinkUrl) -> bool {
        if self.is_full() || self.seen.contains(&link) {
            return false;
        }
        self.seen.insert(link.clone());
        self.order.push(link);
        true
    }

    /// Merge links in order; returns how many were added.
    pub fn extend<I: IntoIterator<Item = LinkUrl>>(&mut self, links: I) -> usize {
        let mut added = 0;
        for link in links {
            if self.is_full() {
                break;
            }
            if self.insert(link) {
                added += 1;
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.order.len() >= self.cap
    }

    pub fn as_slice(&self) -> &[LinkUrl] {
        &self.order
    }

    pub fn into_vec(self) -> Vec<LinkUrl> {
        self.order
    }
}
