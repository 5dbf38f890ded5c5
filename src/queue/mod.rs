//! The persisted playback queue.
//!
//! `QueueState` is the only persisted aggregate. It is replaced wholesale by
//! shuffle / fetch-all, has its cursor moved by next / random, and is reset
//! to [`QueueState::empty`] on clear or whenever an invalid state is seen.

pub mod store;

use std::fmt;

use serde::Serialize;
use url::Url;

use crate::link::LinkUrl;

pub use store::QueueStore;

/// Ordered links plus playback cursor.
///
/// `index == -1` exactly when `links` is empty; otherwise
/// `0 <= index < links.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    links: Vec<LinkUrl>,
    index: i64,
    created_at: i64,
    source_url: String,
}

impl QueueState {
    pub fn empty() -> Self {
        Self {
            links: Vec::new(),
            index: -1,
            created_at: 0,
            source_url: String::new(),
        }
    }

    /// Fresh queue positioned at its first link. Empty input yields the empty
    /// state.
    pub fn fresh(links: Vec<LinkUrl>, created_at: i64, source_url: impl Into<String>) -> Self {
        if links.is_empty() {
            return Self::empty();
        }
        Self {
            links,
            index: 0,
            created_at,
            source_url: source_url.into(),
        }
    }

    /// Build from already-validated parts, clamping the cursor into range.
    pub(crate) fn from_parts(
        links: Vec<LinkUrl>,
        index: Option<i64>,
        created_at: i64,
        source_url: String,
    ) -> Self {
        if links.is_empty() {
            return Self::empty();
        }
        let index = match index {
            Some(i) if i >= 0 && (i as usize) < links.len() => i,
            _ => 0,
        };
        Self {
            links,
            index,
            created_at,
            source_url,
        }
    }

    pub fn links(&self) -> &[LinkUrl] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn index(&self) -> i64 {
        self.index
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Link under the cursor.
    pub fn current(&self) -> Option<&LinkUrl> {
        usize::try_from(self.index)
            .ok()
            .and_then(|i| self.links.get(i))
    }

    /// Move the cursor one step, wrapping past the end. `None` when empty.
    pub fn advance(&mut self) -> Option<&LinkUrl> {
        if self.links.is_empty() {
            return None;
        }
        let next = (self.index + 1).rem_euclid(self.links.len() as i64);
        self.index = next;
        self.current()
    }

    /// Put the cursor on `index`. Out-of-range positions are refused.
    pub fn seek(&mut self, index: usize) -> Option<&LinkUrl> {
        if index >= self.links.len() {
            return None;
        }
        self.index = index as i64;
        self.current()
    }

    /// 1-based "current/total", `0/0` for the empty queue.
    pub fn position_text(&self) -> String {
        if self.links.is_empty() {
            return "0/0".to_string();
        }
        format!("{}/{}", (self.index + 1).max(1), self.links.len())
    }

    /// Path of the page the queue was built from, when it parses.
    pub fn source_path(&self) -> Option<String> {
        if self.source_url.is_empty() {
            return None;
        }
        Url::parse(&self.source_url)
            .ok()
            .map(|url| url.path().to_string())
    }
}

impl Default for QueueState {
    fn default() -> Self {
        Self::empty()
    }
}

/// What the control surface shows: queue position plus visible link count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub queue: QueueState,
    pub visible_count: usize,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Queue {} | Visible: {}",
            self.queue.position_text(),
            self.visible_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TARGET_ORIGIN;
    use crate::link::LinkNormalizer;

    fn links(n: usize) -> Vec<LinkUrl> {
        let normalizer = LinkNormalizer::new(TARGET_ORIGIN);
        (0..n)
            .map(|i| {
                normalizer
                    .validate(&format!("{}/reel/C{}/", TARGET_ORIGIN, i))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn empty_state_invariants() {
        let state = QueueState::empty();
        assert_eq!(state.index(), -1);
        assert_eq!(state.created_at(), 0);
        assert_eq!(state.source_url(), "");
        assert!(state.current().is_none());
        assert_eq!(state.position_text(), "0/0");
    }

    #[test]
    fn fresh_from_nothing_is_empty() {
        assert_eq!(QueueState::fresh(Vec::new(), 5, "x"), QueueState::empty());
    }

    #[test]
    fn advance_wraps() {
        let mut state = QueueState::fresh(links(3), 1, "");
        state.seek(2).unwrap();
        let current = state.advance().cloned();
        assert_eq!(state.index(), 0);
        assert_eq!(current.as_ref(), state.links().first());
    }

    #[test]
    fn advance_on_empty_is_refused() {
        let mut state = QueueState::empty();
        assert!(state.advance().is_none());
        assert_eq!(state.index(), -1);
    }

    #[test]
    fn seek_out_of_range_keeps_cursor() {
        let mut state = QueueState::fresh(links(2), 1, "");
        assert!(state.seek(2).is_none());
        assert_eq!(state.index(), 0);
    }

    #[test]
    fn from_parts_clamps_cursor() {
        let state = QueueState::from_parts(links(2), Some(99), 1, String::new());
        assert_eq!(state.index(), 0);
        let state = QueueState::from_parts(links(2), Some(1), 1, String::new());
        assert_eq!(state.index(), 1);
        let state = QueueState::from_parts(Vec::new(), Some(0), 7, "x".into());
        assert_eq!(state, QueueState::empty());
    }

    #[test]
    fn status_line() {
        let mut queue = QueueState::fresh(links(5), 1, "https://www.instagram.com/bob/reels/");
        queue.seek(2);
        let report = StatusReport {
            queue,
            visible_count: 12,
        };
        assert_eq!(report.to_string(), "Queue 3/5 | Visible: 12");
        assert_eq!(report.queue.source_path().as_deref(), Some("/bob/reels/"));
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let state = QueueState::fresh(links(1), 42, "https://www.instagram.com/");
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "links": ["https://www.instagram.com/reel/C0/"],
                "index": 0,
                "createdAt": 42,
                "sourceUrl": "https://www.instagram.com/",
            })
        );
    }
}
