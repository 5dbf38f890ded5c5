use serde_json::Value;

use super::QueueState;
use crate::host::{KeyValueStore, StoreError};
use crate::link::LinkNormalizer;
use crate::page::LinkSet;

/// Loads and saves the single persisted [`QueueState`] record.
///
/// Stored data is untrusted: `load` re-validates every link and never fails.
pub struct QueueStore<S> {
    store: S,
    key: String,
    normalizer: LinkNormalizer,
    max_links: usize,
}

impl<S: KeyValueStore> QueueStore<S> {
    pub fn new(store: S, key: impl Into<String>, normalizer: LinkNormalizer, max_links: usize) -> Self {
        Self {
            store,
            key: key.into(),
            normalizer,
            max_links,
        }
    }

    pub fn backend(&self) -> &S {
        &self.store
    }

    pub fn normalizer(&self) -> &LinkNormalizer {
        &self.normalizer
    }

    pub fn max_links(&self) -> usize {
        self.max_links
    }

    /// Current persisted state. Absent, unreadable or malformed records all
    /// read as the empty queue.
    pub async fn load(&self) -> QueueState {
        match self.store.get(&self.key).await {
            Ok(Some(raw)) => decode_state(&raw, &self.normalizer, self.max_links),
            Ok(None) => QueueState::empty(),
            Err(e) => {
                log::warn!("Queue state unreadable, treating as empty: {}", e);
                QueueState::empty()
            }
        }
    }

    /// Persist `state` as-is. Last writer wins.
    pub async fn save(&self, state: &QueueState) -> Result<(), StoreError> {
        let value = serde_json::to_value(state)
            .map_err(|e| StoreError::Unavailable(format!("cannot encode queue state: {}", e)))?;
        self.store.set(&self.key, value).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        self.save(&QueueState::empty()).await
    }
}

/// Rebuild a [`QueueState`] from an untrusted record.
///
/// Non-conforming links are dropped, survivors are canonicalized,
/// deduplicated and capped, and the cursor is clamped back into range.
pub fn decode_state(raw: &Value, normalizer: &LinkNormalizer, max_links: usize) -> QueueState {
    let Some(record) = raw.as_object() else {
        log::warn!("Queue state is not a record, resetting");
        return QueueState::empty();
    };
    let Some(raw_links) = record.get("links").and_then(Value::as_array) else {
        log::warn!("Queue state has no link list, resetting");
        return QueueState::empty();
    };

    let mut links = LinkSet::with_cap(max_links);
    let mut dropped = 0usize;
    for entry in raw_links {
        match entry.as_str().and_then(|s| normalizer.validate(s)) {
            Some(link) => {
                links.insert(link);
            }
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        log::warn!("Dropped {} invalid stored links", dropped);
    }

    QueueState::from_parts(
        links.into_vec(),
        record.get("index").and_then(Value::as_i64),
        record.get("createdAt").and_then(Value::as_i64).unwrap_or(0),
        record
            .get("sourceUrl")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    )
}
