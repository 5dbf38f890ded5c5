//! `PageEngine`: the page-resident queue engine.
//!
//! One engine is attached to one page instance. It owns the collector state
//! and is the only writer of the persisted queue; the popup reaches it
//! through [`Dispatch`]. Methods are split across sibling modules:
//!
//! - `collector` — fetch-all scroll/scan loop
//! - `guard`     — validation before every navigation
//!
//! Every handler that mutates the queue persists before returning, and
//! handlers that navigate persist strictly before navigating: the page
//! context is gone once navigation starts.

pub mod collector;
pub mod guard;

use std::cell::{Cell, RefCell};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::channel::{Dispatch, Envelope, Request, StatusReply};
use crate::config::EngineConfig;
use crate::host::{KeyValueStore, Notice, Notifier, PageHost, ScrollTarget};
use crate::link::{LinkNormalizer, LinkUrl};
use crate::page::PageScanner;
use crate::queue::{QueueState, QueueStore, StatusReport};
use crate::shuffle::shuffle;

use collector::{collect, CollectOutcome, CollectSettings, CollectorState};
use guard::{navigate_guarded, GuardVerdict};

/// What a handler ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Navigated(LinkUrl),
    /// Navigation refused by the guard; the queue was reset.
    Rejected,
    /// Nothing changed; the user was told why.
    Noop(Notice),
    Cleared,
    /// A running fetch-all was asked to stop.
    CancelRequested,
    /// This fetch-all run was cancelled before it finished.
    Cancelled,
}

pub struct PageEngine<P, S, N> {
    config: EngineConfig,
    page: P,
    queue: QueueStore<S>,
    notifier: N,
    scanner: PageScanner,
    collector: RefCell<CollectorState>,
    runs: Cell<u64>,
    rng: RefCell<StdRng>,
}

impl<P, S, N> PageEngine<P, S, N>
where
    P: PageHost,
    S: KeyValueStore,
    N: Notifier,
{
    pub fn new(config: EngineConfig, page: P, store: S, notifier: N) -> Self {
        let normalizer = LinkNormalizer::new(&config.target_origin);
        let queue = QueueStore::new(
            store,
            config.storage_key.clone(),
            normalizer.clone(),
            config.max_queue_size,
        );
        let scanner = PageScanner::new(normalizer, config.max_queue_size);
        Self {
            config,
            page,
            queue,
            notifier,
            scanner,
            collector: RefCell::new(CollectorState::Idle),
            runs: Cell::new(0),
            rng: RefCell::new(StdRng::from_entropy()),
        }
    }

    /// Replace the random source (deterministic tests).
    pub fn with_rng(self, rng: StdRng) -> Self {
        *self.rng.borrow_mut() = rng;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn queue(&self) -> &QueueStore<S> {
        &self.queue
    }

    pub fn is_collecting(&self) -> bool {
        self.collector.borrow().is_collecting()
    }

    /// Persisted queue plus a fresh count of visible targets. Read-only.
    pub async fn status(&self) -> StatusReport {
        let queue = self.queue.load().await;
        let visible_count = self.scanner.scan_page(&self.page).len();
        StatusReport {
            queue,
            visible_count,
        }
    }

    /// Shuffle what is visible right now into a new queue and open its head.
    pub async fn shuffle_visible(&self) -> Outcome {
        let visible = self.scanner.scan_page(&self.page);
        if visible.is_empty() {
            self.notifier.notify(Notice::NothingFound);
            return Outcome::Noop(Notice::NothingFound);
        }
        let count = visible.len();
        match self.replace_queue(visible).await {
            Ok(state) => {
                self.notifier.notify(Notice::Shuffled(count));
                self.open_current(&state).await
            }
            Err(outcome) => outcome,
        }
    }

    /// Start a fetch-all run, or cancel the one in progress.
    ///
    /// A cancel returns the collector to idle at once, so the next trigger
    /// starts a new run even before the cancelled one has wound down.
    pub async fn toggle_fetch_all(&self) -> Outcome {
        let (run, token) = {
            let mut state = self.collector.borrow_mut();
            if let CollectorState::Collecting { run, token } = &*state {
                log::info!("Fetch-all run {} cancellation requested", run);
                token.cancel();
                *state = CollectorState::Idle;
                return Outcome::CancelRequested;
            }
            let run = self.runs.get() + 1;
            self.runs.set(run);
            let token = CancellationToken::new();
            *state = CollectorState::Collecting {
                run,
                token: token.clone(),
            };
            (run, token)
        };

        self.notifier.notify(Notice::FetchStarted);
        let settings = CollectSettings {
            delay: self.config.scroll_delay,
            stale_round_limit: self.config.stale_round_limit,
            max_links: self.config.max_queue_size,
        };
        let outcome = collect(&self.page, &self.scanner, settings, &token).await;
        {
            let mut state = self.collector.borrow_mut();
            if state.is_run(run) {
                *state = CollectorState::Idle;
            }
        }

        match outcome {
            CollectOutcome::Cancelled => {
                self.notifier.notify(Notice::FetchCancelled);
                Outcome::Cancelled
            }
            CollectOutcome::Finished { links, .. } => {
                self.page.scroll_to(ScrollTarget::Top).await;
                if links.is_empty() {
                    self.notifier.notify(Notice::NothingFound);
                    return Outcome::Noop(Notice::NothingFound);
                }
                let count = links.len();
                match self.replace_queue(links).await {
                    Ok(state) => {
                        self.notifier.notify(Notice::Collected(count));
                        self.open_current(&state).await
                    }
                    Err(outcome) => outcome,
                }
            }
        }
    }

    /// Advance the cursor, wrapping to the start, and open that link.
    pub async fn next(&self) -> Outcome {
        let mut state = self.queue.load().await;
        if state.advance().is_none() {
            self.notifier.notify(Notice::QueueEmpty);
            return Outcome::Noop(Notice::QueueEmpty);
        }
        self.persist_and_open(&state).await
    }

    /// Jump to a uniformly random position and open that link.
    pub async fn random(&self) -> Outcome {
        let mut state = self.queue.load().await;
        if state.is_empty() {
            self.notifier.notify(Notice::QueueEmpty);
            return Outcome::Noop(Notice::QueueEmpty);
        }
        let index = self.rng.borrow_mut().gen_range(0..state.len());
        state.seek(index);
        self.persist_and_open(&state).await
    }

    pub async fn clear(&self) -> Outcome {
        if let Err(e) = self.queue.clear().await {
            log::warn!("Failed to clear queue: {}", e);
            self.notifier.notify(Notice::SaveFailed);
            return Outcome::Noop(Notice::SaveFailed);
        }
        log::info!("Queue cleared");
        self.notifier.notify(Notice::Cleared);
        Outcome::Cleared
    }

    /// Run one request to completion. `Some` only for `STATUS`.
    pub async fn handle(&self, request: Request) -> (Option<Value>, Option<Outcome>) {
        match request {
            Request::Status => {
                let report = self.status().await;
                let reply = StatusReply {
                    queue: &report.queue,
                    visible_count: report.visible_count,
                }
                .to_value();
                (Some(reply), None)
            }
            Request::Shuffle => (None, Some(self.shuffle_visible().await)),
            Request::FetchAll => (None, Some(self.toggle_fetch_all().await)),
            Request::Next => (None, Some(self.next().await)),
            Request::Random => (None, Some(self.random().await)),
            Request::Clear => (None, Some(self.clear().await)),
        }
    }

    /// Shuffle `links` into a fresh queue and persist it.
    async fn replace_queue(&self, links: Vec<LinkUrl>) -> Result<QueueState, Outcome> {
        let shuffled = {
            let mut rng = self.rng.borrow_mut();
            shuffle(&links, &mut *rng)
        };
        let state = QueueState::fresh(shuffled, now_millis(), self.page.url().to_string());
        self.save(&state).await?;
        log::info!("New queue of {} links from {}", state.len(), state.source_url());
        Ok(state)
    }

    async fn persist_and_open(&self, state: &QueueState) -> Outcome {
        if let Err(outcome) = self.save(state).await {
            return outcome;
        }
        self.open_current(state).await
    }

    async fn save(&self, state: &QueueState) -> Result<(), Outcome> {
        self.queue.save(state).await.map_err(|e| {
            log::warn!("Failed to persist queue, not navigating: {}", e);
            self.notifier.notify(Notice::SaveFailed);
            Outcome::Noop(Notice::SaveFailed)
        })
    }

    async fn open_current(&self, state: &QueueState) -> Outcome {
        let Some(target) = state.current() else {
            return Outcome::Noop(Notice::QueueEmpty);
        };
        let verdict = navigate_guarded(
            target.as_str(),
            self.queue.normalizer(),
            &self.page,
            &self.queue,
            &self.notifier,
        )
        .await;
        match verdict {
            GuardVerdict::Navigated(link) => Outcome::Navigated(link),
            GuardVerdict::Rejected => Outcome::Rejected,
        }
    }
}

#[async_trait(?Send)]
impl<P, S, N> Dispatch for PageEngine<P, S, N>
where
    P: PageHost,
    S: KeyValueStore,
    N: Notifier,
{
    async fn dispatch(&self, envelope: Envelope) -> Option<Value> {
        if envelope.sender != self.config.extension_id {
            log::warn!("Ignoring message from foreign sender {:?}", envelope.sender);
            return None;
        }
        let request = Request::from_value(&envelope.message)?;
        log::debug!("Handling {:?}", request);
        let (reply, outcome) = self.handle(request).await;
        if let Some(outcome) = outcome {
            log::debug!("{:?} -> {:?}", request, outcome);
        }
        reply
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryStore, StaticPage, StoreError};
    use pretty_assertions::assert_eq;
    use std::rc::Rc;
    use std::time::Duration;
    use url::Url;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Notice>>);

    impl Notifier for Recorder {
        fn notify(&self, notice: Notice) {
            self.0.borrow_mut().push(notice);
        }
    }

    /// Store whose writes always fail.
    struct ReadOnlyStore(MemoryStore);

    #[async_trait(?Send)]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
            self.0.get(key).await
        }

        async fn set(&self, _key: &str, _value: Value) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("read-only".into()))
        }
    }

    const REELS_HTML: &str = r#"
        <a href="/reel/A/">a</a><a href="/reel/B/">b</a><a href="/reel/C/">c</a>
    "#;

    type TestEngine = PageEngine<Rc<StaticPage>, Rc<MemoryStore>, Rc<Recorder>>;

    fn engine(html: &str) -> (TestEngine, Rc<StaticPage>, Rc<MemoryStore>, Rc<Recorder>) {
        let page = Rc::new(StaticPage::new(
            Url::parse("https://www.instagram.com/bob/reels/").unwrap(),
            html,
        ));
        let store = Rc::new(MemoryStore::new());
        let notices = Rc::new(Recorder::default());
        let engine = PageEngine::new(
            EngineConfig::default(),
            Rc::clone(&page),
            Rc::clone(&store),
            Rc::clone(&notices),
        )
        .with_rng(StdRng::seed_from_u64(5));
        (engine, page, store, notices)
    }

    #[tokio::test]
    async fn shuffle_persists_then_navigates_to_head() {
        let (engine, page, _store, notices) = engine(REELS_HTML);
        let outcome = engine.shuffle_visible().await;

        let state = engine.queue().load().await;
        assert_eq!(state.len(), 3);
        assert_eq!(state.index(), 0);
        assert_eq!(state.source_url(), "https://www.instagram.com/bob/reels/");
        assert!(state.created_at() > 0);
        assert_eq!(outcome, Outcome::Navigated(state.links()[0].clone()));
        assert_eq!(page.navigated_to().as_ref(), state.current());
        assert_eq!(*notices.0.borrow(), vec![Notice::Shuffled(3)]);
    }

    #[tokio::test]
    async fn shuffle_with_nothing_visible() {
        let (engine, page, store, _) = engine("<p>nothing</p>");
        assert_eq!(
            engine.shuffle_visible().await,
            Outcome::Noop(Notice::NothingFound)
        );
        assert!(page.navigated_to().is_none());
        assert!(store.raw(crate::config::STORAGE_KEY).is_none());
    }

    #[tokio::test]
    async fn next_wraps_around() {
        let (engine, page, _, _) = engine(REELS_HTML);
        engine.shuffle_visible().await;
        let mut state = engine.queue().load().await;
        state.seek(2);
        engine.queue().save(&state).await.unwrap();

        let outcome = engine.next().await;
        let after = engine.queue().load().await;
        assert_eq!(after.index(), 0);
        assert_eq!(outcome, Outcome::Navigated(after.links()[0].clone()));
        assert_eq!(page.navigated_to().as_ref(), after.current());
    }

    #[tokio::test]
    async fn next_and_random_on_empty_queue() {
        let (engine, page, _, notices) = engine(REELS_HTML);
        assert_eq!(engine.next().await, Outcome::Noop(Notice::QueueEmpty));
        assert_eq!(engine.random().await, Outcome::Noop(Notice::QueueEmpty));
        assert!(page.navigated_to().is_none());
        assert_eq!(engine.queue().load().await, QueueState::empty());
        assert_eq!(
            *notices.0.borrow(),
            vec![Notice::QueueEmpty, Notice::QueueEmpty]
        );
    }

    #[tokio::test]
    async fn random_stays_in_range() {
        let (engine, _, _, _) = engine(REELS_HTML);
        engine.shuffle_visible().await;
        for _ in 0..50 {
            engine.random().await;
            let state = engine.queue().load().await;
            assert!(state.index() >= 0 && (state.index() as usize) < state.len());
        }
    }

    #[tokio::test]
    async fn clear_then_status() {
        let (engine, _, _, notices) = engine(REELS_HTML);
        engine.shuffle_visible().await;
        assert_eq!(engine.clear().await, Outcome::Cleared);
        let report = engine.status().await;
        assert_eq!(report.queue.len(), 0);
        assert_eq!(report.queue.index(), -1);
        assert_eq!(report.visible_count, 3);
        assert_eq!(notices.0.borrow().last(), Some(&Notice::Cleared));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_all_with_nothing_to_collect() {
        let (engine, page, store, notices) = engine("<p>nothing</p>");
        assert_eq!(
            engine.toggle_fetch_all().await,
            Outcome::Noop(Notice::NothingFound)
        );
        assert!(store.raw(crate::config::STORAGE_KEY).is_none());
        assert_eq!(page.scroll_position(), ScrollTarget::Top);
        assert!(page.navigated_to().is_none());
        assert!(!engine.is_collecting());
        assert_eq!(
            *notices.0.borrow(),
            vec![Notice::FetchStarted, Notice::NothingFound]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_after_cancel_starts_a_new_run() {
        let (engine, page, _, notices) = engine(REELS_HTML);
        let (first, (cancel, second)) = tokio::join!(engine.toggle_fetch_all(), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let cancel = engine.toggle_fetch_all().await;
            assert!(!engine.is_collecting());
            (cancel, engine.toggle_fetch_all().await)
        });

        assert_eq!(first, Outcome::Cancelled);
        assert_eq!(cancel, Outcome::CancelRequested);
        let state = engine.queue().load().await;
        assert_eq!(state.len(), 3);
        assert_eq!(second, Outcome::Navigated(state.links()[0].clone()));
        assert_eq!(page.navigated_to().as_ref(), state.current());
        assert!(!engine.is_collecting());

        let notices = notices.0.borrow();
        assert_eq!(
            notices.iter().filter(|n| **n == Notice::FetchStarted).count(),
            2
        );
        assert!(notices.contains(&Notice::FetchCancelled));
        assert_eq!(notices.last(), Some(&Notice::Collected(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_run_leaves_newer_run_collecting() {
        let (engine, _, _, _) = engine(REELS_HTML);
        let (first, observed) = tokio::join!(engine.toggle_fetch_all(), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            engine.toggle_fetch_all().await;
            let newer = engine.toggle_fetch_all();
            let check = async {
                // let the cancelled run wind down first
                tokio::time::sleep(Duration::from_millis(10)).await;
                engine.is_collecting()
            };
            let (_, observed) = tokio::join!(newer, check);
            observed
        });
        assert_eq!(first, Outcome::Cancelled);
        assert!(observed);
    }

    #[tokio::test]
    async fn status_does_not_write() {
        let (engine, _, store, _) = engine(REELS_HTML);
        engine.status().await;
        assert!(store.raw(crate::config::STORAGE_KEY).is_none());
    }

    #[tokio::test]
    async fn failed_save_never_navigates() {
        let page = Rc::new(StaticPage::new(
            Url::parse("https://www.instagram.com/").unwrap(),
            REELS_HTML,
        ));
        let notices = Rc::new(Recorder::default());
        let engine = PageEngine::new(
            EngineConfig::default(),
            Rc::clone(&page),
            ReadOnlyStore(MemoryStore::new()),
            Rc::clone(&notices),
        );
        assert_eq!(
            engine.shuffle_visible().await,
            Outcome::Noop(Notice::SaveFailed)
        );
        assert!(page.navigated_to().is_none());
        assert_eq!(*notices.0.borrow(), vec![Notice::SaveFailed]);
    }

    #[tokio::test]
    async fn foreign_sender_is_ignored() {
        let (engine, _, store, _) = engine(REELS_HTML);
        let reply = engine
            .dispatch(Envelope::new("someone-else", Request::Shuffle))
            .await;
        assert!(reply.is_none());
        assert!(store.raw(crate::config::STORAGE_KEY).is_none());

        let reply = engine
            .dispatch(Envelope::new("someone-else", Request::Status))
            .await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn status_reply_shape() {
        let (engine, _, _, _) = engine(REELS_HTML);
        let reply = engine
            .dispatch(Envelope::new(
                crate::config::DEFAULT_EXTENSION_ID,
                Request::Status,
            ))
            .await
            .unwrap();
        assert_eq!(
            reply,
            serde_json::json!({
                "queue": {"links": [], "index": -1, "createdAt": 0, "sourceUrl": ""},
                "visibleCount": 3,
            })
        );
    }
}
