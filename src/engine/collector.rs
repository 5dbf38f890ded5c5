//! Incremental collection: scroll, wait for lazy tiles, rescan, repeat.
//!
//! The run ends when the accumulator stops growing for `stale_round_limit`
//! consecutive rounds, when it reaches the cap, or when the run's
//! cancellation token fires. Cap and stale rounds are independent stop
//! conditions evaluated after every merge.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::host::{PageHost, ScrollTarget};
use crate::link::LinkUrl;
use crate::page::{LinkSet, PageScanner};

/// Whether a fetch-all run is in progress. Owned by the page engine.
///
/// Cancelling moves straight back to `Idle`; the cancelled run winds down
/// on its own and only resets the state if it is still the current run.
#[derive(Debug, Clone, Default)]
pub enum CollectorState {
    #[default]
    Idle,
    Collecting {
        run: u64,
        /// Cancels this run.
        token: CancellationToken,
    },
}

impl CollectorState {
    pub fn is_collecting(&self) -> bool {
        matches!(self, CollectorState::Collecting { .. })
    }

    /// Whether `run` is the collection currently in progress.
    pub fn is_run(&self, run: u64) -> bool {
        matches!(self, CollectorState::Collecting { run: current, .. } if *current == run)
    }
}

/// Why a run finished on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No growth for the configured number of rounds.
    Stale,
    CapReached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    Finished {
        links: Vec<LinkUrl>,
        rounds: u32,
        reason: StopReason,
    },
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct CollectSettings {
    pub delay: Duration,
    pub stale_round_limit: u32,
    pub max_links: usize,
}

/// Run one collection. Cancellation is observed after the scroll, during and
/// after the delay, and after each merge; a cancelled run yields nothing.
pub async fn collect<P: PageHost + ?Sized>(
    page: &P,
    scanner: &PageScanner,
    settings: CollectSettings,
    token: &CancellationToken,
) -> CollectOutcome {
    let mut acc = LinkSet::with_cap(settings.max_links);
    let mut stale_rounds = 0u32;
    let mut rounds = 0u32;

    loop {
        page.scroll_to(ScrollTarget::Bottom).await;
        if token.is_cancelled() {
            return CollectOutcome::Cancelled;
        }

        tokio::select! {
            _ = token.cancelled() => return CollectOutcome::Cancelled,
            _ = tokio::time::sleep(settings.delay) => {}
        }

        let added = acc.extend(scanner.scan_page(page));
        rounds += 1;
        if token.is_cancelled() {
            return CollectOutcome::Cancelled;
        }

        if added == 0 {
            stale_rounds += 1;
        } else {
            stale_rounds = 0;
        }
        log::debug!(
            "Collect round {}: +{} ({} total, {} stale)",
            rounds,
            added,
            acc.len(),
            stale_rounds
        );

        let reason = if acc.is_full() {
            Some(StopReason::CapReached)
        } else if stale_rounds >= settings.stale_round_limit {
            Some(StopReason::Stale)
        } else {
            None
        };
        if let Some(reason) = reason {
            log::info!(
                "Collection finished after {} rounds ({:?}): {} links",
                rounds,
                reason,
                acc.len()
            );
            return CollectOutcome::Finished {
                links: acc.into_vec(),
                rounds,
                reason,
            };
        }
    }
}
