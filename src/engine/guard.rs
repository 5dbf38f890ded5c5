//! Last check before a page transition.

use crate::host::{KeyValueStore, Notice, Notifier, PageHost};
use crate::link::{LinkNormalizer, LinkUrl};
use crate::queue::QueueStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    Navigated(LinkUrl),
    /// Target failed validation; the queue was reset and nothing navigated.
    Rejected,
}

/// Re-validate `candidate` and navigate to it.
///
/// A target that no longer matches the grammar means the persisted queue is
/// corrupt: warn, reset the queue, and stay on the page.
pub async fn navigate_guarded<P, S, N>(
    candidate: &str,
    normalizer: &LinkNormalizer,
    page: &P,
    queue: &QueueStore<S>,
    notifier: &N,
) -> GuardVerdict
where
    P: PageHost + ?Sized,
    S: KeyValueStore,
    N: Notifier + ?Sized,
{
    match normalizer.validate(candidate) {
        Some(target) => {
            log::info!("Navigating to {}", target);
            page.navigate(&target);
            GuardVerdict::Navigated(target)
        }
        None => {
            log::warn!("Refusing navigation to {:?}, clearing queue", candidate);
            notifier.notify(Notice::InvalidTarget);
            if let Err(e) = queue.clear().await {
                log::warn!("Failed to reset queue after invalid target: {}", e);
            }
            GuardVerdict::Rejected
        }
    }
}
