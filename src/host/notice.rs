use std::fmt;

use super::Notifier;

/// User-visible notices raised by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    NothingFound,
    Shuffled(usize),
    FetchStarted,
    FetchCancelled,
    Collected(usize),
    QueueEmpty,
    InvalidTarget,
    Cleared,
    /// Persisting the queue failed; nothing was navigated.
    SaveFailed,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NothingFound => write!(f, "No reels found. Open a reels tab and scroll."),
            Notice::Shuffled(n) => write!(f, "Shuffled {} reels", n),
            Notice::FetchStarted => write!(f, "Fetching all reels… (trigger again to stop)"),
            Notice::FetchCancelled => write!(f, "Fetch cancelled"),
            Notice::Collected(n) => write!(f, "Collected {} reels", n),
            Notice::QueueEmpty => write!(f, "Queue empty — shuffle first."),
            Notice::InvalidTarget => write!(f, "Invalid URL — clearing queue."),
            Notice::Cleared => write!(f, "Queue cleared"),
            Notice::SaveFailed => write!(f, "Could not save queue."),
        }
    }
}

/// Notifier that writes notices to the log instead of a toast.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::InvalidTarget | Notice::SaveFailed => log::warn!("{}", notice),
            _ => log::info!("{}", notice),
        }
    }
}
