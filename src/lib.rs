pub mod config;
pub mod link;
pub mod page;
pub mod queue;
pub mod shuffle;

// Page-instance engine and its control surface
pub mod engine;
pub mod channel;

// Browser seams (page, storage, toasts)
pub mod host;

pub use config::EngineConfig;
pub use engine::{Outcome, PageEngine};
pub use link::{LinkNormalizer, LinkUrl};
pub use queue::{QueueState, QueueStore, StatusReport};
