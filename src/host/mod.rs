//! Seams to the hosting browser: the page, persisted storage, and the
//! toast surface.
//!
//! Everything here is single-threaded and cooperative, so the async traits
//! are `?Send`. Native implementations live in the sibling modules:
//!
//! - `store`  — in-memory and JSON-file key-value stores
//! - `page`   — a static HTML snapshot standing in for a live tab
//! - `notice` — user-visible notices and a `log`-backed notifier

pub mod notice;
pub mod page;
pub mod store;

use std::rc::Rc;

use async_trait::async_trait;
use url::Url;

use crate::link::LinkUrl;

pub use notice::{LogNotifier, Notice};
pub use page::StaticPage;
pub use store::{JsonFileStore, MemoryStore, StoreError};

/// Scroll destinations the collector needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollTarget {
    Top,
    /// Maximum scroll extent of the document.
    Bottom,
}

/// The page instance the engine is attached to.
#[async_trait(?Send)]
pub trait PageHost {
    /// Current location of the page.
    fn url(&self) -> Url;

    /// Markup of the currently rendered document.
    fn document_html(&self) -> String;

    async fn scroll_to(&self, target: ScrollTarget);

    /// Same-tab replacing navigation. Script execution in the current page
    /// context is abandoned once this is called.
    fn navigate(&self, target: &LinkUrl);
}

/// Persisted key-value storage (one JSON value per key).
#[async_trait(?Send)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;
}

/// Toast surface of the page.
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

#[async_trait(?Send)]
impl<T: PageHost + ?Sized> PageHost for Rc<T> {
    fn url(&self) -> Url {
        (**self).url()
    }

    fn document_html(&self) -> String {
        (**self).document_html()
    }

    async fn scroll_to(&self, target: ScrollTarget) {
        (**self).scroll_to(target).await
    }

    fn navigate(&self, target: &LinkUrl) {
        (**self).navigate(target)
    }
}

#[async_trait(?Send)]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Rc<T> {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }
}

impl<T: Notifier + ?Sized> Notifier for Rc<T> {
    fn notify(&self, notice: Notice) {
        (**self).notify(notice)
    }
}
