use std::cell::{Cell, RefCell};

use async_trait::async_trait;
use url::Url;

use super::{PageHost, ScrollTarget};
use crate::link::LinkUrl;

/// A saved page snapshot standing in for a live tab.
///
/// Scrolling does not load anything new; navigation is recorded instead of
/// performed so the caller can report or open it.
#[derive(Debug)]
pub struct StaticPage {
    url: Url,
    html: String,
    scroll: Cell<ScrollTarget>,
    navigated: RefCell<Option<LinkUrl>>,
}

impl StaticPage {
    pub fn new(url: Url, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
            scroll: Cell::new(ScrollTarget::Top),
            navigated: RefCell::new(None),
        }
    }

    pub fn scroll_position(&self) -> ScrollTarget {
        self.scroll.get()
    }

    /// Target of the last navigation, if any.
    pub fn navigated_to(&self) -> Option<LinkUrl> {
        self.navigated.borrow().clone()
    }
}

#[async_trait(?Send)]
impl PageHost for StaticPage {
    fn url(&self) -> Url {
        self.url.clone()
    }

    fn document_html(&self) -> String {
        self.html.clone()
    }

    async fn scroll_to(&self, target: ScrollTarget) {
        self.scroll.set(target);
    }

    fn navigate(&self, target: &LinkUrl) {
        log::debug!("Recorded navigation to {}", target);
        *self.navigated.borrow_mut() = Some(target.clone());
    }
}
