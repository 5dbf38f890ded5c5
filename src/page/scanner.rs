use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use super::indicator::looks_like_video_tile;
use super::LinkSet;
use crate::host::PageHost;
use crate::link::{grammar, LinkNormalizer, LinkUrl};

static REEL_ANCHORS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/reel/"]"#).expect("valid reel anchor selector"));

static POST_ANCHORS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="/p/"]"#).expect("valid post anchor selector"));

/// How post-form anchors are treated on the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// A reels tab: every post tile is a video.
    ReelsListing,
    /// Anything else: post tiles need a video indicator.
    Feed,
}

impl PageMode {
    pub fn detect(page_url: &Url) -> Self {
        if grammar::is_reels_listing(page_url.path()) {
            PageMode::ReelsListing
        } else {
            PageMode::Feed
        }
    }
}

/// Extracts queue targets from rendered page markup.
#[derive(Debug, Clone)]
pub struct PageScanner {
    normalizer: LinkNormalizer,
    max_links: usize,
}

impl PageScanner {
    pub fn new(normalizer: LinkNormalizer, max_links: usize) -> Self {
        Self {
            normalizer,
            max_links,
        }
    }

    pub fn normalizer(&self) -> &LinkNormalizer {
        &self.normalizer
    }

    /// Scan whatever the page currently renders.
    pub fn scan_page<P: PageHost + ?Sized>(&self, page: &P) -> Vec<LinkUrl> {
        self.scan(&page.document_html(), &page.url())
    }

    /// Deduplicated targets in encounter order, reel anchors first, capped.
    pub fn scan(&self, html: &str, page_url: &Url) -> Vec<LinkUrl> {
        let document = Html::parse_document(html);
        // hrefs resolve against the page origin, not its path.
        let base = page_url.join("/").unwrap_or_else(|_| page_url.clone());
        let mode = PageMode::detect(page_url);
        let mut links = LinkSet::with_cap(self.max_links);

        for anchor in document.select(&REEL_ANCHORS) {
            if links.is_full() {
                break;
            }
            if let Some(link) = anchor
                .value()
                .attr("href")
                .and_then(|href| self.normalizer.normalize_reel(href, &base))
            {
                links.insert(link);
            }
        }

        for anchor in document.select(&POST_ANCHORS) {
            if links.is_full() {
                break;
            }
            if mode == PageMode::Feed && !looks_like_video_tile(anchor) {
                continue;
            }
            if let Some(link) = anchor
                .value()
                .attr("href")
                .and_then(|href| self.normalizer.normalize_post(href, &base))
            {
                links.insert(link);
            }
        }

        log::debug!("Scanned {:?} page {}: {} links", mode, page_url, links.len());
        links.into_vec()
    }
}
