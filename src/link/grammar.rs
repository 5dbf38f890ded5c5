//! Path grammars for queue targets and page-mode detection.

use once_cell::sync::Lazy;
use regex::Regex;

/// `/reel/{code}/` with an optional `/{user}` prefix. Shortcode is capture 2.
pub static REEL_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(/[^/?#]+)?/reel/([^/?#]+)/?$").expect("valid reel path regex")
});

/// `/p/{code}/`. Shortcode is capture 1.
pub static POST_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/p/([^/?#]+)/?$").expect("valid post path regex"));

/// A profile or explore "reels" tab, where every post tile is a video.
pub static REELS_PAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/reels/?$").expect("valid reels page regex"));

/// Shortcode of a reel-form path.
pub fn reel_shortcode(path: &str) -> Option<&str> {
    REEL_PATH_RE
        .captures(path)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
}

/// Shortcode of a post-form path.
pub fn post_shortcode(path: &str) -> Option<&str> {
    POST_PATH_RE
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

pub fn is_reels_listing(path: &str) -> bool {
    REELS_PAGE_RE.is_match(path)
}
