//! Link normalization.
//!
//! Turns anchor hrefs (possibly relative, possibly carrying a username
//! prefix, query or fragment) into canonical queue targets. Every failure
//! mode is "no match": nothing in here returns an error.

pub mod grammar;

use std::fmt;

use serde::{Serialize, Serializer};
use url::Url;

/// Which grammar a target was recognised by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// `/reel/{code}/`, optionally prefixed by `/{user}`
    Reel,
    /// `/p/{code}/`
    Post,
}

impl LinkKind {
    fn path_segment(self) -> &'static str {
        match self {
            LinkKind::Reel => "reel",
            LinkKind::Post => "p",
        }
    }
}

/// Canonical absolute URL of a single playable item.
///
/// Always `{origin}/reel/{code}/` or `{origin}/p/{code}/`: no username
/// prefix, no query, no fragment, trailing slash. Only [`LinkNormalizer`]
/// constructs these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkUrl(String);

impl LinkUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for LinkUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LinkUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for LinkUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Canonicalizes and validates queue targets for one fixed origin.
#[derive(Debug, Clone)]
pub struct LinkNormalizer {
    origin: String,
}

impl LinkNormalizer {
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Resolve `href` against `base` and match the reel grammar.
    pub fn normalize_reel(&self, href: &str, base: &Url) -> Option<LinkUrl> {
        let url = self.resolve(href, base)?;
        grammar::reel_shortcode(url.path()).map(|code| self.canonical(LinkKind::Reel, code))
    }

    /// Resolve `href` against `base` and match the post grammar.
    pub fn normalize_post(&self, href: &str, base: &Url) -> Option<LinkUrl> {
        let url = self.resolve(href, base)?;
        grammar::post_shortcode(url.path()).map(|code| self.canonical(LinkKind::Post, code))
    }

    /// Either grammar, reel first.
    pub fn normalize(&self, href: &str, base: &Url) -> Option<LinkUrl> {
        let url = self.resolve(href, base)?;
        self.match_path(url.path())
    }

    /// Whether an untrusted absolute URL string is a valid navigation or
    /// storage target: same origin, and a path in one of the two grammars.
    pub fn is_valid_target(&self, candidate: &str) -> bool {
        self.validate(candidate).is_some()
    }

    /// Validate an untrusted absolute URL string and return its canonical form.
    pub fn validate(&self, candidate: &str) -> Option<LinkUrl> {
        let url = Url::parse(candidate).ok()?;
        if !self.same_origin(&url) {
            return None;
        }
        self.match_path(url.path())
    }

    /// Classify an already-canonical link.
    pub fn kind_of(&self, link: &LinkUrl) -> Option<LinkKind> {
        let url = Url::parse(link.as_str()).ok()?;
        let path = url.path();
        if grammar::reel_shortcode(path).is_some() {
            Some(LinkKind::Reel)
        } else if grammar::post_shortcode(path).is_some() {
            Some(LinkKind::Post)
        } else {
            None
        }
    }

    fn resolve(&self, href: &str, base: &Url) -> Option<Url> {
        let url = base.join(href.trim()).ok()?;
        self.same_origin(&url).then_some(url)
    }

    /// Whether `url` is on the target origin.
    pub fn same_origin(&self, url: &Url) -> bool {
        url.origin().ascii_serialization() == self.origin
    }

    fn match_path(&self, path: &str) -> Option<LinkUrl> {
        if let Some(code) = grammar::reel_shortcode(path) {
            return Some(self.canonical(LinkKind::Reel, code));
        }
        grammar::post_shortcode(path).map(|code| self.canonical(LinkKind::Post, code))
    }

    fn canonical(&self, kind: LinkKind, code: &str) -> LinkUrl {
        LinkUrl(format!("{}/{}/{}/", self.origin, kind.path_segment(), code))
    }
}
