//! Best-effort "is this tile a video" check for feeds that do not mark
//! videos explicitly. This is the only place that knows about tile markup.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

static ANY_SVG: Lazy<Selector> = Lazy::new(|| Selector::parse("svg").expect("valid svg selector"));

static LABELLED_SVG: Lazy<Selector> =
    Lazy::new(|| Selector::parse("svg[aria-label]").expect("valid labelled svg selector"));

/// A post anchor looks like a video tile when it carries a vector icon
/// itself, or its closest enclosing `div` holds a labelled one (the play
/// overlay).
pub fn looks_like_video_tile(anchor: ElementRef<'_>) -> bool {
    if anchor.select(&ANY_SVG).next().is_some() {
        return true;
    }
    closest_div(anchor)
        .map(|div| div.select(&LABELLED_SVG).next().is_some())
        .unwrap_or(false)
}

fn closest_div(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if el.value().name() == "div" {
        return Some(el);
    }
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "div")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn first_anchor(doc: &Html) -> ElementRef<'_> {
        let sel = Selector::parse("a").unwrap();
        doc.select(&sel).next().unwrap()
    }

    #[test]
    fn svg_inside_anchor() {
        let doc = Html::parse_fragment(r#"<a href="/p/A/"><svg></svg></a>"#);
        assert!(looks_like_video_tile(first_anchor(&doc)));
    }

    #[test]
    fn labelled_svg_in_enclosing_div() {
        let doc = Html::parse_fragment(
            r#"<div><a href="/p/A/"><img src="x.jpg"></a><span><svg aria-label="Clip"></svg></span></div>"#,
        );
        assert!(looks_like_video_tile(first_anchor(&doc)));
    }

    #[test]
    fn unlabelled_sibling_svg_is_not_enough() {
        let doc = Html::parse_fragment(
            r#"<div><a href="/p/A/"><img src="x.jpg"></a><svg></svg></div>"#,
        );
        assert!(!looks_like_video_tile(first_anchor(&doc)));
    }

    #[test]
    fn plain_photo_tile() {
        let doc = Html::parse_fragment(r#"<div><a href="/p/A/"><img src="x.jpg"></a></div>"#);
        assert!(!looks_like_video_tile(first_anchor(&doc)));
    }

    #[test]
    fn labelled_svg_outside_closest_div() {
        let doc = Html::parse_fragment(
            r#"<section><svg aria-label="Clip"></svg><div><a href="/p/A/"><img></a></div></section>"#,
        );
        assert!(!looks_like_video_tile(first_anchor(&doc)));
    }
}
