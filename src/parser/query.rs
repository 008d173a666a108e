//! Small query layer over `scraper` so extractors ask for sections by id or
//! label instead of by position.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static ANY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("*").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static LABEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h4").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Concatenated text of an element and its descendants.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// Collapse whitespace runs to single spaces and trim.
pub fn squash(s: &str) -> String {
    WS_RE.replace_all(s.trim(), " ").into_owned()
}

/// Remove all whitespace.
pub fn strip_whitespace(s: &str) -> String {
    WS_RE.replace_all(s, "").into_owned()
}

/// Squashed text of every anchor under `el`, empty ones dropped.
pub fn anchor_texts(el: ElementRef<'_>) -> Vec<String> {
    el.select(&ANCHOR)
        .map(|a| squash(&text_of(a)))
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn first_anchor(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.select(&ANCHOR).next()
}

pub fn element_by_id<'a>(doc: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    doc.select(&ANY).find(|e| e.value().id() == Some(id))
}

/// Text of the block's `h4` label, e.g. `Country:`.
pub fn label_of(el: ElementRef<'_>) -> Option<String> {
    el.select(&LABEL).next().map(|h| squash(&text_of(h)))
}

/// First element of `scope` whose label starts with `prefix`.
pub fn find_labelled<'a>(
    mut scope: impl Iterator<Item = ElementRef<'a>>,
    prefix: &str,
) -> Option<ElementRef<'a>> {
    scope.find(|el| label_of(*el).is_some_and(|l| l.starts_with(prefix)))
}

/// Next sibling element with the given tag name (`<h4 id=..>` → `<ul>`).
pub fn next_sibling_named<'a>(el: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    el.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labelled_block_lookup() {
        let doc = Html::parse_document(
            r#"<div class="b"><h4>Language:</h4><a>English</a></div>
               <div class="b"><h4>Country:</h4><a> USA </a></div>"#,
        );
        let sel = Selector::parse(".b").unwrap();
        let block = find_labelled(doc.select(&sel), "Country").unwrap();
        assert_eq!(anchor_texts(block), vec!["USA"]);
        assert!(find_labelled(doc.select(&sel), "Genres").is_none());
    }

    #[test]
    fn sibling_list_after_heading() {
        let doc = Html::parse_document(
            r#"<h4 id="production">Production</h4> <p>note</p> <ul><li><a>A</a></li></ul>"#,
        );
        let heading = element_by_id(&doc, "production").unwrap();
        let list = next_sibling_named(heading, "ul").unwrap();
        assert_eq!(anchor_texts(list), vec!["A"]);
    }

    #[test]
    fn whitespace_helpers() {
        assert_eq!(squash("  a \n  b  "), "a b");
        assert_eq!(strip_whitespace("\n 1h 47min \n"), "1h47min");
    }
}
