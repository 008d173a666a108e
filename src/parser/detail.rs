use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::query::{
    anchor_texts, element_by_id, find_labelled, squash, strip_whitespace, text_of,
};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{ContentDetail, Title};

static DURATION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".title_wrapper time").unwrap());
static TXT_BLOCK: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".txt-block").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static SEE_MORE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".see-more.inline.canwrap").unwrap());
static CREDIT_SUMMARY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".credit_summary_item").unwrap());

const FULL_CAST_LINK: &str = "See full cast & crew";

pub fn parse_detail(title: &Title, html: &str, diags: &mut Diagnostics) -> ContentDetail {
    let doc = Html::parse_document(html);
    let id = title.id.as_str();

    let duration = doc
        .select(&DURATION)
        .next()
        .map(|t| strip_whitespace(&text_of(t)))
        .unwrap_or_else(|| {
            diags.record(id, DiagnosticKind::MissingSection, "no duration");
            String::new()
        });

    ContentDetail {
        id: title.id.clone(),
        title: title.title.clone(),
        duration,
        country: country(&doc, id, diags),
        genres: genres(&doc, id, diags),
        stars: stars(&doc, id, diags),
    }
}

fn country(doc: &Html, id: &str, diags: &mut Diagnostics) -> String {
    let Some(details) = element_by_id(doc, "titleDetails") else {
        diags.record(id, DiagnosticKind::MissingSection, "no title details section");
        return String::new();
    };

    if let Some(block) = find_labelled(details.select(&TXT_BLOCK), "Country") {
        if let Some(c) = anchor_texts(block).into_iter().next() {
            return c;
        }
    }

    // Older layouts only expose the country as the third link of the section.
    match details.select(&ANCHOR).nth(2) {
        Some(a) => {
            diags.record(
                id,
                DiagnosticKind::PositionalFallback,
                "country read from third details link",
            );
            squash(&text_of(a))
        }
        None => {
            diags.record(id, DiagnosticKind::MissingSection, "no country");
            String::new()
        }
    }
}

fn genres(doc: &Html, id: &str, diags: &mut Diagnostics) -> Vec<String> {
    labelled_or_nth(doc, &SEE_MORE, "Genres", 1, "genres", id, diags)
        .map(anchor_texts)
        .unwrap_or_default()
}

fn stars(doc: &Html, id: &str, diags: &mut Diagnostics) -> Vec<String> {
    labelled_or_nth(doc, &CREDIT_SUMMARY, "Star", 0, "stars", id, diags)
        .map(|block| {
            anchor_texts(block)
                .into_iter()
                .filter(|s| s != FULL_CAST_LINK)
                .collect()
        })
        .unwrap_or_default()
}

/// Block labelled `label`, else the `nth` block matching `sel` (diagnosed).
fn labelled_or_nth<'a>(
    doc: &'a Html,
    sel: &Selector,
    label: &str,
    nth: usize,
    what: &str,
    id: &str,
    diags: &mut Diagnostics,
) -> Option<ElementRef<'a>> {
    if let Some(block) = find_labelled(doc.select(sel), label) {
        return Some(block);
    }
    match doc.select(sel).nth(nth) {
        Some(block) => {
            diags.record(
                id,
                DiagnosticKind::PositionalFallback,
                format!("{} read from unlabelled block #{}", what, nth + 1),
            );
            Some(block)
        }
        None => {
            diags.record(id, DiagnosticKind::MissingSection, format!("no {} block", what));
            None
        }
    }
}
