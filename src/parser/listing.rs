use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::query::{first_anchor, squash, text_of};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::Title;
use crate::pagination::{canonical_title_url, resolve, title_id};

static ITEM_HEADER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".lister-item-header").unwrap());

/// Titles listed on one search results page, in page order. Duplicates are
/// left in; discovery dedups across pages.
pub fn parse_listing(
    html: &str,
    page_url: &str,
    site_root: &str,
    diags: &mut Diagnostics,
) -> Vec<Title> {
    let doc = Html::parse_document(html);
    let mut titles = Vec::new();

    for header in doc.select(&ITEM_HEADER) {
        let Some(anchor) = first_anchor(header) else {
            diags.record(page_url, DiagnosticKind::MissingSection, "listing item without a link");
            continue;
        };
        let title = squash(&text_of(anchor));
        let id = anchor
            .value()
            .attr("href")
            .and_then(|href| resolve(site_root, href))
            .and_then(|url| title_id(&url));

        match id {
            Some(id) => titles.push(Title {
                url: canonical_title_url(site_root, &id),
                id,
                title,
            }),
            None => diags.record(
                page_url,
                DiagnosticKind::MissingSection,
                format!("no title id for listing item {:?}", title),
            ),
        }
    }

    titles
}
