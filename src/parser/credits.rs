use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::distributor::parse_distributor;
use super::query::{
    anchor_texts, element_by_id, first_anchor, next_sibling_named, squash, text_of,
};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{CompanyCredit, DistributorRecord};

static LIST_ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());

/// Producers and distributors from a title's company credits page.
pub fn parse_company_credits(
    title_id: &str,
    html: &str,
    as_of_year: i32,
    diags: &mut Diagnostics,
) -> CompanyCredit {
    let doc = Html::parse_document(html);

    let producers = match section_list(&doc, "production") {
        Some(list) => anchor_texts(list),
        None => {
            diags.record(title_id, DiagnosticKind::MissingSection, "no producers found");
            Vec::new()
        }
    };

    let distributors = match section_list(&doc, "distributors") {
        Some(list) => list
            .select(&LIST_ITEM)
            .filter_map(|item| {
                let Some(anchor) = first_anchor(item) else {
                    diags.record(
                        title_id,
                        DiagnosticKind::MalformedCredit,
                        format!(
                            "distributor item without a company link: {:?}",
                            squash(&text_of(item))
                        ),
                    );
                    return None;
                };
                let name = squash(&text_of(anchor));
                let raw = text_of(item).replacen(&name, "", 1);
                Some(parse_distributor(title_id, &name, &raw, as_of_year, diags))
            })
            .collect::<Vec<DistributorRecord>>(),
        None => {
            diags.record(title_id, DiagnosticKind::MissingSection, "no distributor found");
            Vec::new()
        }
    };

    CompanyCredit {
        id: title_id.to_string(),
        producers,
        distributors,
    }
}

/// The `<ul>` following the section heading with the given id.
fn section_list<'a>(doc: &'a Html, id: &str) -> Option<scraper::ElementRef<'a>> {
    element_by_id(doc, id).and_then(|heading| next_sibling_named(heading, "ul"))
}
