use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::query::{squash, text_of};
use crate::model::Review;

static REVIEW: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".lister-item.mode-detail.imdb-user-review.collapsable").unwrap()
});
static REVIEW_DATE: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".review-date").unwrap());
static RATING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".rating-other-user-rating").unwrap());

/// Reviews on the first page of a title's review listing. Further pages sit
/// behind a "load more" request and are not read.
pub fn parse_reviews(title_id: &str, html: &str) -> Vec<Review> {
    let doc = Html::parse_document(html);
    doc.select(&REVIEW)
        .filter_map(|item| {
            let date = item.select(&REVIEW_DATE).next().map(|d| squash(&text_of(d)))?;
            let rating = item
                .select(&RATING)
                .next()
                .map(|r| squash(&text_of(r)))
                .filter(|r| !r.is_empty());
            Some(Review {
                id: title_id.to_string(),
                date,
                rating,
            })
        })
        .collect()
}
